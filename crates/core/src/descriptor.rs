//! Field/method descriptors and generic signatures.
//!
//! All remapping functions take a class-name mapper returning `Some(new_name)` for renamed
//! classes and `None` for classes that keep their name.

use crate::result::{Error, Result};

/// Remaps every class name inside a field or method descriptor.
pub fn remap_descriptor<F>(descriptor: &str, map: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let bytes = descriptor.as_bytes();
    let mut out = String::with_capacity(descriptor.len());
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'L' {
            let end = descriptor[pos..]
                .find(';')
                .map(|offset| pos + offset)
                .ok_or_else(|| Error::InvalidDescriptor(descriptor.to_string()))?;
            let name = &descriptor[pos + 1..end];
            out.push('L');
            match map(name) {
                Some(mapped) => out.push_str(&mapped),
                None => out.push_str(name),
            }
            out.push(';');
            pos = end + 1;
        } else {
            let ch = descriptor[pos..]
                .chars()
                .next()
                .ok_or_else(|| Error::InvalidDescriptor(descriptor.to_string()))?;
            out.push(ch);
            pos += ch.len_utf8();
        }
    }
    Ok(out)
}

/// Maps the name stored in a `CONSTANT_Class` entry, which is an array descriptor for
/// array types and an internal name otherwise.
pub fn remap_class_reference<F>(name: &str, map: F) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    if name.starts_with('[') {
        let mapped = remap_descriptor(name, map)?;
        Ok((mapped != name).then_some(mapped))
    } else {
        Ok(map(name))
    }
}

/// Remaps class names inside a generic signature (class, method or field).
pub fn remap_signature<F>(signature: &str, map: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut parser = SignatureRemapper {
        src: signature,
        pos: 0,
        out: String::with_capacity(signature.len()),
        map: &map,
    };
    parser.signature()?;
    Ok(parser.out)
}

struct SignatureRemapper<'a, F> {
    src: &'a str,
    pos: usize,
    out: String,
    map: &'a F,
}

impl<F> SignatureRemapper<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn error(&self) -> Error {
        Error::InvalidDescriptor(format!("{} (at {})", self.src, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() != Some(byte) {
            return Err(self.error());
        }
        self.out.push(byte as char);
        self.pos += 1;
        Ok(())
    }

    /// Reads an identifier up to (not including) any byte in `stops`.
    fn identifier(&mut self, stops: &[u8]) -> Result<&str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start || self.peek().is_none() {
            return Err(self.error());
        }
        Ok(&self.src[start..self.pos])
    }

    fn signature(&mut self) -> Result<()> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.expect(b'(')?;
            while self.peek() != Some(b')') {
                self.java_type()?;
            }
            self.expect(b')')?;
            self.java_type()?;
            while self.peek() == Some(b'^') {
                self.expect(b'^')?;
                self.reference_type()?;
            }
        } else {
            // class signature (superclass + interfaces) or field signature
            while self.peek().is_some() {
                self.reference_type()?;
            }
        }
        if self.pos != self.src.len() {
            return Err(self.error());
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            let name = self.identifier(b":>")?.to_string();
            self.out.push_str(&name);
            if self.peek() != Some(b':') {
                return Err(self.error());
            }
            while self.peek() == Some(b':') {
                self.expect(b':')?;
                if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                    self.reference_type()?;
                }
            }
        }
        self.expect(b'>')
    }

    fn java_type(&mut self) -> Result<()> {
        match self.peek() {
            Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V')) => {
                self.out.push(b as char);
                self.pos += 1;
                Ok(())
            }
            Some(_) => self.reference_type(),
            None => Err(self.error()),
        }
    }

    fn reference_type(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => {
                self.expect(b'T')?;
                let name = self.identifier(b";")?.to_string();
                self.out.push_str(&name);
                self.expect(b';')
            }
            Some(b'[') => {
                self.expect(b'[')?;
                self.java_type()
            }
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<()> {
        self.expect(b'L')?;
        let old_name = self.identifier(b"<.;")?.to_string();
        let new_name = (self.map)(&old_name).unwrap_or_else(|| old_name.clone());
        self.out.push_str(&new_name);
        if self.peek() == Some(b'<') {
            self.type_arguments()?;
        }

        let (mut old_outer, mut new_outer) = (old_name, new_name);
        while self.peek() == Some(b'.') {
            self.expect(b'.')?;
            let simple = self.identifier(b"<.;")?.to_string();
            let old_inner = format!("{old_outer}${simple}");
            let new_inner = (self.map)(&old_inner).unwrap_or_else(|| format!("{new_outer}${simple}"));
            let prefix = format!("{new_outer}$");
            let new_simple = match new_inner.strip_prefix(&prefix) {
                Some(rest) => rest.to_string(),
                None => new_inner
                    .rsplit_once('$')
                    .map(|(_, tail)| tail.to_string())
                    .unwrap_or_else(|| simple.clone()),
            };
            self.out.push_str(&new_simple);
            if self.peek() == Some(b'<') {
                self.type_arguments()?;
            }
            old_outer = old_inner;
            new_outer = new_inner;
        }
        self.expect(b';')
    }

    fn type_arguments(&mut self) -> Result<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.expect(b'*')?,
                Some(b @ (b'+' | b'-')) => {
                    self.expect(b)?;
                    self.reference_type()?;
                }
                Some(_) => self.reference_type()?,
                None => return Err(self.error()),
            }
        }
        self.expect(b'>')
    }
}

/// Checks that `descriptor` is a single well-formed field type.
pub fn is_field_descriptor(descriptor: &str) -> bool {
    matches!(field_type_len(descriptor, 0), Some(len) if len == descriptor.len())
}

/// Checks that `descriptor` is a well-formed method descriptor.
pub fn is_method_descriptor(descriptor: &str) -> bool {
    parameter_sizes(descriptor).is_ok()
}

/// Length of the field type starting at `pos`, if one is there.
fn field_type_len(descriptor: &str, pos: usize) -> Option<usize> {
    let bytes = descriptor.as_bytes();
    let mut end = pos;
    while bytes.get(end) == Some(&b'[') {
        end += 1;
    }
    match bytes.get(end)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(end + 1 - pos),
        b'L' => {
            let semi = descriptor[end..].find(';')? + end;
            (semi > end + 1).then_some(semi + 1 - pos)
        }
        _ => None,
    }
}

/// Local-variable slot width of each parameter in a method descriptor.
///
/// `long` and `double` take two slots, everything else one.
pub fn parameter_sizes(descriptor: &str) -> Result<Vec<u16>> {
    let invalid = || Error::InvalidDescriptor(descriptor.to_string());
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(invalid());
    }
    let mut pos = 1;
    let mut sizes = Vec::new();
    while bytes.get(pos) != Some(&b')') {
        let len = field_type_len(descriptor, pos).ok_or_else(invalid)?;
        let wide = len == 1 && matches!(bytes[pos], b'J' | b'D');
        sizes.push(if wide { 2 } else { 1 });
        pos += len;
    }
    pos += 1;
    let valid_return = descriptor.get(pos..) == Some("V")
        || matches!(field_type_len(descriptor, pos), Some(len) if pos + len == descriptor.len());
    if !valid_return {
        return Err(invalid());
    }
    Ok(sizes)
}
