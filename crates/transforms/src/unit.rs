//! The unit of work handed to every [`Transform`](crate::Transform).

use deobf_core::{ClassFile, MemberKind};

/// Names a class and its members carried when the class was read, before any renaming.
///
/// Member positions line up with the class's field and method lists; no stage reorders
/// members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginalSymbols {
    pub name: String,
    pub super_name: Option<String>,
    pub fields: Vec<(String, String)>,
    pub methods: Vec<(String, String)>,
}

impl OriginalSymbols {
    pub fn capture(class: &ClassFile) -> deobf_core::Result<Self> {
        let snapshot = |kind| {
            class
                .members_of(kind)
                .iter()
                .map(|m| {
                    Ok((
                        class.member_name(m)?.to_string(),
                        class.member_descriptor(m)?.to_string(),
                    ))
                })
                .collect::<deobf_core::Result<Vec<_>>>()
        };
        Ok(Self {
            name: class.name()?.to_string(),
            super_name: class.super_name()?.map(str::to_string),
            fields: snapshot(MemberKind::Field)?,
            methods: snapshot(MemberKind::Method)?,
        })
    }

    /// Original `(name, descriptor)` of the member at `position`.
    pub fn member(&self, kind: MemberKind, position: usize) -> Option<(&str, &str)> {
        let list = match kind {
            MemberKind::Field => &self.fields,
            MemberKind::Method => &self.methods,
        };
        list.get(position)
            .map(|(name, desc)| (name.as_str(), desc.as_str()))
    }
}

/// A class being rewritten, paired with the symbols it was read with.
#[derive(Debug, Clone)]
pub struct ClassUnit {
    pub class: ClassFile,
    pub original: OriginalSymbols,
}

impl ClassUnit {
    pub fn new(class: ClassFile) -> deobf_core::Result<Self> {
        let original = OriginalSymbols::capture(&class)?;
        Ok(Self { class, original })
    }

    pub fn decode(bytes: &[u8]) -> deobf_core::Result<Self> {
        Self::new(deobf_core::decode_class(bytes)?)
    }

    pub fn encode(&self) -> deobf_core::Result<Vec<u8>> {
        deobf_core::encode_class(&self.class)
    }

    pub fn into_class(self) -> ClassFile {
        self.class
    }
}
