use crate::{ClassUnit, Result, Transform};
use tracing::debug;

/// Trait for running a sequence of transforms over one class.
pub trait Pass {
    fn run(&self, unit: &mut ClassUnit, transforms: &mut [&mut dyn Transform]) -> Result<bool>;
}

/// Default implementation of the Pass trait.
///
/// Transforms run in order on the same class; each sees the output of the previous one.
pub struct DefaultPass;

impl Pass for DefaultPass {
    fn run(&self, unit: &mut ClassUnit, transforms: &mut [&mut dyn Transform]) -> Result<bool> {
        let mut changed = false;
        for transform in transforms.iter_mut() {
            if transform.apply(unit)? {
                debug!("{:>18} {}", transform.name(), unit.original.name);
                changed = true;
            }
        }
        Ok(changed)
    }
}
