//! Structural metadata: the descriptor file and the step that writes it into class files.

pub mod descriptor;
pub mod injector;

pub use descriptor::{
    ClassStructure, EnclosingMethodRecord, InnerClassRecord, MethodStructure, StructureDescriptor,
};
pub use injector::{AttributeInjector, InjectOptions, LEGACY_TARGET_VERSION, StructureInjector};
