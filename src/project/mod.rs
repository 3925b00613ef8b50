pub mod linker;
pub mod policy;

pub use linker::{ProjectLink, ProjectLinker};
pub use policy::{PolicyRegistry, PrefixPolicy, ProjectNumberPolicy};
