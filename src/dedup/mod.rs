pub mod resolver;

pub use resolver::{DuplicateResolver, Verdict, VerdictKind};
