// Composition engine
pub mod engine;
pub mod node;
pub mod outcome;
pub mod registry;
pub mod task;

// Leaf collaborators
pub mod codegen;
pub mod compiler;
pub mod fetch;
pub mod manifest;
pub mod process;
pub mod transfer;

pub mod error;
pub mod pipelines;
pub mod settings;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use node::{leaf, parallel, scoped, series, Node};
pub use outcome::{Failure, Outcome};
pub use registry::Registry;
pub use task::{Task, TaskContext};
