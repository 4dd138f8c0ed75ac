//! Python semantic model for pysense.
//!
//! Given a stream of ASTs for Python source files, this crate incrementally
//! builds a hierarchical symbol model (nested lexical scopes, declarations,
//! and an approximate union-valued type for every declaration and
//! expression), and classifies an editing cursor's surroundings into a
//! completion intent.
//!
//! - [`model`]: the shared symbol model behind its reader/writer lock
//! - [`types`]: the type lattice and its merge/widen operations
//! - [`builder`]: the two-pass scope and declaration builder
//! - [`inference`]: read-only expression type inference
//! - [`completion`]: completion context classification
//! - [`imports`]: module path resolution against search directories
//! - [`stubs`]: the synthetic builtin stub file
//! - [`scheduler`]: interfaces to the external build scheduler
//!
//! See [`builder::build_file`] for the main entry point.

pub mod ast;
pub mod builder;
pub mod completion;
pub mod imports;
pub mod inference;
pub mod model;
pub mod scheduler;
pub mod stubs;
pub mod types;

pub use builder::{build_file, BuildOutcome};
pub use completion::{classify, CompletionContext, CompletionIntent};
pub use model::SharedModel;
pub use types::Type;
