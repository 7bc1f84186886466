//! Schema compilation and validation.
//!
//! A schema description compiles into a [`RuleNode`] tree
//! ([`compiler::compile`]); a [`validation::Validator`] then walks a data
//! value against that tree, accumulating path-qualified findings. Named
//! partial schemas live in a per-session [`registry::PartialSchemaRegistry`].
//!
//! # Key Types
//!
//! - [`RuleNode`] - one compiled schema unit
//! - [`Validator`] - the recursive tree walker
//! - [`PartialSchemaRegistry`] - named sub-schemas for `include`

pub mod compiler;
pub mod registry;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

pub use compiler::compile;
pub use registry::{PARTIAL_PREFIX, PartialSchemaRegistry};
pub use types::{Bounds, MappingMatching, RegexMapping, RuleKind, RuleNode, SequenceMatching};
pub use validation::Validator;
