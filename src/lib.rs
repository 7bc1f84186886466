//! Declarative schema validation for YAML/JSON data trees.
//!
//! Validates structured data (mappings, sequences, scalars) against a
//! kwalify-style schema description and reports *every* violation with a
//! `/`-delimited path, rather than failing on the first one. Intended as
//! a data-quality gate for configuration and data files.
//!
//! # Core Components
//!
//! - [`Core`] - one compile-and-validate session
//! - [`schema::RuleNode`] - the compiled rule tree
//! - [`schema::Validator`] - the recursive, non-short-circuiting walker
//! - [`ExtensionModule`] - host-registered `func` callbacks
//!
//! # Quick Start
//!
//! ```rust
//! use schemagate::Core;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "map",
//!     "mapping": {
//!         "name": {"type": "str", "required": true},
//!         "age": {"type": "int"},
//!     }
//! });
//! let data = json!({"name": "kaka", "age": 42});
//!
//! let mut core = Core::new(data, schema);
//! assert!(core.validate().is_ok());
//! ```
//!
//! Validation is not a pure function of its input: mapping rules with a
//! `default` inject that default into the source value for absent keys.
//! The enriched source is what [`Core::validate`] hands back.

pub mod core;
pub mod error;
pub mod extensions;
pub mod loader;
pub mod schema;
pub mod types;

// Re-export the common surface for convenience
pub use self::core::Core;
pub use error::{CompileError, CoreError, CoreResult, SchemaError, ValidationError};
pub use extensions::ExtensionModule;
pub use schema::{PartialSchemaRegistry, RuleNode, Validator, compile};
