//! One compile-and-validate session.
//!
//! [`Core`] ties the pieces together: it extracts and registers partial
//! schemas, compiles the root rule tree, runs the validator over the
//! source value, and exposes the result either strictly (any finding
//! raises an aggregate [`SchemaError`]) or as the bare findings list.

use std::path::Path;

use log::{debug, error, info};
use serde_json::{Map, Value};

use crate::error::{CompileError, CoreResult, SchemaError, ValidationError};
use crate::extensions::ExtensionModule;
use crate::loader;
use crate::schema::{PartialSchemaRegistry, Validator, compile};

/// A validation session over one source value and one or more schema
/// documents.
///
/// Note that validation may mutate the source: mapping rules with
/// `default` inject the default into the data for absent keys. The
/// post-run source is available through [`Core::source`] or the
/// reference returned by [`Core::validate`].
#[derive(Debug)]
pub struct Core {
    source: Value,
    schemas: Vec<Value>,
    extensions: Vec<ExtensionModule>,
}

impl Core {
    /// Session over already-parsed source and schema trees.
    pub fn new(source: Value, schema: Value) -> Self {
        Self::with_schemas(source, vec![schema])
    }

    /// Session over several schema documents. Partial schemas are
    /// collected from all of them; non-partial root keys merge shallowly
    /// in document order, later documents overriding earlier ones.
    pub fn with_schemas(source: Value, schemas: Vec<Value>) -> Self {
        Self {
            source,
            schemas,
            extensions: Vec::new(),
        }
    }

    /// Session loaded from files, formats sniffed by extension.
    pub fn from_files(source_file: &Path, schema_files: &[impl AsRef<Path>]) -> CoreResult<Self> {
        let source = loader::load_file(source_file)?;
        let mut schemas = Vec::with_capacity(schema_files.len());
        for schema_file in schema_files {
            schemas.push(loader::load_file(schema_file.as_ref())?);
        }
        Ok(Self::with_schemas(source, schemas))
    }

    /// Register an extension module; modules are consulted in
    /// registration order when a rule names a `func`.
    pub fn add_extension_module(&mut self, module: ExtensionModule) {
        self.extensions.push(module);
    }

    /// The source value, including any defaults injected by validation.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Strict validation: returns the (possibly default-enriched) source
    /// on success, or raises every accumulated finding as one aggregate
    /// [`SchemaError`]. Fatal errors propagate as themselves.
    pub fn validate(&mut self) -> CoreResult<&Value> {
        let errors = self.run()?;
        if errors.is_empty() {
            info!("validation.valid");
            Ok(&self.source)
        } else {
            error!("validation.invalid: {} finding(s)", errors.len());
            Err(SchemaError::new(errors).into())
        }
    }

    /// Non-strict validation: returns the full findings list (empty
    /// means valid) for the caller to inspect or log. Fatal errors still
    /// propagate.
    pub fn validate_all(&mut self) -> CoreResult<Vec<ValidationError>> {
        self.run()
    }

    fn run(&mut self) -> CoreResult<Vec<ValidationError>> {
        // Partials register before the root compiles so includes resolve
        // no matter where they sit in the tree.
        let mut registry = PartialSchemaRegistry::new();
        let mut root_doc: Map<String, Value> = Map::new();
        for schema in &self.schemas {
            for (key, value) in registry.absorb(schema)? {
                root_doc.insert(key, value);
            }
        }
        if root_doc.is_empty() {
            return Err(CompileError::MissingRootSchema.into());
        }

        debug!("building root rule tree");
        let root_rule = compile(&Value::Object(root_doc), "")?;

        let mut validator = Validator::new(&registry, &self.extensions);
        validator.validate(&mut self.source, &root_rule, "")?;
        Ok(validator.into_errors())
    }
}
