//! Partial schema registry.
//!
//! Schema entries keyed `schema;<name>` are compiled and registered here
//! before the root rule is compiled; `{"include": "<name>"}` anywhere in
//! the tree resolves against this registry at validation time, which is
//! what makes self-referential (recursive) schemas work.
//!
//! The registry is scoped to one compile-and-validate session rather
//! than being process-wide, so concurrent runs never share mutable
//! state.

use std::collections::HashMap;

use log::debug;
use serde_json::{Map, Value};

use super::compiler;
use super::types::RuleNode;
use crate::error::{CompileError, CompileResult};

/// Reserved key prefix marking a schema entry as a partial definition.
pub const PARTIAL_PREFIX: &str = "schema;";

/// Named, compiled partial schemas for one validation session.
#[derive(Debug, Default)]
pub struct PartialSchemaRegistry {
    partials: HashMap<String, RuleNode>,
}

impl PartialSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled partial under `name`, replacing any previous
    /// registration of the same name.
    pub fn insert(&mut self, name: impl Into<String>, rule: RuleNode) {
        self.partials.insert(name.into(), rule);
    }

    pub fn get(&self, name: &str) -> Option<&RuleNode> {
        self.partials.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// Registered names, sorted for stable error rendering.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.partials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Drain `schema;<name>` entries from a schema document into this
    /// registry, compiling each, and return the remaining root keys.
    ///
    /// Include references inside a partial resolve only at validation
    /// time, so a partial may reference itself or partials registered
    /// after it.
    pub fn absorb(&mut self, schema: &Value) -> CompileResult<Map<String, Value>> {
        let obj = schema
            .as_object()
            .ok_or_else(|| CompileError::RuleNotMapping {
                path: String::new(),
            })?;

        let mut root = Map::new();
        for (key, value) in obj {
            if let Some(name) = key.strip_prefix(PARTIAL_PREFIX) {
                debug!("registering partial schema '{name}'");
                let rule = compiler::compile(value, "")?;
                self.insert(name, rule);
            } else {
                root.insert(key.clone(), value.clone());
            }
        }
        Ok(root)
    }

    /// Build a registry and the root rule from one schema document.
    pub fn extract(schema: &Value) -> CompileResult<(Self, RuleNode)> {
        let mut registry = Self::new();
        let root = registry.absorb(schema)?;
        if root.is_empty() {
            return Err(CompileError::MissingRootSchema);
        }
        let root_rule = compiler::compile(&Value::Object(root), "")?;
        Ok((registry, root_rule))
    }
}
