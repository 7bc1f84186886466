//! Extension function dispatch.
//!
//! A rule carrying a `func` keyword names a callback that runs before the
//! node's structural checks. Callbacks live in [`ExtensionModule`]s that
//! the host registers programmatically; how a host sources them (from
//! disk or otherwise) is outside this crate. Lookup scans modules in
//! registration order and invokes the first match; a `false` return or a
//! missing name is fatal to the whole run, not an accumulated finding.

use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::schema::RuleNode;

/// Signature of an extension callback: the value under validation, the
/// rule that named the callback, and the current data path.
pub type ExtensionFn = Box<dyn Fn(&Value, &RuleNode, &str) -> bool + Send + Sync>;

/// A named group of extension callbacks.
pub struct ExtensionModule {
    name: String,
    functions: Vec<(String, ExtensionFn)>,
}

impl ExtensionModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a callback under `func_name`.
    pub fn register<F>(&mut self, func_name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &RuleNode, &str) -> bool + Send + Sync + 'static,
    {
        self.functions.push((func_name.into(), Box::new(f)));
    }

    fn get(&self, func_name: &str) -> Option<&ExtensionFn> {
        self.functions
            .iter()
            .find(|(name, _)| name == func_name)
            .map(|(_, f)| f)
    }
}

impl std::fmt::Debug for ExtensionModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionModule")
            .field("name", &self.name)
            .field(
                "functions",
                &self
                    .functions
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Find `func_name` among `modules` (load order) and invoke it.
pub fn dispatch(
    modules: &[ExtensionModule],
    func_name: &str,
    value: &Value,
    rule: &RuleNode,
    path: &str,
) -> CoreResult<()> {
    for module in modules {
        if let Some(f) = module.get(func_name) {
            if f(value, rule, path) {
                return Ok(());
            }
            return Err(CoreError::ExtensionFailed {
                name: func_name.to_string(),
                path: path.to_string(),
            });
        }
    }
    Err(CoreError::ExtensionNotFound {
        name: func_name.to_string(),
    })
}
