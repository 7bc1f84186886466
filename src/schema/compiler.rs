//! Schema compiler.
//!
//! Turns a nested schema description into a [`RuleNode`] tree, enforcing
//! keyword legality and cross-keyword conflicts as it goes. Compilation
//! is all-or-nothing: the first violation aborts with a [`CompileError`],
//! unlike validation findings which accumulate.

use log::debug;
use regex::Regex;
use serde_json::Value;

use super::types::{Bounds, MappingMatching, RegexMapping, RuleKind, RuleNode, SequenceMatching};
use crate::error::{CompileError, CompileResult};
use crate::types::{is_builtin_type, is_collection, is_collection_type};

/// Sentinel prefixes marking a mapping key as a regex pattern.
const REGEX_KEY_PREFIXES: &[&str] = &["regex;", "re;"];

/// Compile a schema description into a rule tree.
///
/// `path` is the `/`-delimited schema position used in error reporting;
/// pass `""` for a root schema.
pub fn compile(schema: &Value, path: &str) -> CompileResult<RuleNode> {
    compile_rule(schema, path, None)
}

fn compile_rule(schema: &Value, path: &str, parent: Option<RuleKind>) -> CompileResult<RuleNode> {
    debug!("compiling rule at path '{path}'");

    let obj = schema
        .as_object()
        .ok_or_else(|| CompileError::RuleNotMapping {
            path: path.to_string(),
        })?;

    // An include reference stands alone; nothing else is legal beside it.
    if let Some(include) = obj.get("include") {
        if obj.len() > 1 {
            return Err(CompileError::IncludeNotAlone {
                path: path.to_string(),
            });
        }
        let name = include
            .as_str()
            .ok_or_else(|| CompileError::BadKeywordValue {
                keyword: "include".to_string(),
                expected: "a string",
                path: path.to_string(),
            })?;
        let mut node = RuleNode::new(RuleKind::Include);
        node.include_name = Some(name.to_string());
        return Ok(node);
    }

    if obj.contains_key("sequence") && obj.contains_key("seq") {
        return Err(CompileError::DuplicateSequenceAlias {
            path: path.to_string(),
        });
    }
    if obj.contains_key("mapping") && obj.contains_key("map") {
        return Err(CompileError::DuplicateMappingAlias {
            path: path.to_string(),
        });
    }
    let has_sequence_alias = obj.contains_key("sequence") || obj.contains_key("seq");
    let has_mapping_alias = obj.contains_key("mapping") || obj.contains_key("map");

    let declared_type = match obj.get("type") {
        Some(Value::String(name)) => {
            if !is_builtin_type(name) {
                return Err(CompileError::UnknownType {
                    name: name.clone(),
                    path: path.to_string(),
                });
            }
            name.clone()
        }
        Some(_) => {
            return Err(CompileError::TypeNotString {
                path: path.to_string(),
            });
        }
        None if has_sequence_alias => "seq".to_string(),
        None if has_mapping_alias => "map".to_string(),
        None => {
            return Err(CompileError::MissingType {
                path: path.to_string(),
            });
        }
    };

    let kind = match declared_type.as_str() {
        "seq" => RuleKind::Sequence,
        "map" => RuleKind::Mapping,
        _ => RuleKind::Scalar,
    };
    let mut node = RuleNode::new(kind);
    node.declared_type = declared_type;

    for (keyword, value) in obj {
        match keyword.as_str() {
            "type" => {}
            "name" => node.name = Some(string_value(keyword, value, path)?),
            "desc" => node.desc = Some(string_value(keyword, value, path)?),
            "example" => node.example = Some(string_value(keyword, value, path)?),
            "required" | "req" => node.required = bool_value(keyword, value, path)?,
            "unique" => {
                node.unique = bool_value(keyword, value, path)?;
                if node.unique {
                    check_flag_placement("unique", &node, path, parent, false)?;
                }
            }
            "ident" => {
                node.ident = bool_value(keyword, value, path)?;
                if node.ident {
                    check_flag_placement("ident", &node, path, parent, true)?;
                    node.required = true;
                }
            }
            "default" => {
                if is_collection(value) {
                    return Err(CompileError::BadKeywordValue {
                        keyword: keyword.clone(),
                        expected: "a scalar value",
                        path: path.to_string(),
                    });
                }
                node.default = Some(value.clone());
            }
            "pattern" => {
                let raw = string_value(keyword, value, path)?;
                node.pattern = Some(compile_pattern(&raw, path)?);
            }
            "enum" => node.enum_values = Some(enum_values(value, &node.declared_type, path)?),
            "range" => {
                // Booleans and nulls have neither a magnitude nor a
                // length; the check would only ever die at run time.
                if matches!(node.declared_type.as_str(), "bool" | "none") {
                    return Err(CompileError::KeywordTypeConflict {
                        keyword: "range",
                        declared_type: node.declared_type.clone(),
                        path: path.to_string(),
                    });
                }
                node.range = Some(parse_bounds("range", value, &node.declared_type, path)?);
            }
            "length" => {
                if !is_string_like(&node.declared_type) {
                    return Err(CompileError::KeywordTypeConflict {
                        keyword: "length",
                        declared_type: node.declared_type.clone(),
                        path: path.to_string(),
                    });
                }
                node.length = Some(parse_bounds("length", value, &node.declared_type, path)?);
            }
            "sequence" | "seq" => {
                let alternatives =
                    value
                        .as_array()
                        .ok_or_else(|| CompileError::BadKeywordValue {
                            keyword: keyword.clone(),
                            expected: "a list of schemas",
                            path: path.to_string(),
                        })?;
                if alternatives.is_empty() {
                    return Err(CompileError::EmptySequence {
                        path: path.to_string(),
                    });
                }
                for (i, alternative) in alternatives.iter().enumerate() {
                    let child_path = format!("{path}/sequence/{i}");
                    node.sequence_children.push(compile_rule(
                        alternative,
                        &child_path,
                        Some(RuleKind::Sequence),
                    )?);
                }
            }
            "mapping" | "map" => {
                let children = value
                    .as_object()
                    .ok_or_else(|| CompileError::BadKeywordValue {
                        keyword: keyword.clone(),
                        expected: "a map of key schemas",
                        path: path.to_string(),
                    })?;
                if children.is_empty() {
                    return Err(CompileError::EmptyMapping {
                        path: path.to_string(),
                    });
                }
                for (key, child_schema) in children {
                    let child_path = format!("{path}/mapping/{key}");
                    let child = compile_rule(child_schema, &child_path, Some(RuleKind::Mapping))?;
                    if let Some(raw_pattern) = strip_regex_sentinel(key) {
                        // Regex keys are vetted here, never deferred to
                        // validation time.
                        let pattern = compile_pattern(raw_pattern, &child_path)?;
                        node.regex_mappings.push(RegexMapping {
                            raw_key: key.clone(),
                            pattern,
                        });
                    }
                    node.mapping_children.push((key.clone(), child));
                }
            }
            "matching" => {
                let raw = string_value(keyword, value, path)?;
                node.matching = SequenceMatching::from_keyword(&raw).ok_or_else(|| {
                    CompileError::BadKeywordValue {
                        keyword: keyword.clone(),
                        expected: "one of 'any', 'all' or '*'",
                        path: path.to_string(),
                    }
                })?;
            }
            "matching-rule" => {
                let raw = string_value(keyword, value, path)?;
                node.matching_rule = MappingMatching::from_keyword(&raw).ok_or_else(|| {
                    CompileError::BadKeywordValue {
                        keyword: keyword.clone(),
                        expected: "'any' or 'all'",
                        path: path.to_string(),
                    }
                })?;
            }
            "allowempty" => node.allow_empty_mapping = bool_value(keyword, value, path)?,
            "func" => node.func_name = Some(string_value(keyword, value, path)?),
            "format" => node.formats = Some(format_values(value, path)?),
            // Deliberately disabled for compatibility; the original parsed
            // this keyword but rejected every use of it.
            "assert" => {
                return Err(CompileError::AssertNotSupported {
                    path: path.to_string(),
                });
            }
            other => {
                return Err(CompileError::UnknownKeyword {
                    keyword: other.to_string(),
                    path: path.to_string(),
                });
            }
        }
    }

    check_conflicts(&node, has_sequence_alias, has_mapping_alias, path)?;
    Ok(node)
}

/// Post-keyword conflict pass, keyed on the declared type.
fn check_conflicts(
    node: &RuleNode,
    has_sequence_alias: bool,
    has_mapping_alias: bool,
    path: &str,
) -> CompileResult<()> {
    let t = node.declared_type.as_str();
    match t {
        "seq" => {
            if !has_sequence_alias {
                return Err(CompileError::MissingStructureKeyword {
                    declared_type: t.to_string(),
                    keyword: "sequence",
                    path: path.to_string(),
                });
            }
            for (keyword, present) in [
                ("enum", node.enum_values.is_some()),
                ("pattern", node.pattern.is_some()),
                ("mapping", has_mapping_alias),
                ("default", node.default.is_some()),
            ] {
                if present {
                    return Err(conflict(keyword, t, path));
                }
            }
        }
        "map" => {
            if !has_mapping_alias && !node.allow_empty_mapping {
                return Err(CompileError::MissingStructureKeyword {
                    declared_type: t.to_string(),
                    keyword: "mapping",
                    path: path.to_string(),
                });
            }
            for (keyword, present) in [
                ("enum", node.enum_values.is_some()),
                ("pattern", node.pattern.is_some()),
                ("sequence", has_sequence_alias),
                ("default", node.default.is_some()),
            ] {
                if present {
                    return Err(conflict(keyword, t, path));
                }
            }
        }
        _ => {
            if has_sequence_alias {
                return Err(conflict("sequence", t, path));
            }
            if has_mapping_alias || node.allow_empty_mapping {
                return Err(conflict("mapping", t, path));
            }
            if node.enum_values.is_some() {
                for (keyword, present) in [
                    ("range", node.range.is_some()),
                    ("length", node.length.is_some()),
                    ("pattern", node.pattern.is_some()),
                ] {
                    if present {
                        return Err(CompileError::EnumConflict {
                            keyword,
                            path: path.to_string(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn conflict(keyword: &'static str, declared_type: &str, path: &str) -> CompileError {
    CompileError::KeywordTypeConflict {
        keyword,
        declared_type: declared_type.to_string(),
        path: path.to_string(),
    }
}

/// `unique` and `ident` placement rules: never at the root, never on a
/// collection type, and `ident` only directly under a mapping.
fn check_flag_placement(
    keyword: &'static str,
    node: &RuleNode,
    path: &str,
    parent: Option<RuleKind>,
    require_mapping_parent: bool,
) -> CompileResult<()> {
    if is_collection_type(&node.declared_type) {
        return Err(CompileError::FlagOnCollection {
            keyword,
            declared_type: node.declared_type.clone(),
            path: path.to_string(),
        });
    }
    if parent.is_none() {
        return Err(CompileError::FlagAtRoot {
            keyword,
            path: path.to_string(),
        });
    }
    if require_mapping_parent && parent != Some(RuleKind::Mapping) {
        return Err(CompileError::IdentOutsideMapping {
            path: path.to_string(),
        });
    }
    Ok(())
}

fn compile_pattern(raw: &str, path: &str) -> CompileResult<Regex> {
    Regex::new(raw).map_err(|e| CompileError::InvalidPattern {
        pattern: raw.to_string(),
        reason: e.to_string(),
        path: path.to_string(),
    })
}

/// `regex;(^a.+$)` → `^a.+$`. Surrounding parentheses are convention,
/// not a requirement.
fn strip_regex_sentinel(key: &str) -> Option<&str> {
    for prefix in REGEX_KEY_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            let rest = rest.trim();
            let inner = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .unwrap_or(rest);
            return Some(inner);
        }
    }
    None
}

fn string_value(keyword: &str, value: &Value, path: &str) -> CompileResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CompileError::BadKeywordValue {
            keyword: keyword.to_string(),
            expected: "a string",
            path: path.to_string(),
        })
}

fn bool_value(keyword: &str, value: &Value, path: &str) -> CompileResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| CompileError::BadKeywordValue {
            keyword: keyword.to_string(),
            expected: "a boolean",
            path: path.to_string(),
        })
}

fn enum_values(value: &Value, declared_type: &str, path: &str) -> CompileResult<Vec<Value>> {
    let items = value
        .as_array()
        .ok_or_else(|| CompileError::BadKeywordValue {
            keyword: "enum".to_string(),
            expected: "a list of scalar values",
            path: path.to_string(),
        })?;
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if is_collection(item) {
            return Err(CompileError::BadKeywordValue {
                keyword: "enum".to_string(),
                expected: "a list of scalar values",
                path: path.to_string(),
            });
        }
        // An admissible value that can never satisfy the type predicate
        // is a schema defect, caught here rather than on every run.
        if crate::types::type_matches(declared_type, item) == Some(false) {
            return Err(CompileError::EnumValueTypeMismatch {
                value: crate::types::scalar_repr(item),
                declared_type: declared_type.to_string(),
                path: path.to_string(),
            });
        }
        if out.contains(item) {
            return Err(CompileError::DuplicateEnumValue {
                value: crate::types::scalar_repr(item),
                path: path.to_string(),
            });
        }
        out.push(item.clone());
    }
    Ok(out)
}

/// `format` accepts one strftime string or a list of them.
fn format_values(value: &Value, path: &str) -> CompileResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(string_value("format", item, path)?);
            }
            Ok(out)
        }
        _ => Err(CompileError::BadKeywordValue {
            keyword: "format".to_string(),
            expected: "a string or list of strings",
            path: path.to_string(),
        }),
    }
}

fn is_string_like(declared_type: &str) -> bool {
    matches!(declared_type, "str" | "text" | "symbol" | "email" | "url")
}

fn parse_bounds(
    keyword: &str,
    value: &Value,
    declared_type: &str,
    path: &str,
) -> CompileResult<Bounds> {
    let obj = value
        .as_object()
        .ok_or_else(|| CompileError::BadKeywordValue {
            keyword: keyword.to_string(),
            expected: "a map of bounds",
            path: path.to_string(),
        })?;

    let mut bounds = Bounds::default();
    for (key, bound) in obj {
        let slot = match key.as_str() {
            "max" => &mut bounds.max,
            "min" => &mut bounds.min,
            "max-ex" => &mut bounds.max_ex,
            "min-ex" => &mut bounds.min_ex,
            other => {
                return Err(CompileError::UnknownBoundKey {
                    keyword: keyword.to_string(),
                    key: other.to_string(),
                    path: path.to_string(),
                });
            }
        };
        let number = bound
            .as_f64()
            .ok_or_else(|| CompileError::BoundNotNumeric {
                keyword: keyword.to_string(),
                key: key.clone(),
                path: path.to_string(),
            })?;
        // Sizes of strings and collections cannot go negative, so a
        // negative bound there is a schema defect.
        if number < 0.0 && !is_numeric_target(declared_type) {
            return Err(CompileError::NegativeBound {
                keyword: keyword.to_string(),
                key: key.clone(),
                declared_type: declared_type.to_string(),
                path: path.to_string(),
            });
        }
        *slot = Some(number);
    }

    if bounds.max.is_some() && bounds.max_ex.is_some() {
        return Err(CompileError::ConflictingMaxBounds {
            keyword: keyword.to_string(),
            path: path.to_string(),
        });
    }
    if bounds.min.is_some() && bounds.min_ex.is_some() {
        return Err(CompileError::ConflictingMinBounds {
            keyword: keyword.to_string(),
            path: path.to_string(),
        });
    }

    let upper = [("max", bounds.max), ("max-ex", bounds.max_ex)];
    let lower = [("min", bounds.min), ("min-ex", bounds.min_ex)];
    for (max_key, max) in upper {
        for (min_key, min) in lower {
            if let (Some(max), Some(min)) = (max, min) {
                if max < min {
                    return Err(CompileError::MaxBelowMin {
                        keyword: keyword.to_string(),
                        max_key,
                        min_key,
                        path: path.to_string(),
                    });
                }
            }
        }
    }

    Ok(bounds)
}

fn is_numeric_target(declared_type: &str) -> bool {
    matches!(declared_type, "int" | "float" | "number" | "timestamp")
}
