//! Recursive validation of a data value against a compiled rule tree.
//!
//! The validator walks depth-first, appending findings to a single
//! run-scoped list and continuing into siblings and children, so one run
//! reports every independent defect. Only the fatal class aborts: a
//! sequence rule meeting a non-sequence, a mapping rule meeting a
//! non-mapping, an unregistered type, a failed extension function.
//!
//! One deliberate side effect: when a mapping rule declares a `default`
//! for an absent key, the default is injected into the input value in
//! place. Validation here is not a pure function of its input.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use serde_json::Value;

use super::registry::PartialSchemaRegistry;
use super::types::{Bounds, MappingMatching, RuleKind, RuleNode, SequenceMatching};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::extensions::{self, ExtensionModule};
use crate::types::{is_scalar, scalar_repr, type_matches};

/// Native integer timestamps must sit in this window (inclusive).
const TIMESTAMP_MIN: f64 = 1.0;
const TIMESTAMP_MAX: f64 = 2_147_483_647.0;

/// One validation run: borrows the session's partial schemas and
/// extension modules, owns the accumulated findings.
pub struct Validator<'a> {
    partials: &'a PartialSchemaRegistry,
    extensions: &'a [ExtensionModule],
    errors: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    pub fn new(partials: &'a PartialSchemaRegistry, extensions: &'a [ExtensionModule]) -> Self {
        Self {
            partials,
            extensions,
            errors: Vec::new(),
        }
    }

    /// Findings accumulated so far, in traversal order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Walk `value` against `rule` at `path`, appending findings.
    ///
    /// `Err` is reserved for the fatal class; a clean `Ok(())` says
    /// nothing about validity until [`Validator::errors`] is inspected.
    pub fn validate(&mut self, value: &mut Value, rule: &RuleNode, path: &str) -> CoreResult<()> {
        debug!("validating path '{path}' against {:?} rule", rule.kind);

        if let Some(func_name) = &rule.func_name {
            extensions::dispatch(self.extensions, func_name, value, rule, path)?;
        }

        match rule.kind {
            RuleKind::Include => self.validate_include(value, rule, path),
            RuleKind::Sequence => self.validate_sequence(value, rule, path),
            RuleKind::Mapping => self.validate_mapping(value, rule, path),
            RuleKind::Scalar => self.validate_scalar(value, rule, path),
        }
    }

    /// A fresh validator sharing this run's session state, used to probe
    /// sequence alternatives without committing their findings.
    fn scratch(&self) -> Validator<'a> {
        Validator::new(self.partials, self.extensions)
    }

    fn validate_include(&mut self, value: &mut Value, rule: &RuleNode, path: &str) -> CoreResult<()> {
        let name = rule.include_name.as_deref().unwrap_or_default();
        let partials = self.partials;
        let Some(resolved) = partials.get(name) else {
            self.errors.push(ValidationError::IncludeNotFound {
                name: name.to_string(),
                known: partials.names().join(", "),
                path: path.to_string(),
            });
            return Ok(());
        };
        // Delegation is what makes recursive partials work: the resolved
        // tree may include the very name it is registered under.
        self.validate(value, resolved, path)
    }

    fn validate_sequence(
        &mut self,
        value: &mut Value,
        rule: &RuleNode,
        path: &str,
    ) -> CoreResult<()> {
        // Absence is the parent's concern (`required`), not ours.
        if value.is_null() {
            return Ok(());
        }
        let Some(items) = value.as_array_mut() else {
            return Err(CoreError::NotSequence {
                path: path.to_string(),
            });
        };

        for (i, item) in items.iter_mut().enumerate() {
            let item_path = format!("{path}/{i}");
            let mut alternative_errors: Vec<Vec<ValidationError>> = Vec::new();
            for alternative in &rule.sequence_children {
                let mut probe = self.scratch();
                probe.validate(item, alternative, &item_path)?;
                alternative_errors.push(probe.into_errors());
            }
            let item_ok = match rule.matching {
                SequenceMatching::Any => alternative_errors.iter().any(Vec::is_empty),
                SequenceMatching::All => alternative_errors.iter().all(Vec::is_empty),
                SequenceMatching::Star => true,
            };
            if !item_ok {
                // Surface every way the item failed, not just one.
                for errs in alternative_errors {
                    self.errors.extend(errs);
                }
            }
        }

        self.check_sequence_uniqueness(items, rule, path);

        if let Some(bounds) = &rule.range {
            self.check_bounds(bounds, items.len() as f64, "seq", path);
        }
        Ok(())
    }

    /// Uniqueness across a whole sequence: `unique`/`ident` keys of any
    /// mapping alternative, and `unique` directly on a scalar
    /// alternative. First occurrence wins; every later duplicate is a
    /// finding carrying both paths.
    fn check_sequence_uniqueness(&mut self, items: &[Value], rule: &RuleNode, path: &str) {
        for alternative in &rule.sequence_children {
            if alternative.kind == RuleKind::Mapping {
                for (key, child) in &alternative.mapping_children {
                    if !(child.unique || child.ident) {
                        continue;
                    }
                    let mut first_seen: HashMap<String, usize> = HashMap::new();
                    for (j, item) in items.iter().enumerate() {
                        let Some(entry) = item.as_object().and_then(|o| o.get(key)) else {
                            continue;
                        };
                        if !is_scalar(entry) {
                            continue;
                        }
                        if let Some(&first) = first_seen.get(&unique_key(entry)) {
                            self.errors.push(ValidationError::NotUnique {
                                value: scalar_repr(entry),
                                previous_path: format!("{path}/{first}/{key}"),
                                path: format!("{path}/{j}/{key}"),
                            });
                        } else {
                            first_seen.insert(unique_key(entry), j);
                        }
                    }
                }
            } else if alternative.unique {
                let mut first_seen: HashMap<String, usize> = HashMap::new();
                for (j, item) in items.iter().enumerate() {
                    if !is_scalar(item) {
                        continue;
                    }
                    if let Some(&first) = first_seen.get(&unique_key(item)) {
                        self.errors.push(ValidationError::NotUnique {
                            value: scalar_repr(item),
                            previous_path: format!("{path}/{first}"),
                            path: format!("{path}/{j}"),
                        });
                    } else {
                        first_seen.insert(unique_key(item), j);
                    }
                }
            }
        }
    }

    fn validate_mapping(
        &mut self,
        value: &mut Value,
        rule: &RuleNode,
        path: &str,
    ) -> CoreResult<()> {
        if rule.mapping_children.is_empty()
            && rule.regex_mappings.is_empty()
            && !rule.allow_empty_mapping
        {
            // Nothing declared to check against.
            return Ok(());
        }
        if value.is_null() {
            return Ok(());
        }
        let Some(obj) = value.as_object_mut() else {
            return Err(CoreError::NotMapping {
                path: path.to_string(),
            });
        };

        if let Some(bounds) = &rule.range {
            let entries = obj.len() as f64;
            self.check_bounds(bounds, entries, "map", path);
        }

        for (key, child) in &rule.mapping_children {
            if rule.regex_mappings.iter().any(|rm| &rm.raw_key == key) {
                continue;
            }
            if !obj.contains_key(key) {
                if child.required {
                    self.errors.push(ValidationError::MissingRequiredKey {
                        key: key.clone(),
                        path: path.to_string(),
                    });
                }
                if let Some(default) = &child.default {
                    // Documented input mutation: the default is written
                    // into the data, not merely assumed.
                    obj.insert(key.clone(), default.clone());
                }
            }
        }

        let present: Vec<String> = obj.keys().cloned().collect();
        for key in present {
            let child_path = format!("{path}/{key}");
            if let Some(child) = rule.mapping_child(&key) {
                if let Some(entry) = obj.get_mut(&key) {
                    self.validate(entry, child, &child_path)?;
                }
            } else if rule.regex_mappings.is_empty() {
                if !rule.allow_empty_mapping {
                    self.errors.push(ValidationError::UndefinedKey {
                        key,
                        path: path.to_string(),
                    });
                }
            } else {
                let mut matched_any = false;
                let mut matched_all = true;
                for rm in &rule.regex_mappings {
                    if rm.pattern.is_match(&key) {
                        matched_any = true;
                        if let Some(child) = rule.mapping_child(&rm.raw_key) {
                            if let Some(entry) = obj.get_mut(&key) {
                                self.validate(entry, child, &child_path)?;
                            }
                        }
                    } else {
                        matched_all = false;
                    }
                }
                let patterns = rule
                    .regex_mappings
                    .iter()
                    .map(|rm| rm.pattern.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                match rule.matching_rule {
                    MappingMatching::Any if !matched_any => {
                        self.errors.push(ValidationError::NoRegexMatch {
                            key,
                            patterns,
                            path: path.to_string(),
                        });
                    }
                    MappingMatching::All if !matched_all => {
                        self.errors.push(ValidationError::NotAllRegexMatch {
                            key,
                            patterns,
                            path: path.to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn validate_scalar(&mut self, value: &Value, rule: &RuleNode, path: &str) -> CoreResult<()> {
        if let Some(enum_values) = &rule.enum_values {
            if !enum_values.contains(value) {
                self.errors.push(ValidationError::EnumMismatch {
                    value: scalar_repr(value),
                    path: path.to_string(),
                });
            }
        }

        // Local substitution only; persistent injection happens in the
        // mapping handler.
        let effective = if value.is_null() {
            rule.default.as_ref().unwrap_or(value)
        } else {
            value
        };

        match type_matches(&rule.declared_type, effective) {
            None => {
                // The compiler vets type names, so this is a defect, not
                // a data-quality finding.
                return Err(CoreError::UnknownType {
                    name: rule.declared_type.clone(),
                    path: path.to_string(),
                });
            }
            Some(false) => {
                self.errors.push(ValidationError::TypeMismatch {
                    value: scalar_repr(effective),
                    expected: rule.declared_type.clone(),
                    path: path.to_string(),
                });
            }
            Some(true) => {}
        }

        // No further scalar checks apply to an absent value.
        if effective.is_null() {
            return Ok(());
        }

        if let Some(pattern) = &rule.pattern {
            let text = scalar_repr(effective);
            if !pattern.is_match(&text) {
                self.errors.push(ValidationError::PatternMismatch {
                    value: text,
                    pattern: pattern.as_str().to_string(),
                    path: path.to_string(),
                });
            }
        }

        if let Some(bounds) = &rule.range {
            let observed = sizeable(effective, path)?;
            self.check_bounds(bounds, observed, &rule.declared_type, path);
        }

        if let Some(bounds) = &rule.length {
            // Always a string-length check; the compiler has constrained
            // the declared type to string-like.
            if let Some(s) = effective.as_str() {
                self.check_bounds(bounds, s.chars().count() as f64, "str", path);
            }
        }

        match rule.declared_type.as_str() {
            "timestamp" => self.check_timestamp(effective, path),
            "date" => self.check_date(effective, rule, path)?,
            _ => {}
        }
        Ok(())
    }

    /// The shared four-bound check. Every violated bound appends its own
    /// finding; none short-circuits the others.
    fn check_bounds(&mut self, bounds: &Bounds, observed: f64, kind: &str, path: &str) {
        if let Some(max) = bounds.max {
            if observed > max {
                self.errors.push(ValidationError::TooLarge {
                    kind: kind.to_string(),
                    size: observed,
                    limit: max,
                    path: path.to_string(),
                });
            }
        }
        if let Some(min) = bounds.min {
            if observed < min {
                self.errors.push(ValidationError::TooSmall {
                    kind: kind.to_string(),
                    size: observed,
                    limit: min,
                    path: path.to_string(),
                });
            }
        }
        if let Some(max_ex) = bounds.max_ex {
            if observed >= max_ex {
                self.errors.push(ValidationError::TooLargeExclusive {
                    kind: kind.to_string(),
                    size: observed,
                    limit: max_ex,
                    path: path.to_string(),
                });
            }
        }
        if let Some(min_ex) = bounds.min_ex {
            if observed <= min_ex {
                self.errors.push(ValidationError::TooSmallExclusive {
                    kind: kind.to_string(),
                    size: observed,
                    limit: min_ex,
                    path: path.to_string(),
                });
            }
        }
    }

    fn check_timestamp(&mut self, value: &Value, path: &str) {
        match value {
            Value::Number(n) => {
                let v = n.as_f64().unwrap_or(f64::NAN);
                if !(TIMESTAMP_MIN..=TIMESTAMP_MAX).contains(&v) {
                    self.errors.push(ValidationError::TimestampOutOfRange {
                        value: scalar_repr(value),
                        path: path.to_string(),
                    });
                }
            }
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    // An empty string is parseable as "now" by lenient
                    // date parsers; it is still not a timestamp.
                    self.errors.push(ValidationError::TimestampEmpty {
                        path: path.to_string(),
                    });
                } else if let Ok(int) = trimmed.parse::<i64>() {
                    let v = int as f64;
                    if !(TIMESTAMP_MIN..=TIMESTAMP_MAX).contains(&v) {
                        self.errors.push(ValidationError::TimestampOutOfRange {
                            value: s.clone(),
                            path: path.to_string(),
                        });
                    }
                } else if !parses_as_timestamp(trimmed) {
                    self.errors.push(ValidationError::TimestampParse {
                        value: s.clone(),
                        path: path.to_string(),
                    });
                }
            }
            _ => {} // already reported by the type predicate
        }
    }

    fn check_date(&mut self, value: &Value, rule: &RuleNode, path: &str) -> CoreResult<()> {
        let formats = rule
            .formats
            .as_ref()
            .ok_or_else(|| CoreError::MissingDateFormat {
                path: path.to_string(),
            })?;
        let Some(s) = value.as_str() else {
            return Ok(()); // non-strings already reported by the predicate
        };
        if !formats.iter().any(|f| parses_with_format(s, f)) {
            self.errors.push(ValidationError::DateFormatMismatch {
                value: s.to_string(),
                formats: formats.join(", "),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

/// Hash key for uniqueness tracking. Tags the value class so values
/// with the same string form stay distinct: `1` is not `"1"` and `true`
/// is not `"true"`.
fn unique_key(value: &Value) -> String {
    match value {
        Value::String(s) => format!("str:{s}"),
        other => format!("lit:{other}"),
    }
}

/// Coerce a scalar to the number the four-bound check runs against:
/// numbers as themselves, strings as their length. Anything else here is
/// a contract violation, not a finding.
fn sizeable(value: &Value, path: &str) -> CoreResult<f64> {
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => Ok(s.chars().count() as f64),
        _ => Err(CoreError::NotScalar {
            path: path.to_string(),
        }),
    }
}

/// Accept RFC 3339 plus the common unzoned date/datetime spellings.
fn parses_as_timestamp(s: &str) -> bool {
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    if FORMATS
        .iter()
        .any(|f| NaiveDateTime::parse_from_str(s, f).is_ok())
    {
        return true;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn parses_with_format(s: &str, format: &str) -> bool {
    NaiveDateTime::parse_from_str(s, format).is_ok()
        || NaiveDate::parse_from_str(s, format).is_ok()
}
