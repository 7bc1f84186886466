//! Tests for schema compilation and the validator core.
//!
//! Covers keyword legality, cross-keyword conflicts, bound sets, the
//! partial schema registry, and the validator's scalar/structural
//! behavior including the fatal versus accumulated error split.

use serde_json::{Value, json};

use super::compiler::compile;
use super::registry::PartialSchemaRegistry;
use super::types::{RuleKind, SequenceMatching};
use super::validation::Validator;
use crate::error::{CompileError, CoreError, ValidationError};
use crate::extensions::ExtensionModule;

/// Compile `schema`, validate `data` against it, return the findings and
/// the (possibly default-enriched) data.
fn validate_value(schema: Value, mut data: Value) -> (Vec<ValidationError>, Value) {
    let (registry, root) = PartialSchemaRegistry::extract(&schema).expect("schema should compile");
    let mut validator = Validator::new(&registry, &[]);
    validator
        .validate(&mut data, &root, "")
        .expect("no fatal error expected");
    (validator.into_errors(), data)
}

fn compile_err(schema: Value) -> CompileError {
    compile(&schema, "").expect_err("schema should not compile")
}

#[test]
fn test_compile_basic_mapping() {
    let rule = compile(
        &json!({
            "type": "map",
            "mapping": {
                "name": {"type": "str", "required": true},
                "age": {"type": "int"},
            }
        }),
        "",
    )
    .expect("schema should compile");

    assert_eq!(rule.kind, RuleKind::Mapping);
    assert_eq!(rule.mapping_children.len(), 2);
    let name = rule.mapping_child("name").expect("declared child");
    assert_eq!(name.kind, RuleKind::Scalar);
    assert_eq!(name.declared_type, "str");
    assert!(name.required);
    assert_eq!(rule.mapping_child("age").unwrap().declared_type, "int");
}

#[test]
fn test_type_inferred_from_structure() {
    let seq = compile(&json!({"sequence": [{"type": "str"}]}), "").unwrap();
    assert_eq!(seq.kind, RuleKind::Sequence);
    assert_eq!(seq.declared_type, "seq");

    let map = compile(&json!({"mapping": {"a": {"type": "int"}}}), "").unwrap();
    assert_eq!(map.kind, RuleKind::Mapping);
    assert_eq!(map.declared_type, "map");
}

#[test]
fn test_missing_type_is_compile_error() {
    assert!(matches!(
        compile_err(json!({"required": true})),
        CompileError::MissingType { .. }
    ));
}

#[test]
fn test_unknown_keyword_rejected() {
    let err = compile_err(json!({"type": "str", "requierd": true}));
    assert!(matches!(
        err,
        CompileError::UnknownKeyword { ref keyword, .. } if keyword == "requierd"
    ));
}

#[test]
fn test_unknown_type_rejected() {
    assert!(matches!(
        compile_err(json!({"type": "strr"})),
        CompileError::UnknownType { .. }
    ));
}

#[test]
fn test_assert_always_rejected() {
    assert!(matches!(
        compile_err(json!({"type": "str", "assert": "val is not None"})),
        CompileError::AssertNotSupported { .. }
    ));
}

#[test]
fn test_empty_sequence_rejected() {
    assert!(matches!(
        compile_err(json!({"type": "seq", "sequence": []})),
        CompileError::EmptySequence { .. }
    ));
}

#[test]
fn test_duplicate_aliases_rejected() {
    let err = compile_err(json!({
        "type": "map",
        "mapping": {"a": {"type": "str"}},
        "map": {"b": {"type": "str"}},
    }));
    assert!(matches!(err, CompileError::DuplicateMappingAlias { .. }));

    let err = compile_err(json!({
        "type": "seq",
        "sequence": [{"type": "str"}],
        "seq": [{"type": "int"}],
    }));
    assert!(matches!(err, CompileError::DuplicateSequenceAlias { .. }));
}

#[test]
fn test_include_must_be_alone() {
    assert!(matches!(
        compile_err(json!({"include": "node", "required": true})),
        CompileError::IncludeNotAlone { .. }
    ));

    let rule = compile(&json!({"include": "node"}), "").unwrap();
    assert_eq!(rule.kind, RuleKind::Include);
    assert_eq!(rule.include_name.as_deref(), Some("node"));
}

#[test]
fn test_ident_placement_rules() {
    // at the root
    assert!(matches!(
        compile_err(json!({"type": "str", "ident": true})),
        CompileError::FlagAtRoot { keyword: "ident", .. }
    ));

    // on a collection type
    let err = compile_err(json!({
        "type": "map",
        "mapping": {
            "children": {"type": "map", "ident": true, "allowempty": true}
        }
    }));
    assert!(matches!(err, CompileError::FlagOnCollection { keyword: "ident", .. }));

    // under a sequence rather than a mapping
    let err = compile_err(json!({
        "type": "seq",
        "sequence": [{"type": "str", "ident": true}],
    }));
    assert!(matches!(err, CompileError::IdentOutsideMapping { .. }));

    // legal placement forces required
    let rule = compile(
        &json!({
            "type": "map",
            "mapping": {"code": {"type": "str", "ident": true}}
        }),
        "",
    )
    .unwrap();
    let code = rule.mapping_child("code").unwrap();
    assert!(code.ident);
    assert!(code.required);
}

#[test]
fn test_unique_illegal_at_root_and_on_collections() {
    assert!(matches!(
        compile_err(json!({"type": "str", "unique": true})),
        CompileError::FlagAtRoot { keyword: "unique", .. }
    ));
    let err = compile_err(json!({
        "type": "map",
        "mapping": {"tags": {"type": "seq", "unique": true, "sequence": [{"type": "str"}]}}
    }));
    assert!(matches!(err, CompileError::FlagOnCollection { keyword: "unique", .. }));
}

#[test]
fn test_range_bound_legality() {
    assert!(matches!(
        compile_err(json!({"type": "int", "range": {"max": 10, "max-ex": 10}})),
        CompileError::ConflictingMaxBounds { .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "int", "range": {"max": 1, "min": 5}})),
        CompileError::MaxBelowMin { .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "str", "range": {"min": -1}})),
        CompileError::NegativeBound { .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "int", "range": {"maximum": 3}})),
        CompileError::UnknownBoundKey { .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "int", "range": {"max": "ten"}})),
        CompileError::BoundNotNumeric { .. }
    ));
    // negative bounds are fine for numeric targets
    assert!(compile(&json!({"type": "int", "range": {"min": -10}}), "").is_ok());
}

#[test]
fn test_enum_conflicts() {
    assert!(matches!(
        compile_err(json!({"type": "str", "enum": ["a", "b"], "pattern": "^a"})),
        CompileError::EnumConflict { keyword: "pattern", .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "int", "enum": [1, 2], "range": {"max": 3}})),
        CompileError::EnumConflict { keyword: "range", .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "str", "enum": ["a", "a"]})),
        CompileError::DuplicateEnumValue { .. }
    ));
}

#[test]
fn test_structure_keyword_conflicts() {
    // pattern is forbidden on mapping rules
    let err = compile_err(json!({
        "type": "map",
        "pattern": "^a",
        "mapping": {"a": {"type": "str"}},
    }));
    assert!(matches!(err, CompileError::KeywordTypeConflict { keyword: "pattern", .. }));

    // scalar rules cannot carry structure
    let err = compile_err(json!({"type": "str", "sequence": [{"type": "str"}]}));
    assert!(matches!(err, CompileError::KeywordTypeConflict { keyword: "sequence", .. }));

    // seq type without its alias
    assert!(matches!(
        compile_err(json!({"type": "seq"})),
        CompileError::MissingStructureKeyword { keyword: "sequence", .. }
    ));

    // map type needs mapping or allowempty
    assert!(matches!(
        compile_err(json!({"type": "map"})),
        CompileError::MissingStructureKeyword { keyword: "mapping", .. }
    ));
    assert!(compile(&json!({"type": "map", "allowempty": true}), "").is_ok());

    // length only applies to string-like types
    assert!(matches!(
        compile_err(json!({"type": "int", "length": {"max": 3}})),
        CompileError::KeywordTypeConflict { keyword: "length", .. }
    ));
}

#[test]
fn test_invalid_pattern_rejected() {
    assert!(matches!(
        compile_err(json!({"type": "str", "pattern": "[unclosed"})),
        CompileError::InvalidPattern { .. }
    ));
}

#[test]
fn test_regex_mapping_keys_compiled_eagerly() {
    let rule = compile(
        &json!({
            "type": "map",
            "matching-rule": "any",
            "mapping": {
                "regex;(^a.+$)": {"type": "int"},
                "regex;(^b.+$)": {"type": "str"},
            }
        }),
        "",
    )
    .unwrap();
    assert_eq!(rule.regex_mappings.len(), 2);
    assert_eq!(rule.mapping_children.len(), 2);

    // a broken regex key fails at compile time, not validation time
    let err = compile_err(json!({
        "type": "map",
        "mapping": {"regex;([bad)": {"type": "int"}},
    }));
    assert!(matches!(err, CompileError::InvalidPattern { .. }));
}

#[test]
fn test_matching_keyword_values() {
    let rule = compile(
        &json!({
            "type": "seq",
            "matching": "all",
            "sequence": [{"type": "str"}, {"type": "text"}],
        }),
        "",
    )
    .unwrap();
    assert_eq!(rule.matching, SequenceMatching::All);

    assert!(matches!(
        compile_err(json!({"type": "seq", "matching": "some", "sequence": [{"type": "str"}]})),
        CompileError::BadKeywordValue { .. }
    ));
}

#[test]
fn test_partial_registry_extract() {
    let schema = json!({
        "schema;person": {
            "type": "map",
            "mapping": {"name": {"type": "str"}}
        },
        "type": "seq",
        "sequence": [{"include": "person"}],
    });
    let (registry, root) = PartialSchemaRegistry::extract(&schema).unwrap();
    assert!(registry.get("person").is_some());
    assert_eq!(root.kind, RuleKind::Sequence);
    assert_eq!(root.sequence_children[0].kind, RuleKind::Include);

    // a document of partials only has no root rule
    let only_partials = json!({
        "schema;person": {"type": "map", "mapping": {"name": {"type": "str"}}}
    });
    assert!(matches!(
        PartialSchemaRegistry::extract(&only_partials),
        Err(CompileError::MissingRootSchema)
    ));
}

#[test]
fn test_scalar_type_mismatch_records_path() {
    let (errors, _) = validate_value(
        json!({"type": "map", "mapping": {"age": {"type": "int"}}}),
        json!({"age": "twenty"}),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ValidationError::TypeMismatch { value, expected, path }
            if value == "twenty" && expected == "int" && path == "/age"
    ));
}

#[test]
fn test_null_value_fails_str_type_gate() {
    let (errors, _) = validate_value(
        json!({"type": "map", "mapping": {"name": {"type": "str"}}}),
        json!({"name": null}),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], ValidationError::TypeMismatch { .. }));
}

#[test]
fn test_scalar_default_substitution_is_local() {
    // A null with a default passes the type gate without writing back;
    // only the mapping handler injects persistently (absent key case).
    let (errors, data) = validate_value(
        json!({"type": "map", "mapping": {"name": {"type": "str", "default": "x"}}}),
        json!({"name": null}),
    );
    assert!(errors.is_empty());
    assert_eq!(data, json!({"name": null}));
}

#[test]
fn test_enum_violation() {
    let (errors, _) = validate_value(
        json!({"type": "map", "mapping": {"state": {"type": "str", "enum": ["on", "off"]}}}),
        json!({"state": "maybe"}),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ValidationError::EnumMismatch { value, path } if value == "maybe" && path == "/state"
    ));
}

#[test]
fn test_pattern_applies_to_string_form() {
    let (errors, _) = validate_value(
        json!({"type": "map", "mapping": {"code": {"type": "int", "pattern": "^1\\d+$"}}}),
        json!({"code": 242}),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], ValidationError::PatternMismatch { .. }));
}

#[test]
fn test_string_range_is_length() {
    let (errors, _) = validate_value(
        json!({"type": "str", "range": {"max": 3}}),
        json!("toolong"),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ValidationError::TooLarge { kind, size, limit, .. }
            if kind == "str" && *size == 7.0 && *limit == 3.0
    ));
}

#[test]
fn test_sequence_and_mapping_sizes_bound_checked() {
    let (errors, _) = validate_value(
        json!({"type": "seq", "range": {"min": 3}, "sequence": [{"type": "int"}]}),
        json!([1, 2]),
    );
    assert!(matches!(
        &errors[0],
        ValidationError::TooSmall { kind, size, .. } if kind == "seq" && *size == 2.0
    ));

    let (errors, _) = validate_value(
        json!({
            "type": "map",
            "range": {"max": 1},
            "allowempty": true,
        }),
        json!({"a": 1, "b": 2}),
    );
    assert!(matches!(
        &errors[0],
        ValidationError::TooLarge { kind, .. } if kind == "map"
    ));
}

#[test]
fn test_sequence_of_non_sequence_is_fatal() {
    let (registry, root) =
        PartialSchemaRegistry::extract(&json!({"type": "seq", "sequence": [{"type": "str"}]}))
            .unwrap();
    let mut validator = Validator::new(&registry, &[]);
    let mut data = json!("not a list");
    let err = validator.validate(&mut data, &root, "").unwrap_err();
    assert!(matches!(err, CoreError::NotSequence { .. }));
}

#[test]
fn test_mapping_of_non_mapping_is_fatal() {
    let (registry, root) = PartialSchemaRegistry::extract(
        &json!({"type": "map", "mapping": {"a": {"type": "str"}}}),
    )
    .unwrap();
    let mut validator = Validator::new(&registry, &[]);
    let mut data = json!([1, 2, 3]);
    let err = validator.validate(&mut data, &root, "").unwrap_err();
    assert!(matches!(err, CoreError::NotMapping { .. }));
}

#[test]
fn test_timestamp_checks() {
    let schema = json!({"type": "map", "mapping": {"ts": {"type": "timestamp"}}});

    let (errors, _) = validate_value(schema.clone(), json!({"ts": 1456700000}));
    assert!(errors.is_empty());

    let (errors, _) = validate_value(schema.clone(), json!({"ts": 0}));
    assert!(matches!(&errors[0], ValidationError::TimestampOutOfRange { .. }));

    let (errors, _) = validate_value(schema.clone(), json!({"ts": 2147483648_i64}));
    assert!(matches!(&errors[0], ValidationError::TimestampOutOfRange { .. }));

    let (errors, _) = validate_value(schema.clone(), json!({"ts": "2016-02-29 12:00:00"}));
    assert!(errors.is_empty());

    let (errors, _) = validate_value(schema.clone(), json!({"ts": ""}));
    assert!(matches!(&errors[0], ValidationError::TimestampEmpty { .. }));

    // integer-looking strings get the same bound check as native ints
    let (errors, _) = validate_value(schema.clone(), json!({"ts": "1456700000"}));
    assert!(errors.is_empty());
    let (errors, _) = validate_value(schema.clone(), json!({"ts": "0"}));
    assert!(matches!(&errors[0], ValidationError::TimestampOutOfRange { .. }));

    let (errors, _) = validate_value(schema, json!({"ts": "never o'clock"}));
    assert!(matches!(&errors[0], ValidationError::TimestampParse { .. }));
}

#[test]
fn test_date_requires_format_and_parses_with_it() {
    let with_format = json!({
        "type": "map",
        "mapping": {"d": {"type": "date", "format": "%Y-%m-%d"}}
    });
    let (errors, _) = validate_value(with_format.clone(), json!({"d": "2016-12-31"}));
    assert!(errors.is_empty());

    let (errors, _) = validate_value(with_format, json!({"d": "31/12/2016"}));
    assert!(matches!(&errors[0], ValidationError::DateFormatMismatch { .. }));

    // format list: any declared format may match
    let multi = json!({
        "type": "map",
        "mapping": {"d": {"type": "date", "format": ["%Y-%m-%d", "%d/%m/%Y"]}}
    });
    let (errors, _) = validate_value(multi, json!({"d": "31/12/2016"}));
    assert!(errors.is_empty());

    // missing format surfaces as a fatal error at validation time
    let (registry, root) = PartialSchemaRegistry::extract(
        &json!({"type": "map", "mapping": {"d": {"type": "date"}}}),
    )
    .unwrap();
    let mut validator = Validator::new(&registry, &[]);
    let mut data = json!({"d": "2016-12-31"});
    let err = validator.validate(&mut data, &root, "").unwrap_err();
    assert!(matches!(err, CoreError::MissingDateFormat { .. }));
}

#[test]
fn test_unique_scalar_sequence() {
    let (errors, _) = validate_value(
        json!({"type": "seq", "sequence": [{"type": "str", "unique": true}]}),
        json!(["a", "b", "a"]),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ValidationError::NotUnique { value, previous_path, path }
            if value == "a" && previous_path == "/0" && path == "/2"
    ));
}

#[test]
fn test_unique_distinguishes_types_with_equal_string_forms() {
    // `1` and `"1"` (and `true` / `"true"`) share a string form but are
    // distinct values, not duplicates.
    let (errors, _) = validate_value(
        json!({"type": "seq", "sequence": [{"type": "scalar", "unique": true}]}),
        json!([1, "1", true, "true"]),
    );
    assert!(errors.is_empty());

    let (errors, _) = validate_value(
        json!({
            "type": "seq",
            "sequence": [{
                "type": "map",
                "mapping": {"id": {"type": "any", "unique": true}}
            }]
        }),
        json!([{"id": 1}, {"id": "1"}]),
    );
    assert!(errors.is_empty());

    // genuinely equal values still collide
    let (errors, _) = validate_value(
        json!({"type": "seq", "sequence": [{"type": "scalar", "unique": true}]}),
        json!([1, "1", 1]),
    );
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ValidationError::NotUnique { previous_path, path, .. }
            if previous_path == "/0" && path == "/2"
    ));
}

#[test]
fn test_range_illegal_on_sizeless_types() {
    assert!(matches!(
        compile_err(json!({"type": "bool", "range": {"max": 1}})),
        CompileError::KeywordTypeConflict { keyword: "range", .. }
    ));
    assert!(matches!(
        compile_err(json!({"type": "none", "range": {"min": 0}})),
        CompileError::KeywordTypeConflict { keyword: "range", .. }
    ));
}

#[test]
fn test_enum_values_must_match_declared_type() {
    assert!(matches!(
        compile_err(json!({"type": "int", "enum": ["a", "b"]})),
        CompileError::EnumValueTypeMismatch { ref value, ref declared_type, .. }
            if value == "a" && declared_type == "int"
    ));
    assert!(matches!(
        compile_err(json!({"type": "str", "enum": ["on", 1]})),
        CompileError::EnumValueTypeMismatch { .. }
    ));
    assert!(compile(&json!({"type": "int", "enum": [1, 2, 3]}), "").is_ok());
}

#[test]
fn test_extension_dispatch() {
    let schema = json!({"type": "str", "func": "no_foo"});
    let (registry, root) = PartialSchemaRegistry::extract(&schema).unwrap();

    let mut module = ExtensionModule::new("checks");
    module.register("no_foo", |value: &serde_json::Value, _rule, _path| {
        value.as_str() != Some("foo")
    });
    let modules = [module];

    let mut validator = Validator::new(&registry, &modules);
    let mut ok_data = json!("bar");
    assert!(validator.validate(&mut ok_data, &root, "").is_ok());
    assert!(validator.errors().is_empty());

    // a false return is fatal, not a finding
    let mut validator = Validator::new(&registry, &modules);
    let mut bad_data = json!("foo");
    let err = validator.validate(&mut bad_data, &root, "").unwrap_err();
    assert!(matches!(err, CoreError::ExtensionFailed { .. }));

    // so is a name no module provides
    let mut validator = Validator::new(&registry, &[]);
    let mut data = json!("bar");
    let err = validator.validate(&mut data, &root, "").unwrap_err();
    assert!(matches!(err, CoreError::ExtensionNotFound { .. }));
}

#[test]
fn test_allowempty_accepts_unknown_keys_silently() {
    let (errors, _) = validate_value(
        json!({
            "type": "map",
            "allowempty": true,
            "mapping": {"known": {"type": "str"}},
        }),
        json!({"known": "yes", "mystery": [1, 2, {"deep": true}]}),
    );
    assert!(errors.is_empty());
}
