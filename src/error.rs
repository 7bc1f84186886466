//! Error types for schema compilation and validation.
//!
//! Two disjoint error classes live here. Fatal errors ([`CompileError`],
//! [`CoreError`]) mean the schema or the gross shape of the data cannot be
//! interpreted at all; they abort a run immediately. Accumulated findings
//! ([`ValidationError`]) are data-quality defects; the validator records
//! them and keeps walking so a single run reports every independent
//! problem, not just the first.

/// A structural or keyword violation in the schema description itself.
///
/// Compile errors are fatal: a schema is either well-formed or the whole
/// compilation fails. Every variant carries the `/`-delimited path of the
/// schema level where the violation was found.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// A keyword outside the closed, known set.
    #[error("Unknown keyword '{keyword}'. Path: '{path}'")]
    UnknownKeyword { keyword: String, path: String },

    /// The rule description itself is not a map of keywords.
    #[error("Schema rule must be a mapping of keywords. Path: '{path}'")]
    RuleNotMapping { path: String },

    /// An `include` entry carried sibling keywords.
    #[error("Keyword 'include' must be the only keyword at its level. Path: '{path}'")]
    IncludeNotAlone { path: String },

    /// No `type`, and no sequence or mapping alias to infer one from.
    #[error("Key 'type' not found, and no 'sequence' or 'mapping' keyword to infer it from. Path: '{path}'")]
    MissingType { path: String },

    /// `type` must be the string name of a registered type.
    #[error("Keyword 'type' must be a string. Path: '{path}'")]
    TypeNotString { path: String },

    /// `type` named something the type registry has never heard of.
    #[error("Unknown type '{name}'. Path: '{path}'")]
    UnknownType { name: String, path: String },

    /// A keyword's value had the wrong shape (e.g. `required: "yes"`).
    #[error("Keyword '{keyword}' expects {expected}. Path: '{path}'")]
    BadKeywordValue {
        keyword: String,
        expected: &'static str,
        path: String,
    },

    /// `sequence` with zero alternatives.
    #[error("Keyword 'sequence' must contain at least one schema. Path: '{path}'")]
    EmptySequence { path: String },

    /// `mapping` with no declared keys.
    #[error("Keyword 'mapping' must contain at least one key. Path: '{path}'")]
    EmptyMapping { path: String },

    /// Both `mapping` and `map` declared at the same level.
    #[error("Keywords 'mapping' and 'map' cannot both be defined at the same level. Path: '{path}'")]
    DuplicateMappingAlias { path: String },

    /// Both `sequence` and `seq` declared at the same level.
    #[error("Keywords 'sequence' and 'seq' cannot both be defined at the same level. Path: '{path}'")]
    DuplicateSequenceAlias { path: String },

    /// A bound dict key other than max/min/max-ex/min-ex.
    #[error("Unknown bound '{key}' in '{keyword}', expected max, min, max-ex or min-ex. Path: '{path}'")]
    UnknownBoundKey {
        keyword: String,
        key: String,
        path: String,
    },

    /// `max` and `max-ex` declared together.
    #[error("Keyword '{keyword}' cannot define both 'max' and 'max-ex'. Path: '{path}'")]
    ConflictingMaxBounds { keyword: String, path: String },

    /// `min` and `min-ex` declared together.
    #[error("Keyword '{keyword}' cannot define both 'min' and 'min-ex'. Path: '{path}'")]
    ConflictingMinBounds { keyword: String, path: String },

    /// A bound value that is not a number.
    #[error("Bound '{key}' in '{keyword}' must be a number. Path: '{path}'")]
    BoundNotNumeric {
        keyword: String,
        key: String,
        path: String,
    },

    /// Negative bound for a target whose size cannot be negative.
    #[error("Bound '{key}' in '{keyword}' cannot be negative for type '{declared_type}'. Path: '{path}'")]
    NegativeBound {
        keyword: String,
        key: String,
        declared_type: String,
        path: String,
    },

    /// An upper bound below the corresponding lower bound.
    #[error("Bound '{max_key}' cannot be less than '{min_key}' in '{keyword}'. Path: '{path}'")]
    MaxBelowMin {
        keyword: String,
        max_key: &'static str,
        min_key: &'static str,
        path: String,
    },

    /// A `pattern` or regex mapping key that fails to compile.
    #[error("Invalid regex '{pattern}': {reason}. Path: '{path}'")]
    InvalidPattern {
        pattern: String,
        reason: String,
        path: String,
    },

    /// `ident` or `unique` on a map/seq typed rule.
    #[error("Keyword '{keyword}' is not allowed on collection type '{declared_type}'. Path: '{path}'")]
    FlagOnCollection {
        keyword: &'static str,
        declared_type: String,
        path: String,
    },

    /// `ident` or `unique` on the rule at the tree root.
    #[error("Keyword '{keyword}' is not allowed at the schema root. Path: '{path}'")]
    FlagAtRoot { keyword: &'static str, path: String },

    /// `ident` on a rule whose immediate parent is not a mapping.
    #[error("Keyword 'ident' requires the parent rule to be a mapping. Path: '{path}'")]
    IdentOutsideMapping { path: String },

    /// The `assert` keyword is parsed but deliberately never supported.
    #[error("Keyword 'assert' is not supported. Path: '{path}'")]
    AssertNotSupported { path: String },

    /// A keyword that is illegal for the rule's declared type, found by
    /// the post-keyword conflict pass (e.g. `enum` on a sequence,
    /// `pattern` on a mapping).
    #[error("Keyword '{keyword}' is not allowed on type '{declared_type}'. Path: '{path}'")]
    KeywordTypeConflict {
        keyword: &'static str,
        declared_type: String,
        path: String,
    },

    /// `enum` combined with range/length/pattern on the same rule.
    #[error("Keyword 'enum' cannot be combined with '{keyword}'. Path: '{path}'")]
    EnumConflict {
        keyword: &'static str,
        path: String,
    },

    /// A sequence-typed rule without a sequence alias, or a map-typed
    /// rule without a mapping alias or `allowempty`.
    #[error("Type '{declared_type}' requires the '{keyword}' keyword. Path: '{path}'")]
    MissingStructureKeyword {
        declared_type: String,
        keyword: &'static str,
        path: String,
    },

    /// The same value listed twice in an `enum`.
    #[error("Duplicate value '{value}' in 'enum'. Path: '{path}'")]
    DuplicateEnumValue { value: String, path: String },

    /// An `enum` value outside the rule's declared type.
    #[error("Enum value '{value}' is not of type '{declared_type}'. Path: '{path}'")]
    EnumValueTypeMismatch {
        value: String,
        declared_type: String,
        path: String,
    },

    /// A schema document consisting only of `schema;<name>` partials.
    #[error("No schema rule found beside partial schema definitions")]
    MissingRootSchema,
}

/// A single accumulated validation finding.
///
/// Findings never abort traversal. Each variant carries the contextual
/// values of the defect and the `/`-delimited data path where it was
/// observed; rendering always ends with `. Path: '<path>'`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value failed the type predicate for the rule's declared type.
    #[error("Value '{value}' is not of type '{expected}'. Path: '{path}'")]
    TypeMismatch {
        value: String,
        expected: String,
        path: String,
    },

    /// A `required: true` key absent from the data mapping.
    #[error("Cannot find required key '{key}'. Path: '{path}'")]
    MissingRequiredKey { key: String, path: String },

    /// A data key with no declared or regex-matched rule.
    #[error("Key '{key}' was not defined. Path: '{path}'")]
    UndefinedKey { key: String, path: String },

    /// Value did not match the rule's `pattern` regex.
    #[error("Value '{value}' does not match pattern '{pattern}'. Path: '{path}'")]
    PatternMismatch {
        value: String,
        pattern: String,
        path: String,
    },

    /// Value outside the closed `enum` set.
    #[error("Enum '{value}' does not exist. Path: '{path}'")]
    EnumMismatch { value: String, path: String },

    /// Duplicate value under a `unique` or `ident` constraint.
    #[error("Value '{value}' is not unique. Previous path: '{previous_path}'. Path: '{path}'")]
    NotUnique {
        value: String,
        previous_path: String,
        path: String,
    },

    /// Observed size/value above an inclusive `max` bound.
    #[error("Type '{kind}' has size of '{size}', greater than max limit '{limit}'. Path: '{path}'")]
    TooLarge {
        kind: String,
        size: f64,
        limit: f64,
        path: String,
    },

    /// Observed size/value below an inclusive `min` bound.
    #[error("Type '{kind}' has size of '{size}', less than min limit '{limit}'. Path: '{path}'")]
    TooSmall {
        kind: String,
        size: f64,
        limit: f64,
        path: String,
    },

    /// Observed size/value at or above an exclusive `max-ex` bound.
    #[error("Type '{kind}' has size of '{size}', greater than or equals to max limit(exclusive) '{limit}'. Path: '{path}'")]
    TooLargeExclusive {
        kind: String,
        size: f64,
        limit: f64,
        path: String,
    },

    /// Observed size/value at or below an exclusive `min-ex` bound.
    #[error("Type '{kind}' has size of '{size}', less than or equals to min limit(exclusive) '{limit}'. Path: '{path}'")]
    TooSmallExclusive {
        kind: String,
        size: f64,
        limit: f64,
        path: String,
    },

    /// With `matching-rule: any`, a key that matched none of the regex
    /// mapping patterns.
    #[error("Key '{key}' does not match any regex '{patterns}'. Path: '{path}'")]
    NoRegexMatch {
        key: String,
        patterns: String,
        path: String,
    },

    /// With `matching-rule: all`, a key that missed at least one pattern.
    #[error("Key '{key}' does not match all regex '{patterns}'. Path: '{path}'")]
    NotAllRegexMatch {
        key: String,
        patterns: String,
        path: String,
    },

    /// An `include` reference naming an unregistered partial schema.
    #[error("Cannot find partial schema with name '{name}'. Existing partial schemas: '{known}'. Path: '{path}'")]
    IncludeNotFound {
        name: String,
        known: String,
        path: String,
    },

    /// An empty string offered as a timestamp.
    #[error("Timestamp value is empty. Path: '{path}'")]
    TimestampEmpty { path: String },

    /// A numeric timestamp outside the accepted epoch window.
    #[error("Timestamp '{value}' is out of range [1, 2147483647]. Path: '{path}'")]
    TimestampOutOfRange { value: String, path: String },

    /// A string that no timestamp parse attempt accepted.
    #[error("Not a valid timestamp '{value}'. Path: '{path}'")]
    TimestampParse { value: String, path: String },

    /// A date string that matched none of the declared formats.
    #[error("Not a valid date '{value}' for formats '{formats}'. Path: '{path}'")]
    DateFormatMismatch {
        value: String,
        formats: String,
        path: String,
    },
}

impl ValidationError {
    /// The data path the finding was recorded at.
    pub fn path(&self) -> &str {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::MissingRequiredKey { path, .. }
            | Self::UndefinedKey { path, .. }
            | Self::PatternMismatch { path, .. }
            | Self::EnumMismatch { path, .. }
            | Self::NotUnique { path, .. }
            | Self::TooLarge { path, .. }
            | Self::TooSmall { path, .. }
            | Self::TooLargeExclusive { path, .. }
            | Self::TooSmallExclusive { path, .. }
            | Self::NoRegexMatch { path, .. }
            | Self::NotAllRegexMatch { path, .. }
            | Self::IncludeNotFound { path, .. }
            | Self::TimestampEmpty { path }
            | Self::TimestampOutOfRange { path, .. }
            | Self::TimestampParse { path, .. }
            | Self::DateFormatMismatch { path, .. } => path,
        }
    }
}

/// Aggregate of every finding from one validation run, raised in strict
/// mode when the run produced at least one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Schema validation failed:\n{}", .errors.iter().map(|e| format!(" - {e}")).collect::<Vec<_>>().join("\n"))]
pub struct SchemaError {
    pub errors: Vec<ValidationError>,
}

impl SchemaError {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

/// Fatal errors from a validation run or its surroundings.
///
/// Unlike [`ValidationError`] findings, these unwind the whole run: they
/// indicate a defective schema, a data tree whose gross shape cannot be
/// interpreted, or a broken extension contract.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The schema description failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A sequence rule met a non-sequence value.
    #[error("Value is not a sequence. Path: '{path}'")]
    NotSequence { path: String },

    /// A mapping rule met a non-mapping value.
    #[error("Value is not a mapping. Path: '{path}'")]
    NotMapping { path: String },

    /// A type name with no registered predicate reached the validator.
    /// Only reachable through a compiler defect.
    #[error("Unknown type check '{name}'. Path: '{path}'")]
    UnknownType { name: String, path: String },

    /// A `range` constraint was applied to a non-scalar value.
    #[error("Value is not a scalar, cannot apply range. Path: '{path}'")]
    NotScalar { path: String },

    /// A `date` rule without the mandatory `format` keyword.
    #[error("Type 'date' requires the 'format' keyword. Path: '{path}'")]
    MissingDateFormat { path: String },

    /// A `func` name not registered in any extension module.
    #[error("Extension function '{name}' is not registered in any module")]
    ExtensionNotFound { name: String },

    /// An extension function returned false.
    #[error("Extension function '{name}' rejected the value. Path: '{path}'")]
    ExtensionFailed { name: String, path: String },

    /// Strict-mode aggregate of accumulated findings.
    #[error(transparent)]
    Validation(#[from] SchemaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A data or schema file with an extension the loader cannot sniff.
    #[error("Unknown file format of '{path}', expected .json, .yaml or .yml")]
    UnknownFileFormat { path: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
pub type CompileResult<T> = Result<T, CompileError>;
