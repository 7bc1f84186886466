//! Compiled rule tree definitions.
//!
//! A schema description compiles into a tree of [`RuleNode`]s, one node
//! per schema level. The tree is built once by the compiler and read-only
//! during validation; the only validation-time mutation is default-value
//! injection into the *data*, never into the rule tree.

use regex::Regex;
use serde_json::Value;

use crate::types::DEFAULT_TYPE;

/// Structural class of a rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A leaf value constraint.
    Scalar,
    /// An ordered list of items, each checked against the alternatives in
    /// [`RuleNode::sequence_children`].
    Sequence,
    /// A key/value collection with declared and regex-keyed children.
    Mapping,
    /// A by-name reference into the partial schema registry, resolved at
    /// validation time.
    Include,
}

/// How many of a sequence rule's alternative sub-schemas an item must
/// satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceMatching {
    /// Valid if at least one alternative accepts the item.
    #[default]
    Any,
    /// Valid only if every alternative accepts the item.
    All,
    /// Always valid; alternatives still run for their side effects
    /// (uniqueness collection).
    Star,
}

impl SequenceMatching {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "all" => Some(Self::All),
            "*" => Some(Self::Star),
            _ => None,
        }
    }
}

/// How many regex key-patterns an otherwise-undeclared mapping key must
/// match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMatching {
    #[default]
    Any,
    All,
}

impl MappingMatching {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// The four-bound set shared by `range` and `length`.
///
/// `max`/`min` are inclusive, the `-ex` forms exclusive (equality itself
/// violates them). All bounds are independent; none suppresses another.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub max_ex: Option<f64>,
    pub min_ex: Option<f64>,
}

/// A regex-keyed mapping child, recorded separately for key lookup.
///
/// The child rule itself also sits in [`RuleNode::mapping_children`]
/// under its raw sentinel key (e.g. `regex;(^a.+$)`).
#[derive(Debug, Clone)]
pub struct RegexMapping {
    /// The raw schema key, sentinel prefix included.
    pub raw_key: String,
    /// The compiled pattern extracted from the key.
    pub pattern: Regex,
}

/// One compiled schema unit.
#[derive(Debug, Clone)]
pub struct RuleNode {
    pub kind: RuleKind,
    /// Resolved type name, always a registered type.
    pub declared_type: String,
    pub required: bool,
    pub unique: bool,
    /// Implies `required`; only legal on scalar children of a mapping.
    pub ident: bool,
    /// Scalar substituted when the key/item is absent. Injected into the
    /// input mapping during validation.
    pub default: Option<Value>,
    pub pattern: Option<Regex>,
    /// Closed set of admissible scalar values.
    pub enum_values: Option<Vec<Value>>,
    /// Bounds on the value itself (numbers) or its size (strings,
    /// sequences, mappings).
    pub range: Option<Bounds>,
    /// Bounds on string length specifically.
    pub length: Option<Bounds>,
    /// Mapping accepts arbitrary undeclared keys.
    pub allow_empty_mapping: bool,
    pub matching: SequenceMatching,
    pub matching_rule: MappingMatching,
    /// Alternative sub-schemas of a sequence rule; normally one.
    pub sequence_children: Vec<RuleNode>,
    /// Declared children of a mapping rule, in schema order.
    pub mapping_children: Vec<(String, RuleNode)>,
    /// Side list of the regex-keyed children for fast key matching.
    pub regex_mappings: Vec<RegexMapping>,
    /// Name in the partial schema registry; `Include` nodes only.
    pub include_name: Option<String>,
    /// Extension callback invoked before structural checks.
    pub func_name: Option<String>,
    /// Date formats for `type: date`, strftime-style.
    pub formats: Option<Vec<String>>,
    // Diagnostics only, never consulted by the validator.
    pub name: Option<String>,
    pub desc: Option<String>,
    pub example: Option<String>,
}

impl RuleNode {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            declared_type: DEFAULT_TYPE.to_string(),
            required: false,
            unique: false,
            ident: false,
            default: None,
            pattern: None,
            enum_values: None,
            range: None,
            length: None,
            allow_empty_mapping: false,
            matching: SequenceMatching::default(),
            matching_rule: MappingMatching::default(),
            sequence_children: Vec::new(),
            mapping_children: Vec::new(),
            regex_mappings: Vec::new(),
            include_name: None,
            func_name: None,
            formats: None,
            name: None,
            desc: None,
            example: None,
        }
    }

    /// Declared child rule for an exact key.
    pub fn mapping_child(&self, key: &str) -> Option<&RuleNode> {
        self.mapping_children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, rule)| rule)
    }
}
