//! The fixed type registry.
//!
//! Maps every schema type name to a predicate over [`serde_json::Value`]
//! and a collection flag. The table is closed: the compiler rejects any
//! type name not present here, and encountering an unregistered name at
//! validation time is a fatal defect, not a finding.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Type assumed when a schema rule omits `type` and structure does not
/// force `seq` or `map`.
pub const DEFAULT_TYPE: &str = "str";

/// Every registered type name, in no particular order.
pub const TYPE_NAMES: &[&str] = &[
    "str",
    "int",
    "float",
    "number",
    "bool",
    "text",
    "any",
    "enum",
    "none",
    "timestamp",
    "date",
    "email",
    "url",
    "ip",
    "ipv4",
    "ipv6",
    "ipv4_cidr",
    "ipv6_cidr",
    "ip_cidr",
    "map",
    "seq",
    "scalar",
    "symbol",
];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://\S+$").unwrap());

/// True if `name` is in the registry at all.
pub fn is_builtin_type(name: &str) -> bool {
    TYPE_NAMES.contains(&name)
}

/// True for the two container types.
pub fn is_collection_type(name: &str) -> bool {
    matches!(name, "map" | "seq")
}

pub fn is_scalar_type(name: &str) -> bool {
    !is_collection_type(name)
}

/// True for values that are containers (arrays and objects).
pub fn is_collection(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

/// True for non-null, non-container values.
pub fn is_scalar(value: &Value) -> bool {
    !is_collection(value) && !value.is_null()
}

/// Run the predicate registered under `name` against `value`.
///
/// Returns `None` when `name` is not registered; the caller decides how
/// loudly to fail (the compiler has already vetted names, so `None` at
/// validation time means a compiler defect).
pub fn type_matches(name: &str, value: &Value) -> Option<bool> {
    let ok = match name {
        "str" => value.is_string(),
        // JSON keeps booleans and numbers apart, so the boolean-is-not-int
        // exclusion holds structurally here.
        "int" => is_int(value),
        "float" => is_float(value),
        "number" => is_int(value) || is_float(value),
        "bool" => value.is_boolean(),
        "text" => value.is_string() || is_int(value) || is_float(value),
        "any" => true,
        "enum" => value.is_string(),
        "none" => value.is_null(),
        "timestamp" => is_timestamp_shaped(value),
        "date" => value.is_string(),
        "email" => value.as_str().is_some_and(|s| EMAIL_RE.is_match(s)),
        "url" => value.as_str().is_some_and(|s| URL_RE.is_match(s)),
        "ip" => value.as_str().is_some_and(|s| is_ipv4(s) || is_ipv6(s)),
        "ipv4" => value.as_str().is_some_and(is_ipv4),
        "ipv6" => value.as_str().is_some_and(is_ipv6),
        "ipv4_cidr" => value.as_str().is_some_and(is_ipv4_cidr),
        "ipv6_cidr" => value.as_str().is_some_and(is_ipv6_cidr),
        "ip_cidr" => value
            .as_str()
            .is_some_and(|s| is_ipv4_cidr(s) || is_ipv6_cidr(s)),
        "map" => value.is_object(),
        "seq" => value.is_array(),
        "scalar" => is_scalar(value),
        "symbol" => value.is_string(),
        _ => return None,
    };
    Some(ok)
}

fn is_int(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

/// Floats proper, plus strings that parse as a float (e.g. `"1e-06"`).
fn is_float(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_f64(),
        Value::String(s) => !s.trim().is_empty() && s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// Shape gate for `timestamp`: numbers and strings pass here, the
/// detailed bound and parse checks live in the scalar validator.
fn is_timestamp_shaped(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(_) => true,
        _ => false,
    }
}

fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

/// Strict CIDR: the address's host bits beyond the prefix must be zero,
/// so `192.168.1.1/24` is rejected while `192.168.1.0/24` passes.
fn is_ipv4_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(addr) = addr.parse::<Ipv4Addr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    if prefix > 32 {
        return false;
    }
    let mask: u32 = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    u32::from(addr) & !mask == 0
}

fn is_ipv6_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(addr) = addr.parse::<Ipv6Addr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    if prefix > 128 {
        return false;
    }
    let mask: u128 = if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    };
    u128::from(addr) & !mask == 0
}

/// Short type name of a JSON value for error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// String form of a scalar for pattern matching and error rendering.
/// Strings render bare (no JSON quotes); everything else via JSON.
pub fn scalar_repr(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
