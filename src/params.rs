//! Query parameter validation for handler code.
//!
//! ```ignore
//! let page = req.validate_param("page", &[Constraint::Integer, Constraint::Range(1, 100)])?;
//! let dark = req.validate_param("dark", &[Constraint::AnyOf(vec![Constraint::Missing, Constraint::Bool])])?;
//! ```
//!
//! Constraints apply in order: each one must accept the current value, then
//! converts it for the next. A rejected value is an [`HttpError::Validation`]
//! (400).

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{HttpError, Request};

static BOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(t|f|true|false|on|off|1|0|yes|no)$").expect("valid bool regex"));
static BOOL_TRUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(t|true|on|1|yes)$").expect("valid bool regex"));
static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+\-]?[0-9]+$").expect("valid integer regex"));
static FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+\-]?[0-9]+(\.[0-9]+)?$").expect("valid float regex"));

/// A single validation rule.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `t|f|true|false|on|off|1|0|yes|no`, converted to a boolean.
    Bool,
    /// Optional sign and digits, converted to `i64`.
    Integer,
    /// Optional sign, digits, optional fraction; converted to `f64`.
    Float,
    /// Exactly this string.
    Literal(String),
    /// Matches the regex.
    Pattern(Regex),
    /// Any present value.
    Present,
    /// The parameter is absent.
    Missing,
    /// Numeric value within the inclusive range.
    Range(i64, i64),
    /// First satisfied alternative wins and converts.
    AnyOf(Vec<Constraint>),
}

/// A parameter value, raw or converted.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Missing,
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl Constraint {
    /// Shorthand for a set of literal alternatives.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(values.into_iter().map(|v| Self::Literal(v.into())).collect())
    }

    fn accepts(&self, value: &ParamValue) -> bool {
        use ParamValue as V;
        match (self, value) {
            (Self::AnyOf(alts), _) => alts.iter().any(|c| c.accepts(value)),
            (Self::Missing, v) => v.is_missing(),
            (_, V::Missing) => false,
            (Self::Present, _) => true,
            (Self::Bool, V::Str(s)) => BOOL_RE.is_match(s),
            (Self::Bool, V::Bool(_)) => true,
            (Self::Integer, V::Str(s)) => INTEGER_RE.is_match(s),
            (Self::Integer, V::Int(_)) => true,
            (Self::Float, V::Str(s)) => FLOAT_RE.is_match(s),
            (Self::Float, V::Int(_) | V::Float(_)) => true,
            (Self::Literal(lit), V::Str(s)) => lit == s,
            (Self::Pattern(re), V::Str(s)) => re.is_match(s),
            (Self::Range(lo, hi), V::Int(n)) => (*lo..=*hi).contains(n),
            (Self::Range(lo, hi), V::Float(f)) => *f >= *lo as f64 && *f <= *hi as f64,
            _ => false,
        }
    }

    /// Convert an accepted value. `None` when conversion overflows.
    fn convert(&self, value: ParamValue) -> Option<ParamValue> {
        use ParamValue as V;
        Some(match (self, value) {
            (Self::AnyOf(alts), value) => {
                let alt = alts.iter().find(|c| c.accepts(&value))?;
                return alt.convert(value);
            }
            (Self::Bool, V::Str(s)) => V::Bool(BOOL_TRUE_RE.is_match(&s)),
            (Self::Integer, V::Str(s)) => V::Int(s.trim_start_matches('+').parse().ok()?),
            (Self::Float, V::Str(s)) => V::Float(s.parse().ok()?),
            (Self::Float, V::Int(n)) => V::Float(n as f64),
            (_, value) => value,
        })
    }
}

/// Validate `value` against `constraints` in order.
pub fn validate(name: &str, value: Option<&str>, constraints: &[Constraint]) -> Result<ParamValue, HttpError> {
    let mut value = value.map_or(ParamValue::Missing, |v| ParamValue::Str(v.to_string()));
    for constraint in constraints {
        if !constraint.accepts(&value) {
            return Err(HttpError::validation(format!("invalid parameter `{name}`")));
        }
        value = constraint
            .convert(value)
            .ok_or_else(|| HttpError::validation(format!("parameter `{name}` out of range")))?;
    }
    Ok(value)
}

impl Request {
    /// Validate and convert a query parameter.
    pub fn validate_param(&self, name: &str, constraints: &[Constraint]) -> Result<ParamValue, HttpError> {
        validate(name, self.query(name), constraints)
    }
}
