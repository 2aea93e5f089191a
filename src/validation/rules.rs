//! Rule descriptors and their evaluators.
//!
//! A `RuleDescriptor` is what the parser produces for one token: the rule kind,
//! its raw parameters, the field-level numeric flag and an optional custom
//! message. `ValidationRule::compile` turns it into an evaluator with its
//! parameters already parsed (bounds, regex, allowed set).

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::RuleError;
use crate::routing::pattern::is_canonical_uuid;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern compiles")
});

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Required,
    Email,
    Url,
    Numeric,
    Integer,
    Alpha,
    AlphaNumeric,
    Boolean,
    Uuid,
    In,
    Regex,
    Date,
    /// Length or value lower bound, depending on numeric context.
    Min,
    /// Length or value upper bound, depending on numeric context.
    Max,
}

/// Parsed form of one rule token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescriptor {
    pub kind: RuleKind,
    pub params: Vec<String>,
    pub numeric_context: bool,
    pub message: Option<String>,
}

/// Evaluator for one rule kind, with its parameters bound.
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Email,
    Url,
    Numeric,
    Integer,
    Alpha,
    AlphaNumeric,
    Boolean,
    Uuid { version: Option<usize> },
    In(Vec<String>),
    Pattern(Regex),
    Date(String),
    MinLength(usize),
    MaxLength(usize),
    MinValue(f64),
    MaxValue(f64),
}

impl Rule {
    pub fn evaluate(&self, value: &Value) -> bool {
        match self {
            Rule::Required => match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                Value::Bool(_) | Value::Number(_) => true,
            },
            Rule::Email => value.as_str().is_some_and(|s| EMAIL.is_match(s)),
            Rule::Url => value
                .as_str()
                .and_then(|s| url::Url::parse(s).ok())
                .is_some_and(|u| u.has_host()),
            Rule::Numeric => as_number(value).is_some(),
            Rule::Integer => match value {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            Rule::Alpha => value
                .as_str()
                .is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())),
            Rule::AlphaNumeric => value
                .as_str()
                .is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())),
            Rule::Boolean => match value {
                Value::Bool(_) => true,
                Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0 || f == 1.0),
                Value::String(s) => matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off"
                ),
                _ => false,
            },
            Rule::Uuid { version } => value.as_str().is_some_and(|s| {
                is_canonical_uuid(s)
                    && match version {
                        Some(v) => uuid::Uuid::parse_str(s)
                            .is_ok_and(|u| u.get_version_num() == *v),
                        None => true,
                    }
            }),
            Rule::In(allowed) => as_text(value).is_some_and(|s| allowed.iter().any(|a| *a == s)),
            Rule::Pattern(re) => as_text(value).is_some_and(|s| re.is_match(&s)),
            Rule::Date(format) => value.as_str().is_some_and(|s| {
                NaiveDateTime::parse_from_str(s, format).is_ok()
                    || NaiveDate::parse_from_str(s, format).is_ok()
                    || NaiveTime::parse_from_str(s, format).is_ok()
            }),
            Rule::MinLength(min) => length(value).is_some_and(|len| len >= *min),
            Rule::MaxLength(max) => length(value).is_some_and(|len| len <= *max),
            Rule::MinValue(min) => as_number(value).is_some_and(|n| n >= *min),
            Rule::MaxValue(max) => as_number(value).is_some_and(|n| n <= *max),
        }
    }

    pub fn default_message(&self, field: &str) -> String {
        match self {
            Rule::Required => format!("The {field} field is required."),
            Rule::Email => format!("The {field} must be a valid email address."),
            Rule::Url => format!("The {field} must be a valid URL."),
            Rule::Numeric => format!("The {field} must be a number."),
            Rule::Integer => format!("The {field} must be an integer."),
            Rule::Alpha => format!("The {field} may only contain letters."),
            Rule::AlphaNumeric => format!("The {field} may only contain letters and numbers."),
            Rule::Boolean => format!("The {field} must be true or false."),
            Rule::Uuid { version: Some(v) } => format!("The {field} must be a valid version {v} UUID."),
            Rule::Uuid { version: None } => format!("The {field} must be a valid UUID."),
            Rule::In(allowed) => format!("The {field} must be one of: {}.", allowed.join(", ")),
            Rule::Pattern(_) => format!("The {field} format is invalid."),
            Rule::Date(format) => format!("The {field} must be a date matching {format}."),
            Rule::MinLength(min) => format!("The {field} must be at least {min} characters."),
            Rule::MaxLength(max) => format!("The {field} may not be longer than {max} characters."),
            Rule::MinValue(min) => format!("The {field} must be at least {min}."),
            Rule::MaxValue(max) => format!("The {field} may not be greater than {max}."),
        }
    }
}

/// An evaluator plus an optional message override.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    rule: Rule,
    message: Option<String>,
}

impl ValidationRule {
    pub fn new(rule: Rule) -> Self {
        Self { rule, message: None }
    }

    pub fn compile(descriptor: &RuleDescriptor) -> Result<Self, RuleError> {
        let rule = match descriptor.kind {
            RuleKind::Required => Rule::Required,
            RuleKind::Email => Rule::Email,
            RuleKind::Url => Rule::Url,
            RuleKind::Numeric => Rule::Numeric,
            RuleKind::Integer => Rule::Integer,
            RuleKind::Alpha => Rule::Alpha,
            RuleKind::AlphaNumeric => Rule::AlphaNumeric,
            RuleKind::Boolean => Rule::Boolean,
            RuleKind::Uuid => Rule::Uuid {
                version: descriptor
                    .params
                    .first()
                    .map(|p| parse_uuid_version(p))
                    .transpose()?,
            },
            RuleKind::In => Rule::In(descriptor.params.clone()),
            RuleKind::Regex => {
                let raw = first_param(descriptor, "regex")?;
                let pattern = strip_delimiters(raw);
                let re = Regex::new(pattern).map_err(|e| RuleError::InvalidRegex {
                    pattern: raw.to_string(),
                    reason: e.to_string(),
                })?;
                Rule::Pattern(re)
            }
            RuleKind::Date => Rule::Date(
                descriptor
                    .params
                    .first()
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            ),
            RuleKind::Min if descriptor.numeric_context => {
                Rule::MinValue(parse_bound::<f64>(descriptor, "min")?)
            }
            RuleKind::Min => Rule::MinLength(parse_bound::<usize>(descriptor, "min")?),
            RuleKind::Max if descriptor.numeric_context => {
                Rule::MaxValue(parse_bound::<f64>(descriptor, "max")?)
            }
            RuleKind::Max => Rule::MaxLength(parse_bound::<usize>(descriptor, "max")?),
        };

        Ok(Self {
            rule,
            message: descriptor.message.clone(),
        })
    }

    /// Replace the default message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn custom_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn evaluate(&self, value: &Value) -> bool {
        self.rule.evaluate(value)
    }

    /// Custom message if one was attached, otherwise the kind's default.
    pub fn message(&self, field: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.rule.default_message(field))
    }
}

fn first_param<'d>(descriptor: &'d RuleDescriptor, rule: &str) -> Result<&'d str, RuleError> {
    descriptor
        .params
        .first()
        .map(String::as_str)
        .ok_or_else(|| RuleError::MissingParameter {
            rule: rule.to_string(),
        })
}

fn parse_bound<T: std::str::FromStr>(descriptor: &RuleDescriptor, rule: &str) -> Result<T, RuleError> {
    let raw = first_param(descriptor, rule)?;
    raw.trim().parse::<T>().map_err(|_| RuleError::InvalidParameter {
        rule: rule.to_string(),
        param: raw.to_string(),
    })
}

fn parse_uuid_version(param: &str) -> Result<usize, RuleError> {
    let digits = param.trim().trim_start_matches(['v', 'V']);
    match digits.parse::<usize>() {
        Ok(v @ 1..=8) => Ok(v),
        _ => Err(RuleError::InvalidParameter {
            rule: "uuid".to_string(),
            param: param.to_string(),
        }),
    }
}

/// `/^\d+$/` → `^\d+$`; anything else is used verbatim.
fn strip_delimiters(raw: &str) -> &str {
    raw.strip_prefix('/')
        .and_then(|s| s.strip_suffix('/'))
        .filter(|s| !s.is_empty())
        .unwrap_or(raw)
}

fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Characters for strings and numbers, element count for lists.
fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Number(n) => Some(n.to_string().chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}
