//! Route template compilation and path matching.
//!
//! # Responsibilities
//! - Compile `/users/{id:int}/posts/{slug}` into literal and typed segments
//! - Match a concrete path segment by segment, whole path only
//! - Extract captured values in placeholder order
//!
//! # Design Decisions
//! - No regex in the hot path: each placeholder type is a character-class check
//! - Paths and templates share one normalization (no query, no trailing slash except root)
//! - Captured values stay raw strings; the type tag travels with them for callers to coerce

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{PatternError, UrlError};

/// Canonical form: leading `/`, no query or fragment, no trailing `/` except root.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() {
        return Cow::Borrowed("/");
    }
    if trimmed.starts_with('/') {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("/{trimmed}"))
    }
}

/// Character class a placeholder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// `[^/]+`
    Any,
    /// `\d+`
    Int,
    /// `[a-zA-Z]+`
    Alpha,
    /// `[a-zA-Z0-9]+`
    AlphaNumeric,
    /// Canonical 8-4-4-4-12 hex.
    Uuid,
    /// `[a-z0-9-]+`
    Slug,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Int => "int",
            ParamType::Alpha => "alpha",
            ParamType::AlphaNumeric => "alphanumeric",
            ParamType::Uuid => "uuid",
            ParamType::Slug => "slug",
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        if value.is_empty() || value.contains('/') {
            return false;
        }
        match self {
            ParamType::Any => true,
            ParamType::Int => value.bytes().all(|b| b.is_ascii_digit()),
            ParamType::Alpha => value.bytes().all(|b| b.is_ascii_alphabetic()),
            ParamType::AlphaNumeric => value.bytes().all(|b| b.is_ascii_alphanumeric()),
            ParamType::Uuid => is_canonical_uuid(value),
            ParamType::Slug => value
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'),
        }
    }
}

impl FromStr for ParamType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(ParamType::Any),
            "int" | "number" => Ok(ParamType::Int),
            "alpha" | "letter" => Ok(ParamType::Alpha),
            "alphanumeric" => Ok(ParamType::AlphaNumeric),
            "uuid" => Ok(ParamType::Uuid),
            "slug" => Ok(ParamType::Slug),
            _ => Err(()),
        }
    }
}

pub(crate) fn is_canonical_uuid(value: &str) -> bool {
    value.len() == 36
        && value.bytes().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, kind: ParamType },
}

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPattern {
    template: String,
    segments: Vec<Segment>,
}

impl UriPattern {
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let normalized = normalize_path(template).into_owned();
        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        for raw in split_segments(&normalized) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(inner) => {
                    let (name, kind) = match inner.split_once(':') {
                        Some((name, kind)) => (name.trim(), kind.trim()),
                        None => (inner.trim(), "any"),
                    };
                    if !is_identifier(name) {
                        return Err(PatternError::InvalidParameterName {
                            pattern: normalized.clone(),
                            name: name.to_string(),
                        });
                    }
                    if names.contains(&name) {
                        return Err(PatternError::DuplicateParameter {
                            pattern: normalized.clone(),
                            name: name.to_string(),
                        });
                    }
                    let kind = kind.parse::<ParamType>().map_err(|_| {
                        PatternError::InvalidPatternType {
                            pattern: normalized.clone(),
                            name: name.to_string(),
                            kind: kind.to_string(),
                        }
                    })?;
                    names.push(name);
                    Segment::Param {
                        name: name.to_string(),
                        kind,
                    }
                }
                None if raw.contains(['{', '}']) => {
                    return Err(PatternError::MalformedPlaceholder {
                        pattern: normalized.clone(),
                        segment: raw.to_string(),
                    });
                }
                None => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            template: normalized,
            segments,
        })
    }

    /// Normalized template text, e.g. `/users/{id:int}`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of appearance.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Captured values in placeholder order, or `None` if the whole path does not match.
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        let path = normalize_path(path);
        self.captures(&path)
            .map(|values| values.into_iter().map(|(_, _, v)| v.to_string()).collect())
    }

    pub fn extract_parameters(&self, path: &str) -> Option<RouteParams> {
        let path = normalize_path(path);
        self.captures_params(&path)
    }

    /// Like `extract_parameters` but `path` must already be normalized.
    pub(crate) fn captures_params(&self, normalized: &str) -> Option<RouteParams> {
        self.captures(normalized).map(|values| {
            RouteParams(
                values
                    .into_iter()
                    .map(|(name, kind, value)| RouteParam {
                        name: name.to_string(),
                        value: value.to_string(),
                        kind,
                    })
                    .collect(),
            )
        })
    }

    fn captures<'p>(&'p self, normalized: &'p str) -> Option<Vec<(&'p str, ParamType, &'p str)>> {
        let mut parts = split_segments(normalized);
        let mut values = Vec::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param { name, kind } if kind.accepts(part) => {
                    values.push((name.as_str(), *kind, part));
                }
                Segment::Param { .. } => return None,
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(values)
    }

    /// Substitute placeholder values; each value must satisfy its placeholder type.
    pub(crate) fn fill(&self, route: &str, params: &[(&str, &str)]) -> Result<String, UrlError> {
        if self.segments.is_empty() {
            return Ok("/".to_string());
        }

        let mut url = String::new();
        for segment in &self.segments {
            url.push('/');
            match segment {
                Segment::Literal(literal) => url.push_str(literal),
                Segment::Param { name, kind } => {
                    let value = params
                        .iter()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| UrlError::MissingParameter {
                            route: route.to_string(),
                            name: name.clone(),
                        })?;
                    if !kind.accepts(value) {
                        return Err(UrlError::InvalidParameter {
                            route: route.to_string(),
                            name: name.clone(),
                            value: value.to_string(),
                            kind: kind.name().to_string(),
                        });
                    }
                    url.push_str(value);
                }
            }
        }
        Ok(url)
    }
}

impl fmt::Display for UriPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn split_segments(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .strip_prefix('/')
        .unwrap_or(normalized)
        .split('/')
        .filter(move |_| normalized != "/")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One captured placeholder value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParam {
    pub name: String,
    pub value: String,
    pub kind: ParamType,
}

/// Captured parameters in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(Vec<RouteParam>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).map(|p| p.value.as_str())
    }

    /// Declared type of a captured parameter.
    pub fn kind(&self, name: &str) -> Option<ParamType> {
        self.find(name).map(|p| p.kind)
    }

    /// Coerce a raw value. `None` if absent, `Some(Err)` if it does not parse.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(|v| v.parse::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|p| (p.name.as_str(), p.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn find(&self, name: &str) -> Option<&RouteParam> {
        self.0.iter().find(|p| p.name == name)
    }
}
