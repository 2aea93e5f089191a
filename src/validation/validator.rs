//! Field-by-field validation.
//!
//! # Responsibilities
//! - Look up each field's value (absent means `null`)
//! - Evaluate its rules in order, stopping at the first failure for that field
//! - Attempt every field regardless of failures in others
//!
//! # Design Decisions
//! - The validator only produces a `ValidationResult`; turning it into HTTP is the caller's job
//! - Unknown rules are configuration errors and surface as `RuleError`, never as field failures

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::RuleError;
use crate::observability::metrics;
use crate::validation::cache::RuleCache;
use crate::validation::parser::{self, FieldRules};

/// Per-field error messages. A field absent from the map passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// First message recorded for `field`.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.field_errors(field).first().map(String::as_str)
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Err` when any field failed, so handlers can use `?`.
    pub fn into_result(self) -> Result<(), ValidationFailed> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationFailed(self))
        }
    }
}

/// A non-empty `ValidationResult` carried as an error.
#[derive(Debug, Clone, Error)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct ValidationFailed(pub ValidationResult);

impl ValidationFailed {
    pub fn result(&self) -> &ValidationResult {
        &self.0
    }
}

/// Compiled rules for a set of fields, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: Vec<(String, Arc<FieldRules>)>,
}

impl RuleSet {
    /// Compile every rule-string up front so configuration errors surface at startup.
    pub fn parse<I, F, R>(rules: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (F, R)>,
        F: AsRef<str>,
        R: AsRef<str>,
    {
        let fields = rules
            .into_iter()
            .map(|(field, rule_string)| {
                parser::parse(rule_string.as_ref())
                    .map(|compiled| (field.as_ref().to_string(), Arc::new(compiled)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }
}

/// Applies rule-strings to input data.
#[derive(Debug, Clone)]
pub struct Validator {
    cache: Option<RuleCache>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Validator that memoizes parsed rule-strings.
    pub fn new() -> Self {
        Self {
            cache: Some(RuleCache::new()),
        }
    }

    /// Validator that shares an existing cache.
    pub fn with_cache(cache: RuleCache) -> Self {
        Self { cache: Some(cache) }
    }

    /// Validator that parses every rule-string on every call.
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    pub fn validate<I, F, R>(&self, data: &Map<String, Value>, rules: I) -> Result<ValidationResult, RuleError>
    where
        I: IntoIterator<Item = (F, R)>,
        F: AsRef<str>,
        R: AsRef<str>,
    {
        let mut result = ValidationResult::new();
        for (field, rule_string) in rules {
            let compiled = self.compile(rule_string.as_ref())?;
            check_field(&mut result, field.as_ref(), &compiled, data);
        }
        record(&result);
        Ok(result)
    }

    /// Validate against pre-compiled rules; cannot fail on configuration.
    pub fn validate_with(&self, data: &Map<String, Value>, rule_set: &RuleSet) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (field, compiled) in &rule_set.fields {
            check_field(&mut result, field, compiled, data);
        }
        record(&result);
        result
    }

    fn compile(&self, rule_string: &str) -> Result<Arc<FieldRules>, RuleError> {
        match &self.cache {
            Some(cache) => cache.get_or_parse(rule_string),
            None => parser::parse(rule_string).map(Arc::new),
        }
    }
}

/// Validate with a throwaway, uncached validator.
pub fn validate<I, F, R>(data: &Map<String, Value>, rules: I) -> Result<ValidationResult, RuleError>
where
    I: IntoIterator<Item = (F, R)>,
    F: AsRef<str>,
    R: AsRef<str>,
{
    Validator::uncached().validate(data, rules)
}

static NULL: Value = Value::Null;

fn check_field(result: &mut ValidationResult, field: &str, rules: &FieldRules, data: &Map<String, Value>) {
    let value = data.get(field).unwrap_or(&NULL);
    if let Some(message) = rules.check(field, value) {
        result.add(field, message);
    }
}

fn record(result: &ValidationResult) {
    if !result.is_valid() {
        tracing::debug!(fields = ?result.errors().keys().collect::<Vec<_>>(), "Validation failed");
        metrics::record_validation_failures(result.len());
    }
}
