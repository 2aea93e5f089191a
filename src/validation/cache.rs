//! Memoized rule-string parsing.
//!
//! Parsed rules are immutable, so one parse per distinct rule-string is
//! enough for the life of the process. Failed parses are not cached.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::RuleError;
use crate::validation::parser::{self, FieldRules};

/// A thread-safe cache of compiled rule-strings.
#[derive(Debug, Clone, Default)]
pub struct RuleCache {
    inner: Arc<DashMap<String, Arc<FieldRules>>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(&self, rule_string: &str) -> Result<Arc<FieldRules>, RuleError> {
        if let Some(rules) = self.inner.get(rule_string) {
            return Ok(Arc::clone(rules.value()));
        }

        let rules = Arc::new(parser::parse(rule_string)?);
        self.inner
            .insert(rule_string.to_string(), Arc::clone(&rules));
        tracing::trace!(rule_string, cached = self.inner.len(), "Cached rule-string");
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}
