//! Validation subsystem.
//!
//! # Data Flow
//! ```text
//! rule-string ("integer|min:18|onError('too young')")
//!     → parser.rs (split, numeric pre-scan, descriptors)
//!     → rules.rs (compile descriptors into evaluators)
//!     → cache.rs (memoize per rule-string)
//!     → validator.rs (evaluate per field, fail fast per field)
//!     → ValidationResult
//! ```
//!
//! # Design Decisions
//! - `min`/`max` compare length unless the field carries `numeric`, `integer` or `int`
//! - Parsed rules are immutable and freely shared across requests
//! - A custom `onError` message only ever replaces the last rule's message

pub mod cache;
pub mod parser;
pub mod rules;
pub mod validator;

pub use cache::RuleCache;
pub use parser::FieldRules;
pub use rules::{Rule, RuleDescriptor, RuleKind, ValidationRule};
pub use validator::{validate, RuleSet, ValidationFailed, ValidationResult, Validator};
