//! Rule-string parser.
//!
//! Grammar: `rule1|rule2:param|rule3:p1,p2|...|onError("message")`
//!
//! # Steps
//! 1. Peel off a trailing `onError("...")` / `onError('...')` clause
//! 2. Split the rest on `|`, dropping empty tokens
//! 3. Pre-scan every token for `numeric`, `integer` or `int`; the result is a
//!    field-level flag, so `min`/`max` see it regardless of token order
//! 4. Resolve each token to a descriptor, then compile it
//! 5. Attach the custom message, if any, to the last rule only

use crate::error::RuleError;
use crate::validation::rules::{RuleDescriptor, RuleKind, ValidationRule};

const ON_ERROR: &str = "onError(";
const NUMERIC_MARKERS: [&str; 3] = ["numeric", "integer", "int"];

/// Compiled rules for one field, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: Vec<ValidationRule>,
    numeric: bool,
}

impl FieldRules {
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Message of the first failing rule, if any. Later rules are not evaluated.
    pub fn check(&self, field: &str, value: &serde_json::Value) -> Option<String> {
        self.rules
            .iter()
            .find(|rule| !rule.evaluate(value))
            .map(|rule| rule.message(field))
    }
}

/// Parse and compile a rule-string.
pub fn parse(rule_string: &str) -> Result<FieldRules, RuleError> {
    let descriptors = describe(rule_string)?;
    let numeric = descriptors.iter().any(|d| d.numeric_context);
    let rules = descriptors
        .iter()
        .map(ValidationRule::compile)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FieldRules { rules, numeric })
}

/// Parse a rule-string into descriptors without compiling evaluators.
pub fn describe(rule_string: &str) -> Result<Vec<RuleDescriptor>, RuleError> {
    let (rules, message) = split_message(rule_string)?;

    let tokens: Vec<(&str, Option<&str>)> = rules
        .split('|')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once(':') {
            Some((name, param)) => (name.trim(), Some(param)),
            None => (t, None),
        })
        .collect();

    let numeric_context = tokens
        .iter()
        .any(|(name, _)| NUMERIC_MARKERS.contains(name));

    let mut descriptors = tokens
        .into_iter()
        .map(|(name, param)| -> Result<RuleDescriptor, RuleError> {
            let (kind, params) = resolve(name, param)?;
            Ok(RuleDescriptor {
                kind,
                params,
                numeric_context,
                message: None,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let (Some(last), Some(message)) = (descriptors.last_mut(), message) {
        last.message = Some(message);
    }
    Ok(descriptors)
}

fn resolve(name: &str, param: Option<&str>) -> Result<(RuleKind, Vec<String>), RuleError> {
    let param = param.filter(|p| !p.trim().is_empty());
    let single = |p: &str| vec![p.trim().to_string()];

    let resolved = match (name, param) {
        ("required", _) => (RuleKind::Required, vec![]),
        ("email", _) => (RuleKind::Email, vec![]),
        ("url", _) => (RuleKind::Url, vec![]),
        ("numeric", _) => (RuleKind::Numeric, vec![]),
        ("integer" | "int", _) => (RuleKind::Integer, vec![]),
        ("alpha", _) => (RuleKind::Alpha, vec![]),
        ("alphanumeric", _) => (RuleKind::AlphaNumeric, vec![]),
        ("boolean" | "bool", _) => (RuleKind::Boolean, vec![]),
        ("uuid", None) => (RuleKind::Uuid, vec![]),
        ("uuid", Some(version)) => (RuleKind::Uuid, single(version)),
        ("uuidv4", _) => (RuleKind::Uuid, single("4")),
        ("uuidv1", _) => (RuleKind::Uuid, single("1")),
        ("in", Some(list)) => (
            RuleKind::In,
            list.split(',').map(|v| v.trim().to_string()).collect(),
        ),
        ("regex", Some(pattern)) => (RuleKind::Regex, vec![pattern.to_string()]),
        ("date", format) => (
            RuleKind::Date,
            format.map(|f| single(f)).unwrap_or_default(),
        ),
        ("min", Some(bound)) => (RuleKind::Min, single(bound)),
        ("max", Some(bound)) => (RuleKind::Max, single(bound)),
        ("in" | "regex" | "min" | "max", None) => {
            return Err(RuleError::MissingParameter {
                rule: name.to_string(),
            })
        }
        _ => return Err(RuleError::UnknownRule(name.to_string())),
    };
    Ok(resolved)
}

/// Split `rules|onError("msg")` into `("rules", Some("msg"))`.
///
/// The clause must start a token and run to the end of the string.
fn split_message(input: &str) -> Result<(&str, Option<String>), RuleError> {
    let trimmed = input.trim_end();

    for (start, _) in trimmed.match_indices(ON_ERROR) {
        let before = trimmed[..start].trim_end();
        if !(before.is_empty() || before.ends_with('|')) {
            continue;
        }

        let clause = &trimmed[start + ON_ERROR.len()..];
        let message = clause.chars().next().and_then(|quote| {
            if quote != '"' && quote != '\'' {
                return None;
            }
            clause
                .strip_prefix(quote)?
                .strip_suffix(')')?
                .strip_suffix(quote)
        });

        return match message {
            Some(message) => Ok((before.trim_end_matches('|'), Some(message.to_string()))),
            None => Err(RuleError::UnterminatedMessage(input.to_string())),
        };
    }
    Ok((input, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::Rule;

    fn kinds(rule_string: &str) -> Vec<RuleKind> {
        describe(rule_string)
            .unwrap()
            .into_iter()
            .map(|d| d.kind)
            .collect()
    }

    #[test]
    fn test_tokens_and_params() {
        assert_eq!(
            kinds("required|email||url"),
            vec![RuleKind::Required, RuleKind::Email, RuleKind::Url]
        );

        let d = describe("in:draft, published,archived").unwrap();
        assert_eq!(d[0].params, vec!["draft", "published", "archived"]);

        let d = describe(r"regex:^\d{3}:\d{2}$").unwrap();
        assert_eq!(d[0].params, vec![r"^\d{3}:\d{2}$"]);

        assert_eq!(kinds("bool|int|uuidv4"), vec![
            RuleKind::Boolean,
            RuleKind::Integer,
            RuleKind::Uuid
        ]);
        assert!(describe("").unwrap().is_empty());
    }

    #[test]
    fn test_numeric_context_is_order_independent() {
        for rule_string in ["integer|min:18|max:120", "min:18|max:120|integer", "min:18|numeric"] {
            let rules = parse(rule_string).unwrap();
            assert!(rules.is_numeric(), "{rule_string}");
            assert!(rules
                .rules()
                .iter()
                .any(|r| matches!(r.rule(), Rule::MinValue(_))));
        }

        let rules = parse("min:3|max:20").unwrap();
        assert!(!rules.is_numeric());
        assert!(matches!(rules.rules()[0].rule(), Rule::MinLength(3)));
        assert!(matches!(rules.rules()[1].rule(), Rule::MaxLength(20)));
    }

    #[test]
    fn test_on_error_attaches_to_last_rule() {
        let d = describe("required|email|onError('bad email')").unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].message, None);
        assert_eq!(d[1].message.as_deref(), Some("bad email"));

        let d = describe(r#"required|onError("Name | is required")"#).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].message.as_deref(), Some("Name | is required"));
    }

    #[test]
    fn test_on_error_must_be_terminated() {
        assert!(matches!(
            describe("required|onError('oops"),
            Err(RuleError::UnterminatedMessage(_))
        ));
        assert!(matches!(
            describe("required|onError(oops)"),
            Err(RuleError::UnterminatedMessage(_))
        ));
    }

    #[test]
    fn test_unknown_and_missing() {
        assert_eq!(
            describe("required|frobnicate").unwrap_err(),
            RuleError::UnknownRule("frobnicate".into())
        );
        assert_eq!(
            describe("min").unwrap_err(),
            RuleError::MissingParameter { rule: "min".into() }
        );
        assert!(matches!(parse("max:ten"), Err(RuleError::InvalidParameter { .. })));
    }

    #[test]
    fn test_check_is_fail_fast() {
        let rules = parse("required|email|onError('bad email')").unwrap();
        assert_eq!(
            rules.check("email", &serde_json::json!("")),
            Some("The email field is required.".to_string())
        );
        assert_eq!(
            rules.check("email", &serde_json::json!("x")),
            Some("bad email".to_string())
        );
        assert_eq!(rules.check("email", &serde_json::json!("a@b.io")), None);
    }
}
