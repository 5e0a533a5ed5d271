//! Parameter contracts for generated methods
//!
//! A contract lists mandatory parameter names and optional parameters with
//! default values. Every call into a generated method passes its named
//! arguments through [`ArgumentContract::validate`] before anything is read or
//! rendered.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::lexer::is_identifier;
use crate::error::{ConfigurationError, ValidationError};
use crate::value::{Args, Value};

/// The mandatory/optional parameter contract of one generated method
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgumentContract {
    mandatory: Vec<String>,
    optional: BTreeMap<String, Value>,
}

impl ArgumentContract {
    /// Build a contract.
    ///
    /// Every name must be an identifier. A mandatory name listed twice, or a
    /// name that is both mandatory and optional, is rejected.
    pub fn new<I, S>(
        mandatory: I,
        optional: BTreeMap<String, Value>,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut names = Vec::new();
        for name in mandatory {
            let name = name.into();
            if !is_identifier(&name) {
                return Err(ConfigurationError::InvalidParameterName { name });
            }
            if !seen.insert(name.clone()) {
                return Err(ConfigurationError::DuplicateParameter { name });
            }
            names.push(name);
        }

        for name in optional.keys() {
            if !is_identifier(name) {
                return Err(ConfigurationError::InvalidParameterName { name: name.clone() });
            }
            if seen.contains(name) {
                return Err(ConfigurationError::ConflictingParameter { name: name.clone() });
            }
        }

        Ok(Self {
            mandatory: names,
            optional,
        })
    }

    /// Mandatory parameter names, in declaration order
    pub fn mandatory(&self) -> &[String] {
        &self.mandatory
    }

    /// Optional parameters with their defaults
    pub fn optional(&self) -> &BTreeMap<String, Value> {
        &self.optional
    }

    /// Whether `name` is a declared parameter
    pub fn accepts(&self, name: &str) -> bool {
        self.mandatory.iter().any(|m| m == name) || self.optional.contains_key(name)
    }

    /// Check `args` against the contract and fill in defaults.
    ///
    /// Missing mandatory names are reported before unknown names; only the
    /// first failing check is reported.
    pub fn validate(&self, args: Args) -> Result<Args, ValidationError> {
        let mut missing: Vec<String> = self
            .mandatory
            .iter()
            .filter(|name| !args.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(ValidationError::Missing { keywords: missing });
        }

        // Args is sorted, so the unknown names come out sorted as well
        let unknown: Vec<String> = args
            .keys()
            .filter(|name| !self.accepts(name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::Unknown { keywords: unknown });
        }

        let mut locals = args;
        for (name, default) in &self.optional {
            locals
                .entry(name.clone())
                .or_insert_with(|| default.clone());
        }
        Ok(locals)
    }

    /// Human-readable signature, e.g. `(name, title = Mr.)`
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .mandatory
            .iter()
            .cloned()
            .chain(
                self.optional
                    .iter()
                    .map(|(name, default)| format!("{} = {:?}", name, default.to_string())),
            )
            .collect();
        format!("({})", params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use pretty_assertions::assert_eq;

    /// `a`, `b` mandatory; `c = 1`, `d = nil` optional
    fn contract() -> ArgumentContract {
        ArgumentContract::new(["a", "b"], args! { "c" => 1, "d" => Value::Nil }).unwrap()
    }

    #[test]
    fn test_all_arguments_given() {
        let args = args! { "a" => 1, "b" => 2, "c" => 3, "d" => 4 };
        assert_eq!(contract().validate(args.clone()).unwrap(), args);
    }

    #[test]
    fn test_missing_mandatory() {
        let err = contract()
            .validate(args! { "b" => 2, "c" => 3, "d" => 4 })
            .unwrap_err();
        assert_eq!(err.to_string(), "missing keywords: a");
    }

    #[test]
    fn test_missing_names_are_sorted() {
        let contract = ArgumentContract::new(["zeta", "alpha"], Args::new()).unwrap();
        let err = contract.validate(Args::new()).unwrap_err();
        assert_eq!(err.to_string(), "missing keywords: alpha, zeta");
    }

    #[test]
    fn test_nil_default_filled_in() {
        let out = contract()
            .validate(args! { "a" => 1, "b" => 2, "c" => 3 })
            .unwrap();
        assert_eq!(out, args! { "a" => 1, "b" => 2, "c" => 3, "d" => Value::Nil });
    }

    #[test]
    fn test_default_filled_in() {
        let out = contract()
            .validate(args! { "a" => 1, "b" => 2, "d" => 4 })
            .unwrap();
        assert_eq!(out, args! { "a" => 1, "b" => 2, "c" => 1, "d" => 4 });
    }

    #[test]
    fn test_unknown_keyword() {
        let err = contract()
            .validate(args! { "a" => 1, "b" => 2, "e" => 5 })
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown keywords: e");
    }

    #[test]
    fn test_missing_reported_before_unknown() {
        let err = contract()
            .validate(args! { "b" => 2, "e" => 5 })
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Missing {
                keywords: vec!["a".to_string()]
            }
        );
    }

    #[test]
    fn test_invalid_mandatory_name() {
        let err = ArgumentContract::new(["ok", "not ok"], Args::new()).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidParameterName {
                name: "not ok".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_mandatory_name() {
        let err = ArgumentContract::new(["a", "a"], Args::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateParameter { name } if name == "a"));
    }

    #[test]
    fn test_mandatory_and_optional_collide() {
        let err = ArgumentContract::new(["a"], args! { "a" => 1 }).unwrap_err();
        assert!(matches!(err, ConfigurationError::ConflictingParameter { name } if name == "a"));
    }

    #[test]
    fn test_describe() {
        let contract = ArgumentContract::new(["name"], args! { "title" => "Mr." }).unwrap();
        assert_eq!(contract.describe(), r#"(name, title = "Mr.")"#);
    }
}
