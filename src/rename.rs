//! Rewrites GnuCash account names into Beancount account names.

use regex::Regex;

use crate::error::{ConversionError, Result};

/// Rule appended to every pipeline: Beancount account names cannot contain whitespace.
pub const WHITESPACE_RULE: (&str, &str) = (r"\s+", "-");

/// An ordered list of regex substitutions; each rule sees the output of the previous one.
#[derive(Clone, Debug)]
pub struct AccountRenamer {
    rules: Vec<(Regex, String)>,
}

impl AccountRenamer {
    /// Compiles `patterns` in order and appends [`WHITESPACE_RULE`] unless an equivalent rule is
    /// already configured.
    ///
    /// Replacements use the `regex` crate syntax, so capture groups are referenced as `$1`.
    pub fn new(patterns: &[(String, String)]) -> Result<Self> {
        let mut rules = patterns
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .map(|re| (re, replacement.clone()))
                    .map_err(|e| {
                        ConversionError::Config(format!("invalid account rename pattern: {}", e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let has_whitespace_rule = rules.iter().any(|(re, replacement)| {
            matches!(re.as_str(), r"\s" | r"\s+") && replacement == WHITESPACE_RULE.1
        });
        if !has_whitespace_rule {
            let (pattern, replacement) = WHITESPACE_RULE;
            let re = Regex::new(pattern)
                .map_err(|e| ConversionError::Config(format!("invalid account rename pattern: {}", e)))?;
            rules.push((re, replacement.to_string()));
        }
        Ok(AccountRenamer { rules })
    }

    /// The `(pattern, replacement)` pairs in application order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules
            .iter()
            .map(|(re, replacement)| (re.as_str(), replacement.as_str()))
    }

    pub fn rename(&self, account: &str) -> String {
        self.rules
            .iter()
            .fold(account.to_string(), |name, (re, replacement)| {
                re.replace_all(&name, replacement.as_str()).into_owned()
            })
    }
}
