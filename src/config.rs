//! Converter configuration.
//!
//! The configuration is a YAML document with a `converter`, a `gnucash`, a `beancount` and an
//! optional `fava` section.  Every key has a default, so an empty document is a valid
//! configuration.  Values that deserialize but cannot work (bad regexes, bad currency codes,
//! clashing number symbols) are rejected when the file is loaded.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use beancount_core::Date;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ConversionError, Result};
use crate::rename::AccountRenamer;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub converter: ConverterConfig,
    pub gnucash: GnucashConfig,
    pub beancount: BeancountConfig,
    pub fava: Option<FavaConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterConfig {
    pub loglevel: LogLevel,
}

/// Log levels accepted in `converter.loglevel`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "WARN")]
    Warning,
    #[serde(alias = "CRITICAL")]
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GnucashConfig {
    pub default_currency: String,
    pub thousands_symbol: String,
    pub decimal_symbol: String,
    pub reconciled_symbol: String,
    pub not_reconciled_symbol: String,
    /// Ordered `(pattern, replacement)` pairs applied to every account name.
    pub account_rename_patterns: Vec<(String, String)>,
    /// Currency of accounts that do not use `default_currency`, keyed by GnuCash account name.
    pub non_default_account_currencies: HashMap<String, String>,
}

impl Default for GnucashConfig {
    fn default() -> Self {
        GnucashConfig {
            default_currency: "EUR".to_string(),
            thousands_symbol: ",".to_string(),
            decimal_symbol: ".".to_string(),
            reconciled_symbol: "y".to_string(),
            not_reconciled_symbol: "n".to_string(),
            account_rename_patterns: Vec::new(),
            non_default_account_currencies: HashMap::new(),
        }
    }
}

impl GnucashConfig {
    pub fn number_format(&self) -> NumberFormat {
        NumberFormat {
            thousands: self.thousands_symbol.clone(),
            decimal: self.decimal_symbol.clone(),
        }
    }
}

/// How the source book writes numbers, e.g. `1.000,50` or `1,000.50`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumberFormat {
    pub thousands: String,
    pub decimal: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        GnucashConfig::default().number_format()
    }
}

impl NumberFormat {
    /// Writes `num` with grouped thousands, e.g. `-1.234,50`.
    pub fn format(&self, num: Decimal) -> String {
        let plain = num.to_string();
        let (sign, digits) = match plain.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", plain.as_str()),
        };
        let (int, fraction) = match digits.split_once('.') {
            Some((int, fraction)) => (int, Some(fraction)),
            None => (digits, None),
        };

        let mut out = String::from(sign);
        for (i, c) in int.chars().enumerate() {
            if i > 0 && (int.len() - i) % 3 == 0 {
                out.push_str(&self.thousands);
            }
            out.push(c);
        }
        if let Some(fraction) = fraction {
            out.push_str(&self.decimal);
            out.push_str(fraction);
        }
        out
    }

    /// Reads a number written by [`NumberFormat::format`]: thousands separators are dropped and
    /// the decimal symbol becomes `.`.
    pub fn parse(&self, text: &str) -> Option<Decimal> {
        let normalized = text
            .trim()
            .replace(self.thousands.as_str(), "")
            .replace(self.decimal.as_str(), ".");
        Decimal::from_str(&normalized).ok()
    }
}

/// What happens when a configured event falls on the day of the conversion event.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum EventCollision {
    /// The conversion event replaces the configured one.
    #[default]
    Replace,
    /// Both events are emitted.
    KeepBoth,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BeancountConfig {
    pub options: Vec<(String, String)>,
    pub plugins: Vec<String>,
    /// Events keyed by date; each value is `"<type> <description>"`.
    pub events: BTreeMap<String, String>,
    pub flag_postings: bool,
    pub event_collision: EventCollision,
}

impl Default for BeancountConfig {
    fn default() -> Self {
        BeancountConfig {
            options: Vec::new(),
            plugins: Vec::new(),
            events: BTreeMap::new(),
            flag_postings: true,
            event_collision: EventCollision::default(),
        }
    }
}

/// A configured event split into its parts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EventSpec {
    pub date: Date,
    pub kind: String,
    pub description: String,
}

impl BeancountConfig {
    /// Configured events in date order.
    pub fn event_specs(&self) -> Result<Vec<EventSpec>> {
        self.events
            .iter()
            .map(|(date, value)| {
                let date: Date = date
                    .parse()
                    .map_err(|e| ConversionError::Config(format!("invalid event date '{}': {}", date, e)))?;
                let (kind, description) = value.split_once(' ').ok_or_else(|| {
                    ConversionError::Config(format!(
                        "event '{}' must be written as '<type> <description>'",
                        value
                    ))
                })?;
                Ok(EventSpec {
                    date,
                    kind: kind.to_string(),
                    description: description.trim_start().to_string(),
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FavaConfig {
    #[serde(rename = "commodity-precision")]
    pub commodity_precision: Option<Scalar>,
}

/// A YAML scalar kept in its textual form.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl Config {
    /// Reads and validates the configuration file at `path`.
    pub fn from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConversionError::Config(format!("{}: {}", path.display(), e)))?;
        Config::from_yaml(&content)
    }

    /// Parses and validates a configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Config> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| ConversionError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Precision attached to every commodity, when the `fava` section asks for one.
    pub fn commodity_precision(&self) -> Option<String> {
        self.fava
            .as_ref()
            .and_then(|fava| fava.commodity_precision.as_ref())
            .map(Scalar::to_string)
    }

    fn validate(&self) -> Result<()> {
        let gnucash = &self.gnucash;

        check_currency(&gnucash.default_currency).map_err(ConversionError::Config)?;
        for (account, currency) in &gnucash.non_default_account_currencies {
            check_currency(currency)
                .map_err(|e| ConversionError::Config(format!("account '{}': {}", account, e)))?;
        }

        for (name, symbol) in [
            ("thousands_symbol", &gnucash.thousands_symbol),
            ("decimal_symbol", &gnucash.decimal_symbol),
            ("reconciled_symbol", &gnucash.reconciled_symbol),
            ("not_reconciled_symbol", &gnucash.not_reconciled_symbol),
        ] {
            if symbol.is_empty() {
                return Err(ConversionError::Config(format!("{} must not be empty", name)));
            }
        }
        if gnucash.thousands_symbol == gnucash.decimal_symbol {
            return Err(ConversionError::Config(format!(
                "thousands_symbol and decimal_symbol are both '{}'",
                gnucash.decimal_symbol
            )));
        }
        if gnucash.reconciled_symbol == gnucash.not_reconciled_symbol {
            return Err(ConversionError::Config(format!(
                "reconciled_symbol and not_reconciled_symbol are both '{}'",
                gnucash.reconciled_symbol
            )));
        }

        AccountRenamer::new(&gnucash.account_rename_patterns)?;

        self.beancount.event_specs()?;
        Ok(())
    }
}

/// Beancount commodity names: an upper-case letter, at most 24 characters, ending in a letter
/// or digit.
fn is_currency_code(s: &str) -> bool {
    let mut chars = s.chars();
    let starts_ok = chars.next().map_or(false, |c| c.is_ascii_uppercase());
    let ends_ok = s
        .chars()
        .last()
        .map_or(false, |c| c.is_ascii_uppercase() || c.is_ascii_digit());
    starts_ok
        && ends_ok
        && s.len() <= 24
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || "'._-".contains(c))
}

fn check_currency(currency: &str) -> std::result::Result<(), String> {
    if is_currency_code(currency) {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid currency code", currency))
    }
}
