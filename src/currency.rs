use std::collections::HashMap;

use crate::book::BookAccount;
use crate::config::GnucashConfig;

/// Looks up the currency an account is kept in.
///
/// A configured override wins, then the commodity the book records for the account, then the
/// default currency.
#[derive(Clone, Debug, Default)]
pub struct CurrencyResolver {
    default: String,
    overrides: HashMap<String, String>,
    book: HashMap<String, String>,
}

impl CurrencyResolver {
    pub fn new(default: impl Into<String>, overrides: HashMap<String, String>) -> Self {
        CurrencyResolver {
            default: default.into(),
            overrides,
            book: HashMap::new(),
        }
    }

    /// Adds the account commodities recorded in the book.
    pub fn with_book_accounts(mut self, accounts: &[BookAccount]) -> Self {
        self.book.extend(accounts.iter().filter_map(|account| {
            account
                .commodity
                .as_ref()
                .map(|commodity| (account.full_name.clone(), commodity.clone()))
        }));
        self
    }

    pub fn from_config(config: &GnucashConfig) -> Self {
        CurrencyResolver::new(
            config.default_currency.clone(),
            config.non_default_account_currencies.clone(),
        )
    }

    /// Currency of the account with GnuCash name `account` (before renaming).
    pub fn resolve(&self, account: &str) -> &str {
        self.overrides
            .get(account)
            .or_else(|| self.book.get(account))
            .map(String::as_str)
            .unwrap_or(&self.default)
    }

    pub fn default_currency(&self) -> &str {
        &self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_default() {
        let mut overrides = HashMap::new();
        overrides.insert("Assets:Current Assets:Wallet NZD".to_string(), "NZD".to_string());
        let resolver = CurrencyResolver::new("EUR", overrides);

        assert_eq!(resolver.resolve("Assets:Current Assets:Wallet NZD"), "NZD");
        assert_eq!(resolver.resolve("Assets:Current Assets:Checking Account"), "EUR");
        // Lookup uses the name before renaming.
        assert_eq!(resolver.resolve("Assets:Current-Assets:Wallet-NZD"), "EUR");
        assert_eq!(resolver.default_currency(), "EUR");
    }

    #[test]
    fn book_commodity_comes_before_default() {
        let mut overrides = HashMap::new();
        overrides.insert("Assets:Broker".to_string(), "USD".to_string());
        let accounts = vec![
            BookAccount {
                full_name: "Assets:Current Assets:Wallet NZD".to_string(),
                commodity: Some("NZD".to_string()),
            },
            BookAccount {
                full_name: "Assets:Broker".to_string(),
                commodity: Some("CHF".to_string()),
            },
            BookAccount {
                full_name: "Assets:Unknown".to_string(),
                commodity: None,
            },
        ];
        let resolver = CurrencyResolver::new("EUR", overrides).with_book_accounts(&accounts);

        assert_eq!(resolver.resolve("Assets:Current Assets:Wallet NZD"), "NZD");
        assert_eq!(resolver.resolve("Assets:Broker"), "USD");
        assert_eq!(resolver.resolve("Assets:Unknown"), "EUR");
        assert_eq!(resolver.resolve("Assets:Missing"), "EUR");
    }

    #[test]
    fn built_from_config() {
        let resolver = CurrencyResolver::from_config(&GnucashConfig::default());
        assert_eq!(resolver.resolve("Assets:Cash"), "EUR");
    }
}
