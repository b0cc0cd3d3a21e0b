use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use typed_builder::TypedBuilder;

use super::account_types::AccountType;

/// Represents an account.
///
/// Beancount accumulates commodities in accounts.  An account name is a
/// colon-separated list of capitalized words which begin with a letter, and whose first word must
/// be one of the five acceptable account types.
///
/// Some example accounts:
///
/// ```text
/// Assets:US:BofA:Checking
/// Liabilities:CA:RBC:CreditCard
/// Equity:Retained-Earnings
/// Income:US:Acme:Salary
/// Expenses:Food:Groceries
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.17ry42rqbuiu>
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, TypedBuilder)]
pub struct Account<'a> {
    /// Type of the account.
    pub ty: AccountType,

    /// Optional parts of the account following the account type.
    pub parts: Vec<Cow<'a, str>>,
}

/// The account name does not start with one of the five root account names or has an empty
/// component.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidAccountName(pub String);

impl fmt::Display for InvalidAccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid account name", self.0)
    }
}

impl Error for InvalidAccountName {}

impl<'a> Account<'a> {
    /// Splits a colon-separated account name into its type and parts.
    ///
    /// Only the structure is checked here; the character rules of account components are left
    /// to the grammar.
    pub fn from_name(name: &'a str) -> Result<Self, InvalidAccountName> {
        let mut pieces = name.split(':');
        let ty = pieces
            .next()
            .and_then(AccountType::from_root)
            .ok_or_else(|| InvalidAccountName(name.to_string()))?;
        let parts: Vec<Cow<'a, str>> = pieces.map(Cow::Borrowed).collect();
        if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return Err(InvalidAccountName(name.to_string()));
        }
        Ok(Account { ty, parts })
    }

    pub fn into_owned(self) -> Account<'static> {
        Account {
            ty: self.ty,
            parts: self
                .parts
                .into_iter()
                .map(|p| Cow::Owned(p.into_owned()))
                .collect(),
        }
    }
}

impl fmt::Display for Account<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty.default_name())?;
        for part in &self.parts {
            write!(f, ":{}", part)?;
        }
        Ok(())
    }
}
