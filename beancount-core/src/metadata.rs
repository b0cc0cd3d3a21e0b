use std::borrow::Cow;

use indexmap::IndexMap;
use rust_decimal::Decimal;

/// Metadata that can be attached to other Beancount information.
///
/// Insertion order is kept so that rendering is deterministic.
pub type Meta<'a> = IndexMap<Cow<'a, str>, MetaValue<'a>>;

/// An enum of the valid values in a metadata map.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum MetaValue<'a> {
    Text(Cow<'a, str>),
    Account(super::account::Account<'a>),
    Date(super::Date),
    Currency(super::Currency<'a>),
    Tag(Tag<'a>),
    Bool(bool),
    Amount(super::amount::Amount<'a>),
    Number(Decimal),
}

/// Line number recorded for directives that were not read from a text file.
pub const UNMAPPED_LINENO: i64 = -1;

/// Where a directive came from.
///
/// Beancount attaches `filename` and `lineno` to every entry.  Directives produced from a
/// non-textual source keep the source path as filename and [`UNMAPPED_LINENO`] as line number.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Location<'a> {
    pub filename: Cow<'a, str>,
    pub lineno: i64,
}

impl<'a> Location<'a> {
    pub fn new<F: Into<Cow<'a, str>>>(filename: F, lineno: i64) -> Self {
        Location {
            filename: filename.into(),
            lineno,
        }
    }

    pub fn unmapped<F: Into<Cow<'a, str>>>(filename: F) -> Self {
        Location::new(filename, UNMAPPED_LINENO)
    }

    pub fn is_unmapped(&self) -> bool {
        self.lineno == UNMAPPED_LINENO
    }
}

/// Tag associated with a transaction directive.  Tags allow you to mark a subset of transactions,
/// enabling filtering on a tag(s) when generating a report.
///
/// In the below transaction, #berlin-trip-2014 is the tag:
///
/// ```text
///
/// 2014-04-23 * "Flight to Berlin" #berlin-trip-2014
///     Expenses:Flights              -1230.27 USD
///     Liabilities:CreditCard
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.oivvp5olom2v>
pub type Tag<'a> = Cow<'a, str>;

/// Links provide a way to link transactions together.  You may think of the link as a special kind
/// of tag that can be used to group together a set of financially related transactions over time.
///
/// ```text
/// 2014-02-05 * "Invoice for January" ^invoice-pepe-studios-jan14
///     Income:Clients:PepeStudios           -8450.00 USD
///     Assets:AccountsReceivable
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.k4v5vkjukel7>
pub type Link<'a> = Cow<'a, str>;
