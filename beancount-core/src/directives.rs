use std::borrow::Cow;
use std::convert::TryFrom;

use indexmap::IndexSet;
use typed_builder::TypedBuilder;

use super::account::Account;
use super::account_types::AccountType;
use super::amount::Amount;
use super::date::Date;
use super::flags::Flag;
use super::metadata::{Link, Location, Meta, Tag};
use super::posting::Posting;
use super::Currency;

/// A single Beancount directive.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive<'a> {
    Open(Open<'a>),
    Commodity(Commodity<'a>),
    Event(Event<'a>),
    Option(BcOption<'a>),
    Plugin(Plugin<'a>),
    Price(Price<'a>),
    Transaction(Transaction<'a>),
}

impl<'a> Directive<'a> {
    /// Date of a dated directive; `option` and `plugin` are undated.
    pub fn date(&self) -> Option<Date> {
        match self {
            Directive::Open(d) => Some(d.date),
            Directive::Commodity(d) => Some(d.date),
            Directive::Event(d) => Some(d.date),
            Directive::Price(d) => Some(d.date),
            Directive::Transaction(d) => Some(d.date),
            Directive::Option(_) | Directive::Plugin(_) => None,
        }
    }

    pub fn location(&self) -> Option<&Location<'a>> {
        match self {
            Directive::Open(d) => d.location.as_ref(),
            Directive::Commodity(d) => d.location.as_ref(),
            Directive::Event(d) => d.location.as_ref(),
            Directive::Option(d) => d.location.as_ref(),
            Directive::Plugin(d) => d.location.as_ref(),
            Directive::Price(d) => d.location.as_ref(),
            Directive::Transaction(d) => d.location.as_ref(),
        }
    }
}

/// Booking method of an account.
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.l4bwy7q6lxp3>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Booking {
    Strict,
    None,
    Average,
    Fifo,
    Lifo,
}

impl TryFrom<&str> for Booking {
    type Error = ();

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val.to_ascii_uppercase().as_str() {
            "STRICT" => Ok(Booking::Strict),
            "NONE" => Ok(Booking::None),
            "AVERAGE" => Ok(Booking::Average),
            "FIFO" => Ok(Booking::Fifo),
            "LIFO" => Ok(Booking::Lifo),
            _ => Err(()),
        }
    }
}

/// Represents an `open` directive, which opens an account at a given date.
///
/// ```text
/// YYYY-MM-DD open Account [ConstraintCurrency,...] ["BookingMethod"]
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.omdbdpj7s5pk>
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Open<'a> {
    /// Date the account was opened.
    pub date: Date,

    /// Account being opened.
    pub account: Account<'a>,

    /// Commodities allowed for the opened account.  An empty list means no restrictions.
    #[builder(default)]
    pub currencies: Vec<Currency<'a>>,

    /// Booking method.  `None` inherits the file default.
    #[builder(default)]
    pub booking: Option<Booking>,

    #[builder(default)]
    pub meta: Meta<'a>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}

/// Represents a `commodity` directive.  This directive allows you to declare commodities,
/// although doing so is not required in order to use a commodity.
///
/// ```text
/// 1867-01-01 commodity CAD
///     name: "Canadian Dollar"
///     asset-class: "cash"
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.a3si01ejc035>
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Commodity<'a> {
    /// Date the commodity was declared.
    pub date: Date,

    /// Commodity name.
    pub name: Currency<'a>,

    #[builder(default)]
    pub meta: Meta<'a>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}

/// Represents an `event` directive, which tracks the value of a named variable over time.
///
/// ```text
/// 2014-07-09 event "location" "Paris, France"
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.tm5fxddlik5x>
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Event<'a> {
    pub date: Date,

    /// Type of the event, e.g. "location".
    pub name: Cow<'a, str>,

    /// Value of the event.
    pub description: Cow<'a, str>,

    #[builder(default)]
    pub meta: Meta<'a>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}

/// Represents a Beancount `option`, which are configuration points global to the file.
///
/// ```text
/// option "title" "Ed’s Personal Ledger"
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.e2iyrfrmstl>
#[derive(Clone, Debug, Eq, PartialEq, TypedBuilder)]
pub struct BcOption<'a> {
    /// Name of the option.
    pub name: Cow<'a, str>,

    /// Value of the option.
    pub val: Cow<'a, str>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}

impl BcOption<'_> {
    /// The account type whose root name this option changes, if any.
    pub fn root_name_change(&self) -> Option<AccountType> {
        match &*self.name {
            "name_assets" => Some(AccountType::Assets),
            "name_liabilities" => Some(AccountType::Liabilities),
            "name_equity" => Some(AccountType::Equity),
            "name_income" => Some(AccountType::Income),
            "name_expenses" => Some(AccountType::Expenses),
            _ => None,
        }
    }
}

/// Represents a `plugin` directive, naming a Python module run over the parsed entries.
///
/// ```text
/// plugin "beancount.plugins.module_name" "configuration data"
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.lxgfhlltuyoe>
#[derive(Clone, Debug, Eq, PartialEq, TypedBuilder)]
pub struct Plugin<'a> {
    /// Full module name of the plugin.
    pub module: Cow<'a, str>,

    /// Configuration string passed to the plugin.
    #[builder(default)]
    pub config: Option<Cow<'a, str>>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}

/// Represents a `price` directive, which fills the historical price database.
///
/// ```text
/// 2014-07-09 price HOOL  579.18 USD
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.f78ym1dxtemh>
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Price<'a> {
    pub date: Date,

    /// The commodity being priced.
    pub currency: Currency<'a>,

    /// Value of one unit of `currency`.
    pub amount: Amount<'a>,

    #[builder(default)]
    pub meta: Meta<'a>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}

/// Represents a transaction.
///
/// ```text
/// 2014-05-05 * "Cafe Mogador" "Lamb tagine with wine"
///   Liabilities:CreditCard:CapitalOne         -37.45 USD
///   Expenses:Restaurant
/// ```
///
/// <https://docs.google.com/document/d/1wAMVrKIA2qtRGmoVDSUBJGmYZSygUaR0uOMW1GV3YE0/edit#heading=h.up4dj751q84w>
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Transaction<'a> {
    pub date: Date,

    #[builder(default)]
    pub flag: Flag<'a>,

    /// Payee of the transaction.  Rendered only when present and non-empty.
    #[builder(default)]
    pub payee: Option<Cow<'a, str>>,

    pub narration: Cow<'a, str>,

    #[builder(default)]
    pub tags: IndexSet<Tag<'a>>,

    #[builder(default)]
    pub links: IndexSet<Link<'a>>,

    pub postings: Vec<Posting<'a>>,

    #[builder(default)]
    pub meta: Meta<'a>,

    #[builder(default)]
    pub location: Option<Location<'a>>,
}
