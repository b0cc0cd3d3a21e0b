//! Reader for GnuCash books saved in the SQLite backend.
//!
//! Only the tables needed for a conversion are read: `accounts`, `commodities`,
//! `transactions`, `splits` and `prices`.  Amounts are stored by GnuCash as `num / denom`
//! rationals; they are handed on in the book's display notation (see [`NumberFormat`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use beancount_core::Date;
use chrono::NaiveDate;
use indexmap::IndexMap;
use rusqlite::{Connection, OpenFlags};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::NumberFormat;
use crate::error::{ConversionError, Result};

const REQUIRED_TABLES: [&str; 5] = ["accounts", "commodities", "prices", "splits", "transactions"];
const TEMPLATE_ROOT: &str = "Template Root";

/// Snapshot of a GnuCash book.
#[derive(Clone, Debug, PartialEq)]
pub struct Book {
    pub path: PathBuf,
    pub accounts: Vec<BookAccount>,
    pub transactions: Vec<BookTransaction>,
    pub prices: Vec<BookPrice>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BookAccount {
    /// Colon-separated path below the root account, e.g. `Assets:Current Assets:Wallet`.
    pub full_name: String,
    pub commodity: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BookTransaction {
    pub date: Date,
    pub currency: String,
    pub description: String,
    pub num: String,
    pub splits: Vec<BookSplit>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BookSplit {
    /// Full name of the account.
    pub account: String,
    /// Amount in the transaction currency.
    pub value: String,
    /// Amount in the account commodity.
    pub quantity: String,
    /// Reconciliation state: `n`, `c`, `y`, `f` or `v`.
    pub reconcile: char,
    pub memo: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BookPrice {
    pub date: Date,
    pub commodity: String,
    pub currency: String,
    pub value: String,
}

struct AccountRow {
    name: String,
    account_type: String,
    parent: Option<String>,
    commodity: Option<String>,
}

/// An open GnuCash SQLite file.
pub struct GnucashBook {
    conn: Connection,
    path: PathBuf,
}

fn wrong_format(path: &Path, err: impl std::fmt::Display) -> ConversionError {
    ConversionError::Book(format!("{}: {}", path.display(), err))
}

impl From<rusqlite::Error> for ConversionError {
    fn from(err: rusqlite::Error) -> Self {
        ConversionError::Book(err.to_string())
    }
}

impl GnucashBook {
    /// Opens `path` read-only and checks that it holds a GnuCash schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| wrong_format(path, e))?;

        let found: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('accounts', 'commodities', 'prices', 'splits', 'transactions')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| wrong_format(path, e))?;
        if found != REQUIRED_TABLES.len() as i64 {
            return Err(wrong_format(
                path,
                format!("missing GnuCash tables, expected {}", REQUIRED_TABLES.join(", ")),
            ));
        }

        Ok(GnucashBook {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Reads the whole book, closing the file afterwards.
    pub fn read(self, format: &NumberFormat) -> Result<Book> {
        let commodities = self.commodities()?;
        let rows = self.account_rows()?;
        let accounts = resolve_accounts(&rows, &commodities);
        let transactions = self.transactions(&accounts, &commodities, format)?;
        let prices = self.prices(&commodities, format)?;

        info!(
            accounts = accounts.len(),
            transactions = transactions.len(),
            prices = prices.len(),
            "read GnuCash book {}",
            self.path.display()
        );

        Ok(Book {
            path: self.path.clone(),
            accounts: accounts.into_values().collect(),
            transactions,
            prices,
        })
    }

    fn commodities(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT guid, mnemonic FROM commodities")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn account_rows(&self) -> Result<Vec<(String, AccountRow)>> {
        let mut stmt = self.conn.prepare(
            "SELECT guid, name, account_type, parent_guid, commodity_guid FROM accounts ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get(0)?,
                AccountRow {
                    name: row.get(1)?,
                    account_type: row.get(2)?,
                    parent: row.get(3)?,
                    commodity: row.get(4)?,
                },
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn transactions(
        &self,
        accounts: &IndexMap<String, BookAccount>,
        commodities: &HashMap<String, String>,
        format: &NumberFormat,
    ) -> Result<Vec<BookTransaction>> {
        let mut split_stmt = self.conn.prepare(
            "SELECT tx_guid, account_guid, memo, reconcile_state, \
                    value_num, value_denom, quantity_num, quantity_denom \
             FROM splits ORDER BY rowid",
        )?;
        let split_rows = split_stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                (row.get::<_, i64>(4)?, row.get::<_, i64>(5)?),
                (row.get::<_, i64>(6)?, row.get::<_, i64>(7)?),
            ))
        })?;

        let mut splits: HashMap<String, Vec<Option<BookSplit>>> = HashMap::new();
        for row in split_rows {
            let (tx_guid, account_guid, memo, reconcile, value, quantity) = row?;
            let split = match accounts.get(&account_guid) {
                Some(account) => {
                    Some(BookSplit {
                        account: account.full_name.clone(),
                        value: format.format(rational(value.0, value.1)?),
                        quantity: format.format(rational(quantity.0, quantity.1)?),
                        reconcile: reconcile.and_then(|r| r.chars().next()).unwrap_or('n'),
                        memo: memo.unwrap_or_default(),
                    })
                }
                // Scheduled transaction templates post to accounts below the template root.
                None => None,
            };
            splits.entry(tx_guid).or_default().push(split);
        }

        let mut stmt = self.conn.prepare(
            "SELECT guid, currency_guid, num, post_date, description FROM transactions ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut transactions = Vec::new();
        for row in rows {
            let (guid, currency_guid, num, post_date, description) = row?;
            let txn_splits = splits.remove(&guid).unwrap_or_default();
            if txn_splits.iter().any(Option::is_none) {
                debug!(guid = %guid, "skipping scheduled transaction template");
                continue;
            }
            let date = post_date
                .as_deref()
                .ok_or_else(|| {
                    ConversionError::Book(format!("transaction {} has no post date", guid))
                })
                .and_then(parse_post_date)?;
            let currency = commodities.get(&currency_guid).cloned().ok_or_else(|| {
                ConversionError::Book(format!(
                    "transaction {} refers to unknown currency {}",
                    guid, currency_guid
                ))
            })?;
            transactions.push(BookTransaction {
                date,
                currency,
                description: description.unwrap_or_default(),
                num: num.unwrap_or_default(),
                splits: txn_splits.into_iter().flatten().collect(),
            });
        }
        Ok(transactions)
    }

    fn prices(
        &self,
        commodities: &HashMap<String, String>,
        format: &NumberFormat,
    ) -> Result<Vec<BookPrice>> {
        let mut stmt = self.conn.prepare(
            "SELECT commodity_guid, currency_guid, date, value_num, value_denom FROM prices ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut prices = Vec::new();
        for row in rows {
            let (commodity_guid, currency_guid, date, num, denom) = row?;
            let (commodity, currency) =
                match (commodities.get(&commodity_guid), commodities.get(&currency_guid)) {
                    (Some(commodity), Some(currency)) => (commodity.clone(), currency.clone()),
                    _ => {
                        return Err(ConversionError::Book(format!(
                            "price on {} refers to an unknown commodity",
                            date
                        )))
                    }
                };
            prices.push(BookPrice {
                date: parse_post_date(&date)?,
                commodity,
                currency,
                value: format.format(rational(num, denom)?),
            });
        }
        Ok(prices)
    }
}

/// Builds the full names of all accounts below the book root, keyed by account guid.
fn resolve_accounts(
    rows: &[(String, AccountRow)],
    commodities: &HashMap<String, String>,
) -> IndexMap<String, BookAccount> {
    let by_guid: HashMap<&str, &AccountRow> =
        rows.iter().map(|(guid, row)| (guid.as_str(), row)).collect();

    let mut accounts = IndexMap::new();
    for (guid, row) in rows {
        if row.account_type == "ROOT" {
            continue;
        }
        let mut names = vec![row.name.as_str()];
        let mut parent = row.parent.as_deref();
        let mut template = false;
        // Bounded by the number of accounts so that a corrupt parent chain cannot loop.
        for _ in 0..rows.len() {
            let Some(p) = parent.and_then(|guid| by_guid.get(guid)) else {
                break;
            };
            if p.account_type == "ROOT" {
                template = p.name == TEMPLATE_ROOT;
                break;
            }
            names.push(p.name.as_str());
            parent = p.parent.as_deref();
        }
        if template {
            continue;
        }
        names.reverse();
        accounts.insert(
            guid.clone(),
            BookAccount {
                full_name: names.join(":"),
                commodity: row
                    .commodity
                    .as_ref()
                    .and_then(|guid| commodities.get(guid))
                    .cloned(),
            },
        );
    }
    accounts
}

/// GnuCash stores `num / denom` rationals; denominators are usually powers of ten.
fn rational(num: i64, denom: i64) -> Result<Decimal> {
    if denom == 0 {
        return Err(ConversionError::Book(format!("amount {}/0 has a zero denominator", num)));
    }
    let mut scale = 0u32;
    let mut rest = denom;
    while rest % 10 == 0 {
        rest /= 10;
        scale += 1;
    }
    let exact = if rest == 1 {
        Decimal::try_from_i128_with_scale(num as i128, scale).ok()
    } else {
        Decimal::from(num).checked_div(Decimal::from(denom))
    };
    exact.ok_or_else(|| ConversionError::Book(format!("amount {}/{} is out of range", num, denom)))
}

/// Parses `post_date` as written by GnuCash 3+ (`2024-05-01 10:59:00`) or by older versions
/// (`20240501105900`).
fn parse_post_date(s: &str) -> Result<Date> {
    let parsed = match (s.get(..10), s.get(..8)) {
        (Some(day), _) if day.as_bytes()[4] == b'-' => NaiveDate::parse_from_str(day, "%Y-%m-%d"),
        (_, Some(day)) => NaiveDate::parse_from_str(day, "%Y%m%d"),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d"),
    };
    parsed
        .map(Date::from)
        .map_err(|e| ConversionError::Book(format!("invalid date '{}': {}", s, e)))
}
