//! Turns GnuCash transactions into Beancount transactions.

use std::borrow::Cow;

use beancount_core::{
    Account, Amount, Flag, IncompleteAmount, Location, Meta, MetaValue, Posting, PriceSpec,
    Transaction,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::book::{Book, BookSplit, BookTransaction};
use crate::config::{GnucashConfig, NumberFormat};
use crate::currency::CurrencyResolver;
use crate::error::{ConversionError, Result};
use crate::rename::AccountRenamer;

/// How reconciliation states map to flags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlagPolicy {
    pub reconciled: String,
    pub not_reconciled: String,
    /// When false every transaction is `*` and no posting carries a flag.
    pub flag_postings: bool,
}

impl FlagPolicy {
    fn posting_flag(&self, marker: char) -> Option<Flag<'static>> {
        if !self.flag_postings {
            return None;
        }
        let mut buf = [0u8; 4];
        let marker: &str = marker.encode_utf8(&mut buf);
        if marker == self.reconciled {
            Some(Flag::Okay)
        } else if marker == self.not_reconciled {
            Some(Flag::Warning)
        } else {
            None
        }
    }

    fn transaction_flag(&self, splits: &[BookSplit]) -> Flag<'static> {
        let all_reconciled = splits
            .iter()
            .all(|s| s.reconcile.to_string() == self.reconciled);
        if !self.flag_postings || all_reconciled {
            Flag::Okay
        } else {
            Flag::Warning
        }
    }
}

pub struct TransactionBuilder<'c> {
    renamer: &'c AccountRenamer,
    currencies: &'c CurrencyResolver,
    format: NumberFormat,
    flags: FlagPolicy,
}

impl<'c> TransactionBuilder<'c> {
    pub fn new(
        renamer: &'c AccountRenamer,
        currencies: &'c CurrencyResolver,
        format: NumberFormat,
        flags: FlagPolicy,
    ) -> Self {
        TransactionBuilder {
            renamer,
            currencies,
            format,
            flags,
        }
    }

    pub fn from_config(
        config: &GnucashConfig,
        flag_postings: bool,
        renamer: &'c AccountRenamer,
        currencies: &'c CurrencyResolver,
    ) -> Self {
        TransactionBuilder::new(
            renamer,
            currencies,
            config.number_format(),
            FlagPolicy {
                reconciled: config.reconciled_symbol.clone(),
                not_reconciled: config.not_reconciled_symbol.clone(),
                flag_postings,
            },
        )
    }

    /// Builds one transaction per book transaction, ordered by date.  Transactions with the
    /// same date keep their book order.
    pub fn build(&self, book: &Book) -> Result<Vec<Transaction<'static>>> {
        let source = book.path.to_string_lossy().into_owned();
        let mut ordered: Vec<&BookTransaction> = book.transactions.iter().collect();
        ordered.sort_by_key(|txn| txn.date);

        let mut transactions = Vec::with_capacity(ordered.len());
        for txn in ordered {
            if txn.splits.len() < 2 {
                warn!(
                    date = %txn.date,
                    description = %txn.description,
                    "skipping transaction with {} split(s)",
                    txn.splits.len()
                );
                continue;
            }
            transactions.push(self.transaction(txn, &source)?);
        }
        debug!("built {} transactions", transactions.len());
        Ok(transactions)
    }

    fn transaction(&self, txn: &BookTransaction, source: &str) -> Result<Transaction<'static>> {
        let postings = txn
            .splits
            .iter()
            .map(|split| self.posting(split, &txn.currency))
            .collect::<Result<Vec<_>>>()?;

        let mut meta = Meta::new();
        if !txn.num.is_empty() {
            meta.insert("num".into(), MetaValue::Text(txn.num.clone().into()));
        }

        Ok(Transaction::builder()
            .date(txn.date)
            .flag(self.flags.transaction_flag(&txn.splits))
            .narration(txn.description.clone().into())
            .postings(postings)
            .meta(meta)
            .location(Some(Location::unmapped(source.to_string())))
            .build())
    }

    fn posting(&self, split: &BookSplit, txn_currency: &str) -> Result<Posting<'static>> {
        let account = Account::from_name(&self.renamer.rename(&split.account))
            .map(Account::into_owned)?;
        let currency = self.currencies.resolve(&split.account);

        let value = self.amount(&split.value)?;
        let (units, price) = if currency == txn_currency {
            (value, None)
        } else {
            let quantity = self.amount(&split.quantity)?;
            (quantity, exchange_rate(value, quantity))
        };

        let mut meta = Meta::new();
        if !split.memo.is_empty() {
            meta.insert("memo".into(), MetaValue::Text(split.memo.clone().into()));
        }

        Ok(Posting::builder()
            .account(account)
            .units(IncompleteAmount::from(
                Amount::builder()
                    .num(units)
                    .currency(Cow::Owned(currency.to_string()))
                    .build(),
            ))
            .price(price.map(|rate| {
                PriceSpec::PerUnit(
                    Amount::builder()
                        .num(rate)
                        .currency(Cow::Owned(txn_currency.to_string()))
                        .build()
                        .into(),
                )
            }))
            .flag(self.flags.posting_flag(split.reconcile))
            .meta(meta)
            .build())
    }

    fn amount(&self, text: &str) -> Result<Decimal> {
        self.format
            .parse(text)
            .ok_or_else(|| ConversionError::Amount(text.to_string()))
    }
}

/// Price of one unit of the account currency in the transaction currency.  A zero quantity has
/// no meaningful rate.
fn exchange_rate(value: Decimal, quantity: Decimal) -> Option<Decimal> {
    if quantity.is_zero() {
        return None;
    }
    value.checked_div(quantity).map(|rate| rate.abs())
}
