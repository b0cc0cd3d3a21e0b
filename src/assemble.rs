//! Derives the open, commodity, price and event directives that surround the transactions.

use std::borrow::Cow;

use beancount_core::{
    Account, Amount, Commodity, Date, Event, Location, Meta, MetaValue, Open, Price, PriceSpec,
    Transaction,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::book::BookPrice;
use crate::config::{EventCollision, EventSpec, NumberFormat};

pub const CONVERSION_EVENT_TYPE: &str = "misc";
pub const CONVERSION_EVENT_DESCRIPTION: &str = "Changed from GnuCash to Beancount";

/// Builds the non-transaction directives of the output ledger.
///
/// Every kind is returned in ascending date order; directives on the same date keep the order in
/// which they were first encountered.
#[derive(Clone, Debug)]
pub struct DirectiveAssembler {
    source: String,
    precision: Option<String>,
    format: NumberFormat,
}

impl DirectiveAssembler {
    pub fn new(source: impl Into<String>, precision: Option<String>, format: NumberFormat) -> Self {
        DirectiveAssembler {
            source: source.into(),
            precision,
            format,
        }
    }

    fn location(&self) -> Option<Location<'static>> {
        Some(Location::unmapped(self.source.clone()))
    }

    /// One open per account used by a posting, dated at its first transaction.
    pub fn opens(&self, transactions: &[Transaction<'static>]) -> Vec<Open<'static>> {
        let mut first_use: IndexMap<Account<'static>, (Date, Cow<'static, str>)> = IndexMap::new();
        for txn in transactions {
            for posting in &txn.postings {
                let currency = posting.units.currency.clone().unwrap_or_default();
                first_use
                    .entry(posting.account.clone())
                    .and_modify(|(date, _)| *date = (*date).min(txn.date))
                    .or_insert((txn.date, currency));
            }
        }

        let mut opens: Vec<Open<'static>> = first_use
            .into_iter()
            .map(|(account, (date, currency))| {
                Open::builder()
                    .date(date)
                    .account(account)
                    .currencies(vec![currency])
                    .location(self.location())
                    .build()
            })
            .collect();
        opens.sort_by_key(|open| open.date);
        debug!("assembled {} open directives", opens.len());
        opens
    }

    /// One commodity per currency seen in posting units, posting prices or the price database.
    pub fn commodities(
        &self,
        transactions: &[Transaction<'static>],
        book_prices: &[BookPrice],
    ) -> Vec<Commodity<'static>> {
        let mut first_seen: IndexMap<String, Date> = IndexMap::new();
        let mut see = |currency: &str, date: Date| {
            first_seen
                .entry(currency.to_string())
                .and_modify(|seen| *seen = (*seen).min(date))
                .or_insert(date);
        };

        for txn in transactions {
            for posting in &txn.postings {
                if let Some(currency) = &posting.units.currency {
                    see(currency, txn.date);
                }
                if let Some(currency) = posting.price.as_ref().and_then(price_currency) {
                    see(currency, txn.date);
                }
            }
        }
        for price in book_prices {
            see(&price.commodity, price.date);
            see(&price.currency, price.date);
        }

        let mut commodities: Vec<Commodity<'static>> = first_seen
            .into_iter()
            .map(|(name, date)| {
                let mut meta = Meta::new();
                if let Some(precision) = &self.precision {
                    meta.insert(
                        "precision".into(),
                        MetaValue::Text(precision.clone().into()),
                    );
                }
                Commodity::builder()
                    .date(date)
                    .name(name.into())
                    .meta(meta)
                    .location(self.location())
                    .build()
            })
            .collect();
        commodities.sort_by_key(|commodity| commodity.date);
        debug!("assembled {} commodity directives", commodities.len());
        commodities
    }

    /// Exchange rates observed on priced postings, followed by the book's own price database.
    pub fn prices(
        &self,
        transactions: &[Transaction<'static>],
        book_prices: &[BookPrice],
    ) -> Vec<Price<'static>> {
        let mut prices = Vec::new();
        for txn in transactions {
            for posting in &txn.postings {
                let rate = match &posting.price {
                    Some(PriceSpec::PerUnit(rate)) => rate,
                    _ => continue,
                };
                let (num, base, quote) = match (&rate.num, &rate.currency, &posting.units.currency)
                {
                    (Some(num), Some(base), Some(quote)) => (*num, base, quote),
                    _ => continue,
                };
                prices.push(
                    Price::builder()
                        .date(txn.date)
                        .currency(base.clone())
                        .amount(Amount::builder().num(num).currency(quote.clone()).build())
                        .location(self.location())
                        .build(),
                );
            }
        }

        for price in book_prices {
            let num = match self.format.parse(&price.value) {
                Some(num) => num,
                None => {
                    warn!(
                        commodity = %price.commodity,
                        date = %price.date,
                        "skipping book price with unreadable value '{}'",
                        price.value
                    );
                    continue;
                }
            };
            prices.push(
                Price::builder()
                    .date(price.date)
                    .currency(price.commodity.clone().into())
                    .amount(
                        Amount::builder()
                            .num(num)
                            .currency(price.currency.clone().into())
                            .build(),
                    )
                    .location(self.location())
                    .build(),
            );
        }

        prices.sort_by_key(|price| price.date);
        debug!("assembled {} price directives", prices.len());
        prices
    }

    /// Configured events plus the conversion event dated `today`.
    pub fn events(
        &self,
        configured: &[EventSpec],
        today: Date,
        collision: EventCollision,
    ) -> Vec<Event<'static>> {
        let mut events = Vec::with_capacity(configured.len() + 1);
        for spec in configured {
            if spec.date == today {
                warn!(
                    date = %today,
                    "configured event '{} {}' falls on the conversion date",
                    spec.kind,
                    spec.description
                );
                if collision == EventCollision::Replace {
                    continue;
                }
            }
            events.push(self.event(spec.date, &spec.kind, &spec.description));
        }
        events.push(self.event(today, CONVERSION_EVENT_TYPE, CONVERSION_EVENT_DESCRIPTION));

        events.sort_by_key(|event| event.date);
        debug!("assembled {} event directives", events.len());
        events
    }

    fn event(&self, date: Date, kind: &str, description: &str) -> Event<'static> {
        Event::builder()
            .date(date)
            .name(kind.to_string().into())
            .description(description.to_string().into())
            .location(self.location())
            .build()
    }
}

fn price_currency<'p>(price: &'p PriceSpec<'_>) -> Option<&'p str> {
    match price {
        PriceSpec::PerUnit(amount) | PriceSpec::Total(amount) => amount.currency.as_deref(),
    }
}
