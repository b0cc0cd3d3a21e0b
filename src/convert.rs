//! The conversion pipeline: read the book, build the ledger, write it, verify it.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use beancount_core::{Date, Directive, Ledger};
use beancount_render::render;
use chrono::Local;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::assemble::DirectiveAssembler;
use crate::book::{Book, GnucashBook};
use crate::config::Config;
use crate::currency::CurrencyResolver;
use crate::error::Result;
use crate::header::HeaderBuilder;
use crate::rename::AccountRenamer;
use crate::transactions::TransactionBuilder;
use crate::verify::{BeancountAuthority, LedgerAuthority, Verifier};

/// Converts the GnuCash book at `input` into the Beancount ledger at `output`.
#[derive(Debug, TypedBuilder)]
pub struct Converter {
    input: PathBuf,
    output: PathBuf,
    config: Config,

    /// Date of the conversion event.
    #[builder(default = Date::from(Local::now().date_naive()))]
    today: Date,
}

impl Converter {
    /// Runs every phase and verifies the written ledger.
    ///
    /// A ledger that fails to write or to verify is removed again.
    pub fn run(&self) -> Result<()> {
        self.run_with(&Verifier::new(BeancountAuthority))
    }

    fn run_with<A: LedgerAuthority>(&self, verifier: &Verifier<A>) -> Result<()> {
        let ledger = self.convert()?;
        let written = self
            .write(&ledger)
            .and_then(|()| verifier.verify(&self.output));
        if let Err(err) = written {
            self.discard_output();
            return Err(err);
        }
        info!("wrote {}", self.output.display());
        Ok(())
    }

    /// Builds every directive of the output ledger, header excluded, in output order.
    pub fn convert(&self) -> Result<Ledger<'static>> {
        let gnucash = &self.config.gnucash;
        let beancount = &self.config.beancount;

        info!("reading {}", self.input.display());
        let book: Book = GnucashBook::open(&self.input)?.read(&gnucash.number_format())?;

        let renamer = AccountRenamer::new(&gnucash.account_rename_patterns)?;
        let currencies = CurrencyResolver::from_config(gnucash).with_book_accounts(&book.accounts);
        let transactions =
            TransactionBuilder::from_config(gnucash, beancount.flag_postings, &renamer, &currencies)
                .build(&book)?;

        let assembler = DirectiveAssembler::new(
            book.path.to_string_lossy().into_owned(),
            self.config.commodity_precision(),
            gnucash.number_format(),
        );
        let commodities = assembler.commodities(&transactions, &book.prices);
        let opens = assembler.opens(&transactions);
        let prices = assembler.prices(&transactions, &book.prices);
        let events = assembler.events(
            &beancount.event_specs()?,
            self.today,
            beancount.event_collision,
        );

        let mut directives = Vec::with_capacity(
            commodities.len() + opens.len() + transactions.len() + prices.len() + events.len(),
        );
        directives.extend(commodities.into_iter().map(Directive::Commodity));
        directives.extend(opens.into_iter().map(Directive::Open));
        directives.extend(transactions.into_iter().map(Directive::Transaction));
        directives.extend(prices.into_iter().map(Directive::Price));
        directives.extend(events.into_iter().map(Directive::Event));
        debug!("{} directives to write", directives.len());

        Ok(Ledger::builder().directives(directives).build())
    }

    fn write(&self, ledger: &Ledger<'_>) -> Result<()> {
        info!("writing {}", self.output.display());
        let mut w = BufWriter::new(File::create(&self.output)?);
        HeaderBuilder::from_config(&self.config.beancount).write_to(&mut w)?;
        render(&mut w, ledger)?;
        w.flush()?;
        Ok(())
    }

    fn discard_output(&self) {
        match fs::remove_file(&self.output) {
            Ok(()) => info!("removed unverified {}", self.output.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {}: {}", self.output.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use tempfile::TempDir;

    #[test]
    fn missing_book_is_reported_before_writing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.beancount");
        let converter = Converter::builder()
            .input(dir.path().join("missing.gnucash"))
            .output(output.clone())
            .config(Config::default())
            .build();

        let err = converter.run().unwrap_err();
        assert!(matches!(err, ConversionError::Book(_)));
        assert!(err
            .to_string()
            .starts_with("File does not exist or wrong format exception"));
        assert!(!output.exists());
    }

    struct RejectingAuthority;

    impl LedgerAuthority for RejectingAuthority {
        type Ledger<'s> = ();

        fn parse<'s>(&self, _: &'s str, _: &'s str) -> std::result::Result<(), Vec<String>> {
            Ok(())
        }

        fn validate(&self, _: &()) -> Vec<String> {
            vec!["Transaction does not balance".to_string()]
        }
    }

    #[test]
    fn rejected_output_is_removed() {
        let dir = TempDir::new().unwrap();
        let book = dir.path().join("book.gnucash");
        rusqlite::Connection::open(&book)
            .unwrap()
            .execute_batch(
                "CREATE TABLE commodities (guid TEXT PRIMARY KEY, namespace TEXT, mnemonic TEXT);
                 CREATE TABLE accounts (guid TEXT PRIMARY KEY, name TEXT, account_type TEXT,
                                        commodity_guid TEXT, parent_guid TEXT);
                 CREATE TABLE transactions (guid TEXT PRIMARY KEY, currency_guid TEXT, num TEXT,
                                            post_date TEXT, enter_date TEXT, description TEXT);
                 CREATE TABLE splits (guid TEXT PRIMARY KEY, tx_guid TEXT, account_guid TEXT,
                                      memo TEXT, action TEXT, reconcile_state TEXT,
                                      reconcile_date TEXT, value_num INTEGER,
                                      value_denom INTEGER, quantity_num INTEGER,
                                      quantity_denom INTEGER, lot_guid TEXT);
                 CREATE TABLE prices (guid TEXT PRIMARY KEY, commodity_guid TEXT,
                                      currency_guid TEXT, date TEXT, source TEXT, type TEXT,
                                      value_num INTEGER, value_denom INTEGER);
                 INSERT INTO accounts VALUES ('root', 'Root Account', 'ROOT', NULL, NULL);",
            )
            .unwrap();
        let output = dir.path().join("out.beancount");
        let converter = Converter::builder()
            .input(book)
            .output(output.clone())
            .config(Config::default())
            .build();

        converter
            .run_with(&Verifier::new(BeancountAuthority))
            .unwrap();
        assert!(output.exists());

        match converter.run_with(&Verifier::new(RejectingAuthority)) {
            Err(ConversionError::Verification(problems)) => {
                assert_eq!(problems, vec!["Transaction does not balance".to_string()])
            }
            other => panic!("expected a verification error, got {:?}", other),
        }
        assert!(!output.exists());
    }
}
