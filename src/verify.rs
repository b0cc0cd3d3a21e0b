//! Re-reads a written ledger and checks that Beancount would accept it.

use std::fs;
use std::path::Path;

use beancount_core::Ledger;
use beancount_parser::validation;
use tracing::{debug, info};

use crate::error::{ConversionError, Result};

/// A parser and validator for Beancount ledgers.
pub trait LedgerAuthority {
    type Ledger<'s>;

    /// Parses `source`, read from `filename`, or returns every syntax problem found.
    fn parse<'s>(
        &self,
        filename: &'s str,
        source: &'s str,
    ) -> std::result::Result<Self::Ledger<'s>, Vec<String>>;

    /// Semantic problems in an already parsed ledger; empty when it is valid.
    fn validate(&self, ledger: &Self::Ledger<'_>) -> Vec<String>;
}

/// Checks ledgers with the bundled `beancount-parser`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BeancountAuthority;

impl LedgerAuthority for BeancountAuthority {
    type Ledger<'s> = Ledger<'s>;

    fn parse<'s>(
        &self,
        filename: &'s str,
        source: &'s str,
    ) -> std::result::Result<Ledger<'s>, Vec<String>> {
        beancount_parser::parse_named(filename, source)
            .map_err(|e| vec![format!("{}: {}", filename, e)])
    }

    fn validate(&self, ledger: &Ledger<'_>) -> Vec<String> {
        validation::validate(ledger)
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Verifier<A> {
    authority: A,
}

impl<A: LedgerAuthority> Verifier<A> {
    pub fn new(authority: A) -> Self {
        Verifier { authority }
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Fails with every parse or validation problem of the ledger at `path`.
    pub fn verify(&self, path: &Path) -> Result<()> {
        info!("verifying {}", path.display());
        let source = fs::read_to_string(path)?;
        let filename = path.to_string_lossy();

        let ledger = self
            .authority
            .parse(&filename, &source)
            .map_err(ConversionError::Verification)?;
        let problems = self.authority.validate(&ledger);
        if !problems.is_empty() {
            return Err(ConversionError::Verification(problems));
        }
        debug!("{} verified without problems", path.display());
        Ok(())
    }
}
