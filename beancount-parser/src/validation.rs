//! Semantic checks run over a parsed ledger.
//!
//! Parsing only guarantees that the input is well-formed; these checks catch ledgers that parse
//! but that Beancount itself would reject: unopened accounts, currency constraint violations and
//! transactions that do not balance.

use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;

use beancount_core as bc;

/// Tolerance applied to a currency that has no unpriced posting to infer one from.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// A semantic problem found in a parsed ledger.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    pub filename: String,
    pub lineno: i64,
    pub message: String,
}

impl ValidationError {
    fn new(location: Option<&bc::Location<'_>>, message: String) -> Self {
        let (filename, lineno) = match location {
            Some(loc) => (loc.filename.to_string(), loc.lineno),
            None => (String::new(), bc::metadata::UNMAPPED_LINENO),
        };
        ValidationError {
            filename,
            lineno,
            message,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.filename, self.lineno, self.message)
    }
}

impl Error for ValidationError {}

/// Runs every check over `ledger`, returning the problems in directive order.
pub fn validate(ledger: &bc::Ledger<'_>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let opens = collect_opens(ledger, &mut errors);

    for directive in &ledger.directives {
        match directive {
            bc::Directive::Transaction(txn) => check_transaction(txn, &opens, &mut errors),
            bc::Directive::Price(price) => check_price(price, &mut errors),
            _ => {}
        }
    }
    errors
}

fn collect_opens<'l, 'a>(
    ledger: &'l bc::Ledger<'a>,
    errors: &mut Vec<ValidationError>,
) -> HashMap<&'l bc::Account<'a>, &'l bc::Open<'a>> {
    let mut opens = HashMap::new();
    for directive in &ledger.directives {
        if let bc::Directive::Open(open) = directive {
            if opens.contains_key(&open.account) {
                errors.push(ValidationError::new(
                    open.location.as_ref(),
                    format!("Duplicate open directive for {}", open.account),
                ));
            } else {
                opens.insert(&open.account, open);
            }
        }
    }
    opens
}

fn check_price(price: &bc::Price<'_>, errors: &mut Vec<ValidationError>) {
    if price.currency == price.amount.currency {
        errors.push(ValidationError::new(
            price.location.as_ref(),
            format!("Price of {} is quoted in itself", price.currency),
        ));
    }
}

fn check_transaction<'a>(
    txn: &bc::Transaction<'a>,
    opens: &HashMap<&bc::Account<'a>, &bc::Open<'a>>,
    errors: &mut Vec<ValidationError>,
) {
    let location = txn.location.as_ref();

    for posting in &txn.postings {
        match opens.get(&posting.account) {
            None => errors.push(ValidationError::new(
                location,
                format!("Invalid reference to unknown account '{}'", posting.account),
            )),
            Some(open) => {
                if txn.date < open.date {
                    errors.push(ValidationError::new(
                        location,
                        format!(
                            "Account '{}' used on {} before it was opened on {}",
                            posting.account, txn.date, open.date
                        ),
                    ));
                }
                if let Some(currency) = &posting.units.currency {
                    if !open.currencies.is_empty() && !open.currencies.contains(currency) {
                        errors.push(ValidationError::new(
                            location,
                            format!(
                                "Invalid currency {} for account '{}'",
                                currency, posting.account
                            ),
                        ));
                    }
                }
            }
        }
    }

    let elided = txn
        .postings
        .iter()
        .filter(|p| p.units.num.is_none())
        .count();
    match elided {
        0 => check_balance(txn, errors),
        1 => {}
        _ => errors.push(ValidationError::new(
            location,
            "Transaction has more than one posting with a missing amount".to_string(),
        )),
    }
}

/// Weight of a posting: the currency and amount it contributes to the transaction balance.
fn weight<'a>(posting: &bc::Posting<'a>) -> Result<(Cow<'a, str>, Decimal), String> {
    let num = posting
        .units
        .num
        .ok_or_else(|| format!("Posting to '{}' has no amount", posting.account))?;
    let currency = posting
        .units
        .currency
        .clone()
        .ok_or_else(|| format!("Posting to '{}' has no currency", posting.account))?;

    let (price, total) = match &posting.price {
        None => return Ok((currency, num)),
        Some(bc::PriceSpec::PerUnit(price)) => (price, false),
        Some(bc::PriceSpec::Total(price)) => (price, true),
    };
    let (price_num, price_currency) = match (price.num, &price.currency) {
        (Some(n), Some(c)) => (n, c.clone()),
        _ => {
            return Err(format!(
                "Incomplete price annotation on posting to '{}'",
                posting.account
            ))
        }
    };
    let weight = if total {
        if num.is_sign_negative() {
            -price_num
        } else {
            price_num
        }
    } else {
        num.checked_mul(price_num).ok_or_else(|| {
            format!(
                "Overflow weighing {} {} at {} {}",
                num, currency, price_num, price_currency
            )
        })?
    };
    Ok((price_currency, weight))
}

/// Half of the last digit of `num`, e.g. 0.005 for an amount written with two decimals.
fn tolerance_of(num: Decimal) -> Decimal {
    Decimal::try_new(5, num.scale() + 1).unwrap_or_else(|_| Decimal::new(5, 28))
}

fn check_balance(txn: &bc::Transaction<'_>, errors: &mut Vec<ValidationError>) {
    let location = txn.location.as_ref();
    let mut residuals: IndexMap<Cow<'_, str>, Decimal> = IndexMap::new();
    let mut tolerances: HashMap<Cow<'_, str>, Decimal> = HashMap::new();

    for posting in &txn.postings {
        let (currency, amount) = match weight(posting) {
            Ok(w) => w,
            Err(message) => {
                errors.push(ValidationError::new(location, message));
                return;
            }
        };
        if posting.price.is_none() {
            let tolerance = tolerances.entry(currency.clone()).or_insert(Decimal::ZERO);
            *tolerance = (*tolerance).max(tolerance_of(amount));
        }
        let residual = residuals.entry(currency).or_insert(Decimal::ZERO);
        match residual.checked_add(amount) {
            Some(sum) => *residual = sum,
            None => {
                errors.push(ValidationError::new(
                    location,
                    "Overflow while balancing transaction".to_string(),
                ));
                return;
            }
        }
    }

    for (currency, residual) in residuals {
        let tolerance = tolerances
            .get(&currency)
            .copied()
            .unwrap_or(DEFAULT_TOLERANCE);
        if residual.abs() > tolerance {
            errors.push(ValidationError::new(
                location,
                format!("Transaction does not balance: ({} {})", residual, currency),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_named;
    use indoc::indoc;

    fn messages(source: &str) -> Vec<String> {
        let ledger = parse_named("test.beancount", source).unwrap();
        validate(&ledger).into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn default_tolerance_is_half_a_cent() {
        assert_eq!(DEFAULT_TOLERANCE, Decimal::new(5, 3));
        assert_eq!(tolerance_of(Decimal::new(12000, 2)), Decimal::new(5, 3));
        assert_eq!(tolerance_of(Decimal::new(27950, 3)), Decimal::new(5, 4));
    }

    #[test]
    fn balanced_ledger_is_valid() {
        let source = indoc!(
            "
            2024-05-01 open Assets:Current:Checking EUR
            2024-05-01 open Equity:Opening-Balances EUR
            2024-05-01 open Assets:Current:NZD NZD

            2024-05-01 * \"Opening\"
              Assets:Current:Checking     10000.0 EUR
              Equity:Opening-Balances    -10000.0 EUR

            2024-05-09 ! \"MoneyTransfer\"
              Assets:Current:NZD                 50.0 NZD
              Assets:Current:Checking         -27.950 EUR @ 1.7889087656529516994633273703 NZD

            2024-05-09 price NZD 1.7889087656529516994633273703 EUR
            "
        );
        assert_eq!(messages(source), Vec::<String>::new());
    }

    #[test]
    fn single_elided_posting_is_not_balance_checked() {
        let source = indoc!(
            "
            2024-05-01 open Assets:Cash
            2024-05-01 open Expenses:Food

            2024-05-02 * \"Lunch\"
              Expenses:Food    12.50 EUR
              Assets:Cash
            "
        );
        assert!(messages(source).is_empty());
    }

    #[test]
    fn reports_unbalanced_transaction() {
        let source = indoc!(
            "
            2024-05-01 open Assets:Cash EUR
            2024-05-01 open Expenses:Food EUR

            2024-05-02 * \"Lunch\"
              Expenses:Food    12.50 EUR
              Assets:Cash     -12.40 EUR
            "
        );
        let ledger = parse_named("test.beancount", source).unwrap();
        let errors = validate(&ledger);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Transaction does not balance: (0.10 EUR)");
        assert_eq!(errors[0].filename, "test.beancount");
        assert_eq!(errors[0].lineno, 4);
        assert_eq!(
            errors[0].to_string(),
            "test.beancount:4: Transaction does not balance: (0.10 EUR)"
        );
    }

    #[test]
    fn total_price_takes_sign_of_units() {
        let source = indoc!(
            "
            2024-05-01 open Assets:EUR
            2024-05-01 open Assets:NZD

            2024-05-09 * \"Exchange\"
              Assets:EUR     -27.950 EUR @@ 50.0 NZD
              Assets:NZD        50.0 NZD
            "
        );
        assert!(messages(source).is_empty());
    }

    #[test]
    fn reports_account_problems() {
        let source = indoc!(
            "
            2024-05-01 open Assets:Cash EUR
            2024-05-01 open Assets:Cash EUR
            2024-05-03 open Expenses:Food EUR

            2024-05-02 * \"Lunch\"
              Expenses:Food     12.50 EUR
              Assets:Cash      -12.50 EUR

            2024-05-04 * \"Dinner\"
              Expenses:Unknown  10.00 USD
              Assets:Cash      -10.00 USD
            "
        );
        assert_eq!(
            messages(source),
            vec![
                "Duplicate open directive for Assets:Cash",
                "Account 'Expenses:Food' used on 2024-05-02 before it was opened on 2024-05-03",
                "Invalid reference to unknown account 'Expenses:Unknown'",
                "Invalid currency USD for account 'Assets:Cash'",
            ]
        );
    }

    #[test]
    fn reports_multiple_elided_postings() {
        let source = indoc!(
            "
            2024-05-01 open Assets:Cash
            2024-05-01 open Expenses:Food
            2024-05-01 open Expenses:Drinks

            2024-05-02 * \"Lunch\"
              Expenses:Food    12.50 EUR
              Expenses:Drinks
              Assets:Cash
            "
        );
        assert_eq!(
            messages(source),
            vec!["Transaction has more than one posting with a missing amount"]
        );
    }

    #[test]
    fn reports_price_in_itself() {
        assert_eq!(
            messages("2024-05-01 price EUR 1 EUR\n"),
            vec!["Price of EUR is quoted in itself"]
        );
    }
}
