use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

/// A calendar date of a directive.
///
/// Beancount accepts both `-` and `/` as separators; dates are always rendered with `-`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Date(NaiveDate);

impl Date {
    pub fn naive(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for Date {
    fn from(d: NaiveDate) -> Self {
        Date(d)
    }
}

impl FromStr for Date {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
            .map(Date)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[test]
fn test_date_from_chrono() {
    let date = Date::from(NaiveDate::from_ymd_opt(2020, 5, 5).unwrap());
    assert_eq!(date, "2020-05-05".parse().unwrap());
    assert_eq!(date, "2020/05/05".parse().unwrap());
    assert_eq!(date.to_string(), "2020-05-05");
}
