//! Monetary amounts stored as integer cents.

use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, ValueObject};

/// A monetary amount in integer cents.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl ValueObject for Cents {}

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn new(cents: i64) -> Self {
        Self(cents)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse a user-entered amount.
    ///
    /// Currency decorations (`$`, `,`, `.`) are stripped and the remaining
    /// digits are read as cents, so `"$5,432.10"` becomes `543210`.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let stripped: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | '.'))
            .collect();

        if stripped.is_empty() {
            return Err(DomainError::validation(format!(
                "value_in_cents is not a number: {input:?}"
            )));
        }

        stripped
            .parse::<i64>()
            .map(Self)
            .map_err(|_| DomainError::validation(format!("value_in_cents is not a number: {input:?}")))
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for Cents {
    /// Dollar rendering, e.g. `$5432.10`.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_currency_formatted_strings() {
        assert_eq!(Cents::parse("$5,432.10").unwrap(), Cents::new(543_210));
        assert_eq!(Cents::parse("1001").unwrap(), Cents::new(1001));
        assert_eq!(Cents::parse("  $0.99 ").unwrap(), Cents::new(99));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(matches!(Cents::parse("abc"), Err(DomainError::Validation(_))));
        assert!(matches!(Cents::parse("$"), Err(DomainError::Validation(_))));
        assert!(matches!(Cents::parse(""), Err(DomainError::Validation(_))));
    }

    #[test]
    fn display_renders_dollars() {
        assert_eq!(Cents::new(543_210).to_string(), "$5432.10");
        assert_eq!(Cents::new(5).to_string(), "$0.05");
        assert_eq!(Cents::new(-150).to_string(), "-$1.50");
    }

    fn with_thousands(dollars: u64) -> String {
        let digits = dollars.to_string();
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    proptest! {
        #[test]
        fn formatted_dollars_parse_to_cents(dollars in 0u64..10_000_000, cents in 0u64..100) {
            let input = format!("${}.{:02}", with_thousands(dollars), cents);
            let parsed = Cents::parse(&input).unwrap();
            prop_assert_eq!(parsed.get(), (dollars * 100 + cents) as i64);
        }
    }
}
