//! Value Objects for the storefront domain

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }
    pub fn mxn(amount: Decimal) -> Self {
        Self::new(amount, "MXN")
    }
    pub fn zero(currency: &str) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
    pub fn amount(&self) -> Decimal {
        self.amount
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("MXN")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone)]
pub enum MoneyError {
    CurrencyMismatch,
}
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency mismatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_add() {
        let a = Money::mxn(Decimal::new(100, 0));
        let b = Money::mxn(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
    }

    #[test]
    fn test_money_add_rejects_mixed_currencies() {
        let a = Money::mxn(Decimal::new(100, 0));
        let b = Money::new(Decimal::new(100, 0), "USD");
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn test_money_multiply() {
        let price = Money::mxn(Decimal::new(1950, 2)); // 19.50
        assert_eq!(price.multiply(3).amount(), Decimal::new(5850, 2));
    }
}
