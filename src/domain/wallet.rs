use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Represents an exact monetary value held by a wallet.
///
/// This is a wrapper around `rust_decimal::Decimal` so balances never pass
/// through floating point. The scale of the value is preserved, which means
/// `1500.50 - 500.25` is `1000.25` and `100.00 - 40.00` is `60.00`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a strictly positive monetary amount for a purchase or credit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::InvalidAmount(format!(
                "amount must be positive, got {value}"
            )))
        }
    }

    /// Parses a decimal string such as `"500.25"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = Decimal::from_str(raw.trim())
            .map_err(|_| PaymentError::InvalidAmount(format!("'{raw}' is not a decimal")))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Decimal::from_str(raw.trim())
            .map(Self)
            .map_err(|_| PaymentError::InvalidAmount(format!("'{raw}' is not a decimal balance")))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletStatus {
    Active,
    Inactive,
    Frozen,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WalletStatus::Active => "ACTIVE",
            WalletStatus::Inactive => "INACTIVE",
            WalletStatus::Frozen => "FROZEN",
        };
        f.write_str(s)
    }
}

/// A customer or partner wallet.
///
/// Debits are only accepted while the wallet is `Active` and never take the
/// balance below zero.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub currency: String,
    pub balance: Balance,
    pub status: WalletStatus,
}

impl Wallet {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        currency: impl Into<String>,
        balance: Balance,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            currency: currency.into(),
            balance,
            status: WalletStatus::Active,
        }
    }

    pub fn with_status(mut self, status: WalletStatus) -> Self {
        self.status = status;
        self
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.status == WalletStatus::Active {
            Ok(())
        } else {
            Err(PaymentError::WalletInactive(self.id.clone()))
        }
    }

    pub fn ensure_funds(&self, amount: Amount) -> Result<()> {
        if self.balance >= amount.into() {
            Ok(())
        } else {
            Err(PaymentError::InsufficientBalance(self.id.clone()))
        }
    }

    /// Debits the wallet after re-checking status and sufficiency.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        self.ensure_active()?;
        self.ensure_funds(amount)?;
        self.balance -= amount.into();
        Ok(())
    }

    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
    }
}
