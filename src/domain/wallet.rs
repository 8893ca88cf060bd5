use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CardSummary, Cents, UserId, ValidationError, cents, validation};

pub type WalletId = Uuid;

/// Currency assigned to a wallet when the caller does not name one.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// A monetary account in a single currency, owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    /// ISO-like 3-letter code, uppercase
    pub currency: String,
    /// Current balance in cents. Transfers never debit it below zero.
    #[serde(with = "cents")]
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet with an explicit opening balance. The sign of the
    /// opening balance is not checked.
    pub fn new(
        user_id: UserId,
        currency: Option<&str>,
        balance: Cents,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            currency: validation::currency(currency.unwrap_or(DEFAULT_CURRENCY))?,
            balance,
            created_at: super::now(),
        })
    }

    pub fn can_cover(&self, amount: Cents) -> bool {
        self.balance >= amount
    }

    pub fn summary(&self) -> WalletSummary {
        WalletSummary {
            id: self.id,
            currency: self.currency.clone(),
            balance: self.balance,
        }
    }
}

/// Partial update of a wallet: an administrative balance overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WalletUpdate {
    #[serde(default, with = "cents::option")]
    pub balance: Option<Cents>,
}

impl WalletUpdate {
    pub fn with_balance(mut self, balance: Cents) -> Self {
        self.balance = Some(balance);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    pub id: WalletId,
    pub currency: String,
    #[serde(with = "cents")]
    pub balance: Cents,
}

/// A wallet together with summaries of its cards.
#[derive(Debug, Clone, Serialize)]
pub struct WalletDetails {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub cards: Vec<CardSummary>,
}
