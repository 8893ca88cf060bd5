use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ValidationError, WalletId, cents, validation};

pub type CardId = Uuid;

/// Payment card bound to a wallet. The number is unique across the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub wallet_id: WalletId,
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    #[serde(with = "cents")]
    pub limit: Cents,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        wallet_id: WalletId,
        number: &str,
        expiry: &str,
        limit: Cents,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            wallet_id,
            number: validation::card_number(number)?,
            expiry: validation::expiry(expiry)?,
            limit,
            created_at: super::now(),
        })
    }

    pub fn summary(&self) -> CardSummary {
        CardSummary {
            id: self.id,
            number: self.number.clone(),
        }
    }
}

/// Partial update of a card; only the credit limit is mutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardUpdate {
    #[serde(default, with = "cents::option")]
    pub limit: Option<Cents>,
}

impl CardUpdate {
    pub fn with_limit(mut self, limit: Cents) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSummary {
    pub id: CardId,
    pub number: String,
}
