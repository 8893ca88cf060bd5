use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, WalletId, cents};

pub type TransactionId = Uuid;

/// A transaction is the immutable record of a completed transfer between two wallets.
/// Once written it is never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Monotonically increasing sequence number for ordering
    pub sequence: i64,
    /// Source wallet (balance decreases)
    pub source_wallet_id: WalletId,
    /// Destination wallet (balance increases)
    pub destination_wallet_id: WalletId,
    /// Amount in cents (always positive)
    #[serde(with = "cents")]
    pub amount: Cents,
    /// When the transfer was recorded
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction. Sequence number must be assigned by the repository.
    pub fn new(source_wallet_id: WalletId, destination_wallet_id: WalletId, amount: Cents) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        assert_ne!(
            source_wallet_id, destination_wallet_id,
            "Transaction wallets must differ"
        );
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            source_wallet_id,
            destination_wallet_id,
            amount,
            created_at: super::now(),
        }
    }

    /// Returns true if the wallet is the source or the destination.
    pub fn involves(&self, wallet_id: WalletId) -> bool {
        self.source_wallet_id == wallet_id || self.destination_wallet_id == wallet_id
    }
}
