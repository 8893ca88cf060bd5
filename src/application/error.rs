use thiserror::Error;

use crate::domain::{
    CardId, Cents, TransactionId, UserId, ValidationError, WalletId, format_cents,
};

/// Coarse classification of [`AppError`], used by the transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    CurrencyMismatch,
    InsufficientFunds,
    SelfTransfer,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::CurrencyMismatch => "currency_mismatch",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::SelfTransfer => "self_transfer",
            ErrorKind::Storage => "storage_failure",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Wallet(s) not found: {}", join_ids(.0))]
    WalletsNotFound(Vec<WalletId>),

    #[error("A user with this tax id already exists")]
    TaxIdTaken,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("A card with this number already exists")]
    CardNumberTaken,

    #[error("Wallet {0} is referenced by recorded transactions")]
    WalletHasTransactions(WalletId),

    #[error("User {0} owns wallets referenced by recorded transactions")]
    UserHasTransactions(UserId),

    #[error("Source and destination wallet must differ: {0}")]
    SelfTransfer(WalletId),

    #[error("Currency mismatch between wallets: {source_currency} vs {destination_currency}")]
    CurrencyMismatch {
        source_currency: String,
        destination_currency: String,
    },

    #[error(
        "Insufficient funds in wallet {wallet_id}: balance {}, required {}",
        money(.balance),
        money(.required)
    )]
    InsufficientFunds {
        wallet_id: WalletId,
        balance: Cents,
        required: Cents,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::InvalidAmount(_) | AppError::Malformed(_) => {
                ErrorKind::Validation
            }
            AppError::UserNotFound(_)
            | AppError::WalletNotFound(_)
            | AppError::CardNotFound(_)
            | AppError::TransactionNotFound(_)
            | AppError::WalletsNotFound(_) => ErrorKind::NotFound,
            AppError::TaxIdTaken
            | AppError::EmailTaken
            | AppError::CardNumberTaken
            | AppError::WalletHasTransactions(_)
            | AppError::UserHasTransactions(_) => ErrorKind::Conflict,
            AppError::SelfTransfer(_) => ErrorKind::SelfTransfer,
            AppError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            AppError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            AppError::Database(_) => ErrorKind::Storage,
        }
    }
}

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

fn join_ids(ids: &[WalletId]) -> String {
    ids.iter()
        .map(WalletId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(
            AppError::from(ValidationError::TaxId).kind(),
            ErrorKind::Validation
        );
        assert_eq!(AppError::WalletsNotFound(vec![id]).kind(), ErrorKind::NotFound);
        assert_eq!(AppError::TaxIdTaken.kind(), ErrorKind::Conflict);
        assert_eq!(AppError::SelfTransfer(id).kind(), ErrorKind::SelfTransfer);
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_messages_name_missing_wallets() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let message = AppError::WalletsNotFound(vec![a, b]).to_string();
        assert!(message.contains(&a.to_string()));
        assert!(message.contains(&b.to_string()));
    }

    #[test]
    fn test_insufficient_funds_message_uses_decimals() {
        let err = AppError::InsufficientFunds {
            wallet_id: Uuid::new_v4(),
            balance: 6000,
            required: 100000,
        };
        let message = err.to_string();
        assert!(message.contains("balance 60.00"));
        assert!(message.contains("required 1000.00"));
    }
}
