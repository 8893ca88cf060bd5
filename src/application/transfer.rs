use anyhow::anyhow;
use tracing::{error, info, instrument, warn};

use crate::domain::{
    Cents, Page, PageRequest, Transaction, TransactionId, Wallet, WalletId, format_cents,
};

use super::{AppError, LedgerService};

/// Lost races tolerated before a transfer is abandoned as a storage failure.
pub const MAX_TRANSFER_ATTEMPTS: u32 = 16;

impl LedgerService {
    // ========================
    // Transfers
    // ========================

    /// Move `amount` from one wallet to another and record the transaction.
    ///
    /// Checks run in a fixed order: amount, self-transfer, existence,
    /// currency, funds, destination headroom. The debit, credit and record
    /// are committed together; a failed transfer leaves both balances and the
    /// history untouched. Gives up with a storage error after
    /// [`MAX_TRANSFER_ATTEMPTS`] lost races.
    #[instrument(skip(self, amount), fields(amount = %format_cents(amount)))]
    pub async fn transfer(
        &self,
        source_wallet_id: WalletId,
        destination_wallet_id: WalletId,
        amount: Cents,
    ) -> Result<Transaction, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                format_cents(amount)
            )));
        }
        if source_wallet_id == destination_wallet_id {
            return Err(AppError::SelfTransfer(source_wallet_id));
        }

        // A lost race means another writer committed first and the next
        // check runs against fresher balances.
        for attempt in 1..=MAX_TRANSFER_ATTEMPTS {
            let (source, destination) = self
                .load_transfer_wallets(source_wallet_id, destination_wallet_id)
                .await?;
            check_transfer(&source, &destination, amount).inspect_err(|err| {
                warn!(reason = err.kind().as_str(), "transfer rejected");
            })?;

            let mut transaction = Transaction::new(source.id, destination.id, amount);
            if self
                .repo
                .commit_transfer(&mut transaction, &source.currency)
                .await?
            {
                info!(
                    transaction_id = %transaction.id,
                    sequence = transaction.sequence,
                    "transfer committed"
                );
                return Ok(transaction);
            }

            // Balances moved between the read and the debit; re-check against fresh state
            warn!(attempt, "transfer lost a race, re-validating");
        }

        error!(
            attempts = MAX_TRANSFER_ATTEMPTS,
            "transfer abandoned after repeated lost races"
        );
        Err(AppError::Database(anyhow!(
            "transfer abandoned after {MAX_TRANSFER_ATTEMPTS} conflicting commits"
        )))
    }

    /// Fetch both wallets, naming every missing id in the error.
    async fn load_transfer_wallets(
        &self,
        source_wallet_id: WalletId,
        destination_wallet_id: WalletId,
    ) -> Result<(Wallet, Wallet), AppError> {
        let source = self.repo.get_wallet(source_wallet_id).await?;
        let destination = self.repo.get_wallet(destination_wallet_id).await?;

        match (source, destination) {
            (Some(source), Some(destination)) => Ok((source, destination)),
            (source, destination) => {
                let mut missing = Vec::with_capacity(2);
                if source.is_none() {
                    missing.push(source_wallet_id);
                }
                if destination.is_none() {
                    missing.push(destination_wallet_id);
                }
                Err(AppError::WalletsNotFound(missing))
            }
        }
    }

    // ========================
    // Transaction history
    // ========================

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))
    }

    /// List transactions newest first, optionally only those touching `wallet_id`.
    pub async fn list_transactions(
        &self,
        wallet_id: Option<WalletId>,
        page: PageRequest,
    ) -> Result<Page<Transaction>, AppError> {
        let (transactions, total) = self.repo.list_transactions(wallet_id, page).await?;
        Ok(Page::new(transactions, total, page))
    }
}

fn check_transfer(source: &Wallet, destination: &Wallet, amount: Cents) -> Result<(), AppError> {
    if source.currency != destination.currency {
        return Err(AppError::CurrencyMismatch {
            source_currency: source.currency.clone(),
            destination_currency: destination.currency.clone(),
        });
    }
    if !source.can_cover(amount) {
        return Err(AppError::InsufficientFunds {
            wallet_id: source.id,
            balance: source.balance,
            required: amount,
        });
    }
    if destination.balance.checked_add(amount).is_none() {
        return Err(AppError::InvalidAmount(format!(
            "crediting {} would overflow the balance of wallet {}",
            format_cents(amount),
            destination.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::application::ErrorKind;

    fn wallet(currency: &str, balance: Cents) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            currency: currency.to_string(),
            balance,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_currency_checked_before_funds() {
        let source = wallet("BRL", 0);
        let destination = wallet("USD", 0);
        let err = check_transfer(&source, &destination, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CurrencyMismatch);
    }

    #[test]
    fn test_exact_balance_is_enough() {
        let source = wallet("BRL", 100);
        let destination = wallet("BRL", 0);
        assert!(check_transfer(&source, &destination, 100).is_ok());

        let err = check_transfer(&source, &destination, 101).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let source = wallet("BRL", 100);
        let destination = wallet("BRL", Cents::MAX - 99);
        assert!(check_transfer(&source, &destination, 99).is_ok());

        let err = check_transfer(&source, &destination, 100).unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
