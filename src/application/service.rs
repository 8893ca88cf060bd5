use tracing::{info, instrument};

use crate::domain::{
    Card, CardId, CardUpdate, Cents, Page, PageRequest, User, UserDetails, UserId, UserUpdate,
    Wallet, WalletDetails, WalletId, WalletUpdate,
};
use crate::storage::{Repository, UserConflict, is_foreign_key_violation, is_unique_violation};

use super::AppError;

/// Default size of the SQLite connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Application service providing high-level operations over the ledger.
/// This is the primary interface for any client (HTTP API, CLI).
#[derive(Clone)]
pub struct LedgerService {
    pub(super) repo: Repository,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open (creating if needed) and migrate the database at `database_url`.
    pub async fn init(database_url: &str) -> Result<Self, AppError> {
        Self::init_with(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn init_with(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let repo = Repository::init(database_url, max_connections).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database without running migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let repo = Repository::connect(database_url, max_connections).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // User operations
    // ========================

    /// Create a new user.
    #[instrument(skip_all)]
    pub async fn create_user(
        &self,
        name: &str,
        tax_id: &str,
        email: &str,
    ) -> Result<User, AppError> {
        let user = User::new(name, tax_id, email)?;

        // Check if tax id or email is already taken
        match self
            .repo
            .find_user_conflict(&user.tax_id, &user.email)
            .await?
        {
            Some(UserConflict::TaxId) => return Err(AppError::TaxIdTaken),
            Some(UserConflict::Email) => return Err(AppError::EmailTaken),
            None => {}
        }

        self.repo.save_user(&user).await.map_err(user_write_error)?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, AppError> {
        self.repo
            .get_user(id)
            .await?
            .ok_or(AppError::UserNotFound(id))
    }

    /// Get a user with summaries of its wallets.
    pub async fn get_user_details(&self, id: UserId) -> Result<UserDetails, AppError> {
        let user = self.get_user(id).await?;
        let wallets = self.repo.list_wallet_summaries(id).await?;
        Ok(UserDetails { user, wallets })
    }

    pub async fn list_users(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        let (users, total) = self.repo.list_users(page).await?;
        Ok(Page::new(users, total, page))
    }

    /// Apply a partial update to a user.
    #[instrument(skip(self, update))]
    pub async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, AppError> {
        let update = update.validated()?;
        let found = self
            .repo
            .update_user(id, &update)
            .await
            .map_err(user_write_error)?;
        if !found {
            return Err(AppError::UserNotFound(id));
        }
        info!("user updated");
        self.get_user(id).await
    }

    /// Delete a user together with its wallets and cards.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), AppError> {
        if self.repo.user_has_transactions(id).await? {
            return Err(AppError::UserHasTransactions(id));
        }

        // A transfer may still land between the check and the delete
        let deleted = self.repo.delete_user(id).await.map_err(|err| {
            if is_foreign_key_violation(&err) {
                AppError::UserHasTransactions(id)
            } else {
                AppError::Database(err)
            }
        })?;
        if !deleted {
            return Err(AppError::UserNotFound(id));
        }
        info!("user deleted");
        Ok(())
    }

    // ========================
    // Wallet operations
    // ========================

    /// Create a new wallet for an existing user.
    #[instrument(skip(self))]
    pub async fn create_wallet(
        &self,
        user_id: UserId,
        currency: Option<&str>,
        balance: Cents,
    ) -> Result<Wallet, AppError> {
        let wallet = Wallet::new(user_id, currency, balance)?;
        self.get_user(user_id).await?;

        self.repo.save_wallet(&wallet).await.map_err(|err| {
            // The owner was deleted after the existence check
            if is_foreign_key_violation(&err) {
                AppError::UserNotFound(user_id)
            } else {
                AppError::Database(err)
            }
        })?;
        info!(wallet_id = %wallet.id, "wallet created");
        Ok(wallet)
    }

    pub async fn get_wallet(&self, id: WalletId) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet(id)
            .await?
            .ok_or(AppError::WalletNotFound(id))
    }

    /// Get a wallet with summaries of its cards.
    pub async fn get_wallet_details(&self, id: WalletId) -> Result<WalletDetails, AppError> {
        let wallet = self.get_wallet(id).await?;
        let cards = self.repo.list_card_summaries(id).await?;
        Ok(WalletDetails { wallet, cards })
    }

    /// List wallets, optionally only those owned by `user_id`.
    pub async fn list_wallets(
        &self,
        user_id: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<Wallet>, AppError> {
        let (wallets, total) = self.repo.list_wallets(user_id, page).await?;
        Ok(Page::new(wallets, total, page))
    }

    /// Apply a partial update to a wallet.
    #[instrument(skip(self))]
    pub async fn update_wallet(
        &self,
        id: WalletId,
        update: WalletUpdate,
    ) -> Result<Wallet, AppError> {
        if let Some(balance) = update.balance {
            if !self.repo.set_wallet_balance(id, balance).await? {
                return Err(AppError::WalletNotFound(id));
            }
            info!("wallet balance overwritten");
        }
        self.get_wallet(id).await
    }

    /// Delete a wallet together with its cards.
    #[instrument(skip(self))]
    pub async fn delete_wallet(&self, id: WalletId) -> Result<(), AppError> {
        if self.repo.wallet_has_transactions(id).await? {
            return Err(AppError::WalletHasTransactions(id));
        }

        let deleted = self.repo.delete_wallet(id).await.map_err(|err| {
            if is_foreign_key_violation(&err) {
                AppError::WalletHasTransactions(id)
            } else {
                AppError::Database(err)
            }
        })?;
        if !deleted {
            return Err(AppError::WalletNotFound(id));
        }
        info!("wallet deleted");
        Ok(())
    }

    // ========================
    // Card operations
    // ========================

    /// Create a new card bound to an existing wallet.
    #[instrument(skip(self, number))]
    pub async fn create_card(
        &self,
        wallet_id: WalletId,
        number: &str,
        expiry: &str,
        limit: Cents,
    ) -> Result<Card, AppError> {
        let card = Card::new(wallet_id, number, expiry, limit)?;
        self.get_wallet(wallet_id).await?;

        if self.repo.card_number_exists(&card.number).await? {
            return Err(AppError::CardNumberTaken);
        }

        self.repo.save_card(&card).await.map_err(|err| {
            if is_unique_violation(&err) {
                AppError::CardNumberTaken
            } else if is_foreign_key_violation(&err) {
                AppError::WalletNotFound(wallet_id)
            } else {
                AppError::Database(err)
            }
        })?;
        info!(card_id = %card.id, "card created");
        Ok(card)
    }

    pub async fn get_card(&self, id: CardId) -> Result<Card, AppError> {
        self.repo
            .get_card(id)
            .await?
            .ok_or(AppError::CardNotFound(id))
    }

    /// List cards, optionally only those bound to `wallet_id`.
    pub async fn list_cards(
        &self,
        wallet_id: Option<WalletId>,
        page: PageRequest,
    ) -> Result<Page<Card>, AppError> {
        let (cards, total) = self.repo.list_cards(wallet_id, page).await?;
        Ok(Page::new(cards, total, page))
    }

    /// Apply a partial update to a card.
    #[instrument(skip(self))]
    pub async fn update_card(&self, id: CardId, update: CardUpdate) -> Result<Card, AppError> {
        if !self.repo.update_card(id, &update).await? {
            return Err(AppError::CardNotFound(id));
        }
        info!("card updated");
        self.get_card(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_card(&self, id: CardId) -> Result<(), AppError> {
        if !self.repo.delete_card(id).await? {
            return Err(AppError::CardNotFound(id));
        }
        info!("card deleted");
        Ok(())
    }
}

/// Classify a failed user insert/update: UNIQUE failures name the column.
fn user_write_error(err: anyhow::Error) -> AppError {
    if !is_unique_violation(&err) {
        return AppError::Database(err);
    }
    if format!("{err:#}").contains("users.email") {
        AppError::EmailTaken
    } else {
        AppError::TaxIdTaken
    }
}
