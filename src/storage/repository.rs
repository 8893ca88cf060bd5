use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Card, CardId, CardSummary, CardUpdate, Cents, PageRequest, Transaction, TransactionId, User,
    UserId, UserUpdate, Wallet, WalletId, WalletSummary,
};

use super::MIGRATION_001_INITIAL;

const USER_COLUMNS: &str = "id, name, tax_id, email, created_at";
const WALLET_COLUMNS: &str = "id, user_id, currency, balance_cents, created_at";
const CARD_COLUMNS: &str = "id, wallet_id, number, expiry, limit_cents, created_at";
const TRANSACTION_COLUMNS: &str =
    "id, sequence, source_wallet_id, destination_wallet_id, amount_cents, created_at";

/// How long a connection waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Which unique field of a user is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserConflict {
    TaxId,
    Email,
}

/// Repository for persisting and querying users, wallets, cards and transactions.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the SQLite database named by `database_url`.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str, max_connections: u32) -> Result<Self> {
        let repo = Self::connect(database_url, max_connections).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Underlying pool, for maintenance tasks and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================
    // User operations
    // ========================

    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, tax_id, email, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.tax_id)
        .bind(&user.email)
        .bind(timestamp(user.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Report which unique field, if any, another user already holds.
    pub async fn find_user_conflict(
        &self,
        tax_id: &str,
        email: &str,
    ) -> Result<Option<UserConflict>> {
        let row = sqlx::query("SELECT tax_id FROM users WHERE tax_id = ? OR email = ? LIMIT 1")
            .bind(tax_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check user uniqueness")?;

        match row {
            Some(row) => {
                let existing: String = row.try_get("tax_id")?;
                Ok(Some(if existing == tax_id {
                    UserConflict::TaxId
                } else {
                    UserConflict::Email
                }))
            }
            None => Ok(None),
        }
    }

    /// List users in creation order.
    pub async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let total = self.count("SELECT COUNT(*) AS count FROM users", &[]).await?;
        let rows = self
            .fetch_page(
                &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"),
                &[],
                page,
            )
            .await
            .context("Failed to list users")?;

        let users = rows.iter().map(Self::row_to_user).collect::<Result<_>>()?;
        Ok((users, total))
    }

    /// Apply the present fields of `update`. Returns false when no user has this id.
    pub async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name), email = COALESCE(?, email)
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a user and, through the schema's cascades, its wallets and cards.
    pub async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        Ok(User {
            id: parse_id(row, "id")?,
            name: row.try_get("name")?,
            tax_id: row.try_get("tax_id")?,
            email: row.try_get("email")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Wallet operations
    // ========================

    pub async fn save_wallet(&self, wallet: &Wallet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, currency, balance_cents, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id.to_string())
        .bind(wallet.user_id.to_string())
        .bind(&wallet.currency)
        .bind(wallet.balance)
        .bind(timestamp(wallet.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save wallet")?;
        Ok(())
    }

    pub async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch wallet")?;

        row.as_ref().map(Self::row_to_wallet).transpose()
    }

    /// List wallets in creation order, optionally only those owned by `user_id`.
    pub async fn list_wallets(
        &self,
        user_id: Option<UserId>,
        page: PageRequest,
    ) -> Result<(Vec<Wallet>, i64)> {
        let user_id_str = user_id.map(|id| id.to_string());
        let filter = if user_id.is_some() { " WHERE user_id = ?" } else { "" };
        let binds: Vec<&str> = user_id_str.as_deref().into_iter().collect();

        let total = self
            .count(&format!("SELECT COUNT(*) AS count FROM wallets{filter}"), &binds)
            .await?;
        let rows = self
            .fetch_page(
                &format!("SELECT {WALLET_COLUMNS} FROM wallets{filter} ORDER BY created_at, id"),
                &binds,
                page,
            )
            .await
            .context("Failed to list wallets")?;

        let wallets = rows.iter().map(Self::row_to_wallet).collect::<Result<_>>()?;
        Ok((wallets, total))
    }

    pub async fn list_wallet_summaries(&self, user_id: UserId) -> Result<Vec<WalletSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, currency, balance_cents
            FROM wallets
            WHERE user_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallet summaries")?;

        rows.iter()
            .map(|row| {
                Ok(WalletSummary {
                    id: parse_id(row, "id")?,
                    currency: row.try_get("currency")?,
                    balance: row.try_get("balance_cents")?,
                })
            })
            .collect()
    }

    /// Overwrite the balance in a single statement. Returns false when no wallet has this id.
    pub async fn set_wallet_balance(&self, id: WalletId, balance: Cents) -> Result<bool> {
        let result = sqlx::query("UPDATE wallets SET balance_cents = ? WHERE id = ?")
            .bind(balance)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update wallet balance")?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a wallet and its cards. Fails with a foreign key violation
    /// while any transaction references the wallet.
    pub async fn delete_wallet(&self, id: WalletId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wallets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete wallet")?;
        Ok(result.rows_affected() > 0)
    }

    /// True when any recorded transaction touches the wallet.
    pub async fn wallet_has_transactions(&self, id: WalletId) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM transactions
                WHERE source_wallet_id = ?1 OR destination_wallet_id = ?1
            ) AS found
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check wallet history")?;
        Ok(row.try_get::<bool, _>("found")?)
    }

    /// True when any recorded transaction touches one of the user's wallets.
    pub async fn user_has_transactions(&self, id: UserId) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM transactions t
                JOIN wallets w ON w.id IN (t.source_wallet_id, t.destination_wallet_id)
                WHERE w.user_id = ?
            ) AS found
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check user history")?;
        Ok(row.try_get::<bool, _>("found")?)
    }

    fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
        Ok(Wallet {
            id: parse_id(row, "id")?,
            user_id: parse_id(row, "user_id")?,
            currency: row.try_get("currency")?,
            balance: row.try_get("balance_cents")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Card operations
    // ========================

    pub async fn save_card(&self, card: &Card) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cards (id, wallet_id, number, expiry, limit_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(card.id.to_string())
        .bind(card.wallet_id.to_string())
        .bind(&card.number)
        .bind(&card.expiry)
        .bind(card.limit)
        .bind(timestamp(card.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save card")?;
        Ok(())
    }

    pub async fn get_card(&self, id: CardId) -> Result<Option<Card>> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch card")?;

        row.as_ref().map(Self::row_to_card).transpose()
    }

    pub async fn card_number_exists(&self, number: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM cards WHERE number = ?) AS found")
            .bind(number)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check card number")?;
        Ok(row.try_get::<bool, _>("found")?)
    }

    /// List cards in creation order, optionally only those bound to `wallet_id`.
    pub async fn list_cards(
        &self,
        wallet_id: Option<WalletId>,
        page: PageRequest,
    ) -> Result<(Vec<Card>, i64)> {
        let wallet_id_str = wallet_id.map(|id| id.to_string());
        let filter = if wallet_id.is_some() { " WHERE wallet_id = ?" } else { "" };
        let binds: Vec<&str> = wallet_id_str.as_deref().into_iter().collect();

        let total = self
            .count(&format!("SELECT COUNT(*) AS count FROM cards{filter}"), &binds)
            .await?;
        let rows = self
            .fetch_page(
                &format!("SELECT {CARD_COLUMNS} FROM cards{filter} ORDER BY created_at, id"),
                &binds,
                page,
            )
            .await
            .context("Failed to list cards")?;

        let cards = rows.iter().map(Self::row_to_card).collect::<Result<_>>()?;
        Ok((cards, total))
    }

    pub async fn list_card_summaries(&self, wallet_id: WalletId) -> Result<Vec<CardSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, number
            FROM cards
            WHERE wallet_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(wallet_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list card summaries")?;

        rows.iter()
            .map(|row| {
                Ok(CardSummary {
                    id: parse_id(row, "id")?,
                    number: row.try_get("number")?,
                })
            })
            .collect()
    }

    /// Apply the present fields of `update`. Returns false when no card has this id.
    pub async fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<bool> {
        let result =
            sqlx::query("UPDATE cards SET limit_cents = COALESCE(?, limit_cents) WHERE id = ?")
                .bind(update.limit)
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .context("Failed to update card")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_card(&self, id: CardId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete card")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_card(row: &SqliteRow) -> Result<Card> {
        Ok(Card {
            id: parse_id(row, "id")?,
            wallet_id: parse_id(row, "wallet_id")?,
            number: row.try_get("number")?,
            expiry: row.try_get("expiry")?,
            limit: row.try_get("limit_cents")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Move `transaction.amount` between its two wallets and record it, as one
    /// store transaction.
    ///
    /// The debit is conditional on the committed source balance still covering
    /// the amount, the credit on the destination balance having room for it,
    /// and both on the wallets still carrying `currency`. Returns
    /// `Ok(false)` with nothing written when either condition no longer holds
    /// or a wallet disappeared; any store error rolls everything back.
    pub async fn commit_transfer(
        &self,
        transaction: &mut Transaction,
        currency: &str,
    ) -> Result<bool> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transfer")?;

        // Writing first takes SQLite's write lock before any balance is read,
        // so the sufficiency check below sees the latest committed balance.
        let debited = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = balance_cents - ?
            WHERE id = ? AND currency = ? AND balance_cents >= ?
            "#,
        )
        .bind(transaction.amount)
        .bind(transaction.source_wallet_id.to_string())
        .bind(currency)
        .bind(transaction.amount)
        .execute(&mut *db_tx)
        .await
        .context("Failed to debit source wallet")?;

        if debited.rows_affected() == 0 {
            debug!(wallet = %transaction.source_wallet_id, "conditional debit matched no row");
            db_tx.rollback().await.context("Failed to roll back transfer")?;
            return Ok(false);
        }

        let credited = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = balance_cents + ?
            WHERE id = ? AND currency = ? AND balance_cents <= 9223372036854775807 - ?
            "#,
        )
        .bind(transaction.amount)
        .bind(transaction.destination_wallet_id.to_string())
        .bind(currency)
        .bind(transaction.amount)
        .execute(&mut *db_tx)
        .await
        .context("Failed to credit destination wallet")?;

        if credited.rows_affected() == 0 {
            debug!(wallet = %transaction.destination_wallet_id, "conditional credit matched no row");
            db_tx.rollback().await.context("Failed to roll back transfer")?;
            return Ok(false);
        }

        transaction.sequence = Self::next_sequence(&mut db_tx).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, source_wallet_id, destination_wallet_id, amount_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.sequence)
        .bind(transaction.source_wallet_id.to_string())
        .bind(transaction.destination_wallet_id.to_string())
        .bind(transaction.amount)
        .bind(timestamp(transaction.created_at))
        .execute(&mut *db_tx)
        .await
        .context("Failed to save transaction")?;

        db_tx.commit().await.context("Failed to commit transfer")?;
        Ok(true)
    }

    /// Get the next sequence number and increment the counter.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.try_get("value")?)
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// List transactions newest first, optionally only those where
    /// `wallet_id` is the source or the destination.
    pub async fn list_transactions(
        &self,
        wallet_id: Option<WalletId>,
        page: PageRequest,
    ) -> Result<(Vec<Transaction>, i64)> {
        let wallet_id_str = wallet_id.map(|id| id.to_string());
        let filter = if wallet_id.is_some() {
            " WHERE source_wallet_id = ? OR destination_wallet_id = ?"
        } else {
            ""
        };
        let binds: Vec<&str> = match wallet_id_str.as_deref() {
            Some(id) => vec![id, id],
            None => Vec::new(),
        };

        let total = self
            .count(
                &format!("SELECT COUNT(*) AS count FROM transactions{filter}"),
                &binds,
            )
            .await?;
        let rows = self
            .fetch_page(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions{filter} ORDER BY sequence DESC"
                ),
                &binds,
                page,
            )
            .await
            .context("Failed to list transactions")?;

        let transactions = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<_>>()?;
        Ok((transactions, total))
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        Ok(Transaction {
            id: parse_id(row, "id")?,
            sequence: row.try_get("sequence")?,
            source_wallet_id: parse_id(row, "source_wallet_id")?,
            destination_wallet_id: parse_id(row, "destination_wallet_id")?,
            amount: row.try_get("amount_cents")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Query helpers
    // ========================

    async fn count(&self, query: &str, binds: &[&str]) -> Result<i64> {
        let mut sql_query = sqlx::query(query);
        for value in binds {
            sql_query = sql_query.bind(*value);
        }

        let row = sql_query
            .fetch_one(&self.pool)
            .await
            .context("Failed to count records")?;
        Ok(row.try_get("count")?)
    }

    async fn fetch_page(
        &self,
        query: &str,
        binds: &[&str],
        page: PageRequest,
    ) -> Result<Vec<SqliteRow>> {
        let query = format!("{query} LIMIT ? OFFSET ?");
        let mut sql_query = sqlx::query(&query);
        for value in binds {
            sql_query = sql_query.bind(*value);
        }

        Ok(sql_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?)
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).with_context(|| format!("Invalid {column}: {raw}"))
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    Ok(DateTime::parse_from_rfc3339(&raw)
        .with_context(|| format!("Invalid {column} timestamp: {raw}"))?
        .with_timezone(&Utc))
}
