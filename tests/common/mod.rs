// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use fintracker::application::LedgerService;
use fintracker::domain::{Cents, User, Wallet};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(&format!("sqlite:{}", db_path.display())).await?;
    Ok((service, temp_dir))
}

/// Test fixture: a user with a predictable tax id and email derived from `n`
pub async fn create_user(service: &LedgerService, n: u32) -> Result<User> {
    let user = service
        .create_user(
            &format!("User {n}"),
            &format!("{n:011}"),
            &format!("user{n}@example.com"),
        )
        .await?;
    Ok(user)
}

/// Test fixture: a wallet for `user` in `currency` with `balance` cents
pub async fn create_wallet(
    service: &LedgerService,
    user: &User,
    currency: &str,
    balance: Cents,
) -> Result<Wallet> {
    let wallet = service
        .create_wallet(user.id, Some(currency), balance)
        .await?;
    Ok(wallet)
}

/// Test fixture: user U1 with two BRL wallets, W1 holding 100.00 and W2 holding 50.00
pub struct TwoWallets {
    pub user: User,
    pub source: Wallet,
    pub destination: Wallet,
}

impl TwoWallets {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let user = create_user(service, 1).await?;
        let source = create_wallet(service, &user, "BRL", 10000).await?;
        let destination = create_wallet(service, &user, "BRL", 5000).await?;
        Ok(Self {
            user,
            source,
            destination,
        })
    }
}

/// Current balance of a wallet, read back from the store
pub async fn balance(service: &LedgerService, wallet: &Wallet) -> Result<Cents> {
    Ok(service.get_wallet(wallet.id).await?.balance)
}
