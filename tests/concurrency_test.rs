mod common;

use anyhow::Result;
use common::{TwoWallets, balance, create_wallet, test_service};
use fintracker::application::{AppError, ErrorKind};
use fintracker::domain::PageRequest;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    // 20 transfers of 10.00 against a 100.00 balance: exactly 10 can succeed
    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let service = service.clone();
        let (from, to) = (source.id, destination.id);
        tasks.spawn(async move { service.transfer(from, to, 1000).await });
    }

    let mut committed = 0;
    let mut rejected = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome? {
            Ok(_) => committed += 1,
            Err(AppError::InsufficientFunds { .. }) => rejected += 1,
            Err(other) => panic!("Unexpected transfer failure: {other:?}"),
        }
    }

    assert_eq!(committed, 10);
    assert_eq!(rejected, 10);
    assert_eq!(balance(&service, &source).await?, 0);
    assert_eq!(balance(&service, &destination).await?, 15000);

    let history = service
        .list_transactions(Some(source.id), PageRequest::default())
        .await?;
    assert_eq!(history.total, 10);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_conserve_money() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        user,
        source,
        destination,
    } = TwoWallets::create(&service).await?;
    let third = create_wallet(&service, &user, "BRL", 2500).await?;
    let wallets = [source.id, destination.id, third.id];

    // Every ordered pair in both directions, several times over
    let mut tasks = JoinSet::new();
    for round in 0..5 {
        for (i, &from) in wallets.iter().enumerate() {
            for (j, &to) in wallets.iter().enumerate() {
                if i == j {
                    continue;
                }
                let service = service.clone();
                let amount = 700 + (round * 10 + i as i64 * 3 + j as i64) * 11;
                tasks.spawn(async move { service.transfer(from, to, amount).await });
            }
        }
    }

    let mut committed = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome? {
            Ok(_) => committed += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::InsufficientFunds),
        }
    }

    let mut total = 0;
    for wallet in [&source, &destination, &third] {
        let current = balance(&service, wallet).await?;
        assert!(current >= 0, "wallet {} went negative", wallet.id);
        total += current;
    }
    assert_eq!(total, 17500);

    let history = service
        .list_transactions(None, PageRequest::default())
        .await?;
    assert_eq!(history.total, committed);

    Ok(())
}
