mod common;

use anyhow::Result;
use common::{TwoWallets, balance, create_user, create_wallet, test_service};
use fintracker::application::{AppError, ErrorKind};
use fintracker::domain::PageRequest;
use rstest::rstest;
use uuid::Uuid;

#[tokio::test]
async fn test_transfer_moves_money_and_records_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    let transaction = service.transfer(source.id, destination.id, 4000).await?;

    assert_eq!(transaction.amount, 4000);
    assert_eq!(transaction.source_wallet_id, source.id);
    assert_eq!(transaction.destination_wallet_id, destination.id);
    assert_eq!(transaction.sequence, 1);

    assert_eq!(balance(&service, &source).await?, 6000);
    assert_eq!(balance(&service, &destination).await?, 9000);

    let stored = service.get_transaction(transaction.id).await?;
    assert_eq!(stored, transaction);

    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_leaves_state_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    service.transfer(source.id, destination.id, 4000).await?;

    // 1000.00 out of a 60.00 balance
    let err = service
        .transfer(source.id, destination.id, 100000)
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientFunds {
            wallet_id,
            balance: available,
            required,
        } => {
            assert_eq!(wallet_id, source.id);
            assert_eq!(available, 6000);
            assert_eq!(required, 100000);
        }
        other => panic!("Expected InsufficientFunds, got {other:?}"),
    }

    assert_eq!(balance(&service, &source).await?, 6000);
    assert_eq!(balance(&service, &destination).await?, 9000);

    let history = service
        .list_transactions(None, PageRequest::default())
        .await?;
    assert_eq!(history.total, 1);

    Ok(())
}

#[tokio::test]
async fn test_transfer_of_entire_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    service.transfer(source.id, destination.id, 10000).await?;

    assert_eq!(balance(&service, &source).await?, 0);
    assert_eq!(balance(&service, &destination).await?, 15000);

    let err = service
        .transfer(source.id, destination.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    Ok(())
}

#[rstest]
#[case(0)]
#[case(-100)]
#[tokio::test]
async fn test_non_positive_amount_is_rejected(#[case] amount: i64) -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    let err = service
        .transfer(source.id, destination.id, amount)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(balance(&service, &source).await?, 10000);
    assert_eq!(balance(&service, &destination).await?, 5000);

    Ok(())
}

#[tokio::test]
async fn test_self_transfer_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets { source, .. } = TwoWallets::create(&service).await?;

    let err = service
        .transfer(source.id, source.id, 1000)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SelfTransfer(id) if id == source.id));
    assert_eq!(balance(&service, &source).await?, 10000);

    Ok(())
}

#[tokio::test]
async fn test_currency_mismatch_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = create_user(&service, 1).await?;
    let brl = create_wallet(&service, &user, "BRL", 10000).await?;
    let usd = create_wallet(&service, &user, "usd", 10000).await?;
    assert_eq!(usd.currency, "USD");

    let err = service.transfer(brl.id, usd.id, 1000).await.unwrap_err();
    match err {
        AppError::CurrencyMismatch {
            source_currency,
            destination_currency,
        } => {
            assert_eq!(source_currency, "BRL");
            assert_eq!(destination_currency, "USD");
        }
        other => panic!("Expected CurrencyMismatch, got {other:?}"),
    }

    assert_eq!(balance(&service, &brl).await?, 10000);
    assert_eq!(balance(&service, &usd).await?, 10000);

    Ok(())
}

#[tokio::test]
async fn test_missing_wallets_are_named() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets { source, .. } = TwoWallets::create(&service).await?;
    let (ghost_a, ghost_b) = (Uuid::new_v4(), Uuid::new_v4());

    let err = service
        .transfer(source.id, ghost_a, 1000)
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::WalletsNotFound(ids) if ids == &vec![ghost_a]));

    let err = service
        .transfer(ghost_a, ghost_b, 1000)
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::WalletsNotFound(ids) if ids == &vec![ghost_a, ghost_b]));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(balance(&service, &source).await?, 10000);

    Ok(())
}

#[tokio::test]
async fn test_checks_run_in_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = create_user(&service, 1).await?;
    let brl = create_wallet(&service, &user, "BRL", 0).await?;
    let usd = create_wallet(&service, &user, "USD", 0).await?;
    let ghost = Uuid::new_v4();

    // Amount before everything else
    let err = service.transfer(ghost, ghost, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Self-transfer before existence
    let err = service.transfer(ghost, ghost, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SelfTransfer);

    // Existence before currency
    let err = service.transfer(brl.id, ghost, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Currency before funds
    let err = service.transfer(brl.id, usd.id, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CurrencyMismatch);

    Ok(())
}

#[tokio::test]
async fn test_store_failure_rolls_back_transfer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    // Make the record write fail after both balance updates have run
    sqlx::query(
        r#"
        CREATE TRIGGER fail_transaction_insert BEFORE INSERT ON transactions
        BEGIN
            SELECT RAISE(ABORT, 'simulated store failure');
        END
        "#,
    )
    .execute(service.repository().pool())
    .await?;

    let err = service
        .transfer(source.id, destination.id, 4000)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(balance(&service, &source).await?, 10000);
    assert_eq!(balance(&service, &destination).await?, 5000);
    let history = service
        .list_transactions(None, PageRequest::default())
        .await?;
    assert!(history.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_transfer_gives_up_when_debit_never_lands() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    // Silently skip every debit so each commit looks like a lost race
    sqlx::query(
        r#"
        CREATE TRIGGER swallow_debits BEFORE UPDATE OF balance_cents ON wallets
        WHEN NEW.balance_cents < OLD.balance_cents
        BEGIN
            SELECT RAISE(IGNORE);
        END
        "#,
    )
    .execute(service.repository().pool())
    .await?;

    let err = service
        .transfer(source.id, destination.id, 4000)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(balance(&service, &source).await?, 10000);
    assert_eq!(balance(&service, &destination).await?, 5000);
    let history = service
        .list_transactions(None, PageRequest::default())
        .await?;
    assert_eq!(history.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_credit_that_would_overflow_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = create_user(&service, 1).await?;
    let source = create_wallet(&service, &user, "BRL", 10000).await?;
    let full = create_wallet(&service, &user, "BRL", i64::MAX - 50).await?;

    let err = service.transfer(source.id, full.id, 100).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(balance(&service, &source).await?, 10000);
    assert_eq!(balance(&service, &full).await?, i64::MAX - 50);

    // Exactly up to the limit still fits
    service.transfer(source.id, full.id, 50).await?;
    assert_eq!(balance(&service, &full).await?, i64::MAX);

    Ok(())
}

#[tokio::test]
async fn test_history_is_newest_first_and_filters_by_wallet() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        user,
        source,
        destination,
    } = TwoWallets::create(&service).await?;
    let other = create_wallet(&service, &user, "BRL", 0).await?;

    let first = service.transfer(source.id, destination.id, 1000).await?;
    let second = service.transfer(destination.id, other.id, 500).await?;
    let third = service.transfer(source.id, other.id, 250).await?;
    assert!(first.sequence < second.sequence && second.sequence < third.sequence);

    let all = service
        .list_transactions(None, PageRequest::default())
        .await?;
    let ids: Vec<_> = all.items.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    // Either side of the transfer matches the filter
    let touching_destination = service
        .list_transactions(Some(destination.id), PageRequest::default())
        .await?;
    let ids: Vec<_> = touching_destination.items.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert!(touching_destination
        .items
        .iter()
        .all(|t| t.involves(destination.id)));

    let second_page = service
        .list_transactions(None, PageRequest::new(2, 2)?)
        .await?;
    assert_eq!(second_page.total, 3);
    assert_eq!(second_page.pages, 2);
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].id, first.id);

    Ok(())
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let id = Uuid::new_v4();

    let err = service.get_transaction(id).await.unwrap_err();
    assert!(matches!(err, AppError::TransactionNotFound(missing) if missing == id));

    Ok(())
}

#[tokio::test]
async fn test_money_is_conserved_across_transfers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let TwoWallets {
        source,
        destination,
        ..
    } = TwoWallets::create(&service).await?;

    service.transfer(source.id, destination.id, 3333).await?;
    service.transfer(destination.id, source.id, 1234).await?;
    let _ = service.transfer(source.id, destination.id, 999_999).await;
    service.transfer(destination.id, source.id, 1).await?;

    let total = balance(&service, &source).await? + balance(&service, &destination).await?;
    assert_eq!(total, 15000);

    Ok(())
}

#[tokio::test]
async fn test_transfer_between_users() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let u1 = service
        .create_user("U1", "12345678901", "a@x.com")
        .await?;
    let u2 = service
        .create_user("U2", "10987654321", "b@x.com")
        .await?;
    let w1 = create_wallet(&service, &u1, "BRL", 10000).await?;
    let w2 = create_wallet(&service, &u2, "BRL", 0).await?;

    let transaction = service.transfer(w1.id, w2.id, 4000).await?;
    assert_eq!(balance(&service, &w1).await?, 6000);
    assert_eq!(balance(&service, &w2).await?, 4000);

    let history = service
        .list_transactions(None, PageRequest::default())
        .await?;
    assert_eq!(history.items, vec![transaction]);

    let err = service.transfer(w1.id, w2.id, 100000).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(balance(&service, &w1).await?, 6000);

    let err = service
        .create_user("U3", "12345678901", "c@x.com")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TaxIdTaken));
    let users = service.list_users(PageRequest::default()).await?;
    assert_eq!(users.total, 2);

    Ok(())
}
