//! Circulation lifecycle integration tests
//!
//! These run against a live Postgres at DATABASE_URL.
//! Run with: cargo test -- --ignored

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::{SystemTime, UNIX_EPOCH};

use libris_core::{
    config::CirculationConfig,
    error::AppError,
    models::{Actor, CopyStatus, FineStatus, LoanStatus},
    repository::Repository,
    services::Services,
};

async fn setup() -> anyhow::Result<(Repository, Services)> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // Stock creation needs at least one branch to host copies
    sqlx::query(
        "INSERT INTO branches (name) SELECT 'Main' WHERE NOT EXISTS (SELECT 1 FROM branches)",
    )
    .execute(&pool)
    .await?;

    let repository = Repository::new(pool);
    let services = Services::with_activity_log(repository.clone(), CirculationConfig::default());
    Ok((repository, services))
}

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

async fn create_user(pool: &Pool<Postgres>, prefix: &str, role: &str) -> anyhow::Result<Actor> {
    let username = unique(prefix);
    let id: i64 =
        sqlx::query_scalar("INSERT INTO users (username, role) VALUES ($1, $2) RETURNING id")
            .bind(&username)
            .bind(role)
            .fetch_one(pool)
            .await?;
    Ok(Actor::new(id, username, role))
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
#[ignore]
async fn full_lifecycle_with_late_return() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("The Left Hand of Darkness"), 1)
        .await?;
    assert_eq!(book.total_quantity, 1);
    assert_eq!(book.available_quantity, 1);

    let copies = services.inventory.list_copies(book.id).await?;
    assert_eq!(copies.len(), 1);
    let copy = &copies[0];

    // Requesting must not touch availability or the copy
    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;
    assert_eq!(pending.loan.status, LoanStatus::Pending);
    assert_eq!(pending.loan.username, reader.username);
    assert_eq!(
        services.inventory.get_book(book.id).await?.available_quantity,
        1
    );
    assert_eq!(
        services.inventory.get_copy(copy.id).await?.status,
        CopyStatus::Available
    );

    // Approval takes the copy and re-anchors the due date
    let approve_day = day(2024, 6, 3);
    let approved = services
        .circulation
        .approve(&staff, pending.loan.id, approve_day)
        .await?;
    assert_eq!(approved.loan.status, LoanStatus::Borrowing);
    assert_eq!(approved.loan.borrow_date, approve_day);
    assert_eq!(approved.loan.due_date, approve_day + Duration::days(14));
    assert_eq!(
        services.inventory.get_book(book.id).await?.available_quantity,
        0
    );
    assert_eq!(
        services.inventory.get_copy(copy.id).await?.status,
        CopyStatus::Borrowed
    );

    // Returning 3 days late restores availability and assesses one fine
    let return_day = approved.loan.due_date + Duration::days(3);
    let (returned, fine) = services
        .circulation
        .return_loan(&staff, approved.loan.id, return_day)
        .await?;
    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert_eq!(returned.loan.return_date, Some(return_day));
    assert_eq!(
        services.inventory.get_book(book.id).await?.available_quantity,
        1
    );
    assert_eq!(
        services.inventory.get_copy(copy.id).await?.status,
        CopyStatus::Available
    );

    let fine = fine.expect("late return must create a fine");
    assert_eq!(fine.late_days, 3);
    assert_eq!(fine.amount, Decimal::new(1500, 2));
    assert_eq!(fine.status, FineStatus::Pending);

    assert_eq!(
        services.fines.total_pending(reader.id).await?,
        Decimal::new(1500, 2)
    );

    // Settle exactly once
    let paid = services.fines.pay(&staff, fine.id).await?;
    assert_eq!(paid.status, FineStatus::Paid);
    assert!(matches!(
        services.fines.pay(&staff, fine.id).await,
        Err(AppError::InvalidState(_))
    ));
    assert_eq!(services.fines.total_pending(reader.id).await?, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn duplicate_pending_request_for_same_book_is_rejected() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("Solaris"), 2)
        .await?;
    let copies = services.inventory.list_copies(book.id).await?;

    services
        .circulation
        .request_borrow(&reader, copies[0].id, None, today)
        .await?;

    // A second request against another copy of the same book must fail
    let err = services
        .circulation
        .request_borrow(&reader, copies[1].id, None, today)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // And nothing moved in the ledger
    let book = services.inventory.get_book(book.id).await?;
    assert_eq!(book.available_quantity, 2);
    for copy in services.inventory.list_copies(book.id).await? {
        assert_eq!(copy.status, CopyStatus::Available);
    }

    Ok(())
}

#[tokio::test]
#[ignore]
async fn approving_twice_succeeds_at_most_once() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("Hyperion"), 1)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;

    services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await?;

    let err = services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Availability was decremented exactly once
    assert_eq!(
        services.inventory.get_book(book.id).await?.available_quantity,
        0
    );

    Ok(())
}

#[tokio::test]
#[ignore]
async fn rejection_leaves_inventory_untouched() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("Roadside Picnic"), 1)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;

    let rejected = services
        .circulation
        .reject(&staff, pending.loan.id, today)
        .await?;
    assert_eq!(rejected.loan.status, LoanStatus::Rejected);
    assert_eq!(
        services.inventory.get_book(book.id).await?.available_quantity,
        1
    );

    // A processed request cannot be approved afterwards
    let err = services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn on_time_return_creates_no_fine() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("Ubik"), 1)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;
    let approved = services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await?;

    // Returning on the due date itself is on time
    let (returned, fine) = services
        .circulation
        .return_loan(&staff, approved.loan.id, approved.loan.due_date)
        .await?;
    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert!(fine.is_none());
    assert_eq!(services.fines.total_pending(reader.id).await?, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn waiving_appends_to_the_assessment_reason() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("Annihilation"), 1)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;
    let approved = services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await?;

    let (_, fine) = services
        .circulation
        .return_loan(&staff, approved.loan.id, approved.loan.due_date + Duration::days(2))
        .await?;
    let fine = fine.unwrap();
    assert_eq!(fine.reason, "Returned 2 day(s) late");

    let waived = services
        .fines
        .waive(&staff, fine.id, "flood damage at home")
        .await?;
    assert_eq!(waived.status, FineStatus::Waived);
    assert_eq!(
        waived.reason,
        "Returned 2 day(s) late | Waived: flood damage at home"
    );

    // Settled is settled
    assert!(matches!(
        services.fines.waive(&staff, fine.id, "again").await,
        Err(AppError::InvalidState(_))
    ));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn borrowed_copies_cannot_be_requested_or_removed() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let other = create_user(&repo.pool, "other", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("Neuromancer"), 1)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;
    services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await?;

    let err = services
        .circulation
        .request_borrow(&other, copy.id, None, today)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = services.inventory.remove_copy(&staff, copy.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // A copy that never existed is NotFound, not a guard failure
    let err = services
        .circulation
        .request_borrow(&other, i64::MAX, None, today)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn removing_an_available_copy_updates_both_counters() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;

    let book = services
        .inventory
        .create_book(&staff, &unique("The Dispossessed"), 2)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    services.inventory.remove_copy(&staff, copy.id).await?;

    let book = services.inventory.get_book(book.id).await?;
    assert_eq!(book.total_quantity, 1);
    assert_eq!(book.available_quantity, 1);

    // Counters agree with the copy census
    let available = services.inventory.list_available_copies(book.id).await?;
    assert_eq!(available.len() as i32, book.available_quantity);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn overdue_is_a_read_time_projection() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let book = services
        .inventory
        .create_book(&staff, &unique("A Canticle for Leibowitz"), 1)
        .await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;
    let approved = services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await?;

    // On the due date: not overdue, stored status still BORROWING
    let on_due = services
        .circulation
        .get_loan(approved.loan.id, approved.loan.due_date)
        .await?;
    assert_eq!(on_due.loan.status, LoanStatus::Borrowing);
    assert!(!on_due.is_overdue);

    // Five days past: projected overdue, listing uses the same predicate
    let late_day = approved.loan.due_date + Duration::days(5);
    let projected = services.circulation.get_loan(approved.loan.id, late_day).await?;
    assert_eq!(projected.loan.status, LoanStatus::Borrowing);
    assert!(projected.is_overdue);
    assert_eq!(projected.overdue_days, 5);

    let overdue = services.circulation.list_overdue(late_day).await?;
    assert!(overdue.iter().any(|l| l.loan.id == approved.loan.id));

    let not_yet = services
        .circulation
        .list_overdue(approved.loan.due_date)
        .await?;
    assert!(!not_yet.iter().any(|l| l.loan.id == approved.loan.id));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn lifecycle_transitions_reach_the_activity_log() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;
    let reader = create_user(&repo.pool, "reader", "USER").await?;
    let today = day(2024, 6, 1);

    let title = unique("Blindsight");
    let book = services.inventory.create_book(&staff, &title, 1).await?;
    let copy = services.inventory.list_copies(book.id).await?[0].clone();

    let pending = services
        .circulation
        .request_borrow(&reader, copy.id, None, today)
        .await?;
    services
        .circulation
        .approve(&staff, pending.loan.id, today)
        .await?;

    let logs = repo.activity_logs.list_recent(50).await?;
    assert!(logs
        .iter()
        .any(|l| l.username == staff.username && l.action.contains("Approved loan")));
    assert!(logs
        .iter()
        .any(|l| l.username == reader.username && l.action.contains("Requested to borrow")));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn adding_copies_to_a_missing_book_is_not_found() -> anyhow::Result<()> {
    let (repo, services) = setup().await?;
    let staff = create_user(&repo.pool, "staff", "STAFF").await?;

    let err = services
        .inventory
        .add_copies(&staff, i64::MAX, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}
