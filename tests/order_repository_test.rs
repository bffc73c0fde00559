use festkasse::{
    domain::{Locale, NewAttendee, NewTicketOrder, OrderStatus, TicketType},
    error::AppError,
    repository::{OrderRepository, PaymentConfirmation, SqliteOrderRepository},
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn test_pool() -> anyhow::Result<SqlitePool> {
    // One connection so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

fn new_order(ticket_type: TicketType, quantity: i64) -> NewTicketOrder {
    NewTicketOrder {
        ticket_type,
        customer_name: "Dara Miran".to_string(),
        customer_email: "dara@example.org".to_string(),
        kino_quantity: quantity,
        locale: Locale::De,
    }
}

fn attendees(n: usize) -> Vec<NewAttendee> {
    (0..n)
        .map(|i| NewAttendee {
            first_name: format!("First{}", i),
            last_name: format!("Last{}", i),
        })
        .collect()
}

fn confirmation() -> PaymentConfirmation {
    PaymentConfirmation {
        payment_intent_id: Some("pi_test_1".to_string()),
        amount_total_cents: Some(3100),
        currency: "eur".to_string(),
    }
}

#[tokio::test]
async fn test_order_create_and_fetch() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    let order = repo.create(new_order(TicketType::Kino, 3), attendees(3)).await?;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.kino_quantity, 3);

    let found = repo.find_by_id(order.id).await?.unwrap();
    assert_eq!(found.customer_email, "dara@example.org");

    let list = repo.attendees(order.id).await?;
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|a| a.ticket_code.is_none() && !a.pdf_sent));

    Ok(())
}

#[tokio::test]
async fn test_order_validation_rejects_bad_quantities() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    // kino with zero seats
    assert!(repo.create(new_order(TicketType::Kino, 0), vec![]).await.is_err());
    // over the cap
    assert!(repo
        .create(new_order(TicketType::Kino, 11), attendees(11))
        .await
        .is_err());
    // online orders carry no seats
    assert!(repo.create(new_order(TicketType::Online, 1), attendees(1)).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_attendee_mismatch_inserts_nothing() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool.clone());

    let result = repo.create(new_order(TicketType::Kino, 5), attendees(4)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticket_orders")
        .fetch_one(&pool)
        .await?;
    let inserted: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticket_order_attendees")
        .fetch_one(&pool)
        .await?;
    assert_eq!(orders, 0);
    assert_eq!(inserted, 0);

    Ok(())
}

#[tokio::test]
async fn test_fulfill_assigns_unique_codes() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    let order = repo.create(new_order(TicketType::Kino, 3), attendees(3)).await?;
    let fulfilled = repo.fulfill(order.id, confirmation()).await?.unwrap();

    assert_eq!(fulfilled.order.status, OrderStatus::Paid);
    assert_eq!(fulfilled.order.amount_total_cents, 3100);
    assert_eq!(fulfilled.attendees.len(), 3);

    let mut codes: Vec<_> = fulfilled
        .attendees
        .iter()
        .map(|a| a.ticket_code.clone().unwrap())
        .collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 3, "ticket codes must be unique");

    // Plain kino orders get no streaming access.
    assert!(fulfilled.access_code.is_none());

    Ok(())
}

#[tokio::test]
async fn test_fulfill_issues_access_code_for_combo() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    let order = repo.create(new_order(TicketType::Combo, 2), attendees(2)).await?;
    let fulfilled = repo.fulfill(order.id, confirmation()).await?.unwrap();

    let access = fulfilled.access_code.unwrap();
    assert_eq!(access.email, "dara@example.org");
    assert_eq!(access.order_id, Some(order.id));
    assert!(access.redeemed_at.is_none());

    Ok(())
}

#[tokio::test]
async fn test_fulfill_is_idempotent() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    let order = repo.create(new_order(TicketType::Kino, 2), attendees(2)).await?;
    let first = repo.fulfill(order.id, confirmation()).await?;
    assert!(first.is_some());

    // Redelivered webhook: different payment reference must change nothing.
    let second = repo
        .fulfill(
            order.id,
            PaymentConfirmation {
                payment_intent_id: Some("pi_test_2".to_string()),
                amount_total_cents: Some(9999),
                currency: "usd".to_string(),
            },
        )
        .await?;
    assert!(second.is_none());

    let after = repo.find_by_id(order.id).await?.unwrap();
    assert_eq!(after.amount_total_cents, 3100);
    assert_eq!(after.stripe_payment_intent_id.as_deref(), Some("pi_test_1"));

    let codes_before: Vec<_> = first.unwrap().attendees;
    let codes_after = repo.attendees(order.id).await?;
    for (a, b) in codes_before.iter().zip(codes_after.iter()) {
        assert_eq!(a.ticket_code, b.ticket_code);
    }

    Ok(())
}

#[tokio::test]
async fn test_fulfill_without_amount_keeps_session_total() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    let order = repo.create(new_order(TicketType::Kino, 2), attendees(2)).await?;
    repo.set_stripe_session(order.id, "cs_test_1", 2000, "eur").await?;

    let fulfilled = repo
        .fulfill(
            order.id,
            PaymentConfirmation {
                payment_intent_id: Some("pi_test_1".to_string()),
                amount_total_cents: None,
                currency: "eur".to_string(),
            },
        )
        .await?
        .unwrap();

    assert_eq!(fulfilled.order.status, OrderStatus::Paid);
    assert_eq!(fulfilled.order.amount_total_cents, 2000);

    Ok(())
}

#[tokio::test]
async fn test_fulfill_unknown_order_is_not_found() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteOrderRepository::new(pool);

    let result = repo.fulfill(Uuid::new_v4(), confirmation()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}
