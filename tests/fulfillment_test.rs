use std::sync::Arc;

use festkasse::{
    domain::{Locale, NewAttendee, NewDonation, NewTicketOrder, OutboxKind, TicketType},
    fulfillment::{FulfillmentOutcome, FulfillmentService},
    mail::RecordingMailer,
    payments::stripe_client::{CheckoutCompletion, WebhookEvent},
    repository::{
        DonationRepository, OrderRepository, OutboxRepository, SqliteDonationRepository,
        SqliteOrderRepository, SqliteOutboxRepository,
    },
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

struct Harness {
    orders: Arc<SqliteOrderRepository>,
    donations: Arc<SqliteDonationRepository>,
    outbox: Arc<SqliteOutboxRepository>,
    mailer: Arc<RecordingMailer>,
    service: FulfillmentService,
}

fn harness(pool: SqlitePool, mailer: RecordingMailer) -> Harness {
    let orders = Arc::new(SqliteOrderRepository::new(pool.clone()));
    let donations = Arc::new(SqliteDonationRepository::new(pool.clone()));
    let outbox = Arc::new(SqliteOutboxRepository::new(pool));
    let mailer = Arc::new(mailer);

    let service = FulfillmentService::new(
        orders.clone(),
        donations.clone(),
        outbox.clone(),
        mailer.clone(),
        "Mitos Film Festival".to_string(),
        "Gemeinnützig nach § 52 AO.".to_string(),
    );

    Harness {
        orders,
        donations,
        outbox,
        mailer,
        service,
    }
}

fn completion(order_id: Option<Uuid>, donation_id: Option<Uuid>) -> CheckoutCompletion {
    CheckoutCompletion {
        session_id: "cs_test_1".to_string(),
        order_id,
        donation_id,
        payment_intent_id: Some("pi_test_1".to_string()),
        amount_total_cents: Some(4300),
        currency: "eur".to_string(),
    }
}

async fn seed_order(orders: &SqliteOrderRepository, quantity: i64) -> anyhow::Result<Uuid> {
    let order = orders
        .create(
            NewTicketOrder {
                ticket_type: TicketType::Combo,
                customer_name: "Rojda Baran".to_string(),
                customer_email: "rojda@example.org".to_string(),
                kino_quantity: quantity,
                locale: Locale::En,
            },
            (0..quantity)
                .map(|i| NewAttendee {
                    first_name: format!("First{}", i),
                    last_name: format!("Last{}", i),
                })
                .collect(),
        )
        .await?;
    Ok(order.id)
}

#[tokio::test]
async fn test_order_fulfillment_sends_one_mail_with_all_tickets() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let h = harness(pool, RecordingMailer::new());

    let order_id = seed_order(&h.orders, 3).await?;
    let outcome = h
        .service
        .process(WebhookEvent::CheckoutCompleted(completion(Some(order_id), None)))
        .await?;

    // 3 ticket codes + 1 online access code for the combo.
    assert_eq!(outcome, FulfillmentOutcome::OrderFulfilled { codes_issued: 4 });

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "rojda@example.org");
    assert_eq!(sent[0].attachments.len(), 3);
    assert!(sent[0].attachments.iter().all(|a| a.bytes.starts_with(b"%PDF")));
    drop(sent);

    let attendees = h.orders.attendees(order_id).await?;
    assert!(attendees.iter().all(|a| a.pdf_sent));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_delivery_is_acknowledged_without_second_mail() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let h = harness(pool, RecordingMailer::new());

    let order_id = seed_order(&h.orders, 2).await?;
    let event = WebhookEvent::CheckoutCompleted(completion(Some(order_id), None));

    let first = h.service.process(event.clone()).await?;
    assert!(matches!(first, FulfillmentOutcome::OrderFulfilled { .. }));

    let second = h.service.process(event).await?;
    assert_eq!(second, FulfillmentOutcome::AlreadyPaid);

    assert_eq!(h.mailer.sent.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_mail_failure_lands_in_outbox_but_state_sticks() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let h = harness(pool, RecordingMailer::failing());

    let order_id = seed_order(&h.orders, 2).await?;
    let outcome = h
        .service
        .process(WebhookEvent::CheckoutCompleted(completion(Some(order_id), None)))
        .await?;

    // Codes are issued even though the mail never went out.
    assert!(matches!(outcome, FulfillmentOutcome::OrderFulfilled { .. }));
    let attendees = h.orders.attendees(order_id).await?;
    assert!(attendees.iter().all(|a| a.ticket_code.is_some()));
    assert!(attendees.iter().all(|a| !a.pdf_sent));

    let pending = h.outbox.list_pending(10).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, OutboxKind::OrderConfirmation);
    assert_eq!(pending[0].reference_id, order_id);
    assert_eq!(pending[0].recipient, "rojda@example.org");

    Ok(())
}

#[tokio::test]
async fn test_donation_fulfillment_sends_receipt() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let h = harness(pool, RecordingMailer::new());

    let donation = h
        .donations
        .create(
            NewDonation {
                donor_name: "Azad Demir".to_string(),
                donor_email: "azad@example.org".to_string(),
                donor_address: None,
                amount_total_cents: 4300,
                locale: Locale::De,
            },
            "eur",
        )
        .await?;

    let outcome = h
        .service
        .process(WebhookEvent::CheckoutCompleted(completion(None, Some(donation.id))))
        .await?;
    assert_eq!(outcome, FulfillmentOutcome::DonationFulfilled);

    let sent = h.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("Spendenbescheinigung"));
    assert_eq!(sent[0].attachments.len(), 1);
    drop(sent);

    let second = h
        .service
        .process(WebhookEvent::CheckoutCompleted(completion(None, Some(donation.id))))
        .await?;
    assert_eq!(second, FulfillmentOutcome::AlreadyPaid);

    Ok(())
}

#[tokio::test]
async fn test_ignored_events_touch_nothing() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let h = harness(pool, RecordingMailer::new());

    let outcome = h.service.process(WebhookEvent::Ignored).await?;
    assert_eq!(outcome, FulfillmentOutcome::Ignored);

    // A completed session without any reference is also a no-op.
    let outcome = h
        .service
        .process(WebhookEvent::CheckoutCompleted(completion(None, None)))
        .await?;
    assert_eq!(outcome, FulfillmentOutcome::Ignored);

    assert!(h.mailer.sent.lock().unwrap().is_empty());

    Ok(())
}
