use chrono::NaiveDate;
use festkasse::{
    domain::{PhaseKind, KINO_STANDARD},
    pricing::{build_phases, resolve_active_phase, PhaseSpec},
    repository::{SqliteTicketRepository, TicketRepository},
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_seeded_tickets_resolve_at_base_price() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteTicketRepository::new(pool);

    for (slug, cents) in [("online", 1500), ("kino", 900), ("combo", 2000), (KINO_STANDARD, 1100)] {
        let ticket = repo.find_by_type(slug).await?.unwrap();
        assert_eq!(ticket.base_price_cents, cents);

        let phases = repo.phases_for_ticket(ticket.id).await?;
        let active = resolve_active_phase(&phases, date(2025, 6, 1)).unwrap();
        assert_eq!(active.phase, PhaseKind::Event);
        assert_eq!(active.price_cents, cents);
    }

    Ok(())
}

#[tokio::test]
async fn test_replace_phases_swaps_the_whole_table() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteTicketRepository::new(pool);

    let ticket = repo.find_by_type("online").await?.unwrap();
    let templates = build_phases(&PhaseSpec {
        base_price_cents: 2000,
        preorder_percent: 25.0,
        preorder_end: date(2025, 1, 10),
        early_percent: Some(10.0),
        early_end: Some(date(2025, 2, 1)),
    })?;

    let stored = repo.replace_phases(ticket.id, 2000, templates).await?;
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].phase, PhaseKind::Preorder);
    assert_eq!(stored[0].price_cents, 1500);
    assert_eq!(stored[2].phase, PhaseKind::Event);
    assert_eq!(stored[2].price_cents, 2000);

    // The resolver now sees the discounted window.
    let active = resolve_active_phase(&stored, date(2025, 1, 20)).unwrap();
    assert_eq!(active.phase, PhaseKind::Early);
    assert_eq!(active.price_cents, 1800);

    let ticket = repo.find_by_type("online").await?.unwrap();
    assert_eq!(ticket.base_price_cents, 2000);

    Ok(())
}
