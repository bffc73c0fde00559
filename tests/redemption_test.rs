use std::sync::Arc;

use festkasse::{
    auth::AuthService,
    domain::NewUser,
    repository::{
        AccessCodeRepository, SqliteAccessCodeRepository, SqliteUserRepository, UserRepository,
    },
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

async fn seed_user(users: &SqliteUserRepository, email: &str) -> anyhow::Result<uuid::Uuid> {
    let hash = AuthService::hash_password("correct horse battery").await?;
    let user = users
        .create(NewUser {
            email: email.to_string(),
            display_name: "Viewer".to_string(),
            password_hash: hash,
        })
        .await?;
    Ok(user.id)
}

#[tokio::test]
async fn test_redeem_flips_entitlement_once() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let users = SqliteUserRepository::new(pool.clone());
    let codes = SqliteAccessCodeRepository::new(pool.clone());

    let user_id = seed_user(&users, "viewer@example.org").await?;
    let code = codes.issue(None, "viewer@example.org").await?;

    assert!(codes.redeem(&code.code, user_id).await?);
    let user = users.find_by_id(user_id).await?.unwrap();
    assert!(user.online_ticket);

    // Second attempt fails the same way an unknown code does.
    assert!(!codes.redeem(&code.code, user_id).await?);
    assert!(!codes.redeem("ON-NOPE-NOPE", user_id).await?);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_redemption_has_exactly_one_winner() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let users = SqliteUserRepository::new(pool.clone());
    let codes = Arc::new(SqliteAccessCodeRepository::new(pool.clone()));

    let first = seed_user(&users, "first@example.org").await?;
    let second = seed_user(&users, "second@example.org").await?;
    let code = codes.issue(None, "first@example.org").await?;

    let a = {
        let codes = codes.clone();
        let code = code.code.clone();
        tokio::spawn(async move { codes.redeem(&code, first).await })
    };
    let b = {
        let codes = codes.clone();
        let code = code.code.clone();
        tokio::spawn(async move { codes.redeem(&code, second).await })
    };

    let results = [a.await??, b.await??];
    let wins = results.iter().filter(|r| **r).count();
    assert_eq!(wins, 1, "exactly one concurrent redemption may succeed");

    // Exactly one account gained the entitlement.
    let flagged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE online_ticket = 1")
        .fetch_one(&pool)
        .await?;
    assert_eq!(flagged, 1);

    Ok(())
}

#[tokio::test]
async fn test_admin_issued_codes_have_no_order() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let codes = SqliteAccessCodeRepository::new(pool);

    let code = codes.issue(None, "press@example.org").await?;
    assert!(code.order_id.is_none());
    assert!(code.code.starts_with("ON-"));

    Ok(())
}
