//! Human-readable code allocation.
//!
//! Ticket codes and online access codes share one namespace: every code is
//! claimed by inserting into `issued_codes`, whose PRIMARY KEY enforces
//! uniqueness across both consumers. A constraint violation is the retry
//! trigger; after five collisions we give up rather than hand out a code we
//! are not sure about.

use chrono::Utc;
use rand::Rng;
use sqlx::SqliteConnection;

use crate::error::{AppError, Result};

/// Prefix for per-attendee cinema ticket codes.
pub const TICKET_CODE_PREFIX: &str = "FK";
/// Prefix for online streaming access codes.
pub const ACCESS_CODE_PREFIX: &str = "ON";

const CODE_RETRY_LIMIT: usize = 5;

// No 0/O/1/I: codes get read out at the door.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}-{}-{}", prefix, chunk(&mut rng), chunk(&mut rng))
}

fn chunk(rng: &mut impl Rng) -> String {
    (0..4)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Allocates a code that is unique across ticket and access codes, within
/// the caller's transaction.
pub async fn claim_code(conn: &mut SqliteConnection, prefix: &str) -> Result<String> {
    for _ in 0..CODE_RETRY_LIMIT {
        let code = generate_code(prefix);
        let inserted = sqlx::query("INSERT INTO issued_codes (code, issued_at) VALUES (?, ?)")
            .bind(&code)
            .bind(Utc::now().naive_utc())
            .execute(&mut *conn)
            .await;
        match inserted {
            Ok(_) => return Ok(code),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(format!(
        "could not allocate a unique {} code after {} attempts",
        prefix, CODE_RETRY_LIMIT
    )))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_carry_prefix_and_grouping() {
        let code = generate_code(TICKET_CODE_PREFIX);
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("FK-"));
        assert_eq!(code.matches('-').count(), 2);
    }

    #[test]
    fn codes_avoid_ambiguous_characters() {
        for _ in 0..50 {
            let code = generate_code(ACCESS_CODE_PREFIX);
            let body: String = code.chars().skip(3).filter(|c| *c != '-').collect();
            assert!(!body.contains(['0', 'O', '1', 'I']), "ambiguous char in {}", code);
        }
    }
}
