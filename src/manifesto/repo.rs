use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

// The flip must not interleave for the same user: two concurrent toggles
// from the same state would otherwise both observe "not a member" (or both
// "member") and collapse into one effective flip. Locking the user row up
// front serializes them, the same way adjust_coins serializes balance
// updates, without blocking toggles for other users.
const LOCK_USER_ROW: &str = "SELECT id FROM users WHERE id = $1 FOR UPDATE";

// Plain insert: with the row lock held, a conflicting membership row is a
// bug, not a race to be swallowed.
const INSERT_LIKE: &str = "INSERT INTO manifesto_likes (user_id) VALUES ($1)";

/// Flip the caller's membership in the like set. The whole
/// read-check-write runs under a per-user row lock, and the returned total
/// is COUNT(*) over the same snapshot, so count and membership cannot
/// diverge and an odd/even number of calls always lands on the expected
/// state.
pub async fn toggle_like(db: &PgPool, user_id: Uuid) -> ApiResult<(bool, i64)> {
    let mut tx = db.begin().await?;

    let locked: Option<Uuid> = sqlx::query_scalar(LOCK_USER_ROW)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    locked.ok_or(ApiError::NotFound("User"))?;

    let removed = sqlx::query("DELETE FROM manifesto_likes WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let has_liked = if removed == 0 {
        sqlx::query(INSERT_LIKE)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        true
    } else {
        false
    };

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM manifesto_likes")
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((has_liked, total))
}

pub async fn has_liked(db: &PgPool, user_id: Uuid) -> ApiResult<bool> {
    let liked: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM manifesto_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    Ok(liked.is_some())
}

/// Cardinality of the like set; never a separately maintained counter.
pub async fn total_likes(db: &PgPool) -> ApiResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM manifesto_likes")
        .fetch_one(db)
        .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The two statements below are what keeps concurrent toggles for the
    // same user from collapsing into one flip; racing real transactions
    // needs a live database, so pin the statements instead.

    #[test]
    fn flip_runs_under_a_per_user_row_lock() {
        assert!(LOCK_USER_ROW.contains("FOR UPDATE"));
        assert!(LOCK_USER_ROW.contains("users"));
    }

    #[test]
    fn membership_insert_does_not_swallow_conflicts() {
        assert!(!INSERT_LIKE.contains("ON CONFLICT"));
    }
}
