use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Full user record as persisted. Deliberately does not implement
/// `Serialize`: every outward projection goes through [`PublicUser`] or
/// [`PublicProfile`], so no call site can leak the credential hash.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub coins: i64,
    pub quizzes_taken: i64,
    pub quizzes_created: i64,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub coins: i64,
}

/// Public projection of a user's own record (returned to the owner).
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub coins: i64,
    pub quizzes_taken: i64,
    pub quizzes_created: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            name: u.name,
            email: u.email,
            profile_picture: u.profile_picture,
            coins: u.coins,
            quizzes_taken: u.quizzes_taken,
            quizzes_created: u.quizzes_created,
            created_at: u.created_at,
            updated_at: u.updated_at,
            last_login: u.last_login,
        }
    }
}

/// Projection served to anyone looking up a profile; no email either.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub coins: i64,
    pub quizzes_taken: i64,
    pub quizzes_created: i64,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

const USER_COLUMNS: &str = "id, username, name, email, password_hash, profile_picture, coins, \
     quizzes_taken, quizzes_created, is_active, created_at, updated_at, last_login";

impl User {
    /// Resolve an active user by email or username, case-insensitively.
    pub async fn find_by_identifier(db: &PgPool, identifier: &str) -> ApiResult<Option<User>> {
        let ident = identifier.trim().to_lowercase();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE (email = $1 OR username = $1) AND is_active = TRUE
            "#
        ))
        .bind(ident)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND is_active = TRUE
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Uniqueness probe ahead of insert; reports which field collides.
    pub async fn check_conflicts(db: &PgPool, email: &str, username: &str) -> ApiResult<()> {
        let rows = sqlx::query(
            r#"
            SELECT email, username FROM users
            WHERE email = $1 OR username = $2
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_all(db)
        .await?;
        for row in &rows {
            let existing_email: String = row.try_get("email")?;
            if existing_email == email {
                return Err(ApiError::DuplicateEmail);
            }
        }
        if !rows.is_empty() {
            return Err(ApiError::DuplicateUsername);
        }
        Ok(())
    }

    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, name, email, password_hash, coins)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.coins)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            // Unique-violation backstop for the insert race behind the probe.
            sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_email_key") => {
                ApiError::DuplicateEmail
            }
            sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_username_key") => {
                ApiError::DuplicateUsername
            }
            _ => ApiError::Storage(e),
        })?;
        Ok(user)
    }

    pub async fn update_last_login(db: &PgPool, id: Uuid) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET last_login = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        profile_picture: Option<&str>,
    ) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                profile_picture = COALESCE($3, profile_picture),
                updated_at = now()
            WHERE id = $1 AND is_active = TRUE
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(profile_picture)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
        Ok(user)
    }

    pub async fn set_password_hash(db: &PgPool, id: Uuid, password_hash: &str) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn fake(username: &str, email: &str) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            name: "Test User".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            profile_picture: None,
            coins: 10,
            quizzes_taken: 0,
            quizzes_created: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

impl PublicProfile {
    pub async fn find_by_username(db: &PgPool, username: &str) -> ApiResult<Option<PublicProfile>> {
        let profile = sqlx::query_as::<_, PublicProfile>(
            r#"
            SELECT id, username, name, profile_picture, coins,
                   quizzes_taken, quizzes_created, created_at, last_login
            FROM users
            WHERE username = $1 AND is_active = TRUE
            "#,
        )
        .bind(username.trim().to_lowercase())
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}

/// Balance adjustment modes. `subtract` and `set` floor at zero; `add`
/// is clamped the same way since the balance invariant is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinOp {
    Set,
    Add,
    Subtract,
}

/// Pure clamp arithmetic; the single source of truth for balance math.
pub fn apply_coin_op(current: i64, amount: i64, op: CoinOp) -> i64 {
    let raw = match op {
        CoinOp::Set => amount,
        CoinOp::Add => current.saturating_add(amount),
        CoinOp::Subtract => current.saturating_sub(amount),
    };
    raw.max(0)
}

/// Transactional read-modify-write: the row lock serializes concurrent
/// adjustments for the same user without blocking other users.
pub async fn adjust_coins(
    db: &PgPool,
    user_id: Uuid,
    amount: i64,
    op: CoinOp,
) -> ApiResult<(i64, i64)> {
    let mut tx = db.begin().await?;
    let previous: i64 = sqlx::query_scalar(
        r#"
        SELECT coins FROM users
        WHERE id = $1 AND is_active = TRUE
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    let new_amount = apply_coin_op(previous, amount, op);
    sqlx::query(
        r#"
        UPDATE users SET coins = $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(new_amount)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok((previous, new_amount))
}

/// Achievement badge; at most one per (user, quiz).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub result_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub coin_value: i64,
    pub earned_at: OffsetDateTime,
}

pub struct BadgeAward<'a> {
    pub quiz_id: Uuid,
    pub result_id: Uuid,
    pub title: &'a str,
    pub image: Option<&'a str>,
    pub coin_value: i64,
}

impl Badge {
    /// Atomic upsert keyed on (user_id, quiz_id): re-earning replaces the
    /// existing badge in place instead of duplicating. `xmax = 0` tells an
    /// insert apart from a conflict-update within the same statement.
    pub async fn upsert(db: &PgPool, user_id: Uuid, award: &BadgeAward<'_>) -> ApiResult<(Badge, bool)> {
        let row = sqlx::query(
            r#"
            INSERT INTO user_badges (user_id, quiz_id, result_id, title, image, coin_value)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, quiz_id) DO UPDATE
            SET result_id = EXCLUDED.result_id,
                title = EXCLUDED.title,
                image = EXCLUDED.image,
                coin_value = EXCLUDED.coin_value,
                earned_at = now()
            RETURNING id, user_id, quiz_id, result_id, title, image, coin_value, earned_at,
                      (xmax = 0) AS is_new
            "#,
        )
        .bind(user_id)
        .bind(award.quiz_id)
        .bind(award.result_id)
        .bind(award.title)
        .bind(award.image)
        .bind(award.coin_value)
        .fetch_one(db)
        .await?;

        let badge = Badge {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            quiz_id: row.try_get("quiz_id")?,
            result_id: row.try_get("result_id")?,
            title: row.try_get("title")?,
            image: row.try_get("image")?,
            coin_value: row.try_get("coin_value")?,
            earned_at: row.try_get("earned_at")?,
        };
        let is_new: bool = row.try_get("is_new")?;
        Ok((badge, is_new))
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> ApiResult<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>(
            r#"
            SELECT id, user_id, quiz_id, result_id, title, image, coin_value, earned_at
            FROM user_badges
            WHERE user_id = $1
            ORDER BY earned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(badges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_floors_at_zero() {
        assert_eq!(apply_coin_op(50, -10, CoinOp::Set), 0);
        assert_eq!(apply_coin_op(50, 0, CoinOp::Set), 0);
        assert_eq!(apply_coin_op(0, 25, CoinOp::Set), 25);
    }

    #[test]
    fn subtract_never_goes_negative() {
        assert_eq!(apply_coin_op(10, 25, CoinOp::Subtract), 0);
        assert_eq!(apply_coin_op(10, 10, CoinOp::Subtract), 0);
        assert_eq!(apply_coin_op(10, 3, CoinOp::Subtract), 7);
        assert_eq!(apply_coin_op(0, 1, CoinOp::Subtract), 0);
        // Holds for any starting balance >= 0 when amount exceeds it.
        for current in [0i64, 1, 9, 100, 1_000_000] {
            assert_eq!(apply_coin_op(current, i64::MAX, CoinOp::Subtract), 0);
        }
    }

    #[test]
    fn add_increments_and_clamps() {
        assert_eq!(apply_coin_op(10, 5, CoinOp::Add), 15);
        assert_eq!(apply_coin_op(10, 0, CoinOp::Add), 10);
        // Negative increments exist in principle; the balance invariant
        // still floors the result at zero.
        assert_eq!(apply_coin_op(10, -25, CoinOp::Add), 0);
    }

    #[test]
    fn coin_op_deserializes_lowercase() {
        assert_eq!(
            serde_json::from_str::<CoinOp>(r#""subtract""#).unwrap(),
            CoinOp::Subtract
        );
        assert_eq!(serde_json::from_str::<CoinOp>(r#""set""#).unwrap(), CoinOp::Set);
        assert!(serde_json::from_str::<CoinOp>(r#""divide""#).is_err());
    }

    #[test]
    fn public_user_has_no_credential_field() {
        let user = User::fake("lucas_feliciano", "lucas@example.com");
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("password"));
        assert!(obj.contains_key("username"));
        assert!(obj.contains_key("coins"));
    }
}
