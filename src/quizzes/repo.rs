use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

/// Quiz metadata consumed by the submission gate. Quiz content itself
/// (questions, options, scoring) lives with the quiz collaborator.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizMeta {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub expires_at: Option<OffsetDateTime>,
    pub taken_count: i64,
    pub created_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuizResult {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub coin_value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub result_id: Uuid,
    pub answers: Option<serde_json::Value>,
    pub traits: Option<serde_json::Value>,
    pub submitted_at: OffsetDateTime,
}

impl QuizMeta {
    /// Published quizzes only; expiry is the caller's check so that an
    /// expired quiz can be told apart from a missing one.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> ApiResult<Option<QuizMeta>> {
        let quiz = sqlx::query_as::<_, QuizMeta>(
            r#"
            SELECT id, title, description, is_published, expires_at,
                   taken_count, created_by, created_at
            FROM quizzes
            WHERE id = $1 AND is_published = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(quiz)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_at, Some(at) if at < now)
    }

    pub async fn increment_taken(db: &PgPool, id: Uuid) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE quizzes SET taken_count = taken_count + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// New quizzes start unpublished.
    pub async fn create(
        db: &PgPool,
        title: &str,
        description: Option<&str>,
        expires_at: Option<OffsetDateTime>,
        created_by: Uuid,
    ) -> ApiResult<QuizMeta> {
        let quiz = sqlx::query_as::<_, QuizMeta>(
            r#"
            INSERT INTO quizzes (title, description, expires_at, created_by, is_published)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, title, description, is_published, expires_at,
                      taken_count, created_by, created_at
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(expires_at)
        .bind(created_by)
        .fetch_one(db)
        .await?;
        Ok(quiz)
    }
}

impl QuizResult {
    /// Membership check: the result must belong to this quiz's result set.
    pub async fn find_for_quiz(
        db: &PgPool,
        quiz_id: Uuid,
        result_id: Uuid,
    ) -> ApiResult<Option<QuizResult>> {
        let result = sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT id, quiz_id, title, image, coin_value
            FROM quiz_results
            WHERE id = $1 AND quiz_id = $2
            "#,
        )
        .bind(result_id)
        .bind(quiz_id)
        .fetch_optional(db)
        .await?;
        Ok(result)
    }
}

impl Submission {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        quiz_id: Uuid,
        result_id: Uuid,
        answers: Option<&serde_json::Value>,
        traits: Option<&serde_json::Value>,
    ) -> ApiResult<Submission> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO quiz_submissions (user_id, quiz_id, result_id, answers, traits)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, quiz_id, result_id, answers, traits, submitted_at
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(result_id)
        .bind(answers)
        .bind(traits)
        .fetch_one(db)
        .await?;
        Ok(submission)
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> ApiResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT id, user_id, quiz_id, result_id, answers, traits, submitted_at
            FROM quiz_submissions
            WHERE user_id = $1
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn meta(expires_at: Option<OffsetDateTime>) -> QuizMeta {
        let now = OffsetDateTime::now_utc();
        QuizMeta {
            id: Uuid::new_v4(),
            title: "Which founder are you?".into(),
            description: None,
            is_published: true,
            expires_at,
            taken_count: 0,
            created_by: None,
            created_at: now,
        }
    }

    #[test]
    fn quiz_without_expiry_never_expires() {
        let now = OffsetDateTime::now_utc();
        assert!(!meta(None).is_expired(now));
    }

    #[test]
    fn expiry_is_strictly_in_the_past() {
        let now = OffsetDateTime::now_utc();
        assert!(meta(Some(now - Duration::hours(1))).is_expired(now));
        assert!(!meta(Some(now + Duration::hours(1))).is_expired(now));
    }
}
