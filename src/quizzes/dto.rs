use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{QuizMeta, QuizResult, Submission};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub result_id: Uuid,
    pub answers: Option<serde_json::Value>,
    pub traits: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub message: &'static str,
    pub result: QuizResult,
    pub coins_earned: i64,
    pub is_guest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<Submission>,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub quiz: QuizMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub expires_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_response_omits_submission() {
        let response = SubmitQuizResponse {
            message: "Quiz result submitted successfully",
            result: QuizResult {
                id: Uuid::new_v4(),
                quiz_id: Uuid::new_v4(),
                title: "The Visionary".into(),
                image: None,
                coin_value: 5,
            },
            coins_earned: 0,
            is_guest: true,
            submission: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["coinsEarned"], 0);
        assert_eq!(json["isGuest"], true);
        assert!(json.get("submission").is_none());
    }
}
