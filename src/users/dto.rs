use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{Badge, CoinOp, PublicProfile, PublicUser};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(rename = "profilePicture")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustCoinsRequest {
    pub amount: i64,
    #[serde(default = "default_coin_op")]
    pub operation: CoinOp,
}

fn default_coin_op() -> CoinOp {
    CoinOp::Set
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardBadgeRequest {
    pub quiz_id: Uuid,
    pub result_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub coin_value: i64,
}

/// A user's own record with their badge set attached.
#[derive(Debug, Serialize)]
pub struct UserWithBadges {
    #[serde(flatten)]
    pub user: PublicUser,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: ProfileWithBadges,
}

#[derive(Debug, Serialize)]
pub struct ProfileWithBadges {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsResponse {
    pub message: &'static str,
    pub user: UserWithBadges,
    pub previous_amount: i64,
    pub new_amount: i64,
}

#[derive(Debug, Serialize)]
pub struct BadgeResponse {
    pub message: &'static str,
    pub badge: Badge,
    pub user: UserWithBadges,
}

#[derive(Debug, Serialize)]
pub struct SubmissionsResponse {
    pub submissions: Vec<crate::quizzes::repo::Submission>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::User;

    #[test]
    fn user_with_badges_flattens_and_strips_credentials() {
        let user = User::fake("lucas_feliciano", "lucas@example.com");
        let body = UserWithBadges {
            user: user.into(),
            badges: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("username").is_some());
        assert!(json.get("badges").is_some());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn adjust_coins_defaults_to_set() {
        let req: AdjustCoinsRequest = serde_json::from_str(r#"{"amount": 5}"#).unwrap();
        assert_eq!(req.operation, CoinOp::Set);
        let req: AdjustCoinsRequest =
            serde_json::from_str(r#"{"amount": 5, "operation": "add"}"#).unwrap();
        assert_eq!(req.operation, CoinOp::Add);
    }
}
