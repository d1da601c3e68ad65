use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Left unset, token issue/verify fails with a configuration error
    /// rather than silently signing with a default secret.
    pub secret: Option<String>,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub starting_coins: i64,
    pub creator_usernames: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").ok(),
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let starting_coins = std::env::var("STARTING_COINS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);
        let creator_usernames = std::env::var("CREATOR_USERNAMES")
            .unwrap_or_else(|_| "lucas_feliciano,lucasfeliciano".into())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            database_url,
            jwt,
            starting_coins,
            creator_usernames,
        })
    }
}
