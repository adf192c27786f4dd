// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Attempts at or above this percentage extend a user's streak.
pub const STREAK_THRESHOLD: i32 = 70;

/// Default and maximum row counts for list endpoints.
pub const GLOBAL_LEADERBOARD_LIMIT: i64 = 50;
pub const GLOBAL_LEADERBOARD_MAX: i64 = 100;
pub const QUIZ_LEADERBOARD_LIMIT: i64 = 10;
pub const QUIZ_LIST_MAX: i64 = 50;
pub const ATTEMPT_HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Reads the configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| format!("BIND_ADDR is not a socket address: {}", e))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            cors_origins,
        })
    }
}
