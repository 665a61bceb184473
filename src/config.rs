use std::{env, path::PathBuf, time::Duration};

use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub cors_origin: Option<String>,
    pub search_rate_limit: u32,
    pub search_rate_window: Duration,
}

impl Config {
    pub fn init() -> Config {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let port = parse_or("PORT", 8080u16);
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        Config {
            database_url,
            jwt_secret,
            port,
            upload_dir: PathBuf::from(upload_dir),
            public_url,
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            search_rate_limit: parse_or("SEARCH_RATE_LIMIT", 30u32),
            search_rate_window: Duration::from_secs(parse_or("SEARCH_RATE_WINDOW_SECS", 60u64)),
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} has an invalid value: {raw}")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
