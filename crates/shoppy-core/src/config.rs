use std::{env, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the bot, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    /// Used to build invite links. When unset the adapter asks Telegram (`getMe`).
    pub bot_username: Option<String>,

    // Storage
    pub database_path: PathBuf,
    pub database_max_connections: u32,

    // Screens
    pub page_size: usize,

    // Notifications
    pub notification_throttle: Duration,

    // Activity log
    pub activity_view_limit: u32,
    pub activity_retention_days: u32,
    pub activity_prune_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing `.env` is fine; existing variables always win.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let bot_username = lookup("TELEGRAM_BOT_USERNAME")
            .and_then(non_empty)
            .map(|s| s.trim().trim_start_matches('@').to_string());

        let database_path = PathBuf::from(
            lookup("SHOPPY_DB_PATH")
                .and_then(non_empty)
                .unwrap_or_else(|| "./data/shoppy.sqlite".to_string()),
        );
        let database_max_connections =
            parse_num::<u32>(lookup("SHOPPY_DB_MAX_CONNECTIONS")).unwrap_or(5).max(1);

        let page_size = parse_num::<usize>(lookup("SHOPPY_PAGE_SIZE"))
            .unwrap_or(6)
            .max(1);

        let notification_throttle = Duration::from_millis(
            parse_num::<u64>(lookup("SHOPPY_NOTIFY_THROTTLE_MS")).unwrap_or(2_000),
        );

        let activity_view_limit =
            parse_num::<u32>(lookup("SHOPPY_ACTIVITY_VIEW_LIMIT")).unwrap_or(25);
        let activity_retention_days =
            parse_num::<u32>(lookup("SHOPPY_ACTIVITY_RETENTION_DAYS")).unwrap_or(30);
        let activity_prune_interval = Duration::from_secs(
            parse_num::<u64>(lookup("SHOPPY_ACTIVITY_PRUNE_INTERVAL_SECS"))
                .unwrap_or(6 * 60 * 60)
                .max(60),
        );

        Ok(Self {
            telegram_bot_token,
            bot_username,
            database_path,
            database_max_connections,
            page_size,
            notification_throttle,
            activity_view_limit,
            activity_retention_days,
            activity_prune_interval,
        })
    }
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
