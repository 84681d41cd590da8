use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::RateLimitPolicy;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "wishwall")]
#[command(about = "Live birthday guestbook: wishes and hearts over WebSocket")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Interface to bind
    #[arg(long, env = "WISHWALL_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    // Directory holding greetings.json and hearts.json
    #[arg(short, long, env = "WISHWALL_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    // JSON array of forbidden words
    #[arg(short, long, env = "WISHWALL_BADWORDS", default_value = "badwords.json")]
    pub badwords: PathBuf,

    // Seconds between two wishes from one identity
    #[arg(long, default_value_t = 10)]
    pub wish_cooldown: u64,

    // Seconds between two hearts from one identity
    #[arg(long, default_value_t = 2)]
    pub heart_cooldown: u64,

    // Max wishes per identity per quota window
    #[arg(long, default_value_t = 10)]
    pub max_wishes_per_window: u32,

    // Quota window in seconds
    #[arg(long, default_value_t = 3600)]
    pub quota_window: u64,

    // Max wish length in characters
    #[arg(long, default_value_t = 500)]
    pub max_wish_len: usize,

    // Pending jobs before sessions wait on the worker
    #[arg(long, default_value_t = 100)]
    pub queue_capacity: usize,

    // Outbound events queued per session before it starts missing them
    #[arg(long, default_value_t = 64)]
    pub session_buffer: usize,

    // Emit logs as JSON lines
    #[arg(long, env = "WISHWALL_LOG_JSON")]
    pub log_json: bool,
}

impl Args {
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            wish_cooldown: Duration::from_secs(self.wish_cooldown),
            heart_cooldown: Duration::from_secs(self.heart_cooldown),
            max_wishes_per_window: self.max_wishes_per_window,
            window: Duration::from_secs(self.quota_window),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
