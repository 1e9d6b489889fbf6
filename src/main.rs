use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rate_limit_redis::config::LimiterConfig;
use rate_limit_redis::{RateLimiter, RedisStore};

/// Send a burst of requests for one tracker through a Redis-backed rate limiter.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Redis URL, overriding the configuration
    #[arg(long)]
    url: Option<String>,

    /// Tracker to rate limit (client IP, user ID, ...)
    #[arg(short, long, default_value = "192.168.1.0")]
    tracker: String,

    /// Number of requests to send
    #[arg(short = 'n', long, default_value_t = 20)]
    requests: u32,

    /// Pause between requests in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let mut config = LimiterConfig::load(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.store.url = url;
    }
    let policy = config.policy.to_policy()?;

    info!(
        url = %config.store.url,
        max_allowed_hits = policy.max_allowed_hits(),
        window_seconds = policy.window_seconds(),
        "Configuration loaded"
    );

    let store = RedisStore::connect(&config.store.url)
        .await
        .context("Could not connect to Redis")?;
    let limiter = RateLimiter::with_policy(store, policy)
        .context("Could not initialize rate limiter")?;

    for i in 1..=args.requests {
        let allowed = limiter
            .allow(&args.tracker)
            .await
            .context("Error checking rate limit")?;

        if allowed {
            info!(request = i, tracker = %args.tracker, "Request allowed");
        } else {
            warn!(request = i, tracker = %args.tracker, "Request rate limited");
        }

        if i < args.requests {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    Ok(())
}
