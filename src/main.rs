use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_topic_alert::config::Config;
use forum_topic_alert::runner::{RunOutcome, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        forum = %config.forum_name,
        category_url = %config.category_url,
        state_path = %config.state_path.display(),
        force_latest = config.force_latest,
        "Configuration loaded"
    );

    let runner = Runner::from_config(&config).context("Failed to initialize runner")?;
    let outcome = runner.run().await.context("Run aborted")?;

    match outcome {
        RunOutcome::NoTopics => info!("Run complete, category is empty"),
        RunOutcome::Initialized { last_topic_id } => {
            info!(last_topic_id, "Run complete, watermark initialized");
        }
        RunOutcome::UpToDate { last_topic_id } => {
            info!(last_topic_id, "Run complete, nothing new");
        }
        RunOutcome::Notified {
            sent,
            last_topic_id,
        } => info!(sent, last_topic_id, "Run complete"),
        RunOutcome::Previewed { topic_id } => info!(topic_id, "Run complete, preview sent"),
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_topic_alert=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
