//! Press review CLI - grounded weekly digest with Slack approval.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use notify::{DeliveryChannel, SlackClient};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use press_review::citations::{Annotator, CitationMode};
use press_review::config::{
    env_lookup, Config, DeliveryConfig, GenerationConfig, MAX_DURATION_SECS,
};
use press_review::{
    generate_digest, GeminiClient, InteractionListener, ReviewCoordinator, ReviewWorkflow,
    WorkflowOutcome, WorkflowSettings,
};

/// Press review CLI - generate, cite, review and publish a news digest.
#[derive(Parser)]
#[command(name = "press-review")]
#[command(about = "Grounded weekly press review with Slack approval")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a digest, post it for review and publish it once approved
    Run {
        #[command(flatten)]
        generation: GenerationArgs,

        /// Review deadline in seconds (overrides REVIEW_TIMEOUT_SECS)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Generate a digest and print it without touching Slack
    Preview {
        #[command(flatten)]
        generation: GenerationArgs,

        /// Print the raw generated document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a digest and publish it directly, without review
    Send {
        #[command(flatten)]
        generation: GenerationArgs,
    },
}

/// Overrides for the generation settings read from the environment.
#[derive(Args, Debug, Default)]
pub struct GenerationArgs {
    /// Digest subject
    #[arg(long)]
    topic: Option<String>,

    /// Gemini model to use
    #[arg(long)]
    model: Option<String>,

    /// Number of news items
    #[arg(long)]
    item_count: Option<u32>,

    /// Citation placement: auto, substring or offset
    #[arg(long)]
    citation_mode: Option<CitationMode>,
}

impl GenerationArgs {
    fn apply(self, config: &mut GenerationConfig) {
        if let Some(topic) = self.topic {
            config.prompt = config.prompt.clone().with_topic(topic);
        }
        if let Some(model) = self.model {
            config.prompt.model = model;
        }
        if let Some(item_count) = self.item_count {
            config.prompt.item_count = item_count;
        }
        if let Some(mode) = self.citation_mode {
            config.citation_mode = mode;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("press_review=debug,notify=debug,info")
        } else {
            EnvFilter::new("press_review=info,notify=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            generation,
            timeout_secs,
        } => run_review(generation, timeout_secs).await,
        Commands::Preview { generation, json } => run_preview(generation, json).await,
        Commands::Send { generation } => run_send(generation).await,
    }
}

fn gemini(config: &GenerationConfig) -> GeminiClient {
    let client = GeminiClient::new(&config.api_key);
    match &config.base_url {
        Some(url) => client.with_base_url(url),
        None => client,
    }
}

fn slack(config: &DeliveryConfig) -> SlackClient {
    let client = SlackClient::new(&config.bot_token);
    match &config.api_base_url {
        Some(url) => client.with_base_url(url),
        None => client,
    }
}

async fn run_review(args: GenerationArgs, timeout_secs: Option<u64>) -> Result<()> {
    let mut config = Config::from_env().context("Invalid configuration")?;
    args.apply(&mut config.generation);
    if let Some(secs) = timeout_secs.filter(|s| *s > 0) {
        if secs > MAX_DURATION_SECS {
            anyhow::bail!("--timeout-secs must be at most {MAX_DURATION_SECS}");
        }
        config.review.timeout = std::time::Duration::from_secs(secs);
    }

    tracing::info!(
        topic = %config.generation.prompt.topic,
        model = %config.generation.prompt.model,
        cutoff = %config.generation.prompt.cutoff,
        review_channel = %config.review.review_channel,
        timeout_secs = config.review.timeout.as_secs(),
        "Starting press review"
    );

    let coordinator = Arc::new(ReviewCoordinator::new());
    let listener = InteractionListener::bind(
        config.review.listen_addr,
        Arc::clone(&coordinator),
        config.review.signing_secret.clone(),
    )
    .await
    .with_context(|| format!("Failed to bind {}", config.review.listen_addr))?;

    let workflow = ReviewWorkflow::new(
        Arc::new(gemini(&config.generation)),
        Arc::new(slack(&config.delivery)),
        coordinator,
        WorkflowSettings::from_config(&config),
    );

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping");
                cancel.cancel();
            }
        })
    };

    let result = workflow.run(&cancel).await;

    ctrl_c.abort();
    listener.shutdown().await;

    match result.context("Press review failed")? {
        WorkflowOutcome::Published(receipt) => {
            tracing::info!(message = %receipt.id, "Press review published");
        }
        WorkflowOutcome::TimedOut => {
            tracing::info!("Review window closed, nothing published");
        }
        WorkflowOutcome::Cancelled => {
            tracing::info!("Press review cancelled, nothing published");
        }
    }
    Ok(())
}

async fn run_preview(args: GenerationArgs, json: bool) -> Result<()> {
    let mut config = GenerationConfig::from_lookup(&env_lookup).context("Invalid configuration")?;
    args.apply(&mut config);

    let digest = generate_digest(
        &gemini(&config),
        &config.prompt,
        Annotator::new(config.citation_mode),
        config.max_attempts,
    )
    .await
    .context("Failed to generate digest")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&digest.document)?);
    } else {
        println!("{}", digest.text);
    }
    Ok(())
}

async fn run_send(args: GenerationArgs) -> Result<()> {
    let mut generation =
        GenerationConfig::from_lookup(&env_lookup).context("Invalid configuration")?;
    args.apply(&mut generation);
    let delivery = DeliveryConfig::from_lookup(&env_lookup).context("Invalid configuration")?;

    let digest = generate_digest(
        &gemini(&generation),
        &generation.prompt,
        Annotator::new(generation.citation_mode),
        generation.max_attempts,
    )
    .await
    .context("Failed to generate digest")?;

    let receipt = slack(&delivery)
        .post_text(
            &delivery.main_channel,
            &digest.text,
            delivery.max_block_chars,
            false,
        )
        .await
        .context("Failed to publish digest")?;

    tracing::info!(message = %receipt.id, "Press review sent");
    Ok(())
}
