use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use mood_insights::application::*;
use mood_insights::insights::InsightGenerator;
use mood_insights::journal::Emotion;
use mood_insights::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mood-insights")]
#[command(about = "AI insight pipeline for mood journal entries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background insight worker until interrupted
    Run,
    /// Apply database migrations
    Migrate,
    /// Log a new mood entry
    Add {
        #[arg(long)]
        user: String,
        /// happy, sad, neutral, angry or anxious
        #[arg(long)]
        emotion: Option<Emotion>,
        #[arg(long)]
        emoji: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// Identifier of an attached audio recording
        #[arg(long)]
        audio: Option<String>,
        /// Entry date (RFC 3339); defaults to now
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },
    /// Show the insight for an entry, generating it if still pending
    Insight {
        #[arg(long)]
        user: String,
        entry_id: String,
    },
    /// Discard and regenerate the insight for an entry
    Regenerate {
        #[arg(long)]
        user: String,
        entry_id: String,
    },
    /// Return an entry to pending so the worker retries it
    Reset {
        #[arg(long)]
        user: String,
        entry_id: String,
    },
    /// Summarize the past week of entries
    Weekly {
        #[arg(long)]
        user: String,
    },
    /// Show stored insight state for up to 20 entries
    Batch {
        #[arg(long)]
        user: String,
        #[arg(required = true)]
        entry_ids: Vec<String>,
    },
    /// AI availability and per-user processing counts
    Status {
        #[arg(long)]
        user: String,
    },
    /// Send a minimal request to the AI service
    TestConnection,
    /// Print a configuration diagnostic report
    Config,
    /// Generate a sample .env file
    InitConfig {
        #[arg(long, default_value = ".env")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());
    let json = format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .init();
}

fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists. Use --force to overwrite it.",
            output.display()
        ));
    }
    std::fs::write(output, Config::sample_env())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Sample configuration written to {}", output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    // Needs no database or environment
    if let Commands::InitConfig { output, force } = &command {
        return init_config(output, *force);
    }

    let config = Config::from_env()?;
    init_logging(&config.operational.log_level, &config.operational.log_format);

    match command {
        Commands::Config => {
            print!("{}", config.create_diagnostic_report());
            return Ok(());
        }
        Commands::TestConnection => {
            let generator = DependencyContainer::create_generator(&config)?;
            return print_json(&generator.test_connection().await);
        }
        _ => {}
    }

    let app = Application::new(config).await?;
    app.initialize().await?;

    let entries = EntryCommandHandler::new(app.container.clone());
    let result = match command {
        Commands::Run => {
            WorkerCommandHandler::new(app.container.clone(), app.lifecycle.clone())
                .run()
                .await
        }
        Commands::Migrate => {
            DatabaseCommandHandler::new(app.container.clone())
                .migrate()
                .await
        }
        Commands::Add {
            user,
            emotion,
            emoji,
            note,
            audio,
            date,
        } => entries.add(&user, emotion, emoji, note, audio, date).await,
        Commands::Insight { user, entry_id } => entries.insight(&user, &entry_id).await,
        Commands::Regenerate { user, entry_id } => entries.regenerate(&user, &entry_id).await,
        Commands::Reset { user, entry_id } => entries.reset(&user, &entry_id).await,
        Commands::Weekly { user } => entries.weekly(&user).await,
        Commands::Batch { user, entry_ids } => entries.batch(&user, &entry_ids).await,
        Commands::Status { user } => entries.status(&user).await,
        Commands::TestConnection | Commands::Config | Commands::InitConfig { .. } => Ok(()),
    };

    app.shutdown().await?;
    result
}
