//! # Skycast: scheduled weather broadcasts for Telegram chats
//!
//! Usage:
//!   skycast                          # Run the bot (polling + daily broadcasts)
//!   skycast report --tomorrow        # Print tomorrow's report and exit
//!   skycast recipients list          # Show registered chats
//!   skycast next-runs                # When the daily jobs fire next

mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use skycast_channels::TelegramChannel;
use skycast_core::SkycastConfig;
use skycast_core::types::{DayOffset, RecipientId};
use skycast_scheduler::{
    Broadcaster, LoadOutcome, RecipientStore, ReportJob, SchedulerEngine, spawn_scheduler,
};
use skycast_weather::{ForecastAssembler, OpenMeteoProvider};
use tracing_subscriber::EnvFilter;

use crate::commands::CommandHandler;

#[derive(Parser)]
#[command(
    name = "skycast",
    version,
    about = "🌤 Skycast — daily weather reports for Telegram chats"
)]
struct Cli {
    /// Config file (default: ~/.skycast/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot: answer commands and broadcast on schedule
    Run,
    /// Build a report once and print it
    Report {
        /// Tomorrow's forecast instead of today's
        #[arg(long)]
        tomorrow: bool,
    },
    /// Inspect or edit the recipient registry
    Recipients {
        #[command(subcommand)]
        action: RecipientsAction,
    },
    /// Show when each daily job fires next
    NextRuns,
}

#[derive(Subcommand)]
enum RecipientsAction {
    List,
    Add {
        #[arg(allow_negative_numbers = true)]
        id: RecipientId,
    },
    Remove {
        #[arg(allow_negative_numbers = true)]
        id: RecipientId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "skycast=debug,skycast_core=debug,skycast_weather=debug,skycast_scheduler=debug,skycast_channels=debug"
    } else {
        "skycast=info,skycast_core=info,skycast_weather=info,skycast_scheduler=info,skycast_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;
    config.validate()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Report { tomorrow } => {
            let day = if tomorrow { DayOffset::Tomorrow } else { DayOffset::Today };
            let text = build_assembler(&config)?.build_report(day).await?;
            println!("{text}");
            Ok(())
        }
        Command::Recipients { action } => recipients(&config, action).await,
        Command::NextRuns => {
            let tz = config.schedule.timezone()?;
            for job in jobs(&config)? {
                let next = skycast_scheduler::next_fire_after(job.at, tz, chrono::Utc::now());
                println!(
                    "{:<10} {}",
                    job.name,
                    next.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z")
                );
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&str>) -> Result<SkycastConfig> {
    let config = match path {
        Some(p) => {
            let path = PathBuf::from(shellexpand::tilde(p).to_string());
            SkycastConfig::load_from(&path)?
        }
        None => SkycastConfig::load()?,
    };
    Ok(config)
}

fn build_assembler(config: &SkycastConfig) -> Result<ForecastAssembler> {
    let timeout = Duration::from_secs(config.weather.timeout_secs);
    let provider = OpenMeteoProvider::new(&config.weather.base_url, &config.schedule.timezone, timeout)?;
    Ok(ForecastAssembler::new(
        Arc::new(provider),
        config.locations.clone(),
        timeout,
    ))
}

fn jobs(config: &SkycastConfig) -> Result<Vec<ReportJob>> {
    Ok(vec![
        ReportJob::today(config.schedule.today_at()?),
        ReportJob::tomorrow(config.schedule.tomorrow_at()?),
    ])
}

async fn run(config: SkycastConfig) -> Result<()> {
    let token = config.bot_token()?;
    let tz = config.schedule.timezone()?;

    let store = Arc::new(RecipientStore::open(&config.storage.chats_path()?));
    let assembler = Arc::new(build_assembler(&config)?);
    let telegram = Arc::new(TelegramChannel::new(&token, &config.telegram)?);

    let me = telegram.get_me().await.context("Telegram getMe failed")?;
    tracing::info!(
        "🤖 Telegram bot: @{} ({})",
        me.username.as_deref().unwrap_or("unknown"),
        me.first_name
    );

    let broadcaster = Arc::new(Broadcaster::new(store.clone(), telegram.clone()));
    let engine = Arc::new(SchedulerEngine::new(
        jobs(&config)?,
        tz,
        assembler.clone(),
        broadcaster,
    ));
    for (job, at) in engine.next_runs(chrono::Utc::now()) {
        tracing::info!(
            "⏱ '{}' report due {}",
            job.name,
            at.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z")
        );
    }
    let _timers = spawn_scheduler(engine);

    let handler = Arc::new(CommandHandler::new(
        store.clone(),
        assembler,
        telegram.clone(),
        config.schedule.today_at()?,
        config.schedule.tomorrow_at()?,
    ));

    tracing::info!(
        "✅ Skycast running. Chats in broadcast list: {} (file: {})",
        store.len().await,
        store.path().display()
    );

    let mut events = telegram.start_polling(me);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    tracing::warn!("Telegram event stream ended");
                    break;
                };
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { handler.handle(event).await });
            }
            _ = &mut shutdown => {
                tracing::info!("👋 Shutting down");
                break;
            }
        }
    }
    Ok(())
}

async fn recipients(config: &SkycastConfig, action: RecipientsAction) -> Result<()> {
    let path = config.storage.chats_path()?;
    match action {
        RecipientsAction::List => match RecipientStore::load_from(&path) {
            LoadOutcome::Present(set) => {
                for id in &set {
                    println!("{id}");
                }
                eprintln!("{} recipient(s) in {}", set.len(), path.display());
            }
            LoadOutcome::Absent => eprintln!("No recipient file at {}", path.display()),
            LoadOutcome::Corrupt { reason } => {
                eprintln!("Recipient file {} is unreadable: {reason}", path.display());
            }
        },
        RecipientsAction::Add { id } => {
            let added = RecipientStore::open(&path).add(id).await?;
            println!("{}", if added { "added" } else { "already registered" });
        }
        RecipientsAction::Remove { id } => {
            let removed = RecipientStore::open(&path).remove(id).await?;
            println!("{}", if removed { "removed" } else { "not registered" });
        }
    }
    Ok(())
}
