use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use jobscout_core::{
    ApiClient, Outcome, RunControl, RunSession, SessionUpdate, merge_suggestions, strings,
};
use jobscout_model::{RunId, StopRunRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{WatchConfig, WatchConfigSource};

#[derive(Parser)]
#[command(name = "jobscoutctl", about = "Start, watch and stop job-scraping runs")]
struct Cli {
    /// Config file (TOML or JSON); overrides $JOBSCOUT_CONFIG_PATH
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Run server root URL
    #[arg(long, global = true)]
    server: Option<String>,
    /// Run-control request timeout, e.g. `15s`
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a run and follow its event stream until it ends or Ctrl-C
    Watch(WatchArgs),
    /// Print server-suggested sources merged with the given input
    Suggest(SourceArgs),
    /// Stop a run by id
    Stop {
        #[arg(long)]
        run_id: String,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct SourceArgs {
    /// Source URL; repeat for several
    #[arg(long = "url")]
    urls: Vec<String>,
    /// File with one source URL per line
    #[arg(long)]
    urls_file: Option<PathBuf>,
}

impl SourceArgs {
    fn pending_input(&self) -> Result<String> {
        let mut lines = self.urls.clone();
        if let Some(path) = &self.urls_file {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read sources from {}", path.display()))?;
            lines.push(contents);
        }
        Ok(lines.join("\n"))
    }
}

#[derive(Args)]
struct WatchArgs {
    #[command(flatten)]
    sources: SourceArgs,
    /// Seed the input with the server's suggested sources
    #[arg(long)]
    suggest: bool,
    /// Deliver passed postings to the server's mock outbound sink
    #[arg(long)]
    mock_outbound: bool,
    /// Write the activity log here when the watch ends
    #[arg(long)]
    export_log: Option<PathBuf>,
    /// Interval between progress summaries
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    summary_every: Duration,
    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> Result<(WatchConfig, WatchConfigSource)> {
    let (config, source) = match &cli.config {
        Some(path) => (
            WatchConfig::load_from_file(path)?,
            WatchConfigSource::Cli(path.clone()),
        ),
        None => WatchConfig::load_from_env()?,
    };

    let mut config = config.with_server_override(cli.server.clone());
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout.as_secs().max(1);
    }
    config
        .validate()
        .with_context(|| format!("invalid configuration from {source}"))?;

    tracing::debug!(%source, server = %config.server_url, "configuration loaded");
    Ok((config, source))
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = dotenv {
        tracing::warn!("failed to load .env: {}", err);
    }

    let cli = Cli::parse();
    let (config, source) = load_config(&cli)?;

    match cli.command {
        Command::Watch(args) => watch(&config, args).await,
        Command::Suggest(args) => {
            let api = ApiClient::new(&config.server_url, config.request_timeout())?;
            let suggestions = api.suggest_sources().await?;
            println!("{}", merge_suggestions(&suggestions.urls, &args.pending_input()?));
            Ok(())
        }
        Command::Stop { run_id } => {
            let api = ApiClient::new(&config.server_url, config.request_timeout())?;
            let ack = api
                .stop_run(&StopRunRequest {
                    run_id: RunId::new(run_id)?,
                })
                .await?;
            println!("{} {}", ack.status, ack.run_id.unwrap_or_default());
            Ok(())
        }
        Command::Config => {
            println!("# source: {source}");
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
    }
}

async fn watch(config: &WatchConfig, args: WatchArgs) -> Result<()> {
    let api = ApiClient::new(&config.server_url, config.request_timeout())?;
    let transport = Arc::new(api.event_transport()?);
    let mut session = RunSession::new(Arc::new(api), transport)
        .with_layout(config.layout())
        .with_mock_outbound(args.mock_outbound || config.use_mock_outbound);

    let mut input = args.sources.pending_input()?;
    if args.suggest {
        match session.suggest_sources(&input).await {
            Ok(merged) => input = merged,
            Err(e) => tracing::warn!("sources fetch failed: {}", e),
        }
    }

    let handle = match session.start(&input).await {
        Ok(handle) => handle,
        Err(e) if e.is_validation() => bail!(strings::NO_SOURCES),
        Err(e) => return Err(e).context("failed to start run"),
    };
    println!("{} ({} sources)", session.projection().status_text, handle.urls.len());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(args.summary_every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupt received, stopping run {}", handle.run_id);
                break;
            }
            _ = ticker.tick() => {
                println!("{}", session.summary());
            }
            update = session.next_update() => match update {
                Some(SessionUpdate::Reconciled(Outcome::JobPassed { region: Some(region) })) => {
                    if let Some(job) = session
                        .projection()
                        .regions
                        .get(&region)
                        .and_then(|jobs| jobs.front())
                    {
                        println!("[{region}] {:>5} {} <{}>", job.score, job.title, job.url);
                    }
                }
                Some(SessionUpdate::Disconnected(reason)) => {
                    tracing::warn!("event stream closed: {}", reason);
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    if let Err(e) = session.stop().await {
        tracing::warn!("failed to stop run {}: {}", handle.run_id, e);
    }

    if let Some(path) = &args.export_log {
        fs::write(path, session.export_logs())
            .with_context(|| format!("failed to write activity log to {}", path.display()))?;
        tracing::info!("activity log written to {}", path.display());
    }

    let summary = session.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
