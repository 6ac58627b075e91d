//! courier - webhook task runner
//!
//! ```text
//! courier serve [--config courier.toml] [--sweep-interval 3600]
//! courier tasks
//! courier sign --body '{"module":"math","function":"add","args":[2,3]}'
//! courier dispatch math.add --args '[2,3]' --countdown 60
//! ```

mod tasks;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_core::app::signature::sign;
use courier_core::app::{App, AppBuilder};
use courier_core::config::Settings;
use courier_core::domain::ApplyOptions;
use courier_core::server::{AppState, build_router};
use courier_core::typed::Arguments;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Run and dispatch webhook-delivered tasks")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the webhook endpoint
    Serve(ServeArgs),
    /// List registered tasks
    Tasks,
    /// Print a signature header value for a body (local testing)
    Sign(SignArgs),
    /// Publish one task through the delivery service
    Dispatch(DispatchArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Seconds between result retention sweeps
    #[arg(long, default_value_t = 3600)]
    sweep_interval: u64,
}

#[derive(Args)]
struct SignArgs {
    /// Raw request body
    #[arg(long)]
    body: String,

    /// URL the request will be sent to (defaults to the callback URL)
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args)]
struct DispatchArgs {
    /// Dotted task path, e.g. `math.add`
    path: String,

    /// Positional arguments as a JSON list
    #[arg(long, default_value = "[]")]
    args: String,

    /// Keyword arguments as a JSON object
    #[arg(long, default_value = "{}")]
    kwargs: String,

    /// Delay before first delivery, in seconds
    #[arg(long)]
    countdown: Option<u64>,

    /// Explicit deduplication key
    #[arg(long)]
    deduplication_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=info,courier_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Tasks => {
            for (path, label) in tasks::registry()?.discover() {
                println!("{path}\t{label}");
            }
            Ok(())
        }
        Commands::Serve(args) => serve(build_app(cli.config.as_deref())?, args).await,
        Commands::Sign(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            let url = args.url.unwrap_or_else(|| settings.callback_url());
            let token = sign(
                &settings.signing_keys().current,
                args.body.as_bytes(),
                &url,
                Utc::now(),
            )?;
            println!("{token}");
            Ok(())
        }
        Commands::Dispatch(args) => dispatch(build_app(cli.config.as_deref())?, args).await,
    }
}

fn build_app(config: Option<&std::path::Path>) -> Result<App, Box<dyn Error>> {
    let settings = Settings::load(config)?;
    let app = AppBuilder::new(settings)
        .registry(tasks::registry()?)
        .build()?;
    Ok(app)
}

async fn serve(app: App, args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let app = Arc::new(app);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = app.sweeper().map(|sweeper| {
        let interval = Duration::from_secs(args.sweep_interval.max(1));
        tokio::spawn(async move { sweeper.run(interval, shutdown_rx).await })
    });

    let listener = tokio::net::TcpListener::bind(app.settings().bind()).await?;
    info!(
        addr = %listener.local_addr()?,
        webhook = %app.settings().callback_url(),
        tasks = app.registry().len(),
        "listening"
    );

    let router = build_router(AppState::new(Arc::clone(&app)));
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    // ignore send error: the sweeper may not be running
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    Ok(())
}

async fn dispatch(app: App, args: DispatchArgs) -> Result<(), Box<dyn Error>> {
    let positional: Vec<Value> = serde_json::from_str(&args.args)?;
    let keywords: Map<String, Value> = serde_json::from_str(&args.kwargs)?;

    let mut options = ApplyOptions::new();
    if let Some(seconds) = args.countdown {
        options = options.countdown(seconds);
    }
    if let Some(key) = args.deduplication_id {
        options = options.deduplication_id(key);
    }

    let handle = app
        .dispatch()
        .apply_async(&args.path, Arguments::from_parts(positional, keywords), options)
        .await?;
    println!("{}", handle.task_id());
    Ok(())
}
