//! `bouncerd` — standalone daemon binary for the Bouncer authorization
//! broker.
//!
//! Thin entry point: load configuration, wire the domain crates into one
//! [`bouncer_pipeline::PipelineContext`], then spawn the chat poller, the
//! RPC server and the TTL reaper as independent background tasks. Mirrors
//! `astridd`'s daemon_main shape: one `DaemonServer::start`-equivalent
//! wiring step, then `tokio::select!` on a shutdown signal.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config_bridge;

use std::sync::Arc;

use anyhow::{Context, Result};
use bouncer_chat::{ChatChannel, Poller};
use bouncer_config::BouncerConfig;
use bouncer_pipeline::{CallbackHandler, PipelineContext};
use bouncer_store::{Database, Store};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Bouncer Daemon — background authorization-broker runtime server.
#[derive(Parser)]
#[command(name = "bouncerd")]
#[command(author, version, about = "Bouncer daemon — authorization-broker runtime server")]
struct Args {
    /// Workspace root to resolve `bouncer.toml` against (defaults to cwd).
    #[arg(long)]
    workspace: Option<std::path::PathBuf>,

    /// Enable verbose (debug) logging, overriding `logging.filter`.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(cfg: &BouncerConfig, verbose: bool) {
    let directive = if verbose { "debug" } else { cfg.logging.filter.as_str() };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if cfg.logging.json {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init()
    };
    if let Err(error) = result {
        eprintln!("failed to initialize logging: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = BouncerConfig::load(args.workspace.as_deref()).context("failed to load configuration")?;
    init_logging(&cfg, args.verbose);

    let db = if cfg.store.in_memory {
        Database::connect_memory().await.context("failed to open in-memory store")?
    } else {
        Database::connect_embedded(&cfg.store.path).await.context("failed to open embedded store")?
    };
    let reaper_store = Store::new(db.clone());
    let store = Arc::new(Store::new(db));

    let bot_token = cfg.chat.bot_token.clone().context("chat.bot_token is required (set BOUNCER_CHAT_BOT_TOKEN or a config file)")?;
    let bot = teloxide::Bot::new(bot_token);
    let channel = ChatChannel::new(bot);
    let chat = Arc::new(channel.clone());
    let chat_id = bouncer_chat::ChatId(cfg.chat.chat_id);

    let classifier = Arc::new(config_bridge::to_classifier_tables(&cfg));
    let compliance = Arc::new(config_bridge::to_compliance_table(&cfg).context("invalid compliance rule table")?);
    let risk_rules = Arc::new(config_bridge::to_risk_rules(&cfg));
    let exclusion = Arc::new(config_bridge::to_trust_exclusion_tables(&cfg));
    let rate_limit = config_bridge::to_rate_limit_config(&cfg);

    let ctx = PipelineContext {
        store: Arc::clone(&store),
        chat: Arc::clone(&chat),
        chat_id,
        classifier,
        compliance,
        risk_rules,
        exclusion,
        approvers: Arc::new(cfg.chat.approvers.clone()),
        rate_limit,
        trust_enabled: cfg.trust.enabled,
        approval_timeout_secs: cfg.approval.timeout_secs,
        ttl_buffer_secs: cfg.approval.ttl_buffer_secs,
        role_assumer: None,
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let reaper_shutdown = shutdown_rx.clone();
    let reaper_handle = tokio::spawn(bouncer_store::run_ttl_reaper(reaper_store, reaper_shutdown));

    let poller = Poller::new(channel, CallbackHandler::new(ctx.clone()));
    let poller_shutdown = shutdown_rx.clone();
    let poller_handle = tokio::spawn(poller.run(poller_shutdown));

    let shared_secret = cfg.server.shared_secret.clone().context("server.shared_secret is required (set BOUNCER_SERVER_SHARED_SECRET or a config file)")?;
    let (rpc_handle, addr) = bouncer_server::start(ctx, shared_secret, Some(cfg.server.bind_addr.as_str())).await.context("failed to start RPC server")?;

    println!("{}", format!("bouncerd listening on {addr}").cyan().bold());

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;

    println!("\n{}", "Shutting down daemon...".yellow());
    let _ = shutdown_tx.send(true);
    rpc_handle.stop()?;
    rpc_handle.stopped().await;
    let _ = tokio::join!(reaper_handle, poller_handle);

    println!("{}", "Daemon stopped".green().bold());
    Ok(())
}
