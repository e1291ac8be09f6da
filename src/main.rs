use std::path::PathBuf;
use std::sync::Arc;

use serenity::Client;
use serenity::all::{GatewayIntents, GuildId};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod audit;
mod config;
mod error;
mod handlers;
mod score;
mod session;
mod tatsu;
mod voice_tracker;

use crate::audit::{ChannelAuditLog, parse_snowflake};
use crate::config::Config;
use crate::error::TrackerError;
use crate::handlers::{Dispatcher, JoinHandler, LeaveHandler};
use crate::session::SessionStore;
use crate::tatsu::TatsuClient;
use crate::voice_tracker::VoiceHandler;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vc_points=info,serenity=warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();

    if let Err(err) = run().await {
        error!(%err, "vc-points stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), TrackerError> {
    let config = Config::load(std::env::args_os().nth(1).map(PathBuf::from))?;
    let bounds = config.score_bounds()?;
    info!(
        min_score = bounds.min(),
        max_score = bounds.max(),
        policy = ?config.score_error_policy,
        "configuration loaded"
    );

    let guild_id = parse_snowflake(&config.guild_id).map(GuildId::new);
    if guild_id.is_none() {
        warn!(
            guild_id = %config.guild_id,
            "guild id is not a valid snowflake; tracking every guild"
        );
    }

    let sessions = SessionStore::new();
    let audit = Arc::new(ChannelAuditLog::new(&config.log_channel_id));
    let tatsu = Arc::new(TatsuClient::new(config.tatsu_token.clone()));

    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register(Arc::new(JoinHandler::new(sessions.clone(), audit.clone())))
        .register(Arc::new(LeaveHandler::new(
            sessions.clone(),
            audit.clone(),
            tatsu,
            bounds,
            config.guild_id.clone(),
        )));

    let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
    let handler = VoiceHandler::new(dispatcher, guild_id, config.score_error_policy, fatal_tx);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(TrackerError::GatewayConnect)?;
    audit.attach(client.http.clone());
    let shard_manager = client.shard_manager.clone();

    info!("connecting to gateway");

    let outcome = tokio::select! {
        res = client.start() => res.map_err(TrackerError::GatewayConnect),
        () = shutdown_signal() => {
            info!("shutdown signal received");
            Ok(())
        }
        Some(err) = fatal_rx.recv() => Err(err),
    };

    shard_manager.shutdown_all().await;
    info!(open_sessions = sessions.len().await, "gateway closed, open sessions dropped");

    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(?err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
