use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tonic::transport::Server;
use tracing_subscriber::EnvFilter;

use arcade_game_engine::engine::settings::{load_default_settings, load_settings};
use arcade_game_engine::games::GameRegistry;
use arcade_game_engine::server::proto::game_engine_service_server::GameEngineServiceServer;
use arcade_game_engine::server::GameEngineServer;

#[derive(Parser)]
#[command(name = "arcade-game-engine", about = "Arcade game rules engine gRPC server")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "50051", env = "ARCADE_ENGINE_PORT")]
    port: u16,

    /// Path to engine_settings.toml (default: auto-discover)
    #[arg(long, env = "ARCADE_ENGINE_SETTINGS")]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let settings = match cli.settings {
        Some(ref path) => {
            load_settings(path).map_err(|e| format!("Failed to load settings: {}", e))?
        }
        None => load_default_settings(),
    };

    let registry = GameRegistry::with_builtin_games(&settings);
    tracing::info!(
        games = ?registry.list_game_ids(),
        "registered game plugins"
    );

    let addr: SocketAddr = ([0, 0, 0, 0], cli.port).into();
    tracing::info!(%addr, "starting gRPC server");

    Server::builder()
        .add_service(GameEngineServiceServer::new(GameEngineServer::new(
            registry, settings,
        )))
        .serve(addr)
        .await?;

    Ok(())
}
