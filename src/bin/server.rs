use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use teamspace::{cli::Args, create_router, teams::TeamRegistry, RouterConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teamspace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Seed the team registry
    let registry = match &args.teams {
        Some(path) => {
            tracing::info!("Loading teams from: {}", path.display());
            TeamRegistry::from_seed_file(path).expect("Failed to load teams seed file")
        }
        None => {
            tracing::warn!("No teams seed file specified - every request will be rejected");
            tracing::warn!("Use --teams <file> to seed teams and bearer tokens");
            TeamRegistry::new()
        }
    };

    tracing::info!("Workspace data directory: {}", args.data_dir.display());

    let app = create_router(RouterConfig::new(args.data_dir, Arc::new(registry)));

    // Run the server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
