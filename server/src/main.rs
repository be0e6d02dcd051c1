use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod agent;
mod handlers;
mod logic;
mod state;

use crate::agent::AgentConfig;
use crate::handlers::router;
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
    /// How long the agent waits before answering a stroke.
    #[arg(long, default_value_t = 2000)]
    agent_delay_ms: u64,
    #[arg(long, default_value = "jarvis")]
    agent_name: String,
    #[arg(long)]
    no_agent: bool,
    /// Directory served for any path other than the socket routes.
    #[arg(long)]
    public_dir: Option<PathBuf>,
}

impl Args {
    fn agent(&self) -> Option<AgentConfig> {
        if self.no_agent {
            return None;
        }
        Some(AgentConfig {
            name: self.agent_name.clone(),
            delay: Duration::from_millis(self.agent_delay_ms),
            ..AgentConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("didboard_server=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let state = AppState::new(args.agent());
    if let Some(agent) = &state.agent {
        info!("agent {} answers after {:?}", agent.name, agent.delay);
    }
    if let Some(dir) = &args.public_dir {
        info!("serving static files from {}", dir.display());
    }
    let app = router(state, args.public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("drawing relay listening on ws://{addr}/ws/draw");
    axum::serve(listener, app).await
}
