use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the workspace server
#[derive(Parser, Debug)]
#[clap(name = "teamspace-server")]
#[clap(about = "Team workspace server with realtime chat and typing presence", long_about = None)]
pub struct Args {
    /// Port to listen on
    #[clap(short, long, default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory for team workspace roots
    #[clap(short, long, value_name = "DIR", default_value = "workspace-data")]
    pub data_dir: PathBuf,

    /// Path to a JSON file seeding teams and bearer tokens
    #[clap(long, value_name = "FILE")]
    pub teams: Option<PathBuf>,
}
