// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Order a VPS and deploy a containerized app onto it")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Order a server (or use an existing one) and deploy the app onto it
    Deploy(DeployArgs),

    /// Restore a server to a snapshot
    Rollback {
        /// Server to restore
        #[arg(long)]
        server: String,

        /// Snapshot to restore
        #[arg(long)]
        snapshot: String,

        /// Server address; when given, waits for SSH after the restore
        #[arg(long)]
        address: Option<String>,
    },

    /// Show the account balance
    Balance,

    /// List orderable products
    Products,

    /// List installable images
    Images,

    /// Show a server's state
    Status {
        /// Server id
        id: String,
    },
}

#[derive(Args)]
pub struct DeployArgs {
    /// Deploy to this existing server instead of ordering one
    #[arg(long, requires = "address")]
    pub existing: Option<String>,

    /// Address of the existing server
    #[arg(long, requires = "existing")]
    pub address: Option<String>,

    /// Root password of the existing server; key or agent auth when omitted.
    /// Ignored without --existing.
    #[arg(long, env = "HOIST_SERVER_PASSWORD", hide_env_values = true)]
    pub credential: Option<String>,
}
