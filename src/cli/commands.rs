use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "renewal-bot")]
#[command(about = "Reconcile membership-fee payments with the member table and send renewal reminders")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to an additional configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full reconciliation: update members and send reminders
    Run {
        /// Log what would happen without sending emails or updating members
        #[arg(long)]
        dry_run: bool,
    },

    /// Show payment/member statistics without changing anything
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Validate the configuration and print it with secrets masked
    Check,
}
