use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "libris", version, about = "Library email reminder service")]
pub struct Cli {
    /// Path to libris.toml (falls back to LIBRIS_CONFIG, then ./libris.toml).
    #[arg(long, global = true, env = "LIBRIS_CONFIG")]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP gateway, the email worker and the daily scheduler.
    Serve,
    /// Run both reminder scans once and print the report.
    ScanNow,
    /// Send the test email to one address.
    SendTest {
        #[arg(long)]
        to: String,
    },
}
