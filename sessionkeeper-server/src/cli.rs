use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8046;

#[derive(Parser)]
#[command(
    name = "sessionkeeper",
    about = "SessionKeeper - messaging session supervisor",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "SESSIONKEEPER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "SESSIONKEEPER_DATA_DIR", help = "Data directory (default: ~/.sessionkeeper)")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the supervisor daemon (default if no command specified)")]
    Serve,

    #[command(about = "Show health of a running daemon")]
    Status {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "List stored accounts")]
    Accounts {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Force a fresh QR link for an account on a running daemon")]
    Relink {
        #[arg(help = "Account ID")]
        account_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["sessionkeeper", "--port", "9000"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.port, 9000);
    }

    #[test]
    fn test_relink_requires_account() {
        assert!(Cli::try_parse_from(["sessionkeeper", "relink"]).is_err());
        let cli = Cli::try_parse_from(["sessionkeeper", "relink", "sales"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Relink { account_id }) if account_id == "sales"));
    }
}
