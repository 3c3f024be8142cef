//! CLI argument parsing for the favorites-gateway binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "favorites-gateway", about = "Authenticated gateway over the character catalog")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_migrate_command_parses() {
        let cli = Cli::parse_from(["favorites-gateway", "migrate"]);
        assert!(matches!(cli.command, Some(Command::Migrate)));
    }

    #[test]
    fn test_cli_serve_command_parses() {
        let cli = Cli::parse_from(["favorites-gateway", "serve"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["favorites-gateway"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["favorites-gateway", "create-admin"]).is_err());
    }
}
