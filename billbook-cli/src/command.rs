//! Command-line arguments.

use billbook_core::{BusinessId, PartyId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "billbook",
    version,
    about = "Dashboards and party ledgers for small-business invoicing"
)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "BILLBOOK_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Headline figures for the active business.
    Dashboard,
    /// Running-balance ledger of one party.
    Ledger { party_id: PartyId },
    /// Make a business the active one.
    Select { business_id: BusinessId },
    /// Forget the active business.
    Logout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::try_parse_from(["billbook", "--config", "b.toml", "dashboard"]).unwrap();
        assert_eq!(cli.command, Command::Dashboard);
        assert_eq!(cli.config, Some(PathBuf::from("b.toml")));

        let cli = Cli::try_parse_from(["billbook", "logout", "--config", "b.toml"]).unwrap();
        assert_eq!(cli.command, Command::Logout);
        assert_eq!(cli.config, Some(PathBuf::from("b.toml")));
    }

    #[test]
    fn test_parse_ledger_party_id() {
        let party = "0190f1a2-7b3c-7d4e-8f00-112233445566";
        let cli = Cli::try_parse_from(["billbook", "ledger", party]).unwrap();
        assert_eq!(
            cli.command,
            Command::Ledger {
                party_id: party.parse().unwrap()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let err = Cli::try_parse_from(["billbook", "ledger"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["billbook", "ledger", "not-a-uuid"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["billbook", "dashboard", "extra"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        assert!(Cli::try_parse_from(["billbook"]).is_err());
    }
}
