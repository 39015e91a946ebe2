//! Error types for the CLI.

use crate::config::CliConfigError;
use billbook_core::BillbookError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] CliConfigError),
    #[error(transparent)]
    Billbook(#[from] BillbookError),
    #[error("No active business: run `billbook select <business-id>` or set default_business_id")]
    NoActiveBusiness,
    #[error("Unknown business {0}")]
    UnknownBusiness(billbook_core::BusinessId),
}
