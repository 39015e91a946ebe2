//! Wires config, session, remote and cache together and runs one command.

use std::sync::Arc;

use billbook_core::BusinessId;
use billbook_storage::{CacheStore, CachedReads, InMemoryRemote, SeedData, Session};

use crate::command::Command;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::render;

pub struct App {
    config: CliConfig,
    session: Session,
    reads: CachedReads<InMemoryRemote>,
}

impl App {
    /// Load seed data and open the session named by `config`.
    pub fn open(config: CliConfig) -> Result<Self, CliError> {
        let seed = SeedData::load(&config.seed_path)?;
        let remote = Arc::new(InMemoryRemote::from_seed(seed)?);
        let cache = CacheStore::new(config.cache_config());
        let session = Session::open(config.session_path.clone(), cache.clone())?;
        tracing::debug!(
            seed = %config.seed_path.display(),
            cache = ?cache.config(),
            "app opened"
        );
        Ok(Self {
            config,
            session,
            reads: CachedReads::new(remote, cache),
        })
    }

    pub fn reads(&self) -> &CachedReads<InMemoryRemote> {
        &self.reads
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Session selection first, then the configured default.
    fn active_business(&self) -> Result<BusinessId, CliError> {
        self.session
            .active_business()
            .or(self.config.default_business_id)
            .ok_or(CliError::NoActiveBusiness)
    }

    /// Run `command` and return the text to print.
    pub async fn run(&mut self, command: Command) -> Result<String, CliError> {
        match command {
            Command::Dashboard => {
                let business_id = self.active_business()?;
                let (business, summary) = tokio::join!(
                    self.reads.business(business_id),
                    self.reads.dashboard(business_id)
                );
                Ok(render::dashboard(business.as_ref(), &summary))
            }
            Command::Ledger { party_id } => {
                let business_id = self.active_business()?;
                let ledger = self.reads.party_ledger(business_id, party_id).await?;
                let name = self
                    .reads
                    .parties(business_id)
                    .await
                    .into_iter()
                    .find(|p| p.party_id == party_id)
                    .map(|p| p.name)
                    .unwrap_or_else(|| party_id.to_string());
                Ok(render::ledger(&name, &ledger))
            }
            Command::Select { business_id } => {
                if self.reads.business(business_id).await.is_none() {
                    return Err(CliError::UnknownBusiness(business_id));
                }
                self.session.select_business(business_id)?;
                Ok(format!("Active business set to {}\n", business_id))
            }
            Command::Logout => {
                self.session.logout()?;
                Ok("Logged out\n".to_string())
            }
        }
    }
}
