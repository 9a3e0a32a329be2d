use std::collections::HashSet;

use crate::error::Result;
use crate::model::{AccessToken, Election, ElectionId, PrimaryConfig, VoterId};
use crate::service::{CatalogResponse, ElectionService};

/// A fully loaded, unfiltered election catalog and the primary rules it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    elections: Vec<Election>,
    config: PrimaryConfig,
}

impl Catalog {
    /// Fetch the voter's eligible elections. Nothing is returned unless the
    /// whole response was received and decoded.
    pub async fn load<S>(
        service: &S,
        voter: VoterId,
        credential: Option<&AccessToken>,
    ) -> Result<Self>
    where
        S: ElectionService + ?Sized,
    {
        debug!("Loading eligible elections for voter {voter}");
        let response = service.eligible_elections(voter, credential).await?;
        let catalog = Self::from(response);
        info!(
            "Loaded {} elections for voter {voter} ({} primary model)",
            catalog.elections.len(),
            catalog.config.primary_model
        );
        Ok(catalog)
    }

    pub fn elections(&self) -> &[Election] {
        &self.elections
    }

    pub fn config(&self) -> PrimaryConfig {
        self.config
    }

    pub fn election(&self, id: ElectionId) -> Option<&Election> {
        self.elections.iter().find(|election| election.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.elections.is_empty()
    }

    /// Record a successful submission locally.
    pub(crate) fn mark_voted(&mut self, id: ElectionId) -> Option<&Election> {
        let election = self.elections.iter_mut().find(|election| election.id == id)?;
        election.has_voted = true;
        Some(election)
    }
}

impl From<CatalogResponse> for Catalog {
    fn from(response: CatalogResponse) -> Self {
        // A voter votes at most once per election, so duplicate entries are dropped.
        let mut seen = HashSet::new();
        let elections = response
            .elections
            .into_iter()
            .filter(|election| {
                let fresh = seen.insert(election.id);
                if !fresh {
                    warn!("Ignoring duplicate catalog entry for election {}", election.id);
                }
                fresh
            })
            .collect();

        Self {
            elections,
            config: PrimaryConfig::new(response.primary_model, response.advancement_model),
        }
    }
}
