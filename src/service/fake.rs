use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::model::{AccessToken, Election, ElectionId, VoteRequest, VoterId};

use super::{CatalogResponse, ElectionService};

/// An in-memory election service that records what it is sent.
#[derive(Debug, Clone, Default)]
pub struct FakeElectionService {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    catalog: CatalogResponse,
    catalog_failure: Option<String>,
    /// 1-based index of the vote request that should fail.
    failing_vote: Option<usize>,
    vote_attempts: usize,
    votes: Vec<(ElectionId, VoteRequest)>,
    catalog_loads: usize,
    last_voter: Option<VoterId>,
    last_credential: Option<String>,
}

impl FakeElectionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog returned by the next load.
    pub fn set_catalog(&self, catalog: CatalogResponse) {
        self.inner.lock().unwrap().catalog = catalog;
    }

    /// Make every catalog load fail with this message, or succeed again with `None`.
    pub fn fail_catalog(&self, message: Option<&str>) {
        self.inner.lock().unwrap().catalog_failure = message.map(str::to_string);
    }

    /// Make the `n`th vote request (counting from 1 over the service's lifetime) fail.
    pub fn fail_vote_number(&self, n: usize) {
        self.inner.lock().unwrap().failing_vote = Some(n);
    }

    /// Every vote the service accepted, in arrival order.
    pub fn votes(&self) -> Vec<(ElectionId, VoteRequest)> {
        self.inner.lock().unwrap().votes.clone()
    }

    /// Number of vote requests received, including rejected ones.
    pub fn vote_attempts(&self) -> usize {
        self.inner.lock().unwrap().vote_attempts
    }

    pub fn catalog_loads(&self) -> usize {
        self.inner.lock().unwrap().catalog_loads
    }

    pub fn last_voter(&self) -> Option<VoterId> {
        self.inner.lock().unwrap().last_voter
    }

    pub fn last_credential(&self) -> Option<String> {
        self.inner.lock().unwrap().last_credential.clone()
    }
}

#[rocket::async_trait]
impl ElectionService for FakeElectionService {
    async fn eligible_elections(
        &self,
        voter: VoterId,
        credential: Option<&AccessToken>,
    ) -> Result<CatalogResponse> {
        let mut state = self.inner.lock().unwrap();
        state.catalog_loads += 1;
        state.last_voter = Some(voter);
        state.last_credential = credential.map(|token| token.secret().to_string());
        match &state.catalog_failure {
            Some(message) => Err(Error::Service {
                status: 503,
                message: Some(message.clone()),
            }),
            None => Ok(state.catalog.clone()),
        }
    }

    async fn cast_vote(
        &self,
        election: ElectionId,
        vote: &VoteRequest,
        credential: Option<&AccessToken>,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.vote_attempts += 1;
        state.last_credential = credential.map(|token| token.secret().to_string());
        if state.failing_vote == Some(state.vote_attempts) {
            return Err(Error::Service {
                status: 400,
                message: Some(format!("Vote for candidate {} rejected", vote.candidate_id)),
            });
        }
        state.votes.push((election, vote.clone()));
        // Upstream considers the voter to have voted once anything is recorded.
        if let Some(recorded) = state
            .catalog
            .elections
            .iter_mut()
            .find(|e: &&mut Election| e.id == election)
        {
            recorded.has_voted = true;
        }
        Ok(())
    }
}
