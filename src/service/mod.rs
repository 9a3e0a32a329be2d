//! The external election service this portal consumes.

mod http;

#[cfg(test)]
mod fake;

pub use http::HttpElectionService;

#[cfg(test)]
pub use fake::FakeElectionService;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    AccessToken, AdvancementModel, Election, ElectionId, PrimaryModel, VoteRequest, VoterId,
};

/// The body of `GET eligible-elections`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    #[serde(default)]
    pub elections: Vec<Election>,
    #[serde(default)]
    pub primary_model: PrimaryModel,
    #[serde(default)]
    pub advancement_model: AdvancementModel,
}

/// The two calls the voting engine makes.
#[rocket::async_trait]
pub trait ElectionService: Send + Sync {
    /// Every election the voter is eligible for, unfiltered, plus the primary rules.
    async fn eligible_elections(
        &self,
        voter: VoterId,
        credential: Option<&AccessToken>,
    ) -> Result<CatalogResponse>;

    /// Record a single vote. Ranked ballots call this once per rank.
    async fn cast_vote(
        &self,
        election: ElectionId,
        vote: &VoteRequest,
        credential: Option<&AccessToken>,
    ) -> Result<()>;
}
