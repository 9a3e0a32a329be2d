use serde::{Deserialize, Serialize};

use super::{CandidateId, ElectionId, Rank, VoterId};

/// The body of a single `POST vote` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub candidate_id: CandidateId,
    pub voter_id: VoterId,
    /// Only present for ranked elections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
}

/// A validated ballot: the vote requests to send, in sending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotPayload {
    pub election_id: ElectionId,
    pub votes: Vec<VoteRequest>,
}

impl BallotPayload {
    pub fn is_ranked(&self) -> bool {
        self.votes.iter().any(|vote| vote.rank.is_some())
    }
}
