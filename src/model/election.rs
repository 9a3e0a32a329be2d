use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::{CandidateId, ElectionId, PartyId};

/// Whether an election is a party primary or a general election.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionType {
    Primary,
    General,
}

/// How a ballot is filled in. Counting is done by the election service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    /// Single choice, most votes wins.
    Plurality,
    /// Single choice, a majority is needed to win outright.
    Majority,
    /// Ordered preference list, tabulated by instant runoff.
    #[serde(alias = "ranked_choice", alias = "instant_runoff")]
    Ranked,
}

impl VotingMethod {
    pub fn is_ranked(self) -> bool {
        self == Self::Ranked
    }
}

impl Display for VotingMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Plurality => "plurality",
            Self::Majority => "majority",
            Self::Ranked => "ranked choice",
        };
        write!(f, "{name}")
    }
}

/// A party whose primaries a voter may commit to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
}

impl Display for Party {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An option within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Candidate unique ID.
    pub id: CandidateId,
    /// Candidate display name.
    pub name: String,
    /// Party tag, shown on cross-party ballots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_name: Option<String>,
    /// Colour used when rendering the party tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_color: Option<String>,
}

/// A single contest open for this voter, as reported by the election service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    /// Election unique ID.
    pub id: ElectionId,
    /// Name of the position being elected.
    pub position_name: String,
    /// Grouping (city, county, state) the position belongs to.
    #[serde(default)]
    pub grouping_name: String,
    pub election_type: ElectionType,
    /// Owning party; only set for partisan primaries.
    #[serde(default)]
    pub party_id: Option<PartyId>,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(rename = "votingMethod", alias = "method")]
    pub method: VotingMethod,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Whether this voter has already voted in this election.
    #[serde(default)]
    pub has_voted: bool,
}

impl Election {
    /// A primary owned by a single party.
    pub fn is_partisan_primary(&self) -> bool {
        self.election_type == ElectionType::Primary && self.party_id.is_some()
    }

    /// The owning party, if any. Falls back to a generated name if the service
    /// did not send one.
    pub fn party(&self) -> Option<Party> {
        self.party_id.map(|id| Party {
            id,
            name: self
                .party_name
                .clone()
                .unwrap_or_else(|| format!("Party {id}")),
        })
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.id == id)
    }

    pub fn candidate_ids(&self) -> Vec<CandidateId> {
        self.candidates.iter().map(|candidate| candidate.id).collect()
    }
}
