mod ranking;

pub use ranking::{RankingEditor, RankingError};

use thiserror::Error;

use crate::model::{BallotPayload, CandidateId, Election, ElectionId, VoteRequest, VoterId};

/// Problems with a ballot that are caught before anything is sent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select a candidate before submitting")]
    NoSelection,
    #[error("Rank at least one candidate before submitting")]
    NoRanks,
    #[error("Candidate {0} is not on this ballot")]
    UnknownCandidate(CandidateId),
    #[error("This is a ranked ballot; rank candidates instead")]
    RankingRequired,
    #[error("This ballot takes a single choice; candidates cannot be ranked")]
    SingleChoiceOnly,
}

/// A single-choice (plurality or majority) selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleChoice {
    pool: Vec<CandidateId>,
    selected: Option<CandidateId>,
}

impl SingleChoice {
    pub fn new(pool: Vec<CandidateId>) -> Self {
        Self {
            pool,
            selected: None,
        }
    }

    /// Select a candidate, replacing any previous selection.
    pub fn select(&mut self, candidate: CandidateId) -> Result<(), ValidationError> {
        if !self.pool.contains(&candidate) {
            return Err(ValidationError::UnknownCandidate(candidate));
        }
        self.selected = Some(candidate);
        Ok(())
    }

    pub fn selected(&self) -> Option<CandidateId> {
        self.selected
    }
}

/// The in-progress selection for the currently open election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallotDraft {
    Single(SingleChoice),
    Ranked(RankingEditor),
}

impl BallotDraft {
    /// An empty draft of the right kind for this election.
    pub fn for_election(election: &Election) -> Self {
        let pool = election.candidate_ids();
        if election.method.is_ranked() {
            Self::Ranked(RankingEditor::new(pool))
        } else {
            Self::Single(SingleChoice::new(pool))
        }
    }

    pub fn single_mut(&mut self) -> Result<&mut SingleChoice, ValidationError> {
        match self {
            Self::Single(choice) => Ok(choice),
            Self::Ranked(_) => Err(ValidationError::RankingRequired),
        }
    }

    pub fn ranking_mut(&mut self) -> Result<&mut RankingEditor, ValidationError> {
        match self {
            Self::Ranked(editor) => Ok(editor),
            Self::Single(_) => Err(ValidationError::SingleChoiceOnly),
        }
    }

    /// Exactly one selection, or at least one rank.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Single(choice) => choice.selected().is_some(),
            Self::Ranked(editor) => !editor.is_empty(),
        }
    }

    /// Turn the draft into the vote requests to send, in ascending rank order
    /// for ranked ballots.
    pub fn payload(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
    ) -> Result<BallotPayload, ValidationError> {
        let votes = match self {
            Self::Single(choice) => {
                let candidate_id = choice.selected().ok_or(ValidationError::NoSelection)?;
                vec![VoteRequest {
                    candidate_id,
                    voter_id,
                    rank: None,
                }]
            }
            Self::Ranked(editor) => {
                if editor.is_empty() {
                    return Err(ValidationError::NoRanks);
                }
                editor
                    .ranks()
                    .into_iter()
                    .map(|(candidate_id, rank)| VoteRequest {
                        candidate_id,
                        voter_id,
                        rank: Some(rank),
                    })
                    .collect()
            }
        };

        Ok(BallotPayload { election_id, votes })
    }
}
