use serde::Serialize;

use crate::model::{ballot::BallotDraft, Candidate, Election, Rank, VotingMethod};

use super::resolver::{ElectionSummary, ElectionTag};

/// What opening an election produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Draft(BallotDraft),
    /// The voter has already voted here; no draft is built.
    AlreadyVoted,
}

/// Start a ballot for an election.
pub fn compose(election: &Election) -> Composition {
    if election.has_voted {
        Composition::AlreadyVoted
    } else {
        Composition::Draft(BallotDraft::for_election(election))
    }
}

/// A candidate on a single-choice ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateChoice {
    pub candidate: Candidate,
    pub selected: bool,
}

/// A candidate on a ranked ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedChoice {
    pub candidate: Candidate,
    pub rank: Option<Rank>,
}

/// The ballot UI for the active election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BallotView {
    Single {
        election: ElectionSummary,
        instructions: String,
        choices: Vec<CandidateChoice>,
    },
    /// Ranked candidates first in rank order, then the unranked ones in ballot order.
    Ranked {
        election: ElectionSummary,
        instructions: String,
        choices: Vec<RankedChoice>,
    },
    AlreadyVoted {
        election: ElectionSummary,
    },
}

impl BallotView {
    pub fn election(&self) -> &ElectionSummary {
        match self {
            Self::Single { election, .. }
            | Self::Ranked { election, .. }
            | Self::AlreadyVoted { election } => election,
        }
    }
}

/// Render the ballot for `election`. Without a draft, the election is shown as
/// already voted.
pub fn ballot_view(
    election: &Election,
    summary: &ElectionSummary,
    draft: Option<&BallotDraft>,
) -> BallotView {
    let instructions = instructions(summary);
    match draft {
        None => BallotView::AlreadyVoted {
            election: summary.clone(),
        },
        Some(BallotDraft::Single(choice)) => BallotView::Single {
            election: summary.clone(),
            instructions,
            choices: election
                .candidates
                .iter()
                .map(|candidate| CandidateChoice {
                    candidate: candidate.clone(),
                    selected: choice.selected() == Some(candidate.id),
                })
                .collect(),
        },
        Some(BallotDraft::Ranked(editor)) => {
            let ranked = editor.ranks().into_iter().filter_map(|(id, rank)| {
                election.candidate(id).map(|candidate| RankedChoice {
                    candidate: candidate.clone(),
                    rank: Some(rank),
                })
            });
            let unranked = editor.unranked().filter_map(|id| {
                election.candidate(id).map(|candidate| RankedChoice {
                    candidate: candidate.clone(),
                    rank: None,
                })
            });
            BallotView::Ranked {
                election: summary.clone(),
                instructions,
                choices: ranked.chain(unranked).collect(),
            }
        }
    }
}

/// Voter-facing instructions for a ballot.
pub fn instructions(summary: &ElectionSummary) -> String {
    let mut text = match summary.method {
        VotingMethod::Plurality => "Select one candidate.".to_string(),
        VotingMethod::Majority => {
            "Select one candidate. A candidate needs a majority to win outright.".to_string()
        }
        VotingMethod::Ranked => {
            "Rank the candidates in order of preference. You may rank as many or as few as you like."
                .to_string()
        }
    };
    match &summary.tag {
        Some(ElectionTag::Blanket { advancing }) => text.push_str(&format!(
            " Candidates from every party share this ballot; the top {advancing} advance to the general election."
        )),
        Some(ElectionTag::Jungle) => {
            text.push_str(" Candidates from every party share this ballot and all voters take part.")
        }
        Some(ElectionTag::Party(_)) | None => {}
    }
    text
}
