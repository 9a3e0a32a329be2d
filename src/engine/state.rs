use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ballot::BallotDraft, ElectionId, Party, VoterIdentity};

use super::composer::BallotView;
use super::resolver::{ElectionSummary, PartyPrompt};

/// Where the voter is in the browse → compose → submit flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EngineState {
    /// No catalog is loaded for the bound voter, or no voter is bound.
    #[default]
    Unloaded,
    /// Looking at the visible election list.
    Browsing,
    /// Looking at the election list with primaries gated behind the party
    /// prompt. `locked` is set when the voter is already committed, in which
    /// case the prompt only explains the lock.
    PartySelectionRequired { locked: Option<Party> },
    /// Filling in a ballot.
    Composing {
        election: ElectionId,
        draft: BallotDraft,
    },
    /// Opened an election this voter has already voted in.
    AlreadyVoted { election: ElectionId },
    /// Vote requests are in flight.
    Submitting {
        election: ElectionId,
        draft: BallotDraft,
    },
    /// The last ballot was fully recorded.
    Confirmed(Confirmation),
    /// Something failed; `resume` is the last good state.
    Error {
        message: String,
        resume: Box<EngineState>,
    },
}

impl EngineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded => "no elections are loaded",
            Self::Browsing => "browsing elections",
            Self::PartySelectionRequired { .. } => "choosing a party",
            Self::Composing { .. } => "filling in a ballot",
            Self::AlreadyVoted { .. } => "viewing a completed election",
            Self::Submitting { .. } => "submitting a ballot",
            Self::Confirmed(_) => "viewing a confirmation",
            Self::Error { .. } => "showing an error",
        }
    }

    /// The state to render underneath any error.
    pub fn settled(&self) -> &EngineState {
        match self {
            Self::Error { resume, .. } => resume.settled(),
            other => other,
        }
    }

    /// Whether the voter is on the election list.
    pub fn is_browsing(&self) -> bool {
        matches!(self, Self::Browsing | Self::PartySelectionRequired { .. })
    }
}

/// Record of a fully recorded ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub election_id: ElectionId,
    pub position_name: String,
    /// Number of vote requests the service accepted (one per rank on ranked ballots).
    pub votes_recorded: usize,
    pub confirmed_at: DateTime<Utc>,
}

/// One-shot messages for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Signal {
    Confirmed(Confirmation),
    Error(String),
}

/// Everything a presentation layer needs to render the portal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalView {
    pub voter: Option<VoterIdentity>,
    /// Whether a catalog has been loaded; an empty list with `loaded` false is
    /// the "no elections" state.
    pub loaded: bool,
    pub elections: Vec<ElectionSummary>,
    pub party_prompt: PartyPrompt,
    pub ballot: Option<BallotView>,
    pub submit_enabled: bool,
    pub signal: Option<Signal>,
    pub state: EngineState,
}

impl PortalView {
    pub fn is_submitting(&self) -> bool {
        matches!(self.state.settled(), EngineState::Submitting { .. })
    }
}
