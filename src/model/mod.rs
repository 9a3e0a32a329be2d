pub mod ballot;
pub(crate) mod election;
mod primary;
mod vote;
mod voter;

pub use election::{Candidate, Election, ElectionType, Party, VotingMethod};
pub use primary::{AdvancementModel, PrimaryConfig, PrimaryModel};
pub use vote::{BallotPayload, VoteRequest};
pub use voter::{AccessToken, VoterIdentity};

/// Our election IDs are integers assigned by the election service.
pub type ElectionId = u32;
/// Our candidate IDs are integers assigned by the election service.
pub type CandidateId = u32;
/// Our party IDs are integers assigned by the election service.
pub type PartyId = u32;
/// Our voter IDs are integers assigned by the program roster.
pub type VoterId = u32;
/// A position on a ranked ballot, starting from 1.
pub type Rank = usize;
