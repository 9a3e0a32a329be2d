use rocket::figment::Error as ConfigError;
use rocket::serde::json::serde_json::Error as JsonError;
use thiserror::Error;

use crate::model::{
    ballot::{RankingError, ValidationError},
    ElectionId, PartyId,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Shown when the service gives no usable explanation.
const GENERIC_SERVICE_FAILURE: &str =
    "The election service could not be reached. Please try again.";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Election service error ({status}): {}", .message.as_deref().unwrap_or("no details given"))]
    Service { status: u16, message: Option<String> },
    #[error("Malformed election service response: {0}")]
    Decode(#[from] JsonError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ranking(#[from] RankingError),
    #[error("Ballot submission failed after {accepted} of {total} votes were recorded: {source}")]
    Submission {
        accepted: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("You are already committed to the {0} primaries")]
    PartyLocked(String),
    #[error("No party with ID {0} has primaries open to you")]
    UnknownParty(PartyId),
    #[error("Party selection is not used for these elections")]
    PartySelectionUnavailable,
    #[error("No voter is signed in")]
    NoVoter,
    #[error("Elections have not been loaded yet")]
    NotLoaded,
    #[error("Election {0} is not available to you")]
    ElectionNotVisible(ElectionId),
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl Error {
    /// The text to show the voter: the service-provided message when there is
    /// one, a generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Service {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Service {
                status,
                message: None,
            } => format!("The election service rejected the request (status {status})."),
            Self::Http(_) => GENERIC_SERVICE_FAILURE.to_string(),
            Self::Decode(_) => "The election service sent a response that could not be read.".to_string(),
            Self::Submission { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}
