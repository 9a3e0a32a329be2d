use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

use super::VoterId;

/// The authenticated participant casting ballots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterIdentity {
    /// Voter unique ID.
    pub id: VoterId,
    /// Name shown in the portal header.
    pub display_name: String,
    /// The grouping (city, county, ...) the voter belongs to.
    pub grouping_name: String,
    /// Party the voter is affiliated with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_affiliation: Option<String>,
}

/// An access credential forwarded to the election service as a bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

// Never print the secret itself.
impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(***)")
    }
}
