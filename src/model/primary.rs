use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Program-wide rule for how partisan primaries are scoped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryModel {
    /// The voter's party is fixed outside the portal.
    #[default]
    Closed,
    /// The voter picks a party and is locked to it after the first vote.
    Open,
    /// Same portal behaviour as `Open`.
    #[serde(alias = "semi-open", alias = "semiopen")]
    SemiOpen,
    /// One cross-party primary; the top candidates advance.
    Blanket,
    /// No primary; one cross-party general election.
    Jungle,
}

impl PrimaryModel {
    /// Whether voters commit to a single party's primaries under this model.
    pub fn uses_party_lock(self) -> bool {
        matches!(self, Self::Open | Self::SemiOpen)
    }
}

impl Display for PrimaryModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::SemiOpen => "semi_open",
            Self::Blanket => "blanket",
            Self::Jungle => "jungle",
        };
        write!(f, "{name}")
    }
}

/// For blanket primaries, how many candidates proceed to the general election.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvancementModel {
    #[default]
    #[serde(rename = "top_2", alias = "top2", alias = "top-2")]
    Top2,
    #[serde(rename = "top_4_irv", alias = "top_4", alias = "top4", alias = "top-4-irv")]
    Top4InstantRunoff,
}

impl AdvancementModel {
    /// Number of candidates that advance.
    pub fn advancing(self) -> usize {
        match self {
            Self::Top2 => 2,
            Self::Top4InstantRunoff => 4,
        }
    }
}

/// The primary rules loaded alongside each catalog.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryConfig {
    pub primary_model: PrimaryModel,
    pub advancement_model: AdvancementModel,
}

impl PrimaryConfig {
    pub fn new(primary_model: PrimaryModel, advancement_model: AdvancementModel) -> Self {
        Self {
            primary_model,
            advancement_model,
        }
    }
}
