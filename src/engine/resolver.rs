//! Primary model resolution: which elections a voter may currently see, and
//! whether (and how) they are asked to commit to a party.
//!
//! Everything here is a pure function of the catalog, the session's party lock
//! and the voter's current (uncommitted) party choice.

use serde::Serialize;

use crate::model::{
    Election, ElectionId, ElectionType, Party, PartyId, PrimaryConfig, PrimaryModel,
    VotingMethod,
};

/// Model-specific label shown next to an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElectionTag {
    /// A single party's election.
    Party(Party),
    /// A cross-party primary; the top `advancing` candidates go to the general.
    Blanket { advancing: usize },
    /// A cross-party general election in which all voters compete together.
    Jungle,
}

/// Whether the voter can still cast a ballot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Badge {
    Open,
    Voted,
}

/// One row of the visible election list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub position_name: String,
    pub grouping_name: String,
    pub election_type: ElectionType,
    pub method: VotingMethod,
    pub tag: Option<ElectionTag>,
    pub badge: Badge,
    pub candidate_count: usize,
}

impl ElectionSummary {
    fn new(election: &Election, tag: Option<ElectionTag>) -> Self {
        Self {
            id: election.id,
            position_name: election.position_name.clone(),
            grouping_name: election.grouping_name.clone(),
            election_type: election.election_type,
            method: election.method,
            tag,
            badge: if election.has_voted {
                Badge::Voted
            } else {
                Badge::Open
            },
            candidate_count: election.candidates.len(),
        }
    }
}

/// State of the party-selection prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum PartyPrompt {
    /// No party choice is needed.
    #[default]
    Hidden,
    /// The voter may pick (or re-pick) a party; primaries are hidden until they do.
    Offered {
        parties: Vec<Party>,
        selected: Option<PartyId>,
    },
    /// The voter has voted in this party's primaries and cannot switch.
    Locked { party: Party },
}

/// The visible election list and party prompt for one moment of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub visible: Vec<ElectionSummary>,
    pub prompt: PartyPrompt,
}

impl Resolution {
    pub fn summary(&self, id: ElectionId) -> Option<&ElectionSummary> {
        self.visible.iter().find(|summary| summary.id == id)
    }

    pub fn is_visible(&self, id: ElectionId) -> bool {
        self.summary(id).is_some()
    }
}

/// Distinct parties owning primaries, in catalog order.
pub fn partisan_parties(elections: &[Election]) -> Vec<Party> {
    let mut parties: Vec<Party> = Vec::new();
    for party in elections
        .iter()
        .filter(|election| election.is_partisan_primary())
        .filter_map(Election::party)
    {
        if !parties.iter().any(|known| known.id == party.id) {
            parties.push(party);
        }
    }
    parties
}

/// The party a voter is committed to, inferred from having already voted in
/// one of its primaries.
pub fn infer_party_lock(elections: &[Election]) -> Option<Party> {
    let mut voted = elections
        .iter()
        .filter(|election| election.is_partisan_primary() && election.has_voted)
        .filter_map(Election::party);
    let lock = voted.next()?;
    if let Some(other) = voted.find(|party| party.id != lock.id) {
        warn!(
            "Voter has votes recorded in both {} and {} primaries; locking to {}",
            lock, other, lock
        );
    }
    Some(lock)
}

/// Produce the visible election list for the current moment.
///
/// `lock` is the session's party lock (only meaningful under open/semi-open
/// models); `choice` is the voter's current uncommitted party pick.
pub fn resolve(
    elections: &[Election],
    config: PrimaryConfig,
    lock: Option<&Party>,
    choice: Option<PartyId>,
) -> Resolution {
    match config.primary_model {
        PrimaryModel::Closed => unfiltered(elections),
        PrimaryModel::Blanket => {
            let advancing = config.advancement_model.advancing();
            tagged(elections, |election| {
                (election.election_type == ElectionType::Primary && election.party_id.is_none())
                    .then_some(ElectionTag::Blanket { advancing })
            })
        }
        PrimaryModel::Jungle => tagged(elections, |election| {
            (election.election_type == ElectionType::General && election.party_id.is_none())
                .then_some(ElectionTag::Jungle)
        }),
        PrimaryModel::Open | PrimaryModel::SemiOpen => partisan(elections, lock, choice),
    }
}

fn party_tag(election: &Election) -> Option<ElectionTag> {
    election.party().map(ElectionTag::Party)
}

fn unfiltered(elections: &[Election]) -> Resolution {
    tagged(elections, |_| None)
}

/// Every election passes; `special` may override the default party tag.
fn tagged(elections: &[Election], special: impl Fn(&Election) -> Option<ElectionTag>) -> Resolution {
    let visible = elections
        .iter()
        .map(|election| ElectionSummary::new(election, special(election).or_else(|| party_tag(election))))
        .collect();
    Resolution {
        visible,
        prompt: PartyPrompt::Hidden,
    }
}

/// Non-partisan elections always pass; partisan primaries pass only for `party`.
fn filtered(elections: &[Election], party: Option<PartyId>) -> Vec<ElectionSummary> {
    elections
        .iter()
        .filter(|election| !election.is_partisan_primary() || election.party_id == party)
        .map(|election| ElectionSummary::new(election, party_tag(election)))
        .collect()
}

fn partisan(elections: &[Election], lock: Option<&Party>, choice: Option<PartyId>) -> Resolution {
    let parties = partisan_parties(elections);

    if let Some(locked) = lock {
        // A locked voter may be locked to a party that has since left the
        // catalog, in which case they simply see no primaries.
        let prompt = if parties.len() > 1 {
            PartyPrompt::Locked {
                party: locked.clone(),
            }
        } else {
            PartyPrompt::Hidden
        };
        return Resolution {
            visible: filtered(elections, Some(locked.id)),
            prompt,
        };
    }

    if parties.len() <= 1 {
        // Nothing to choose between.
        return unfiltered(elections);
    }

    let selected = choice.filter(|id| parties.iter().any(|party| party.id == *id));
    Resolution {
        visible: filtered(elections, selected),
        prompt: PartyPrompt::Offered { parties, selected },
    }
}
