//! The voter participation engine: one instance per voting session.
//!
//! The engine owns the catalog, the party lock and the ballot draft. Nothing
//! else mutates them; the presentation layer reads [`PortalView`] snapshots,
//! either on demand via [`VotingEngine::view`] or by subscribing to every
//! transition via [`VotingEngine::subscribe`].

mod catalog;
pub mod composer;
pub mod resolver;
mod state;
mod submission;

pub use catalog::Catalog;
pub use composer::{BallotView, CandidateChoice, RankedChoice};
pub use resolver::{Badge, ElectionSummary, ElectionTag, PartyPrompt, Resolution};
pub use state::{Confirmation, EngineState, PortalView, Signal};

use chrono::Utc;
use rocket::tokio::sync::watch;

use crate::error::{Error, Result};
use crate::model::{
    ballot::BallotDraft, AccessToken, CandidateId, Election, ElectionId, Party, PartyId, Rank,
    VoterIdentity,
};
use crate::service::ElectionService;

use composer::Composition;

/// The voter bound to the engine.
struct Session {
    voter: VoterIdentity,
    credential: Option<AccessToken>,
}

/// A single voter's session over an [`ElectionService`].
///
/// Every operation settles any pending error first. Service failures put an
/// error on top of the last good state; local failures leave the state alone.
pub struct VotingEngine<S> {
    service: S,
    session: Option<Session>,
    catalog: Option<Catalog>,
    /// Committed party under open/semi-open models. Once set, only a reset clears it.
    party_lock: Option<Party>,
    /// Uncommitted party pick, replaceable until the first partisan vote.
    party_choice: Option<PartyId>,
    state: EngineState,
    views: watch::Sender<PortalView>,
}

impl<S: ElectionService> VotingEngine<S> {
    /// An engine with no voter bound and nothing loaded.
    pub fn new(service: S) -> Self {
        let (views, _) = watch::channel(PortalView::default());
        Self {
            service,
            session: None,
            catalog: None,
            party_lock: None,
            party_choice: None,
            state: EngineState::Unloaded,
            views,
        }
    }

    /// Receive a fresh [`PortalView`] after every transition.
    pub fn subscribe(&self) -> watch::Receiver<PortalView> {
        self.views.subscribe()
    }

    /// The election service this engine talks to.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The current state, including any error on top of it.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// The bound voter, if any.
    pub fn voter(&self) -> Option<&VoterIdentity> {
        self.session.as_ref().map(|session| &session.voter)
    }

    /// The last successfully loaded catalog, unfiltered.
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// The party this voter is committed to for the rest of the session.
    pub fn party_lock(&self) -> Option<&Party> {
        self.party_lock.as_ref()
    }

    // ----- Session -----

    /// Start a session for `voter`, discarding everything from any previous voter.
    pub fn bind_voter(&mut self, voter: VoterIdentity, credential: Option<AccessToken>) {
        self.clear();
        info!("Bound voter {} ({})", voter.id, voter.display_name);
        self.session = Some(Session { voter, credential });
        self.publish();
    }

    /// End the session and drop all derived state.
    pub fn reset(&mut self) {
        if let Some(session) = &self.session {
            info!("Ending session for voter {}", session.voter.id);
        }
        self.clear();
        self.publish();
    }

    fn clear(&mut self) {
        self.session = None;
        self.catalog = None;
        self.party_lock = None;
        self.party_choice = None;
        self.state = EngineState::Unloaded;
    }

    // ----- Catalog -----

    /// Load (or reload) the bound voter's elections. On failure the previous
    /// catalog stays in place and the error is signalled.
    pub async fn load(&mut self) -> Result<()> {
        self.settle();
        let session = self.session.as_ref().ok_or(Error::NoVoter)?;
        let voter = session.voter.id;
        let credential = session.credential.clone();

        match Catalog::load(&self.service, voter, credential.as_ref()).await {
            Ok(catalog) => {
                self.install(catalog);
                Ok(())
            }
            Err(err) => {
                error!("Failed to load elections for voter {voter}: {err}");
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn install(&mut self, catalog: Catalog) {
        if catalog.config().primary_model.uses_party_lock() && self.party_lock.is_none() {
            if let Some(party) = resolver::infer_party_lock(catalog.elections()) {
                info!("Voter has already voted in the {party} primaries; committing to {party}");
                self.party_lock = Some(party);
            }
        }
        if let Some(choice) = self.party_choice {
            let still_offered = resolver::partisan_parties(catalog.elections())
                .iter()
                .any(|party| party.id == choice);
            if !still_offered {
                debug!("Dropping party choice {choice}: it has no primaries any more");
                self.party_choice = None;
            }
        }
        self.catalog = Some(catalog);
        let next = self.browse_state();
        self.transition(next);
    }

    // ----- Resolution -----

    /// The visible elections and party prompt, if a catalog is loaded.
    pub fn resolution(&self) -> Option<Resolution> {
        let catalog = self.catalog.as_ref()?;
        let config = catalog.config();
        let lock = if config.primary_model.uses_party_lock() {
            self.party_lock.as_ref()
        } else {
            None
        };
        Some(resolver::resolve(
            catalog.elections(),
            config,
            lock,
            self.party_choice,
        ))
    }

    /// The elections the voter may currently see; empty until a catalog is loaded.
    pub fn visible_elections(&self) -> Vec<ElectionSummary> {
        self.resolution()
            .map(|resolution| resolution.visible)
            .unwrap_or_default()
    }

    /// The party-selection prompt; hidden until a catalog is loaded.
    pub fn party_prompt(&self) -> PartyPrompt {
        self.resolution()
            .map(|resolution| resolution.prompt)
            .unwrap_or_default()
    }

    /// Pick the party whose primaries to show. Allowed until the voter has
    /// voted in a partisan primary.
    pub fn select_party(&mut self, party: PartyId) -> Result<()> {
        self.settle();
        let resolution = self.resolution().ok_or(Error::NotLoaded)?;
        // A confirmation sits on top of the election list.
        if !(self.state.is_browsing() || matches!(self.state, EngineState::Confirmed(_))) {
            return Err(self.invalid("choose a party"));
        }

        match resolution.prompt {
            PartyPrompt::Hidden => Err(Error::PartySelectionUnavailable),
            PartyPrompt::Locked { party: locked } if locked.id == party => {
                let next = self.browse_state();
                self.transition(next);
                Ok(())
            }
            PartyPrompt::Locked { party: locked } => Err(Error::PartyLocked(locked.name)),
            PartyPrompt::Offered { parties, .. } => {
                let chosen = parties
                    .iter()
                    .find(|offered| offered.id == party)
                    .ok_or(Error::UnknownParty(party))?;
                info!("Voter chose the {chosen} primaries");
                self.party_choice = Some(party);
                let next = self.browse_state();
                self.transition(next);
                Ok(())
            }
        }
    }

    fn browse_state(&self) -> EngineState {
        match self.resolution() {
            None => EngineState::Unloaded,
            Some(resolution) => match resolution.prompt {
                PartyPrompt::Offered { selected: None, .. } => {
                    EngineState::PartySelectionRequired { locked: None }
                }
                PartyPrompt::Locked { party } => EngineState::PartySelectionRequired {
                    locked: Some(party),
                },
                PartyPrompt::Offered { .. } | PartyPrompt::Hidden => EngineState::Browsing,
            },
        }
    }

    // ----- Ballot composition -----

    /// Open a visible election, discarding any draft for another one.
    pub fn open_election(&mut self, id: ElectionId) -> Result<()> {
        self.settle();
        let resolution = self.resolution().ok_or(Error::NotLoaded)?;
        if matches!(self.state, EngineState::Submitting { .. }) {
            return Err(self.invalid("open an election"));
        }
        if !resolution.is_visible(id) {
            return Err(Error::ElectionNotVisible(id));
        }
        let election = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.election(id))
            .ok_or(Error::ElectionNotVisible(id))?;

        let next = match composer::compose(election) {
            Composition::Draft(draft) => EngineState::Composing { election: id, draft },
            Composition::AlreadyVoted => EngineState::AlreadyVoted { election: id },
        };
        self.transition(next);
        Ok(())
    }

    /// The election currently open, if any.
    pub fn active_election(&self) -> Option<&Election> {
        let id = match self.state.settled() {
            EngineState::Composing { election, .. }
            | EngineState::Submitting { election, .. }
            | EngineState::AlreadyVoted { election } => *election,
            _ => return None,
        };
        self.catalog.as_ref()?.election(id)
    }

    /// Return to the election list, discarding any draft.
    pub fn back(&mut self) {
        self.settle();
        if matches!(self.state, EngineState::Submitting { .. }) {
            return;
        }
        let next = self.browse_state();
        self.transition(next);
    }

    /// Acknowledge a confirmation or error.
    pub fn dismiss(&mut self) {
        match &self.state {
            EngineState::Error { .. } => self.settle(),
            EngineState::Confirmed(_) => self.back(),
            _ => {}
        }
    }

    pub fn select_candidate(&mut self, candidate: CandidateId) -> Result<()> {
        self.edit_draft("select a candidate", |draft| {
            Ok(draft.single_mut()?.select(candidate)?)
        })
    }

    pub fn add_rank(&mut self, candidate: CandidateId) -> Result<Rank> {
        self.edit_draft("rank a candidate", |draft| {
            Ok(draft.ranking_mut()?.add_rank(candidate)?)
        })
    }

    pub fn remove_rank(&mut self, candidate: CandidateId) -> Result<()> {
        self.edit_draft("unrank a candidate", |draft| {
            Ok(draft.ranking_mut()?.remove_rank(candidate)?)
        })
    }

    pub fn move_up(&mut self, candidate: CandidateId) -> Result<Rank> {
        self.edit_draft("reorder candidates", |draft| {
            Ok(draft.ranking_mut()?.move_up(candidate)?)
        })
    }

    pub fn move_down(&mut self, candidate: CandidateId) -> Result<Rank> {
        self.edit_draft("reorder candidates", |draft| {
            Ok(draft.ranking_mut()?.move_down(candidate)?)
        })
    }

    pub fn clear_ranks(&mut self) -> Result<()> {
        self.edit_draft("clear rankings", |draft| {
            draft.ranking_mut()?.clear();
            Ok(())
        })
    }

    fn edit_draft<T>(
        &mut self,
        action: &'static str,
        edit: impl FnOnce(&mut BallotDraft) -> Result<T>,
    ) -> Result<T> {
        self.settle();
        let result = match &mut self.state {
            EngineState::Composing { draft, .. } => edit(draft)?,
            other => {
                return Err(Error::InvalidState {
                    action,
                    state: other.name(),
                })
            }
        };
        self.publish();
        Ok(result)
    }

    // ----- Submission -----

    /// Whether the open ballot is complete and can be sent.
    pub fn can_submit(&self) -> bool {
        matches!(
            self.state.settled(),
            EngineState::Composing { draft, .. } if draft.is_complete()
        )
    }

    /// Send the open ballot. On failure the ballot stays open with its draft
    /// intact and the error is signalled.
    pub async fn submit(&mut self) -> Result<Confirmation> {
        self.settle();
        let (election_id, draft) = match &self.state {
            EngineState::Composing { election, draft } => (*election, draft.clone()),
            other => {
                return Err(Error::InvalidState {
                    action: "submit a ballot",
                    state: other.name(),
                })
            }
        };
        let session = self.session.as_ref().ok_or(Error::NoVoter)?;
        let payload = draft.payload(election_id, session.voter.id)?;
        let credential = session.credential.clone();

        self.transition(EngineState::Submitting {
            election: election_id,
            draft: draft.clone(),
        });
        match submission::submit(&self.service, &payload, credential.as_ref()).await {
            Ok(votes_recorded) => Ok(self.record_success(election_id, votes_recorded)),
            Err(err) => {
                error!("Submission for election {election_id} failed: {err}");
                self.state = EngineState::Composing {
                    election: election_id,
                    draft,
                };
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn record_success(&mut self, election_id: ElectionId, votes_recorded: usize) -> Confirmation {
        let uses_lock = self
            .catalog
            .as_ref()
            .map_or(false, |catalog| catalog.config().primary_model.uses_party_lock());
        let (position_name, primary_party) = match self
            .catalog
            .as_mut()
            .and_then(|catalog| catalog.mark_voted(election_id))
        {
            Some(election) => (
                election.position_name.clone(),
                election
                    .is_partisan_primary()
                    .then(|| election.party())
                    .flatten(),
            ),
            None => (String::new(), None),
        };
        if let (true, Some(party)) = (uses_lock, primary_party) {
            self.commit_to_party(party);
        }

        let confirmation = Confirmation {
            election_id,
            position_name,
            votes_recorded,
            confirmed_at: Utc::now(),
        };
        info!(
            "Ballot for election {election_id} ({}) confirmed",
            confirmation.position_name
        );
        self.transition(EngineState::Confirmed(confirmation.clone()));
        confirmation
    }

    fn commit_to_party(&mut self, party: Party) {
        match &self.party_lock {
            None => {
                info!("Voter is now committed to the {party} primaries");
                self.party_lock = Some(party);
                self.party_choice = None;
            }
            Some(locked) if locked.id == party.id => {}
            Some(locked) => {
                warn!("Voted in the {party} primaries while committed to {locked}; keeping {locked}")
            }
        }
    }

    // ----- Transitions -----

    fn transition(&mut self, next: EngineState) {
        debug!("{} -> {}", self.state.name(), next.name());
        self.state = next;
        self.publish();
    }

    /// Show an error on top of the last good state.
    fn fail(&mut self, err: &Error) {
        let resume = match std::mem::take(&mut self.state) {
            EngineState::Error { resume, .. } => *resume,
            other => other,
        };
        self.transition(EngineState::Error {
            message: err.user_message(),
            resume: Box::new(resume),
        });
    }

    /// Drop any error, returning to the state underneath it.
    fn settle(&mut self) {
        match std::mem::take(&mut self.state) {
            EngineState::Error { resume, .. } => {
                self.state = *resume;
                self.publish();
            }
            other => self.state = other,
        }
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    fn publish(&self) {
        self.views.send_replace(self.view());
    }

    // ----- Presentation -----

    /// A snapshot of everything the presentation layer renders.
    pub fn view(&self) -> PortalView {
        let resolution = self.resolution();
        let signal = match &self.state {
            EngineState::Error { message, .. } => Some(Signal::Error(message.clone())),
            EngineState::Confirmed(confirmation) => Some(Signal::Confirmed(confirmation.clone())),
            _ => None,
        };
        let ballot = resolution
            .as_ref()
            .and_then(|resolution| self.ballot_view(resolution, self.state.settled()));

        PortalView {
            voter: self.voter().cloned(),
            loaded: self.catalog.is_some(),
            elections: resolution
                .as_ref()
                .map(|resolution| resolution.visible.clone())
                .unwrap_or_default(),
            party_prompt: resolution
                .map(|resolution| resolution.prompt)
                .unwrap_or_default(),
            ballot,
            submit_enabled: self.can_submit(),
            signal,
            state: self.state.clone(),
        }
    }

    fn ballot_view(&self, resolution: &Resolution, state: &EngineState) -> Option<BallotView> {
        let (id, draft) = match state {
            EngineState::Composing { election, draft }
            | EngineState::Submitting { election, draft } => (*election, Some(draft)),
            EngineState::AlreadyVoted { election } => (*election, None),
            _ => return None,
        };
        let election = self.catalog.as_ref()?.election(id)?;
        let summary = resolution.summary(id)?;
        Some(composer::ballot_view(election, summary, draft))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::election::examples::{FEDERALIST, NATIONALIST, WHIG};
    use crate::model::{AdvancementModel, PrimaryModel};
    use crate::service::{CatalogResponse, FakeElectionService};

    use super::*;

    fn catalog(model: PrimaryModel, elections: Vec<Election>) -> CatalogResponse {
        CatalogResponse {
            elections,
            primary_model: model,
            advancement_model: AdvancementModel::Top2,
        }
    }

    /// General 1, Federalist primaries 2 and 4, Nationalist primary 3.
    fn two_party(model: PrimaryModel) -> CatalogResponse {
        catalog(
            model,
            vec![
                Election::general_example(1),
                Election::primary_example(2, FEDERALIST),
                Election::primary_example(3, NATIONALIST),
                Election::primary_example(4, FEDERALIST),
            ],
        )
    }

    fn visible_ids<S: ElectionService>(engine: &VotingEngine<S>) -> Vec<ElectionId> {
        engine.visible_elections().iter().map(|e| e.id).collect()
    }

    fn badge<S: ElectionService>(engine: &VotingEngine<S>, id: ElectionId) -> Option<Badge> {
        engine
            .visible_elections()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.badge)
    }

    #[portal_test(voter)]
    async fn closed_general_without_selection_cannot_submit(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::general_example(1)]));
        engine.load().await.unwrap();
        assert_eq!(engine.state(), &EngineState::Browsing);
        assert_eq!(engine.party_prompt(), PartyPrompt::Hidden);

        engine.open_election(1).unwrap();
        assert!(!engine.can_submit());
        assert!(!engine.view().submit_enabled);

        // Submitting anyway is caught before anything is sent.
        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(service.vote_attempts(), 0);
        assert!(matches!(engine.state(), EngineState::Composing { .. }));
    }

    #[portal_test(voter)]
    async fn open_primary_offers_party_choice(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();

        assert_eq!(
            engine.state(),
            &EngineState::PartySelectionRequired { locked: None }
        );
        match engine.party_prompt() {
            PartyPrompt::Offered { parties, selected } => {
                let names: Vec<_> = parties.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["Federalist", "Nationalist"]);
                assert_eq!(selected, None);
            }
            other => panic!("Expected an offered prompt, got {other:?}"),
        }
        // No primaries until a party is picked.
        assert_eq!(visible_ids(&engine), vec![1]);
        assert!(matches!(
            engine.open_election(2),
            Err(Error::ElectionNotVisible(2))
        ));

        engine.select_party(FEDERALIST).unwrap();
        assert_eq!(engine.state(), &EngineState::Browsing);
        assert_eq!(visible_ids(&engine), vec![1, 2, 4]);

        // Nothing is committed until a vote is cast, so the choice can change.
        engine.select_party(NATIONALIST).unwrap();
        assert_eq!(visible_ids(&engine), vec![1, 3]);
        assert!(matches!(
            engine.select_party(WHIG),
            Err(Error::UnknownParty(WHIG))
        ));
        assert!(engine.party_lock().is_none());
    }

    #[portal_test(voter)]
    async fn prior_primary_vote_locks_party(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        let mut response = two_party(PrimaryModel::SemiOpen);
        response.elections[1].has_voted = true;
        service.set_catalog(response);
        engine.load().await.unwrap();

        let federalist = Party {
            id: FEDERALIST,
            name: "Federalist".to_string(),
        };
        assert_eq!(
            engine.party_prompt(),
            PartyPrompt::Locked {
                party: federalist.clone()
            }
        );
        assert_eq!(
            engine.state(),
            &EngineState::PartySelectionRequired {
                locked: Some(federalist)
            }
        );
        assert_eq!(visible_ids(&engine), vec![1, 2, 4]);
        assert!(matches!(
            engine.select_party(NATIONALIST),
            Err(Error::PartyLocked(name)) if name == "Federalist"
        ));
        engine.select_party(FEDERALIST).unwrap();
    }

    #[portal_test(voter)]
    async fn first_partisan_vote_commits_party(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();
        engine.select_party(FEDERALIST).unwrap();

        engine.open_election(2).unwrap();
        engine.select_candidate(21).unwrap();
        engine.submit().await.unwrap();

        assert_eq!(engine.party_lock().map(|p| p.id), Some(FEDERALIST));
        assert!(matches!(engine.party_prompt(), PartyPrompt::Locked { .. }));
        assert!(engine.select_party(NATIONALIST).is_err());

        // The lock survives every later catalog view in the session.
        engine.load().await.unwrap();
        assert_eq!(visible_ids(&engine), vec![1, 2, 4]);
        assert_eq!(badge(&engine, 2), Some(Badge::Voted));
    }

    #[portal_test(voter)]
    async fn general_vote_does_not_commit_party(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();
        engine.open_election(1).unwrap();
        engine.select_candidate(101).unwrap();
        engine.submit().await.unwrap();

        assert!(engine.party_lock().is_none());
        assert!(matches!(
            engine.party_prompt(),
            PartyPrompt::Offered { selected: None, .. }
        ));
    }

    #[portal_test(voter)]
    async fn party_choice_allowed_after_confirmation(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();
        engine.open_election(1).unwrap();
        engine.select_candidate(101).unwrap();
        engine.submit().await.unwrap();
        assert!(matches!(engine.state(), EngineState::Confirmed(_)));

        engine.select_party(NATIONALIST).unwrap();
        assert_eq!(engine.state(), &EngineState::Browsing);
        assert_eq!(visible_ids(&engine), vec![1, 3]);

        engine.open_election(3).unwrap();
        engine.select_candidate(31).unwrap();
        engine.submit().await.unwrap();
        engine.select_party(NATIONALIST).unwrap();
        assert_eq!(
            engine.state(),
            &EngineState::PartySelectionRequired {
                locked: engine.party_lock().cloned()
            }
        );
        assert!(matches!(
            engine.select_party(FEDERALIST),
            Err(Error::PartyLocked(name)) if name == "Nationalist"
        ));
    }

    #[portal_test(voter)]
    async fn refresh_drops_departed_party_choice(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();
        engine.select_party(FEDERALIST).unwrap();
        assert_eq!(visible_ids(&engine), vec![1, 2, 4]);

        // Federalist primaries disappear...
        service.set_catalog(catalog(
            PrimaryModel::Open,
            vec![
                Election::general_example(1),
                Election::primary_example(3, NATIONALIST),
                Election::primary_example(5, WHIG),
            ],
        ));
        engine.load().await.unwrap();
        assert!(matches!(
            engine.party_prompt(),
            PartyPrompt::Offered { selected: None, .. }
        ));

        // ...and come back, but the old choice does not.
        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();
        assert!(matches!(
            engine.party_prompt(),
            PartyPrompt::Offered { selected: None, .. }
        ));
        assert_eq!(
            engine.state(),
            &EngineState::PartySelectionRequired { locked: None }
        );
        assert_eq!(visible_ids(&engine), vec![1]);
    }

    #[portal_test(voter)]
    async fn refresh_while_composing_returns_to_list(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::general_example(1)]));
        engine.load().await.unwrap();
        engine.open_election(1).unwrap();
        engine.select_candidate(101).unwrap();
        assert!(engine.can_submit());

        engine.load().await.unwrap();
        assert_eq!(engine.state(), &EngineState::Browsing);
        assert!(!engine.can_submit());
        assert!(engine.active_election().is_none());
        assert!(engine.view().ballot.is_none());
        assert!(engine.select_candidate(101).is_err());
    }

    #[portal_test(voter)]
    async fn locked_party_removed_from_catalog(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        let mut response = two_party(PrimaryModel::Open);
        response.elections[3].has_voted = true;
        service.set_catalog(response);
        engine.load().await.unwrap();

        service.set_catalog(catalog(
            PrimaryModel::Open,
            vec![
                Election::general_example(1),
                Election::primary_example(3, NATIONALIST),
                Election::primary_example(5, WHIG),
            ],
        ));
        engine.load().await.unwrap();

        assert_eq!(visible_ids(&engine), vec![1]);
        assert!(matches!(
            engine.party_prompt(),
            PartyPrompt::Locked { party } if party.id == FEDERALIST
        ));
    }

    #[portal_test(voter)]
    async fn other_models_never_prompt(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        for model in [PrimaryModel::Closed, PrimaryModel::Blanket, PrimaryModel::Jungle] {
            service.set_catalog(two_party(model));
            engine.load().await.unwrap();
            assert_eq!(engine.party_prompt(), PartyPrompt::Hidden);
            assert_eq!(visible_ids(&engine), vec![1, 2, 3, 4]);
            assert!(matches!(
                engine.select_party(FEDERALIST),
                Err(Error::PartySelectionUnavailable)
            ));
        }
    }

    #[portal_test(voter)]
    async fn blanket_ballot_spans_parties(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        let mut response = catalog(PrimaryModel::Blanket, vec![Election::blanket_example(9)]);
        response.advancement_model = AdvancementModel::Top4InstantRunoff;
        service.set_catalog(response);
        engine.load().await.unwrap();
        engine.open_election(9).unwrap();

        match engine.view().ballot {
            Some(BallotView::Single {
                election, choices, ..
            }) => {
                assert_eq!(election.tag, Some(ElectionTag::Blanket { advancing: 4 }));
                assert_eq!(choices.len(), 3);
                assert!(choices.iter().all(|c| c.candidate.party_name.is_some()));
            }
            other => panic!("Expected a single-choice ballot, got {other:?}"),
        }
    }

    #[portal_test(voter)]
    async fn ranking_through_engine(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::ranked_example(30)]));
        engine.load().await.unwrap();
        engine.open_election(30).unwrap();
        assert!(!engine.can_submit());

        assert_eq!(engine.add_rank(2).unwrap(), 1);
        assert_eq!(engine.add_rank(1).unwrap(), 2);
        engine.remove_rank(2).unwrap();

        match engine.view().ballot {
            Some(BallotView::Ranked { choices, .. }) => {
                let ranks: Vec<_> = choices
                    .iter()
                    .map(|c| (c.candidate.name.as_str(), c.rank))
                    .collect();
                assert_eq!(ranks, vec![("A", Some(1)), ("B", None), ("C", None)]);
            }
            other => panic!("Expected a ranked ballot, got {other:?}"),
        }
        assert!(engine.can_submit());
        assert!(matches!(
            engine.select_candidate(1),
            Err(Error::Validation(_))
        ));

        engine.add_rank(3).unwrap();
        assert_eq!(engine.move_up(3).unwrap(), 1);
        assert_eq!(engine.move_down(3).unwrap(), 2);
        engine.clear_ranks().unwrap();
        assert!(!engine.can_submit());
    }

    #[portal_test(voter)]
    async fn ranked_failure_stops_remaining_requests(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::ranked_example(30)]));
        engine.load().await.unwrap();
        engine.open_election(30).unwrap();
        for candidate in [1, 2, 3] {
            engine.add_rank(candidate).unwrap();
        }
        service.fail_vote_number(2);

        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, Error::Submission { accepted: 1, total: 3, .. }));
        assert_eq!(service.vote_attempts(), 2);
        assert_eq!(badge(&engine, 30), Some(Badge::Open));
        assert!(!engine.catalog().unwrap().election(30).unwrap().has_voted);

        // The ballot is still there, with the error on top of it.
        let view = engine.view();
        assert_eq!(
            view.signal,
            Some(Signal::Error("Vote for candidate 2 rejected".to_string()))
        );
        assert!(view.submit_enabled);
        assert!(matches!(view.ballot, Some(BallotView::Ranked { .. })));
        engine.dismiss();
        assert!(matches!(engine.state(), EngineState::Composing { .. }));
    }

    #[portal_test(voter)]
    async fn single_choice_round_trip(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::general_example(1)]));
        engine.load().await.unwrap();
        engine.open_election(1).unwrap();
        engine.select_candidate(101).unwrap();
        engine.select_candidate(102).unwrap();
        assert!(engine.can_submit());

        let confirmation = engine.submit().await.unwrap();
        assert_eq!(confirmation.election_id, 1);
        assert_eq!(confirmation.position_name, "Governor");
        assert_eq!(confirmation.votes_recorded, 1);

        let votes = service.votes();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].1.candidate_id, 102);
        assert_eq!(votes[0].1.voter_id, VoterIdentity::example().id);
        assert_eq!(votes[0].1.rank, None);

        let view = engine.view();
        assert_eq!(view.signal, Some(Signal::Confirmed(confirmation)));
        assert!(view.ballot.is_none());
        assert_eq!(badge(&engine, 1), Some(Badge::Voted));

        engine.dismiss();
        assert_eq!(engine.state(), &EngineState::Browsing);
    }

    #[portal_test(voter)]
    async fn voted_election_never_drafts(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(
            PrimaryModel::Closed,
            vec![Election::general_example(1).voted()],
        ));
        engine.load().await.unwrap();

        for _ in 0..2 {
            engine.open_election(1).unwrap();
            assert_eq!(engine.state(), &EngineState::AlreadyVoted { election: 1 });
            assert!(!engine.can_submit());
            assert!(matches!(
                engine.view().ballot,
                Some(BallotView::AlreadyVoted { .. })
            ));
            assert!(engine.select_candidate(101).is_err());
        }
        assert!(engine.submit().await.is_err());
        assert_eq!(service.vote_attempts(), 0);
    }

    #[portal_test(voter)]
    async fn opening_another_election_discards_draft(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.set_catalog(catalog(
            PrimaryModel::Closed,
            vec![Election::general_example(1), Election::ranked_example(30)],
        ));
        engine.load().await.unwrap();
        engine.open_election(1).unwrap();
        engine.select_candidate(101).unwrap();

        engine.open_election(30).unwrap();
        engine.open_election(1).unwrap();
        assert!(!engine.can_submit());

        engine.select_candidate(101).unwrap();
        engine.back();
        assert_eq!(engine.state(), &EngineState::Browsing);
        assert!(engine.select_candidate(101).is_err());
        assert!(engine.active_election().is_none());
    }

    #[portal_test(voter)]
    async fn load_failure_keeps_previous_catalog(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        service.fail_catalog(Some("Election service is down"));
        assert!(engine.load().await.is_err());
        let view = engine.view();
        assert!(!view.loaded);
        assert!(view.elections.is_empty());
        assert_eq!(
            view.signal,
            Some(Signal::Error("Election service is down".to_string()))
        );

        service.fail_catalog(None);
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::general_example(1)]));
        engine.load().await.unwrap();
        assert_eq!(engine.view().signal, None);

        service.fail_catalog(Some("Election service is down"));
        assert!(engine.load().await.is_err());
        assert_eq!(visible_ids(&engine), vec![1]);
        assert!(engine.view().loaded);
        assert_eq!(service.catalog_loads(), 3);
        engine.dismiss();
        assert_eq!(engine.state(), &EngineState::Browsing);
    }

    #[portal_test]
    async fn load_requires_voter(mut engine: VotingEngine<FakeElectionService>) {
        assert!(matches!(engine.load().await, Err(Error::NoVoter)));
        assert!(matches!(engine.open_election(1), Err(Error::NotLoaded)));
    }

    #[portal_test(voter)]
    async fn rebinding_resets_everything(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        let mut response = two_party(PrimaryModel::Open);
        response.elections[1].has_voted = true;
        service.set_catalog(response);
        engine.load().await.unwrap();
        engine.open_election(4).unwrap();
        assert!(engine.party_lock().is_some());

        engine.bind_voter(VoterIdentity::example2(), Some(AccessToken::new("second")));
        assert_eq!(engine.state(), &EngineState::Unloaded);
        assert!(engine.party_lock().is_none());
        assert!(engine.catalog().is_none());
        assert_eq!(engine.voter().map(|v| v.id), Some(8));

        service.set_catalog(two_party(PrimaryModel::Open));
        engine.load().await.unwrap();
        assert_eq!(service.last_voter(), Some(8));
        assert_eq!(service.last_credential().as_deref(), Some("second"));
        assert!(engine.party_lock().is_none());

        engine.reset();
        assert!(engine.voter().is_none());
        assert_eq!(engine.view(), PortalView::default());
    }

    #[portal_test(voter)]
    async fn subscribers_see_each_transition(
        mut engine: VotingEngine<FakeElectionService>,
        service: FakeElectionService,
    ) {
        let mut views = engine.subscribe();
        service.set_catalog(catalog(PrimaryModel::Closed, vec![Election::general_example(1)]));

        engine.load().await.unwrap();
        assert!(views.has_changed().unwrap());
        assert_eq!(views.borrow_and_update().elections.len(), 1);

        engine.open_election(1).unwrap();
        engine.select_candidate(101).unwrap();
        assert!(views.borrow_and_update().submit_enabled);

        engine.submit().await.unwrap();
        let latest = views.borrow_and_update().clone();
        assert!(matches!(latest.signal, Some(Signal::Confirmed(_))));
        assert!(!latest.is_submitting());
    }
}
