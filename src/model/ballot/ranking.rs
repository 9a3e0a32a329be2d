use thiserror::Error;

use crate::model::{CandidateId, Rank};

/// Invalid Ranking Editor operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("Candidate {0} is not on this ballot")]
    NotOnBallot(CandidateId),
    #[error("Candidate {0} already has a rank")]
    AlreadyRanked(CandidateId),
    #[error("Candidate {0} has not been ranked")]
    NotRanked(CandidateId),
    #[error("Candidate {0} is already ranked first")]
    AlreadyFirst(CandidateId),
    #[error("Candidate {0} is already ranked last")]
    AlreadyLast(CandidateId),
}

/// An ordered preference list over an unordered candidate pool.
///
/// Ranks are the 1-based positions in `ranked`, so the assigned ranks are always
/// exactly `1..=k` with no gaps or duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEditor {
    pool: Vec<CandidateId>,
    ranked: Vec<CandidateId>,
}

impl RankingEditor {
    pub fn new(pool: Vec<CandidateId>) -> Self {
        Self {
            pool,
            ranked: Vec::new(),
        }
    }

    /// The candidate pool, in ballot order.
    pub fn pool(&self) -> &[CandidateId] {
        &self.pool
    }

    /// Ranked candidates, first preference first.
    pub fn ranked(&self) -> &[CandidateId] {
        &self.ranked
    }

    /// Candidates without a rank, in ballot order.
    pub fn unranked(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.pool
            .iter()
            .copied()
            .filter(move |candidate| !self.ranked.contains(candidate))
    }

    pub fn rank_of(&self, candidate: CandidateId) -> Option<Rank> {
        self.position(candidate).map(|index| index + 1)
    }

    /// `(candidate, rank)` pairs in ascending rank order.
    pub fn ranks(&self) -> Vec<(CandidateId, Rank)> {
        self.ranked
            .iter()
            .enumerate()
            .map(|(index, candidate)| (*candidate, index + 1))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Give an unranked candidate the next rank after the current lowest preference.
    pub fn add_rank(&mut self, candidate: CandidateId) -> Result<Rank, RankingError> {
        self.check_on_ballot(candidate)?;
        if self.position(candidate).is_some() {
            return Err(RankingError::AlreadyRanked(candidate));
        }
        self.ranked.push(candidate);
        Ok(self.ranked.len())
    }

    /// Clear a candidate's rank; everyone ranked below moves up by one.
    pub fn remove_rank(&mut self, candidate: CandidateId) -> Result<(), RankingError> {
        let index = self.ranked_position(candidate)?;
        self.ranked.remove(index);
        Ok(())
    }

    /// Swap a candidate with whoever holds the rank above.
    pub fn move_up(&mut self, candidate: CandidateId) -> Result<Rank, RankingError> {
        let index = self.ranked_position(candidate)?;
        if index == 0 {
            return Err(RankingError::AlreadyFirst(candidate));
        }
        self.ranked.swap(index, index - 1);
        Ok(index)
    }

    /// Swap a candidate with whoever holds the rank below.
    pub fn move_down(&mut self, candidate: CandidateId) -> Result<Rank, RankingError> {
        let index = self.ranked_position(candidate)?;
        if index + 1 == self.ranked.len() {
            return Err(RankingError::AlreadyLast(candidate));
        }
        self.ranked.swap(index, index + 1);
        Ok(index + 2)
    }

    /// Unrank everyone.
    pub fn clear(&mut self) {
        self.ranked.clear();
    }

    fn position(&self, candidate: CandidateId) -> Option<usize> {
        self.ranked.iter().position(|ranked| *ranked == candidate)
    }

    fn ranked_position(&self, candidate: CandidateId) -> Result<usize, RankingError> {
        self.check_on_ballot(candidate)?;
        self.position(candidate)
            .ok_or(RankingError::NotRanked(candidate))
    }

    fn check_on_ballot(&self, candidate: CandidateId) -> Result<(), RankingError> {
        if self.pool.contains(&candidate) {
            Ok(())
        } else {
            Err(RankingError::NotOnBallot(candidate))
        }
    }
}
