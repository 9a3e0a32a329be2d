//! Voter participation engine for civic-program elections.
//!
//! Loads the elections a voter is eligible for, applies the program's primary
//! model and party lock to decide what the voter sees, builds single-choice and
//! ranked ballots, and submits them to the election service.

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate portal_test;

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;

pub use config::PortalConfig;
pub use engine::{EngineState, PortalView, VotingEngine};
pub use error::{Error, Result};
pub use service::{ElectionService, HttpElectionService};
