//! Reconciliation logic for CheckIn and LongLivingPod.
//!
//! Reconcile functions receive only the key of the object to converge and
//! re-read everything they need through the [`ClusterStore`], so they are
//! safe to call any number of times for the same key.

pub mod check_in;
pub mod long_living_pod;

use crate::config::TrackerSettings;
use controller_kit::ClusterStore;

pub use check_in::reconcile_check_in;
pub use long_living_pod::reconcile_long_living_pod;

/// State shared by every reconciliation.
pub struct Context<S: ClusterStore> {
    pub store: S,
    pub tracker: TrackerSettings,
}

impl<S: ClusterStore> Context<S> {
    pub fn new(store: S, tracker: TrackerSettings) -> Self {
        Self { store, tracker }
    }
}
