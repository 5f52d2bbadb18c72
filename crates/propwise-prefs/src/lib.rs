use thiserror::Error;

mod learning;
mod service;

pub use learning::{
    LearningOptions, WeightNudge, choice_nudge, rejection_nudge, update_from_choice,
    update_from_rejection,
};
pub use service::{PreferenceService, resolve_stored};

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(#[from] propwise_store::StoreError),
}
