use propwise_core::{
    DEFAULT_W_BUDGET, DEFAULT_W_RISK, DEFAULT_W_ROI, PreferenceVector, PreferenceWeights,
    RecommendationRecord,
};
use propwise_store::{PreferenceStore, StoredPreferences};

use crate::PrefsError;
use crate::learning::{LearningOptions, update_from_choice, update_from_rejection};

/// Fills missing fields with defaults and re-normalizes, so a hand-edited entry
/// still yields a usable vector.
pub fn resolve_stored(stored: Option<StoredPreferences>) -> PreferenceVector {
    let Some(stored) = stored else {
        return PreferenceVector::default();
    };

    let mut weights = PreferenceWeights::new(
        stored.w_roi.unwrap_or(DEFAULT_W_ROI),
        stored.w_risk.unwrap_or(DEFAULT_W_RISK),
        stored.w_budget.unwrap_or(DEFAULT_W_BUDGET),
    );
    if !weights.normalize() {
        tracing::warn!(
            w_roi = weights.w_roi,
            w_risk = weights.w_risk,
            w_budget = weights.w_budget,
            "stored weights do not have a positive sum; using them as-is"
        );
    }

    PreferenceVector::new(weights, stored.interactions.unwrap_or(0))
}

/// Per-user preference learning on top of a [`PreferenceStore`]. User keys are used
/// exactly as given; callers normalize them first.
#[derive(Debug, Clone)]
pub struct PreferenceService<S> {
    store: S,
    learning: LearningOptions,
}

impl<S: PreferenceStore> PreferenceService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            learning: LearningOptions::default(),
        }
    }

    pub fn with_learning(mut self, learning: LearningOptions) -> Self {
        self.learning = learning;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load(&self, user_key: &str) -> Result<PreferenceVector, PrefsError> {
        let user_key = validate_user_key(user_key)?;
        let stored = self.store.get_preferences(user_key)?;
        Ok(resolve_stored(stored))
    }

    pub fn save(&self, user_key: &str, vector: &PreferenceVector) -> Result<(), PrefsError> {
        let user_key = validate_user_key(user_key)?;
        self.store.upsert_preferences(user_key, vector)?;
        Ok(())
    }

    /// Folds an accepted recommendation into the persisted vector for `user_key`.
    pub fn record_choice(
        &self,
        user_key: &str,
        chosen: &RecommendationRecord,
        budget: Option<f64>,
    ) -> Result<PreferenceVector, PrefsError> {
        let user_key = validate_user_key(user_key)?;
        let learning = self.learning;
        let updated = self.store.update_preferences(user_key, &mut |stored| {
            let mut vector = resolve_stored(stored);
            update_from_choice(&mut vector, chosen, budget, &learning);
            vector
        })?;

        tracing::debug!(
            user = user_key,
            listing = %chosen.name,
            interactions = updated.interactions,
            "recorded choice"
        );
        Ok(updated)
    }

    /// Folds a rejected batch into the persisted vector for `user_key`.
    pub fn record_rejection(
        &self,
        user_key: &str,
        shown: &[RecommendationRecord],
        budget: Option<f64>,
    ) -> Result<PreferenceVector, PrefsError> {
        let user_key = validate_user_key(user_key)?;
        let learning = self.learning;
        let updated = self.store.update_preferences(user_key, &mut |stored| {
            let mut vector = resolve_stored(stored);
            update_from_rejection(&mut vector, shown, budget, &learning);
            vector
        })?;

        tracing::debug!(
            user = user_key,
            shown = shown.len(),
            interactions = updated.interactions,
            "recorded rejection"
        );
        Ok(updated)
    }
}

fn validate_user_key(user_key: &str) -> Result<&str, PrefsError> {
    if user_key.trim().is_empty() {
        return Err(PrefsError::InvalidInput(
            "user key must not be empty".to_owned(),
        ));
    }
    Ok(user_key)
}

#[cfg(test)]
mod tests {
    use propwise_core::{PreferenceVector, PreferenceWeights};
    use propwise_store::StoredPreferences;

    use super::resolve_stored;

    #[test]
    fn missing_entry_resolves_to_defaults() {
        assert_eq!(resolve_stored(None), PreferenceVector::default());
    }

    #[test]
    fn partial_entry_is_filled_and_renormalized() {
        let vector = resolve_stored(Some(StoredPreferences {
            w_roi: Some(1.0),
            w_risk: None,
            w_budget: None,
            interactions: None,
        }));

        assert_eq!(vector.interactions, 0);
        assert!((vector.weights.sum() - 1.0).abs() < 1e-9);
        assert!((vector.weights.w_roi - 1.0 / 1.5).abs() < 1e-12);
        assert!((vector.weights.w_risk - 0.3 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn degenerate_entry_is_kept_verbatim() {
        let vector = resolve_stored(Some(StoredPreferences {
            w_roi: Some(0.0),
            w_risk: Some(0.0),
            w_budget: Some(0.0),
            interactions: Some(7),
        }));

        assert_eq!(vector.weights, PreferenceWeights::new(0.0, 0.0, 0.0));
        assert_eq!(vector.interactions, 7);
    }
}
