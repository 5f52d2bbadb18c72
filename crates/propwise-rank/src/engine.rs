use std::cmp::Ordering;

use propwise_config::{DEFAULT_BUDGET_CEILING, DEFAULT_MODE_THRESHOLD, RankingConfig};
use propwise_core::{Listing, PreferenceWeights, RankMode, RecommendationRecord};
use serde::{Deserialize, Serialize};

use crate::Filter;
use crate::candidate::{Candidate, collect_candidates, effective_budget};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankRequest {
    /// Pre-validated budget; `None`, zero, negative or non-finite all mean "no budget".
    pub budget: Option<f64>,
    pub city: Filter,
    pub property_type: Filter,
    /// One-off weights that take precedence over the learned ones for this call only.
    pub override_weights: Option<PreferenceWeights>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingOptions {
    pub mode_threshold: f64,
    pub budget_ceiling: f64,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            mode_threshold: DEFAULT_MODE_THRESHOLD,
            budget_ceiling: DEFAULT_BUDGET_CEILING,
        }
    }
}

impl From<RankingConfig> for RankingOptions {
    fn from(config: RankingConfig) -> Self {
        Self {
            mode_threshold: config.mode_threshold,
            budget_ceiling: config.budget_ceiling,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankResult {
    pub mode_used: RankMode,
    pub weights_used: PreferenceWeights,
    pub records: Vec<RecommendationRecord>,
}

/// Picks the ranking strategy. The override, when present, is the only input: its
/// dominant criterion selects a single-criterion mode, otherwise its own weights
/// drive the learned blend.
pub fn select_mode(
    learned: &PreferenceWeights,
    override_weights: Option<&PreferenceWeights>,
    threshold: f64,
) -> (RankMode, PreferenceWeights) {
    let basis = *override_weights.unwrap_or(learned);

    let mode = if basis.w_roi >= threshold {
        RankMode::Roi
    } else if basis.w_risk >= threshold {
        RankMode::Risk
    } else if basis.w_budget >= threshold {
        RankMode::Price
    } else {
        RankMode::Learned
    };

    (mode, basis)
}

pub fn rank(
    listings: &[Listing],
    request: &RankRequest,
    learned: &PreferenceWeights,
    options: &RankingOptions,
) -> RankResult {
    let (mode_used, weights_used) = select_mode(
        learned,
        request.override_weights.as_ref(),
        options.mode_threshold,
    );

    let mut candidates = collect_candidates(listings, request, options);
    let has_budget = effective_budget(request.budget).is_some();
    sort_candidates(&mut candidates, mode_used, has_budget, &weights_used);

    tracing::debug!(
        mode = mode_used.as_str(),
        listings = listings.len(),
        candidates = candidates.len(),
        "ranked listings"
    );

    RankResult {
        mode_used,
        weights_used,
        records: candidates.iter().map(Candidate::to_record).collect(),
    }
}

fn sort_candidates(
    candidates: &mut [Candidate<'_>],
    mode: RankMode,
    has_budget: bool,
    weights: &PreferenceWeights,
) {
    match mode {
        RankMode::Roi => candidates.sort_by(|left, right| {
            descending(left.roi, right.roi)
                .then_with(|| ascending(left.risk_norm, right.risk_norm))
                .then_with(|| ascending(left.diff, right.diff))
        }),
        RankMode::Risk => candidates.sort_by(|left, right| {
            ascending(left.risk_norm, right.risk_norm)
                .then_with(|| descending(left.roi, right.roi))
                .then_with(|| ascending(left.diff, right.diff))
        }),
        RankMode::Price if has_budget => candidates.sort_by(|left, right| {
            ascending(left.diff, right.diff)
                .then_with(|| descending(left.roi, right.roi))
                .then_with(|| ascending(left.risk_norm, right.risk_norm))
        }),
        RankMode::Price => candidates.sort_by(|left, right| {
            ascending(left.price, right.price)
                .then_with(|| descending(left.roi, right.roi))
                .then_with(|| ascending(left.risk_norm, right.risk_norm))
        }),
        RankMode::Learned => {
            let score = |candidate: &Candidate<'_>| {
                weights.w_roi * candidate.roi_norm
                    - weights.w_risk * candidate.risk_norm
                    - weights.w_budget * candidate.diff_norm
            };
            candidates.sort_by(|left, right| descending(score(left), score(right)));
        }
    }
}

fn ascending(left: f64, right: f64) -> Ordering {
    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

fn descending(left: f64, right: f64) -> Ordering {
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}
