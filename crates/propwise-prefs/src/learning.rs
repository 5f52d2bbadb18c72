use propwise_config::LearningConfig;
use propwise_core::{PreferenceVector, RecommendationRecord, RiskLevel};
use serde::{Deserialize, Serialize};

const HIGH_ROI: f64 = 0.15;
const LOW_ROI: f64 = 0.10;
const CLOSE_TO_BUDGET: f64 = 0.15;
const FAR_FROM_BUDGET: f64 = 0.40;

const REINFORCE_STEP: f64 = 0.03;
const WEAKEN_STEP: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningOptions {
    /// Lower bound applied to every weight before normalization. `None` lets
    /// repeated negative feedback push a weight below zero.
    pub weight_floor: Option<f64>,
}

impl From<LearningConfig> for LearningOptions {
    fn from(config: LearningConfig) -> Self {
        Self {
            weight_floor: config.weight_floor,
        }
    }
}

/// Additive change to each weight before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightNudge {
    pub roi: f64,
    pub risk: f64,
    pub budget: f64,
}

pub fn choice_nudge(chosen: &RecommendationRecord, budget: Option<f64>) -> WeightNudge {
    let mut nudge = WeightNudge::default();

    // 0.10 < roi < 0.15 is a dead zone.
    if chosen.roi >= HIGH_ROI {
        nudge.roi += REINFORCE_STEP;
    } else if chosen.roi <= LOW_ROI {
        nudge.roi -= WEAKEN_STEP;
    }

    match chosen.risk {
        RiskLevel::Low => nudge.risk += REINFORCE_STEP,
        RiskLevel::High => nudge.risk -= REINFORCE_STEP,
        RiskLevel::Medium => {}
    }

    if let Some(budget) = effective_budget(budget) {
        let diff = chosen.relative_budget_distance(budget);
        if diff <= CLOSE_TO_BUDGET {
            nudge.budget += REINFORCE_STEP;
        } else if diff >= FAR_FROM_BUDGET {
            nudge.budget -= REINFORCE_STEP;
        }
    }

    nudge
}

/// Rejecting a batch always reads as "ROI too low"; risk is never adjusted.
pub fn rejection_nudge(shown: &[RecommendationRecord], budget: Option<f64>) -> WeightNudge {
    let mut nudge = WeightNudge {
        roi: -WEAKEN_STEP,
        ..WeightNudge::default()
    };

    if let Some(budget) = effective_budget(budget) {
        if !shown.is_empty() {
            let total = shown
                .iter()
                .map(|record| record.relative_budget_distance(budget))
                .sum::<f64>();
            let avg_diff = total / shown.len() as f64;

            if avg_diff >= FAR_FROM_BUDGET {
                nudge.budget += REINFORCE_STEP;
            } else if avg_diff <= CLOSE_TO_BUDGET {
                nudge.budget -= WEAKEN_STEP;
            }
        }
    }

    nudge
}

pub fn update_from_choice(
    vector: &mut PreferenceVector,
    chosen: &RecommendationRecord,
    budget: Option<f64>,
    options: &LearningOptions,
) {
    let nudge = choice_nudge(chosen, budget);
    apply(vector, nudge, options);
}

pub fn update_from_rejection(
    vector: &mut PreferenceVector,
    shown: &[RecommendationRecord],
    budget: Option<f64>,
    options: &LearningOptions,
) {
    let nudge = rejection_nudge(shown, budget);
    apply(vector, nudge, options);
}

fn apply(vector: &mut PreferenceVector, nudge: WeightNudge, options: &LearningOptions) {
    vector.interactions = vector.interactions.saturating_add(1);
    vector.weights.w_roi += nudge.roi;
    vector.weights.w_risk += nudge.risk;
    vector.weights.w_budget += nudge.budget;

    if let Some(floor) = options.weight_floor {
        vector.weights.apply_floor(floor);
    }

    if !vector.weights.normalize() {
        tracing::warn!(
            w_roi = vector.weights.w_roi,
            w_risk = vector.weights.w_risk,
            w_budget = vector.weights.w_budget,
            "weight sum is not positive and finite; leaving weights unnormalized"
        );
    }
}

fn effective_budget(budget: Option<f64>) -> Option<f64> {
    budget.filter(|value| value.is_finite() && *value > 0.0)
}

#[cfg(test)]
mod tests {
    use propwise_core::{PreferenceVector, PreferenceWeights, RecommendationRecord, RiskLevel};

    use super::*;

    fn record(price: f64, roi: f64, risk: RiskLevel) -> RecommendationRecord {
        RecommendationRecord {
            name: "unit".to_owned(),
            city: "Cairo".to_owned(),
            property_type: "apartment".to_owned(),
            price,
            roi,
            risk,
            risk_text: risk.label().to_owned(),
            url: String::new(),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn rewarding_choice_raises_every_weight() {
        let chosen = record(1_000_000.0, 0.20, RiskLevel::Low);

        let nudge = choice_nudge(&chosen, Some(1_000_000.0));

        assert_eq!(
            nudge,
            WeightNudge {
                roi: 0.03,
                risk: 0.03,
                budget: 0.03
            }
        );

        let mut vector = PreferenceVector::default();
        update_from_choice(&mut vector, &chosen, Some(1_000_000.0), &LearningOptions::default());

        assert_eq!(vector.interactions, 1);
        assert_close(vector.weights.w_roi, 0.53 / 1.09);
        assert_close(vector.weights.w_risk, 0.33 / 1.09);
        assert_close(vector.weights.w_budget, 0.23 / 1.09);
        assert_close(vector.weights.sum(), 1.0);
    }

    #[test]
    fn choice_nudges_are_asymmetric_with_a_roi_dead_zone() {
        let low = choice_nudge(&record(1.0, 0.10, RiskLevel::Medium), None);
        assert_eq!(low.roi, -0.02);
        assert_eq!(low.risk, 0.0);
        assert_eq!(low.budget, 0.0);

        let dead_zone = choice_nudge(&record(1.0, 0.12, RiskLevel::High), None);
        assert_eq!(dead_zone.roi, 0.0);
        assert_eq!(dead_zone.risk, -0.03);
    }

    #[test]
    fn choice_roi_thresholds_are_inclusive() {
        let at_high = choice_nudge(&record(1.0, 0.15, RiskLevel::Medium), None);
        assert_eq!(at_high.roi, 0.03);

        let just_below_high = choice_nudge(&record(1.0, 0.1499, RiskLevel::Medium), None);
        assert_eq!(just_below_high.roi, 0.0);

        let just_above_low = choice_nudge(&record(1.0, 0.1001, RiskLevel::Medium), None);
        assert_eq!(just_above_low.roi, 0.0);
    }

    #[test]
    fn choice_budget_nudge_depends_on_relative_distance() {
        let close = choice_nudge(&record(1_150_000.0, 0.12, RiskLevel::Medium), Some(1_000_000.0));
        assert_eq!(close.budget, 0.03);

        let middle = choice_nudge(&record(1_300_000.0, 0.12, RiskLevel::Medium), Some(1_000_000.0));
        assert_eq!(middle.budget, 0.0);

        let far = choice_nudge(&record(600_000.0, 0.12, RiskLevel::Medium), Some(1_000_000.0));
        assert_eq!(far.budget, -0.03);

        let no_budget = choice_nudge(&record(600_000.0, 0.12, RiskLevel::Medium), Some(0.0));
        assert_eq!(no_budget.budget, 0.0);
    }

    #[test]
    fn rejection_of_on_budget_batch_trusts_price_less() {
        let shown = vec![record(1_000_000.0, 0.12, RiskLevel::Low)];

        let nudge = rejection_nudge(&shown, Some(1_000_000.0));

        assert_eq!(
            nudge,
            WeightNudge {
                roi: -0.02,
                risk: 0.0,
                budget: -0.02
            }
        );

        let mut vector = PreferenceVector::default();
        update_from_rejection(&mut vector, &shown, Some(1_000_000.0), &LearningOptions::default());

        assert_eq!(vector.interactions, 1);
        assert_close(vector.weights.w_roi, 0.48 / 0.96);
        assert_close(vector.weights.w_risk, 0.30 / 0.96);
        assert_close(vector.weights.w_budget, 0.18 / 0.96);
    }

    #[test]
    fn rejection_of_far_batch_leans_on_budget() {
        let shown = vec![
            record(500_000.0, 0.12, RiskLevel::Low),
            record(1_700_000.0, 0.12, RiskLevel::High),
        ];

        let nudge = rejection_nudge(&shown, Some(1_000_000.0));

        assert_eq!(nudge.roi, -0.02);
        assert_eq!(nudge.risk, 0.0);
        assert_eq!(nudge.budget, 0.03);
    }

    #[test]
    fn rejection_budget_thresholds_are_inclusive() {
        // Both rows sit exactly 40% away, so the average is exactly 0.40.
        let far = vec![
            record(1_400_000.0, 0.12, RiskLevel::Low),
            record(600_000.0, 0.12, RiskLevel::Low),
        ];
        assert_eq!(rejection_nudge(&far, Some(1_000_000.0)).budget, 0.03);

        let close = vec![record(1_150_000.0, 0.12, RiskLevel::Low)];
        assert_eq!(rejection_nudge(&close, Some(1_000_000.0)).budget, -0.02);

        let between = vec![record(1_390_000.0, 0.12, RiskLevel::Low)];
        assert_eq!(rejection_nudge(&between, Some(1_000_000.0)).budget, 0.0);
    }

    #[test]
    fn rejection_without_budget_or_batch_only_touches_roi() {
        let shown = vec![record(500_000.0, 0.12, RiskLevel::Low)];
        assert_eq!(
            rejection_nudge(&shown, None),
            WeightNudge {
                roi: -0.02,
                ..WeightNudge::default()
            }
        );
        assert_eq!(
            rejection_nudge(&[], Some(1_000_000.0)),
            WeightNudge {
                roi: -0.02,
                ..WeightNudge::default()
            }
        );
    }

    #[test]
    fn repeated_rejection_without_floor_drives_roi_negative() {
        let mut vector = PreferenceVector::new(PreferenceWeights::new(0.02, 0.49, 0.49), 0);

        for _ in 0..3 {
            update_from_rejection(&mut vector, &[], None, &LearningOptions::default());
        }

        assert_eq!(vector.interactions, 3);
        assert!(vector.weights.w_roi < 0.0, "{:?}", vector.weights);
        assert_close(vector.weights.sum(), 1.0);
    }

    #[test]
    fn weight_floor_keeps_weights_non_negative() {
        let options = LearningOptions {
            weight_floor: Some(0.0),
        };
        let mut vector = PreferenceVector::new(PreferenceWeights::new(0.02, 0.49, 0.49), 0);

        for _ in 0..3 {
            update_from_rejection(&mut vector, &[], None, &options);
        }

        assert!(vector.weights.w_roi >= 0.0);
        assert!(vector.weights.w_risk > 0.0);
        assert_close(vector.weights.sum(), 1.0);
    }

    #[test]
    fn degenerate_sum_skips_normalization_but_still_counts() {
        let mut vector = PreferenceVector::new(PreferenceWeights::new(0.02, -0.01, -0.01), 4);

        update_from_rejection(&mut vector, &[], None, &LearningOptions::default());

        assert_eq!(vector.interactions, 5);
        assert_close(vector.weights.w_roi, 0.0);
        assert_close(vector.weights.w_risk, -0.01);
        assert_close(vector.weights.w_budget, -0.01);
    }
}
