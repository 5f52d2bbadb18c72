use serde::{Deserialize, Serialize};

pub const DEFAULT_W_ROI: f64 = 0.5;
pub const DEFAULT_W_RISK: f64 = 0.3;
pub const DEFAULT_W_BUDGET: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferenceWeights {
    pub w_roi: f64,
    pub w_risk: f64,
    pub w_budget: f64,
}

impl PreferenceWeights {
    pub const fn new(w_roi: f64, w_risk: f64, w_budget: f64) -> Self {
        Self {
            w_roi,
            w_risk,
            w_budget,
        }
    }

    pub fn sum(&self) -> f64 {
        self.w_roi + self.w_risk + self.w_budget
    }

    /// Scales the weights to sum to one. Returns `false` and leaves the weights
    /// untouched when the sum is not positive or not finite.
    pub fn normalize(&mut self) -> bool {
        let total = self.sum();
        if !(total > 0.0 && total.is_finite()) {
            return false;
        }

        self.w_roi /= total;
        self.w_risk /= total;
        self.w_budget /= total;
        true
    }

    pub fn apply_floor(&mut self, floor: f64) {
        self.w_roi = self.w_roi.max(floor);
        self.w_risk = self.w_risk.max(floor);
        self.w_budget = self.w_budget.max(floor);
    }
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        Self::new(DEFAULT_W_ROI, DEFAULT_W_RISK, DEFAULT_W_BUDGET)
    }
}

/// Learned per-user blend plus the number of feedback events folded into it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferenceVector {
    #[serde(flatten)]
    pub weights: PreferenceWeights,
    pub interactions: u64,
}

impl PreferenceVector {
    pub fn new(weights: PreferenceWeights, interactions: u64) -> Self {
        Self {
            weights,
            interactions,
        }
    }
}
