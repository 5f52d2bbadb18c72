use propwise_core::{Listing, RecommendationRecord, RiskLevel};

use crate::engine::{RankRequest, RankingOptions};

/// A listing that survived the hard filters, with the derived scoring fields for one
/// ranking call.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'a> {
    pub listing: &'a Listing,
    pub price: f64,
    pub roi: f64,
    pub risk: i64,
    pub risk_norm: f64,
    pub diff: f64,
    pub roi_norm: f64,
    pub diff_norm: f64,
}

impl Candidate<'_> {
    pub fn to_record(&self) -> RecommendationRecord {
        let risk = RiskLevel::from_base_risk(self.risk);
        RecommendationRecord {
            name: self.listing.name.clone(),
            city: self.listing.city.clone(),
            property_type: self.listing.property_type.clone(),
            price: self.price,
            roi: self.roi,
            risk,
            risk_text: risk.label().to_owned(),
            url: self
                .listing
                .url
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// Scales `value` into [0, 1] relative to `lo..=hi`; a degenerate range maps to 0.
pub fn min_max(value: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    (value - lo) / (hi - lo)
}

pub(crate) fn effective_budget(budget: Option<f64>) -> Option<f64> {
    budget.filter(|value| value.is_finite() && *value > 0.0)
}

pub(crate) fn collect_candidates<'a>(
    listings: &'a [Listing],
    request: &RankRequest,
    options: &RankingOptions,
) -> Vec<Candidate<'a>> {
    let budget = effective_budget(request.budget);
    let mut candidates = Vec::new();

    for listing in listings {
        if !request.city.matches(&listing.city) {
            continue;
        }
        if !request.property_type.matches(&listing.property_type) {
            continue;
        }

        let (Some(price), Some(roi), Some(risk)) = (
            listing.price.as_f64(),
            listing.expected_roi.as_f64(),
            listing.base_risk.as_i64(),
        ) else {
            tracing::debug!(
                listing = %listing.name,
                "skipping listing with unparsable numeric fields"
            );
            continue;
        };
        if !price.is_finite() || !roi.is_finite() {
            tracing::debug!(
                listing = %listing.name,
                "skipping listing with non-finite price or roi"
            );
            continue;
        }

        if let Some(budget) = budget {
            if price > budget * options.budget_ceiling {
                continue;
            }
        }

        let risk_norm = ((risk as f64 - 1.0) / 2.0).clamp(0.0, 1.0);
        let diff = budget
            .map(|budget| ((price - budget).abs() / budget).max(0.0))
            .unwrap_or(0.0);

        candidates.push(Candidate {
            listing,
            price,
            roi,
            risk,
            risk_norm,
            diff,
            roi_norm: 0.0,
            diff_norm: 0.0,
        });
    }

    normalize_candidates(&mut candidates);
    candidates
}

fn normalize_candidates(candidates: &mut [Candidate<'_>]) {
    let Some((roi_lo, roi_hi)) = bounds(candidates.iter().map(|candidate| candidate.roi)) else {
        return;
    };
    let Some((diff_lo, diff_hi)) = bounds(candidates.iter().map(|candidate| candidate.diff))
    else {
        return;
    };

    for candidate in candidates.iter_mut() {
        candidate.roi_norm = min_max(candidate.roi, roi_lo, roi_hi);
        candidate.diff_norm = min_max(candidate.diff, diff_lo, diff_hi);
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
    })
}
