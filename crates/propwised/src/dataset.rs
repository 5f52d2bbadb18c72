use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use propwise_core::Listing;

/// Reads a listings catalogue: a JSON array of listing objects. Numeric fields may be
/// numbers or numeric strings; rows that still fail to parse are skipped at rank time.
pub fn load_listings(path: &Path) -> Result<Vec<Listing>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read listings file {}", path.display()))?;
    let listings: Vec<Listing> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse listings file {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        listings = listings.len(),
        "loaded listings"
    );
    Ok(listings)
}
