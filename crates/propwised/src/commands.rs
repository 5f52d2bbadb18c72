use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use propwise_config::{PropwiseConfig, ensure_workspace_config, validate_config};
use propwise_core::{PreferenceVector, RecommendationRecord, normalize_user_key};
use propwise_prefs::{LearningOptions, PreferenceService};
use propwise_rank::{RankRequest, RankResult, RankingOptions, rank};
use propwise_store::{PreferenceStore, open_preference_store};
use serde_json::json;

use crate::cli::{ChooseArgs, ListingQueryArgs, OutputFormat, RankArgs, RejectArgs};
use crate::dataset::load_listings;

/// Everything a command needs once the workspace and user are resolved.
pub struct Session {
    pub workspace: PathBuf,
    pub user_key: String,
    pub config: PropwiseConfig,
    pub preferences: PreferenceService<Box<dyn PreferenceStore>>,
}

impl Session {
    pub fn open(workspace: &Path, user: &str) -> Result<Self> {
        let workspace = workspace.canonicalize().with_context(|| {
            format!("failed to resolve workspace path {}", workspace.display())
        })?;

        let config = ensure_workspace_config(&workspace).with_context(|| {
            format!(
                "failed to load or create workspace config at {}",
                propwise_config::config_path(&workspace).display()
            )
        })?;
        for warning in validate_config(&config) {
            tracing::warn!(code = warning.code, "{}", warning.message);
        }

        let store = open_preference_store(&workspace, &config.store)
            .context("failed to open preference store")?;
        let preferences =
            PreferenceService::new(store).with_learning(LearningOptions::from(config.learning));

        Ok(Self {
            workspace,
            user_key: normalize_user_key(user),
            config,
            preferences,
        })
    }

    fn ranking_options(&self) -> RankingOptions {
        RankingOptions::from(self.config.ranking)
    }

    fn load_preferences(&self) -> Result<PreferenceVector> {
        self.preferences
            .load(&self.user_key)
            .with_context(|| format!("failed to load preferences for '{}'", self.user_key))
    }

    fn rank_query(&self, query: &ListingQueryArgs) -> Result<RankResult> {
        let listings = load_listings(&query.listings)?;
        let learned = self.load_preferences()?;
        let request = RankRequest {
            budget: query.budget(),
            city: query.city.clone(),
            property_type: query.property_type.clone(),
            override_weights: query.focus.map(|focus| focus.override_weights()),
        };

        Ok(rank(
            &listings,
            &request,
            &learned.weights,
            &self.ranking_options(),
        ))
    }
}

pub fn run_rank_command(session: &Session, args: RankArgs, out: &mut dyn Write) -> Result<()> {
    let result = session.rank_query(&args.query)?;

    match args.output {
        OutputFormat::Table => {
            write_rank_table(&result, out).context("failed to write ranking table")
        }
        OutputFormat::Json => write_json(out, &serde_json::to_value(&result)?),
    }
}

pub fn run_choose_command(
    session: &Session,
    args: ChooseArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let result = session.rank_query(&args.query)?;
    let position = args.pick.checked_sub(1);
    let Some(chosen) = position.and_then(|index| result.records.get(index)) else {
        bail!(
            "--pick {} is out of range: only {} recommendation(s) matched",
            args.pick,
            result.records.len()
        );
    };

    let updated = session
        .preferences
        .record_choice(&session.user_key, chosen, args.query.budget())
        .context("failed to record choice")?;

    let response = json!({
        "user": session.user_key,
        "mode_used": result.mode_used.as_str(),
        "chosen": chosen,
        "preferences": updated,
    });
    write_json(out, &response)
}

pub fn run_reject_command(
    session: &Session,
    args: RejectArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let result = session.rank_query(&args.query)?;
    let shown: &[RecommendationRecord] =
        &result.records[..args.shown.min(result.records.len())];

    let updated = session
        .preferences
        .record_rejection(&session.user_key, shown, args.query.budget())
        .context("failed to record rejection")?;

    let response = json!({
        "user": session.user_key,
        "mode_used": result.mode_used.as_str(),
        "rejected": shown.iter().map(|record| record.name.as_str()).collect::<Vec<_>>(),
        "preferences": updated,
    });
    write_json(out, &response)
}

pub fn run_weights_command(session: &Session, out: &mut dyn Write) -> Result<()> {
    let vector = session.load_preferences()?;
    let response = json!({
        "user": session.user_key,
        "preferences": vector,
    });
    write_json(out, &response)
}

pub fn write_rank_table(result: &RankResult, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        out,
        "# mode={} w_roi={:.3} w_risk={:.3} w_budget={:.3}",
        result.mode_used.as_str(),
        result.weights_used.w_roi,
        result.weights_used.w_risk,
        result.weights_used.w_budget
    )?;
    writeln!(out, "rank\tname\tcity\ttype\tprice\troi\trisk\turl")?;

    for (index, record) in result.records.iter().enumerate() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{:.0}\t{:.2}%\t{}\t{}",
            index + 1,
            normalize_table_field(&record.name),
            normalize_table_field(&record.city),
            normalize_table_field(&record.property_type),
            record.price,
            record.roi * 100.0,
            record.risk_text,
            normalize_table_field(&record.url)
        )?;
    }

    Ok(())
}

fn normalize_table_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

fn write_json(out: &mut dyn Write, value: &serde_json::Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to serialize JSON output")?;
    writeln!(out).context("failed to write trailing newline")?;
    Ok(())
}
