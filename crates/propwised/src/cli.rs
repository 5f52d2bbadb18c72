use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use propwise_core::{ANY_FILTER, Focus, GUEST_USER_KEY};
use propwise_rank::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid output format '{other}', expected one of: table, json"
            )),
        }
    }
}

/// Budget as typed by the user: blank or "any" means no budget at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    Any,
    Amount(f64),
}

impl Budget {
    pub fn amount(self) -> Option<f64> {
        match self {
            Self::Any => None,
            Self::Amount(value) => Some(value),
        }
    }
}

impl std::str::FromStr for Budget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }

        let amount = trimmed
            .parse::<f64>()
            .map_err(|_| format!("invalid budget '{trimmed}', expected a number or 'any'"))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(format!("invalid budget '{trimmed}', must be greater than 0"));
        }

        Ok(Self::Amount(amount))
    }
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct ListingQueryArgs {
    #[arg(long, help = "JSON file holding an array of listings")]
    pub listings: PathBuf,

    #[arg(
        long,
        value_parser = parse_budget,
        help = "Target price; 'any' or blank disables budget filtering"
    )]
    pub budget: Option<Budget>,

    #[arg(
        long,
        default_value = ANY_FILTER,
        value_parser = parse_filter,
        help = "City to match (case-insensitive), or Any"
    )]
    pub city: Filter,

    #[arg(
        long = "type",
        default_value = ANY_FILTER,
        value_parser = parse_filter,
        help = "Property type to match (case-insensitive), or Any"
    )]
    pub property_type: Filter,

    #[arg(
        long,
        value_parser = parse_focus,
        help = "One-off emphasis for this call: roi, risk, or price"
    )]
    pub focus: Option<Focus>,
}

impl ListingQueryArgs {
    pub fn budget(&self) -> Option<f64> {
        self.budget.and_then(Budget::amount)
    }
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct RankArgs {
    #[command(flatten)]
    pub query: ListingQueryArgs,

    #[arg(
        long,
        default_value = "table",
        value_parser = parse_output_format,
        help = "Output format: table or json"
    )]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct ChooseArgs {
    #[command(flatten)]
    pub query: ListingQueryArgs,

    #[arg(
        long,
        value_parser = parse_position,
        help = "1-based position of the accepted recommendation"
    )]
    pub pick: usize,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct RejectArgs {
    #[command(flatten)]
    pub query: ListingQueryArgs,

    #[arg(
        long,
        default_value_t = 3,
        help = "Number of leading recommendations that were shown and rejected"
    )]
    pub shown: usize,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Rank listings for the current user
    Rank(RankArgs),
    /// Accept one recommendation and learn from it
    Choose(ChooseArgs),
    /// Reject the shown recommendations and learn from it
    Reject(RejectArgs),
    /// Print the current user's learned weights
    Weights,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Property recommendations that learn from feedback")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .propwise/"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = GUEST_USER_KEY,
        help = "User whose preferences are read and updated"
    )]
    pub user: String,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

fn parse_budget(value: &str) -> Result<Budget, String> {
    value.parse()
}

fn parse_focus(value: &str) -> Result<Focus, String> {
    value.parse()
}

fn parse_filter(value: &str) -> Result<Filter, String> {
    Ok(Filter::from(value))
}

fn parse_position(value: &str) -> Result<usize, String> {
    let position = value
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid position '{value}', expected a positive integer"))?;
    if position == 0 {
        return Err("position is 1-based; 0 is not valid".to_owned());
    }
    Ok(position)
}
