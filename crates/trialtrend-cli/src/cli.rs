//! Command-line arguments and selection resolution.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use trialtrend_core::{Phase, StudyStatus};
use trialtrend_engine::{GroupBy, Options, ResultFilter, Selection, YearRange};

#[derive(Parser, Debug)]
#[command(name = "trialtrend")]
#[command(version)]
#[command(about = "Yearly counts and growth trends for clinical-trial registry exports", long_about = None)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Flatten a ClinicalTrials.gov JSON export into study and site tables
    Extract(ExtractArgs),
    /// List the statuses, phases, and year bounds present in a study table
    Options(DataArgs),
    /// Count matrices and trends for the active and started views
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// ClinicalTrials.gov v2 JSON export (array of studies or API page)
    pub input: PathBuf,

    /// Output study table (.csv or .parquet)
    #[arg(long, default_value = "ctg-studies.csv")]
    pub studies: PathBuf,

    /// Output site table (.csv or .parquet)
    #[arg(long, default_value = "ctg-geo.csv")]
    pub sites: PathBuf,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Flat study table written by `extract` (.csv or .parquet)
    #[arg(long, env = "TRIALTREND_DATA")]
    pub data: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// JSON selection file; flags below override its fields
    #[arg(long, env = "TRIALTREND_SELECTION")]
    pub selection: Option<PathBuf>,

    /// Statuses to include (e.g. RECRUITING,COMPLETED)
    #[arg(long = "status", value_name = "STATUS", value_delimiter = ',')]
    pub statuses: Vec<StudyStatus>,

    /// Phase label to include, repeatable (e.g. --phase PHASE1 --phase "PHASE1, PHASE2")
    #[arg(long = "phase", value_name = "PHASE")]
    pub phases: Vec<String>,

    /// Keep studies by results submission
    #[arg(long, value_enum)]
    pub results: Option<ResultsArg>,

    /// Year range for the active view
    #[arg(long, value_name = "MIN:MAX", value_parser = parse_year_range)]
    pub active_years: Option<YearRange>,

    /// Year range for the started view
    #[arg(long, value_name = "MIN:MAX", value_parser = parse_year_range)]
    pub start_years: Option<YearRange>,

    /// Matrix columns
    #[arg(long, value_enum, default_value = "phase")]
    pub group_by: GroupArg,

    /// Which views to print
    #[arg(long, value_enum, default_value = "both")]
    pub view: ViewArg,

    /// Also write each count matrix as CSV into this directory
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResultsArg {
    Any,
    With,
    Without,
}

impl From<ResultsArg> for ResultFilter {
    fn from(arg: ResultsArg) -> Self {
        match arg {
            ResultsArg::Any => ResultFilter::Any,
            ResultsArg::With => ResultFilter::WithResults,
            ResultsArg::Without => ResultFilter::WithoutResults,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    Phase,
    Status,
}

impl From<GroupArg> for GroupBy {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::Phase => GroupBy::Phase,
            GroupArg::Status => GroupBy::Status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Active,
    Started,
    Both,
}

impl ViewArg {
    pub fn active(self) -> bool {
        matches!(self, Self::Active | Self::Both)
    }

    pub fn started(self) -> bool {
        matches!(self, Self::Started | Self::Both)
    }
}

impl ReportArgs {
    /// The selection file (or the dataset defaults), with flag overrides applied.
    pub fn resolve_selection(&self, options: &Options) -> Result<Selection> {
        let mut selection = match &self.selection {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading selection {}", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("parsing selection {}", path.display()))?
            }
            None => Selection::defaults_for(options),
        };

        if !self.statuses.is_empty() {
            selection.statuses = self.statuses.iter().copied().collect();
        }
        if !self.phases.is_empty() {
            selection.phases = self.phases.iter().map(|p| Phase::from(p.as_str())).collect();
        }
        if let Some(results) = self.results {
            selection.results = results.into();
        }
        if let Some(years) = self.active_years {
            selection.active_years = years;
        }
        if let Some(years) = self.start_years {
            selection.start_years = years;
        }
        Ok(selection)
    }
}

/// `MIN:MAX`, or a single year.
fn parse_year_range(s: &str) -> Result<YearRange, String> {
    let year = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid year {v:?}"))
    };
    match s.split_once(':') {
        Some((min, max)) => Ok(YearRange::new(year(min)?, year(max)?)),
        None => {
            let y = year(s)?;
            Ok(YearRange::new(y, y))
        }
    }
}
