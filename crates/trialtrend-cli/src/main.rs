mod cli;
mod display;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trialtrend_core::StudyRecord;
use trialtrend_engine::{Dashboard, GroupBy, Selection, View, YearRange};
use trialtrend_store as store;

use crate::cli::{Cli, Command, DataArgs, ExtractArgs, ReportArgs};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("trialtrend v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Extract(args) => extract(&args),
        Command::Options(args) => options(&args),
        Command::Report(args) => report(&args),
    }
}

fn extract(args: &ExtractArgs) -> Result<()> {
    let extraction = store::extract_file(&args.input)
        .with_context(|| format!("extracting {}", args.input.display()))?;

    let studies = store::studies_to_batch(&extraction.studies)?;
    store::write_table(&args.studies, &studies)
        .with_context(|| format!("writing {}", args.studies.display()))?;

    let sites = store::geo_to_batch(&extraction.sites)?;
    store::write_table(&args.sites, &sites)
        .with_context(|| format!("writing {}", args.sites.display()))?;

    println!(
        "{} studies -> {}",
        extraction.studies.len(),
        args.studies.display()
    );
    println!("{} sites -> {}", extraction.sites.len(), args.sites.display());
    Ok(())
}

fn options(args: &DataArgs) -> Result<()> {
    let studies = load(args)?;
    let dashboard = Dashboard::new(&studies)?;
    let options = dashboard.options();
    display::print_options(&options, &Selection::defaults_for(&options));
    Ok(())
}

fn report(args: &ReportArgs) -> Result<()> {
    let studies = load(&args.data)?;
    let dashboard = Dashboard::new(&studies)?;
    let selection = args.resolve_selection(&dashboard.options())?;
    let by = GroupBy::from(args.group_by);

    if let Some(dir) = &args.export {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    if args.view.active() {
        let view = dashboard.active_view(&selection, by)?;
        let title = format!("Active studies per year by {}", by.label());
        display::print_view(&title, &span(selection.active_years), &view)?;
        export(args.export.as_deref(), "active", by, &view)?;
    }
    if args.view.started() {
        let view = dashboard.start_view(&selection, by)?;
        let title = format!("Studies started per year by {}", by.label());
        display::print_view(&title, &span(selection.start_years), &view)?;
        export(args.export.as_deref(), "started", by, &view)?;
    }
    Ok(())
}

fn load(args: &DataArgs) -> Result<Vec<StudyRecord>> {
    store::load_studies(&args.data).with_context(|| format!("loading {}", args.data.display()))
}

fn export(dir: Option<&Path>, name: &str, by: GroupBy, view: &View) -> Result<()> {
    let Some(dir) = dir else {
        return Ok(());
    };
    let path = dir.join(format!("{name}_by_{}.csv", by.label()));
    store::write_table(&path, &view.matrix.to_record_batch()?)
        .with_context(|| format!("writing {}", path.display()))
}

fn span(years: YearRange) -> String {
    format!("{} to {}", years.min, years.max)
}
