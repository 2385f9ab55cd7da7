//! Terminal rendering of dashboard views and dataset options.
//!
//! A view prints as an Arrow table (one row per year, one column per
//! category) followed by the two trend annotation lines.

use arrow::util::pretty::pretty_format_batches;
use trialtrend_engine::{LinearFit, LogLinearFit, Options, Selection, TrendFit, View};

// ── Public API ──

/// Print one view: title, count matrix, and trend annotations.
pub fn print_view(title: &str, years: &str, view: &View) -> anyhow::Result<()> {
    println!("=== {title} ({years}) ===");
    if view.matrix.is_empty() {
        println!("(no studies match the selection)");
    } else {
        let batch = view.matrix.to_record_batch()?;
        println!("{}", pretty_format_batches(&[batch])?);
        println!("  {:<26} {}", "total rows", view.matrix.total());
    }
    println!("  {}", linear_summary(&view.trend.linear));
    println!("  {}", log_linear_summary(&view.trend.log_linear));
    println!();
    Ok(())
}

/// Print the choices a selection can be made from.
pub fn print_options(options: &Options, defaults: &Selection) {
    println!("Statuses");
    for status in &options.statuses {
        let mark = if defaults.statuses.contains(status) { "*" } else { " " };
        println!("  {mark} {status}");
    }
    println!();

    println!("Phases");
    for phase in &options.phases {
        println!("  * {phase}");
    }
    println!();

    println!("Years");
    println!(
        "  {:<26} {}",
        "active (observed)",
        options
            .active_years
            .map_or_else(|| "-".to_string(), |y| format!("{} to {}", y.min, y.max))
    );
    println!(
        "  {:<26} {}",
        "started (observed)",
        options
            .start_years
            .map_or_else(|| "-".to_string(), |y| format!("{} to {}", y.min, y.max))
    );
    println!(
        "  {:<26} {} to {}",
        "active (default)", defaults.active_years.min, defaults.active_years.max
    );
    println!();
    println!("* preselected by default");
}

// ── Trend annotations ──

pub fn linear_summary(fit: &TrendFit<LinearFit>) -> String {
    match fit {
        TrendFit::Fitted(f) => format!(
            "linear      slope {:+.2} studies/yr  r = {:.3}  p = {}  se = {:.3}",
            f.slope,
            f.r,
            format_p(f.p_value),
            f.std_err
        ),
        TrendFit::InsufficientData { points } => format!(
            "linear      insufficient data ({points} distinct year(s), need 2)"
        ),
    }
}

pub fn log_linear_summary(fit: &TrendFit<LogLinearFit>) -> String {
    match fit {
        TrendFit::Fitted(f) => {
            let mut line = format!(
                "log-linear  APC {:+.1}%/yr  slope {:.4}  r = {:.3}  p = {}  se = {:.4}",
                f.apc,
                f.fit.slope,
                f.fit.r,
                format_p(f.fit.p_value),
                f.fit.std_err
            );
            if !f.excluded_years.is_empty() {
                let years: Vec<String> = f.excluded_years.iter().map(|y| y.to_string()).collect();
                line.push_str(&format!("  (zero-count years excluded: {})", years.join(", ")));
            }
            line
        }
        TrendFit::InsufficientData { points } => format!(
            "log-linear  insufficient data ({points} distinct year(s) with studies, need 2)"
        ),
    }
}

fn format_p(p: f64) -> String {
    if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}
