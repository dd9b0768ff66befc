use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::charts::{build_all, Chart, ChartOptions, StepOutcome};
use crate::derive::add_revenue;
use crate::events::{EdaError, PassEvent};
use crate::loader::{load_table, LoadOptions};
use crate::page::{render_idle_page, render_page, RenderedStep, Report};
use crate::render::render_svg;
use crate::summary::{info_text, Summary};
use crate::table::Table;

#[derive(Parser, Debug, Clone)]
#[command(name = "ecommerce-eda")]
#[command(about = "Exploratory data analysis report for an e-commerce transactions CSV")]
#[command(version)]
pub struct Args {
    /// Transactions CSV file (omit to show the upload prompt)
    pub input: Option<PathBuf>,

    /// Directory the report is written to
    #[arg(short, long, env = "EDA_OUT_DIR", default_value = "eda_report")]
    pub out_dir: PathBuf,

    /// Only require order_date up front; other missing columns fail their own charts
    #[arg(long)]
    pub lenient: bool,

    /// Also write summary.json with the summary and chart data
    #[arg(long)]
    pub json: bool,

    /// Number of products in the top products chart
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Log to stderr, filtered by RUST_LOG when set.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Serialize)]
struct JsonExport<'a> {
    summary: &'a Summary,
    charts: Vec<&'a Chart>,
    failed_steps: Vec<(&'a str, String)>,
}

/// Derive revenue, then summarize and chart the table.
pub fn analyze(
    table: &mut Table,
    options: &ChartOptions,
) -> Result<(Summary, Vec<StepOutcome>), EdaError> {
    add_revenue(table)?;
    let summary = Summary::of(table);
    info!(
        rows = summary.shape.0,
        columns = summary.shape.1,
        duplicates = summary.duplicate_rows,
        "summarized table"
    );
    Ok((summary, build_all(table, options)))
}

const REPORT_FILE: &str = "report.html";
const SUMMARY_FILE: &str = "summary.json";
const CHARTS_DIR: &str = "charts";

/// Remove everything a previous pass wrote into `out_dir`.
fn clear_previous(out_dir: &Path) -> Result<(), EdaError> {
    let charts_dir = out_dir.join(CHARTS_DIR);
    if charts_dir.exists() {
        fs::remove_dir_all(&charts_dir)?;
    }
    for name in [REPORT_FILE, SUMMARY_FILE] {
        let path = out_dir.join(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

pub fn run_pass(args: &Args) -> Result<PassEvent, EdaError> {
    clear_previous(&args.out_dir)?;

    let Some(input) = &args.input else {
        fs::create_dir_all(&args.out_dir)?;
        fs::write(args.out_dir.join(REPORT_FILE), render_idle_page())?;
        return Ok(PassEvent::AwaitingInput);
    };

    info!(input = %input.display(), "starting pass");
    let file = File::open(input)?;
    let load_options = LoadOptions {
        strict: !args.lenient,
    };
    let mut table = load_table(BufReader::new(file), &load_options)?;

    let chart_options = ChartOptions { top_n: args.top_n };
    let (summary, outcomes) = analyze(&mut table, &chart_options)?;

    let charts_dir = args.out_dir.join(CHARTS_DIR);
    fs::create_dir_all(&charts_dir)?;

    let mut steps = Vec::with_capacity(outcomes.len());
    for (idx, outcome) in outcomes.iter().enumerate() {
        let svg = match &outcome.result {
            Ok(chart) => render_svg(chart).map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        if let Ok(svg) = &svg {
            let path = charts_dir.join(format!("{:02}-{}.svg", idx + 1, outcome.step));
            fs::write(&path, svg)?;
            debug!(path = %path.display(), "wrote chart");
        }
        steps.push(RenderedStep {
            step: outcome.step.clone(),
            section: outcome.section,
            svg,
        });
    }
    let failed_steps = steps.iter().filter(|s| s.svg.is_err()).count();

    if args.json {
        let export = JsonExport {
            summary: &summary,
            charts: outcomes.iter().filter_map(|o| o.result.as_ref().ok()).collect(),
            failed_steps: outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().err().map(|e| (o.step.as_str(), e.to_string())))
                .collect(),
        };
        fs::write(
            args.out_dir.join(SUMMARY_FILE),
            serde_json::to_string_pretty(&export)?,
        )?;
    }

    let report = Report {
        summary,
        info_text: info_text(&table),
        steps,
    };
    fs::write(args.out_dir.join(REPORT_FILE), render_page(&report))?;
    info!(out_dir = %args.out_dir.display(), failed_steps, "pass complete");

    Ok(PassEvent::PassComplete {
        report_dir: args.out_dir.clone(),
        failed_steps,
    })
}

/// Entry point used by the binary.
pub fn the_app() -> Result<PassEvent, EdaError> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run_pass(&args)
}
