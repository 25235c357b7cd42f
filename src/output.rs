use std::path::PathBuf;

use serde::Serialize;

use crate::adapters::registry::Application;
use crate::classify::Category;
use crate::monitor::SweepSummary;

/// Everything a `sweep` or `watch` run reports.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub dir: PathBuf,
    pub sweep: SweepSummary,
    pub applications: Vec<Application>,
}

#[derive(Debug, Serialize)]
pub struct Classified {
    pub path: PathBuf,
    pub category: Category,
}

/// Print a run report.
///
/// - `json = true`: pretty-printed JSON object on stdout.
/// - `json = false`: the sweep counts, then one line per application.
///
/// If the sweep had failures, a warning line goes to **stderr** so stdout
/// stays clean for JSON consumers.
pub fn print_report(report: &RunReport, json: bool) {
    if report.sweep.failed > 0 {
        eprintln!("  {} entries failed (see log)", report.sweep.failed);
    }

    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising report: {}", e),
        }
        return;
    }

    let sweep = &report.sweep;
    println!(
        "Swept {}: {} registered, {} expanded, {} ignored",
        report.dir.display(),
        sweep.registered,
        sweep.expanded,
        sweep.ignored,
    );
    println!("{} application(s)", report.applications.len());
    for app in &report.applications {
        println!("  {:<4} {}  {}", app.kind.as_str(), app.name, app.path.display());
    }
}

/// Print classification results, one `category path` line each.
pub fn print_classified(results: &[Classified], json: bool) {
    if json {
        match serde_json::to_string_pretty(results) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising results: {}", e),
        }
        return;
    }
    for r in results {
        println!("{:<11} {}", r.category.as_str(), r.path.display());
    }
}
