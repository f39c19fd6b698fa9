//! Run the conformance suites against the cloud described by the environment.
//!
//! ```text
//! conformance [FILTER]
//! ```
//!
//! Only tests whose name contains `FILTER` run. Every suite runs once per
//! interface listed in `CONFORMANCE_INTERFACES` (default `json,xml`).
//! Log verbosity follows `RUST_LOG`.

use openstack_conformance::{
    all_suites, run_suite, CloudClient, CloudClientBuilder, SuiteReport, TestOutcome,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let filter = std::env::args().nth(1);

    let base = match CloudClientBuilder::new().from_env().build() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("conformance: {}", e);
            return ExitCode::from(2);
        }
    };

    let mut reports = Vec::new();
    for format in base.config().interfaces.clone() {
        let client: Arc<dyn CloudClient> = Arc::new(base.with_format(format));
        for suite in all_suites(client) {
            reports.push(run_suite(suite.as_ref(), filter.as_deref()).await);
        }
    }

    print_reports(&reports);

    if reports.iter().all(SuiteReport::is_success) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_reports(reports: &[SuiteReport]) {
    let (mut passed, mut failed, mut skipped) = (0, 0, 0);

    for report in reports {
        println!("{} [{}]", report.suite, report.format);
        for case in &report.cases {
            match &case.outcome {
                TestOutcome::Passed => println!(
                    "  {} {} ({} ms)",
                    case.outcome.label(),
                    case.name,
                    case.duration.as_millis()
                ),
                TestOutcome::Failed { reason } | TestOutcome::Skipped { reason } => {
                    println!("  {} {}: {}", case.outcome.label(), case.name, reason)
                }
            }
        }
        passed += report.passed();
        failed += report.failed();
        skipped += report.skipped();
    }

    println!();
    println!("{} passed, {} failed, {} skipped", passed, failed, skipped);
}
