// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imagegate: admission check for a batch of uploaded images.
//
// Entry point. Initialises logging, loads the admission config, runs the
// batch against local files and prints the outcome as JSON on stdout.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use imagegate_core::AdmissionConfig;
use imagegate_core::error::Result;
use imagegate_core::human_errors::humanize_error;
use imagegate_gate::{BatchReport, UploadGate};
use imagegate_quality::AdmissionEvaluator;
use imagegate_storage::LocalFileStore;

use cli::Cli;

const EXIT_REJECTED: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) if report.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_REJECTED),
        Err(e) => {
            let human = humanize_error(&e);
            tracing::error!(error = %e, severity = ?human.severity, "imagegate failed");
            eprintln!("error: {}\n{}", human.message, human.suggestion);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<BatchReport> {
    let uploads = cli.batch()?;

    let config = match &cli.config {
        Some(path) => AdmissionConfig::load(path)?,
        None => AdmissionConfig::default(),
    };
    let gate = UploadGate::new(
        AdmissionEvaluator::new(config)?,
        Arc::new(LocalFileStore::new()),
    );

    tracing::info!(
        uploads = uploads.len(),
        concurrent = cli.concurrent,
        "imagegate starting"
    );
    let report = if cli.concurrent {
        gate.evaluate_concurrent(&uploads).await
    } else {
        gate.evaluate(&uploads)
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}
