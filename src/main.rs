use anyhow::Result;
use clap::Parser;
use skillcheck::{AuditOptions, Config, Engine, ExitStatus, Report, SkillcheckError};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Args, Command};

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("skillcheck=debug")
    } else {
        EnvFilter::new("skillcheck=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("Logging initialized (verbose={})", args.verbose);

    match run(args) {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            eprintln!("skillcheck: {:#}", e);
            ExitCode::from(ExitStatus::Usage.code())
        }
    }
}

fn run(args: Args) -> Result<ExitStatus> {
    let config = Config::load(args.config.as_deref())
        .map_err(|e| SkillcheckError::config(format!("{:#}", e)))?;
    let engine = Engine::new(config);

    match args.command {
        Command::Validate { path, strict, json } => {
            let report = engine.validate(&path, strict)?;
            print_report(&report, json)
        }
        Command::Triggers { path, json } => {
            let report = engine.analyze_triggers(&path)?;
            print_report(&report, json)
        }
        Command::Scan {
            path,
            exit_nonzero,
            json,
        } => {
            let report = engine.security_scan(&path, exit_nonzero)?;
            print_report(&report, json)
        }
        Command::Audit {
            skills_dir,
            strict,
            fail_on_findings,
            json,
        } => {
            let audit = engine.audit(
                &skills_dir,
                AuditOptions {
                    strict,
                    fail_on_findings,
                },
            )?;
            if json {
                println!("{}", audit.render_json()?);
            } else {
                print!("{}", audit.render_text());
            }
            Ok(audit.exit_status)
        }
    }
}

fn print_report(report: &Report, json: bool) -> Result<ExitStatus> {
    if json {
        println!("{}", report.render_json()?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(report.exit_status)
}
