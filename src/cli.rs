use clap::{Parser, Subcommand};
use skillcheck::skillpacks::DEFAULT_SKILLS_DIR;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "skillcheck")]
#[command(about = "Validate skill packages and score their activation triggers")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Extra config file, merged over ~/.skillcheck and ./.skillcheck
    #[arg(long, global = true, env = "SKILLCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every check against one package
    Validate {
        /// Package directory
        path: PathBuf,

        /// Promote advisory findings to errors and reject malformed headers
        #[arg(long)]
        strict: bool,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score triggers and anti-triggers declared in skill.spec.json
    #[command(alias = "analyze-triggers")]
    Triggers {
        /// Package directory
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Security scan only
    Scan {
        /// Package directory
        path: PathBuf,

        /// Exit non-zero on security warnings too
        #[arg(long)]
        exit_nonzero: bool,

        #[arg(long)]
        json: bool,
    },

    /// Validate every package under a skills directory
    Audit {
        /// Skills directory
        #[arg(long, default_value = DEFAULT_SKILLS_DIR)]
        skills_dir: PathBuf,

        #[arg(long)]
        strict: bool,

        /// Security warnings fail the package
        #[arg(long)]
        fail_on_findings: bool,

        #[arg(long)]
        json: bool,
    },
}
