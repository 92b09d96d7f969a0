//! Binary entry point for the errorutil CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Validate a tree; artifacts land in the root directory
//! errorutil analyze -d ./meshkit
//!
//! # Replace placeholders with the next free codes
//! errorutil update -d ./meshkit -o ./out --skip-dirs build,dist
//!
//! # Renumber every code in the component
//! errorutil update --force
//!
//! # Print the convention documentation
//! errorutil doc
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use errorutil::assign::AssignPolicy;
use errorutil::config::{ConventionConfig, Mode, RunConfig};
use errorutil::doc::convention_doc;
use errorutil::error::ErrorUtilError;
use errorutil::output::{emit_error, emit_report};
use errorutil::pipeline;
use errorutil::GoAdapter;

// ============================================================================
// CLI Structure
// ============================================================================

/// Analyze, verify and update MeshKit compatible error codes in Go trees.
#[derive(Parser, Debug)]
#[command(name = "errorutil", version, about = "Manage structured error codes in Go source trees")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Verbose output (debug logging).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Root directory of the source tree.
    #[arg(short = 'd', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Output directory for the JSON artifacts (default: root directory).
    #[arg(short = 'o', long, global = true)]
    out_dir: Option<PathBuf>,

    /// Directory containing component_info.json (default: root directory).
    #[arg(short = 'i', long, global = true)]
    info_dir: Option<PathBuf>,

    /// Directories to skip, by name or root-relative path.
    ///
    /// Comma separated and repeatable: `--skip-dirs a,b --skip-dirs c`.
    #[arg(long, global = true, value_delimiter = ',')]
    skip_dirs: Vec<String>,

    /// Log level for tracing output (overrides --verbose).
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
}

impl GlobalArgs {
    fn effective_log_level(&self) -> LogLevel {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level,
            (None, true) => LogLevel::Debug,
            (None, false) => LogLevel::Warn,
        }
    }

    fn run_config(&self, mode: Mode) -> Result<RunConfig, ErrorUtilError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ErrorUtilError::invalid_args("--dir must not be empty"));
        }
        Ok(RunConfig::new(&self.dir, mode)
            .with_out_dir(self.out_dir.as_ref())
            .with_info_dir(self.info_dir.as_ref())
            .with_skip_dirs(&self.skip_dirs))
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze and validate errors, then write the three artifacts.
    Analyze,

    /// Replace placeholder codes with integers, then analyze.
    Update {
        /// Re-sequence every error code, not just placeholders.
        #[arg(long)]
        force: bool,
    },

    /// Print the error convention documentation.
    Doc,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.effective_log_level());

    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            let _ = emit_error(&err, &mut io::stderr());
            ExitCode::from(err.error_code().code())
        }
    }
}

/// Initialize tracing subscriber. `RUST_LOG` wins over the CLI level.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<ExitCode, ErrorUtilError> {
    let mode = match cli.command {
        Command::Doc => {
            print!("{}", convention_doc(&ConventionConfig::default()));
            return Ok(ExitCode::SUCCESS);
        }
        Command::Analyze => Mode::Analyze,
        Command::Update { force: false } => Mode::Update(AssignPolicy::Incremental),
        Command::Update { force: true } => Mode::Update(AssignPolicy::Force),
    };

    let config = cli.global.run_config(mode)?;
    let report = pipeline::run(&config, &GoAdapter::new())?;

    let mut stdout = io::stdout().lock();
    emit_report(&report, &mut stdout)
        .and_then(|()| stdout.flush())
        .map_err(|e| ErrorUtilError::internal(format!("failed to write report: {}", e)))?;

    Ok(match report.status().error_code() {
        Some(code) => ExitCode::from(code.code()),
        None => ExitCode::SUCCESS,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    mod parsing {
        use super::*;

        #[test]
        fn defaults() {
            let cli = Cli::try_parse_from(["errorutil", "analyze"]).unwrap();
            assert!(matches!(cli.command, Command::Analyze));
            assert_eq!(cli.global.dir, PathBuf::from("."));
            assert!(cli.global.out_dir.is_none());
            assert!(cli.global.skip_dirs.is_empty());
            assert_eq!(cli.global.effective_log_level(), LogLevel::Warn);
        }

        #[test]
        fn update_force_and_global_flags_after_subcommand() {
            let cli = Cli::try_parse_from([
                "errorutil", "update", "--force", "-d", "src", "-o", "out", "-i", "meta", "-v",
            ])
            .unwrap();
            assert!(matches!(cli.command, Command::Update { force: true }));
            assert_eq!(cli.global.dir, PathBuf::from("src"));
            assert_eq!(cli.global.out_dir, Some(PathBuf::from("out")));
            assert_eq!(cli.global.info_dir, Some(PathBuf::from("meta")));
            assert_eq!(cli.global.effective_log_level(), LogLevel::Debug);
        }

        #[test]
        fn skip_dirs_are_comma_separated_and_repeatable() {
            let cli = Cli::try_parse_from([
                "errorutil",
                "--skip-dirs",
                "build,dist",
                "--skip-dirs",
                "third_party",
                "analyze",
            ])
            .unwrap();
            assert_eq!(cli.global.skip_dirs, vec!["build", "dist", "third_party"]);
        }

        #[test]
        fn log_level_overrides_verbose() {
            let cli =
                Cli::try_parse_from(["errorutil", "-v", "--log-level", "error", "doc"]).unwrap();
            assert_eq!(cli.global.effective_log_level(), LogLevel::Error);
        }

        #[test]
        fn unknown_subcommand_is_rejected() {
            assert!(Cli::try_parse_from(["errorutil", "export"]).is_err());
            assert!(Cli::try_parse_from(["errorutil", "analyze", "--force"]).is_err());
        }
    }

    mod config {
        use super::*;

        #[test]
        fn out_and_info_dirs_default_to_root() {
            let cli = Cli::try_parse_from(["errorutil", "analyze", "-d", "tree"]).unwrap();
            let config = cli.global.run_config(Mode::Analyze).unwrap();
            assert_eq!(config.root_dir, Path::new("tree"));
            assert_eq!(config.out_dir, Path::new("tree"));
            assert_eq!(config.info_dir, Path::new("tree"));
        }

        #[test]
        fn empty_dir_is_invalid() {
            let cli = Cli::try_parse_from(["errorutil", "analyze", "-d", ""]).unwrap();
            let err = cli.global.run_config(Mode::Analyze).unwrap_err();
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn update_mode_from_force_flag() {
            let cli = Cli::try_parse_from(["errorutil", "update", "-o", "out"]).unwrap();
            let config = cli
                .global
                .run_config(Mode::Update(AssignPolicy::Incremental))
                .unwrap();
            assert_eq!(config.out_dir, Path::new("out"));
            assert_eq!(config.mode, Mode::Update(AssignPolicy::Incremental));
        }
    }
}
