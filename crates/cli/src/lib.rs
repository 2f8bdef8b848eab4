#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the front end of the `generate-blobs` executable. It parses the
//! command line, assembles a [`BlobConfig`], installs the tracing subscriber
//! and hands the job stream to [`engine::generate_blobs`].
//!
//! # Design
//!
//! [`run`] takes the argument list together with handles for standard output
//! and error so tests can drive it without spawning a process. The binary
//! converts the returned status with [`exit_code_from`].
//!
//! Settings are layered: defaults, then the JSON file named by `--config`,
//! then individual command-line options.
//!
//! # Errors
//!
//! Usage errors exit with status `2` after clap's diagnostic. Every other
//! failure prints `generate-blobs error: <message>` and exits with `1`.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["generate-blobs", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(status, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("generate-blobs "));
//! ```

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Arg, ArgAction, Command, builder::PathBufValueParser};
use engine::{BlobConfig, EngineError, FulltextStore, RunSummary, StoreKind, generate_blobs};
use keywords::KeywordHandling;
use logging::{VerbosityConfig, init_tracing};
use thiserror::Error;

/// Name the executable reports in diagnostics.
pub const PROGRAM_NAME: &str = "generate-blobs";

/// Status for a completed run.
pub const EXIT_SUCCESS: i32 = 0;
/// Status when the run failed.
pub const EXIT_FAILURE: i32 = 1;
/// Status for malformed command lines.
pub const EXIT_USAGE: i32 = 2;

const MAX_EXIT_CODE: i32 = u8::MAX as i32;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Flag(String),
}

#[derive(Debug, Default)]
struct ParsedArgs {
    show_help: bool,
    show_version: bool,
    blob_file: Option<PathBuf>,
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    keywords: Option<KeywordHandling>,
    binary_suffixes: Vec<String>,
    verbose: u8,
    info: Vec<String>,
    debug: Vec<String>,
}

fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .about("Reconstruct RCS revision fulltexts and write them as blob records.")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .short('h')
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .value_name("FILE")
                .help("Read jobs from FILE instead of standard input.")
                .value_parser(PathBufValueParser::new())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Load settings from the JSON file FILE.")
                .value_parser(PathBufValueParser::new())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("keywords")
                .long("keywords")
                .value_name("MODE")
                .help("Keyword handling: expanded, collapsed or untouched.")
                .value_parser(["expanded", "collapsed", "untouched"])
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("binary-suffix")
                .long("binary-suffix")
                .value_name("SUFFIX")
                .help("Also treat files ending in .SUFFIX,v as binary.")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase verbosity; may be repeated.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .value_name("FLAGS")
                .help("Fine-grained informational output (files, stats).")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .value_name("FLAGS")
                .help("Fine-grained debug output (rcs, prune, delta, keyword, store, emit).")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("blob-file")
                .value_name("BLOBFILE")
                .help("Output file; created or truncated.")
                .value_parser(PathBufValueParser::new())
                .action(ArgAction::Set),
        )
}

fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;
    let strings = |matches: &mut clap::ArgMatches, id: &str| -> Vec<String> {
        matches
            .remove_many::<String>(id)
            .map(Iterator::collect)
            .unwrap_or_default()
    };

    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        blob_file: matches.remove_one::<PathBuf>("blob-file"),
        input: matches.remove_one::<PathBuf>("input"),
        config: matches.remove_one::<PathBuf>("config"),
        keywords: matches
            .remove_one::<String>("keywords")
            .and_then(|mode| KeywordHandling::from_str(&mode).ok()),
        binary_suffixes: strings(&mut matches, "binary-suffix"),
        verbose: matches.get_count("verbose"),
        info: strings(&mut matches, "info"),
        debug: strings(&mut matches, "debug"),
    })
}

fn build_config(args: &ParsedArgs) -> Result<BlobConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => BlobConfig::load(path)?,
        None => BlobConfig::default(),
    };

    if let Some(handling) = args.keywords {
        config.keyword_handling = handling;
    }
    config
        .binary_suffixes
        .extend(args.binary_suffixes.iter().cloned());

    if args.verbose > 0 {
        config.verbosity = VerbosityConfig::from_verbose_level(args.verbose);
    }
    for token in &args.info {
        config.verbosity.apply_info_flag(token).map_err(CliError::Flag)?;
    }
    for token in &args.debug {
        config.verbosity.apply_debug_flag(token).map_err(CliError::Flag)?;
    }
    Ok(config)
}

fn open_blob_file(path: &Path) -> Result<FulltextStore<File>, EngineError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|err| EngineError::from(err).in_file(path))?;
    FulltextStore::new(StoreKind::Blob, file).map_err(|err| EngineError::from(err).in_file(path))
}

fn execute(args: &ParsedArgs, blob_file: &Path) -> Result<RunSummary, CliError> {
    let config = build_config(args)?;
    init_tracing(&config.verbosity);

    let mut blobs = open_blob_file(blob_file)?;
    let summary = match &args.input {
        Some(path) => {
            let file = File::open(path).map_err(|err| EngineError::from(err).in_file(path))?;
            generate_blobs(BufReader::new(file), &mut blobs, &config)?
        }
        None => {
            let stdin = io::stdin();
            generate_blobs(stdin.lock(), &mut blobs, &config)?
        }
    };
    tracing::debug!(
        target: "blobgen::stats",
        files = summary.files,
        blobs = summary.stats.blobs_emitted,
        "run complete"
    );
    Ok(summary)
}

fn render_help() -> String {
    clap_command()
        .override_usage(format!("{PROGRAM_NAME} [OPTIONS] BLOBFILE"))
        .render_help()
        .to_string()
}

/// Runs the blob generator with `arguments`, returning the process status.
///
/// The first argument is the program name. Help and version output go to
/// `stdout`; diagnostics go to `stderr`.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let args = match parse_args(arguments) {
        Ok(args) => args,
        Err(error) => {
            let _ = write!(stderr, "{}", error.render());
            return EXIT_USAGE;
        }
    };

    if args.show_help {
        return match stdout.write_all(render_help().as_bytes()) {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_FAILURE,
        };
    }
    if args.show_version {
        return match writeln!(stdout, "{PROGRAM_NAME} {}", env!("CARGO_PKG_VERSION")) {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_FAILURE,
        };
    }

    let Some(blob_file) = args.blob_file.clone() else {
        let _ = writeln!(stderr, "{PROGRAM_NAME}: missing BLOBFILE operand");
        let _ = write!(stderr, "{}", render_help());
        return EXIT_USAGE;
    };

    match execute(&args, &blob_file) {
        Ok(_) => EXIT_SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{PROGRAM_NAME} error: {error}");
            EXIT_FAILURE
        }
    }
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(args: &[&str]) -> (i32, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(args.iter().copied(), &mut stdout, &mut stderr);
        (
            status,
            String::from_utf8(stdout).expect("utf8"),
            String::from_utf8(stderr).expect("utf8"),
        )
    }

    #[test]
    fn help_lists_every_option() {
        let (status, stdout, stderr) = run_args(&[PROGRAM_NAME, "--help"]);
        assert_eq!(status, EXIT_SUCCESS);
        assert!(stderr.is_empty());
        for option in ["--input", "--config", "--keywords", "--binary-suffix", "BLOBFILE"] {
            assert!(stdout.contains(option), "help lacks {option}");
        }
    }

    #[test]
    fn version_is_printed() {
        let (status, stdout, _) = run_args(&[PROGRAM_NAME, "-V"]);
        assert_eq!(status, EXIT_SUCCESS);
        assert_eq!(stdout, format!("generate-blobs {}\n", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn missing_operand_is_a_usage_error() {
        let (status, stdout, stderr) = run_args(&[PROGRAM_NAME]);
        assert_eq!(status, EXIT_USAGE);
        assert!(stdout.is_empty());
        assert!(stderr.contains("missing BLOBFILE"));
    }

    #[test]
    fn unknown_option_and_bad_mode_are_usage_errors() {
        assert_eq!(run_args(&[PROGRAM_NAME, "--frobnicate", "out"]).0, EXIT_USAGE);
        assert_eq!(run_args(&[PROGRAM_NAME, "--keywords", "kv", "out"]).0, EXIT_USAGE);
    }

    #[test]
    fn command_line_overrides_configuration() {
        let args = parse_args([
            PROGRAM_NAME,
            "--keywords",
            "collapsed",
            "--binary-suffix",
            "bin",
            "--binary-suffix",
            "iso",
            "-vv",
            "--debug",
            "store2,emit",
            "out.blobs",
        ])
        .expect("parse");
        assert_eq!(args.blob_file, Some(PathBuf::from("out.blobs")));

        let config = build_config(&args).expect("config");
        assert_eq!(config.keyword_handling, KeywordHandling::Collapsed);
        assert!(config.binary_suffixes.ends_with(&["bin".to_owned(), "iso".to_owned()]));
        assert!(config.binary_suffixes.iter().any(|suffix| suffix == "gif"));
        assert!(config.verbosity.debug_gte(logging::DebugFlag::Store, 2));
        assert!(config.verbosity.debug_gte(logging::DebugFlag::Emit, 1));
    }

    #[test]
    fn unknown_debug_flag_fails_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out.blobs");
        let (status, _, stderr) = run_args(&[
            PROGRAM_NAME,
            "--debug",
            "bogus",
            out.to_str().expect("utf8 path"),
        ]);
        assert_eq!(status, EXIT_FAILURE);
        assert!(stderr.starts_with("generate-blobs error: unknown debug flag: bogus"));
    }

    #[test]
    fn empty_job_stream_truncates_the_blob_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let jobs = dir.path().join("jobs.jsonl");
        let out = dir.path().join("out.blobs");
        std::fs::write(&jobs, "\n").expect("write jobs");
        std::fs::write(&out, "stale").expect("write stale output");

        let (status, _, stderr) = run_args(&[
            PROGRAM_NAME,
            "--input",
            jobs.to_str().expect("utf8 path"),
            out.to_str().expect("utf8 path"),
        ]);
        assert_eq!(status, EXIT_SUCCESS, "{stderr}");
        assert_eq!(std::fs::read(&out).expect("read output"), b"");
    }

    #[test]
    fn exit_codes_are_clamped() {
        assert_eq!(exit_code_from(0), std::process::ExitCode::SUCCESS);
        assert_eq!(exit_code_from(-3), std::process::ExitCode::from(0));
        assert_eq!(exit_code_from(300), std::process::ExitCode::from(255));
    }
}
