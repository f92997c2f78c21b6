//! Purpose: `utftool` CLI entry point for inspecting `@UTF` table containers.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout; diagnostics and logs go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::Shell;
use memmap2::Mmap;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod diagnostics;
mod table_json;

use diagnostics::{ColorMode, emit_error, emit_findings, with_default_hint};
use table_json::{endian_name, header_json, layout_json, table_json};
use utftable::api::{self, Error, ErrorKind, ValidationStatus, to_exit_code};

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout; a bare subcommand prints its usage.
        Err(err) if !err.use_stderr() || is_bare_invocation(&err) => {
            err.print().map_err(|io_err| {
                (
                    Error::new(ErrorKind::Io)
                        .with_message("cannot print help")
                        .with_source(io_err),
                    ColorMode::Auto,
                )
            })?;
            return Ok(if err.use_stderr() { 2 } else { 0 });
        }
        Err(err) => {
            let usage = Error::new(ErrorKind::Usage)
                .with_message(clap_summary(&err))
                .with_hint("Run `utftool --help` for usage.");
            return Err((usage, ColorMode::Auto));
        }
    };

    init_tracing(cli.verbose);
    let color_mode = cli.color;
    dispatch(cli.command, color_mode).map_err(|err| (with_default_hint(err), color_mode))
}

fn is_bare_invocation(err: &clap::Error) -> bool {
    err.kind() == clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
}

fn clap_summary(err: &clap::Error) -> String {
    err.render()
        .to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

#[derive(Parser)]
#[command(
    name = "utftool",
    version,
    about = "Inspect @UTF table containers",
    help_template = r#"{about-with-newline}
USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    after_help = r#"EXAMPLES
  $ utftool info cues.utf
  $ utftool dump --pretty cues.utf
  $ utftool dump --nested archive.utf | jq '.rows[0]'
  $ utftool check *.utf

NOTES
  - Output is JSON on stdout; logs go to stderr (RUST_LOG or -v to raise)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Raise log verbosity (-v debug, -vv trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Show the declared header, digest and canonical layout",
        after_help = r#"EXAMPLES
  $ utftool info cues.utf"#
    )]
    Info {
        #[arg(help = "Container file", value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    #[command(
        arg_required_else_help = true,
        about = "Decode a container and print the table as JSON",
        after_help = r#"EXAMPLES
  $ utftool dump cues.utf
  $ utftool dump --pretty --nested archive.utf

NOTES
  - Blobs render as {size, hex}; with --nested, blobs holding a container render as tables"#
    )]
    Dump {
        #[arg(help = "Container file", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long, help = "Pretty-print the JSON output")]
        pretty: bool,
        #[arg(long, help = "Decode blobs that hold nested containers")]
        nested: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Validate containers and report layout drift",
        after_help = r#"EXAMPLES
  $ utftool check cues.utf
  $ utftool check a.utf b.utf c.utf

NOTES
  - Exit code is non-zero when any file is corrupt; drift alone exits 0"#
    )]
    Check {
        #[arg(required = true, help = "Container files", value_hint = ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ utftool completion bash > ~/.local/share/bash-completion/completions/utftool
  $ utftool completion zsh > ~/.zfunc/_utftool"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn dispatch(command: Command, color_mode: ColorMode) -> Result<i32, Error> {
    match command {
        Command::Info { file } => {
            let input = InputFile::open(&file)?;
            let bytes = input.bytes();
            let header = api::read_header(bytes).map_err(|err| err.with_path(&file))?;
            let table = api::decode(bytes).map_err(|err| err.with_path(&file))?;
            let layout = api::plan_layout(&table).map_err(|err| err.with_path(&file))?;
            let digest = Sha256::digest(&bytes[..header.container_len()]);
            emit_json(
                json!({
                    "path": file.display().to_string(),
                    "table_name": table.name,
                    "endian": endian_name(header.endian),
                    "file_size": bytes.len(),
                    "container_size": header.container_len(),
                    "sha256": hex_digest(&digest),
                    "uses_null_sentinel": table.uses_null_sentinel,
                    "header": header_json(&header),
                    "layout": layout_json(&layout),
                }),
                true,
            );
            Ok(0)
        }
        Command::Dump {
            file,
            pretty,
            nested,
        } => {
            let input = InputFile::open(&file)?;
            let table = api::decode(input.bytes()).map_err(|err| err.with_path(&file))?;
            debug!(
                path = %file.display(),
                rows = table.row_count(),
                "dumping table"
            );
            emit_json(table_json(&table, nested), pretty);
            Ok(0)
        }
        Command::Check { files } => {
            let mut exit_code = 0;
            for file in files {
                let input = InputFile::open(&file)?;
                let report = api::validate_container(input.bytes()).with_path(file.clone());
                if report.status == ValidationStatus::Corrupt {
                    exit_code = to_exit_code(ErrorKind::Corrupt);
                }
                emit_json(serde_json::to_value(&report).unwrap_or(Value::Null), false);
                emit_findings(&report, color_mode);
            }
            Ok(exit_code)
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "utftool", &mut io::stdout());
            Ok(0)
        }
    }
}

/// Read-only view of an input file; empty files are not mapped.
enum InputFile {
    Mapped(Mmap),
    Empty,
}

impl InputFile {
    fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?;
        let len = file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?;
        if len == 0 {
            return Ok(InputFile::Empty);
        }
        let mmap = unsafe {
            Mmap::map(&file)
                .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?
        };
        Ok(InputFile::Mapped(mmap))
    }

    fn bytes(&self) -> &[u8] {
        match self {
            InputFile::Mapped(mmap) => &mmap[..],
            InputFile::Empty => &[],
        }
    }
}

fn hex_digest(digest: &[u8]) -> String {
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, hex_digest};
    use clap::Parser;

    #[test]
    fn dump_flags_parse() {
        let cli = Cli::try_parse_from(["utftool", "-vv", "dump", "--nested", "a.utf"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Dump {
                file,
                pretty,
                nested,
            } => {
                assert_eq!(file.to_str(), Some("a.utf"));
                assert!(!pretty);
                assert!(nested);
            }
            _ => panic!("expected dump"),
        }
    }

    #[test]
    fn check_requires_a_file() {
        assert!(Cli::try_parse_from(["utftool", "check"]).is_err());
    }

    #[test]
    fn color_flag_accepts_modes() {
        for mode in ["auto", "always", "never"] {
            Cli::try_parse_from(["utftool", "--color", mode, "info", "a.utf"]).expect("parse");
        }
        assert!(Cli::try_parse_from(["utftool", "--color", "rainbow", "info", "a.utf"]).is_err());
    }

    #[test]
    fn digest_hex_is_lowercase() {
        assert_eq!(hex_digest(&[0xde, 0xad, 0x01]), "dead01");
    }
}
