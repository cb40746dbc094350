//! Binary entry point: argument handling, session check, flow dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;

use jgui_gather::exit_codes;
use jgui_gather::gather::{GatherOutcome, run_gather};
use jgui_gather::io::console::{Console, ConsoleInput};
use jgui_gather::io::facts::CimFactsProvider;
use jgui_gather::io::session::{SessionCheck, TasklistProbe, ensure_session, kill_progress_ui};
use jgui_gather::io::store::{TsEnvStore, VariableStore, vars};
use jgui_gather::logging;
use jgui_gather::silent::run_silent;

#[derive(Debug, Parser)]
#[command(
    name = "jgui-gather",
    version,
    about = "Gathers and validates machine identity for a task sequence",
    long_about = "Gathers and validates machine identity for a task sequence.\n\n\
        To use inside a task sequence, set the variables <JGUI-regex>, \
        <JGUI-timeout> and <JGUI-buildtypes>. The regex needs to start with \
        '^' and end with '$', the timeout needs to be a number, and build \
        types are separated by a comma (with no space).\n\n\
        Submit with '+fail' to force a failout (exit code 4). Submit with \
        '+override' to set the variable 'Override' to true."
)]
struct Cli {
    /// Enter regex, timeout and build types manually (standalone only).
    #[arg(short, long, conflicts_with = "silent")]
    testing: bool,
    /// Submit make, model and chassis with no interaction.
    #[arg(short, long)]
    silent: bool,
    /// Print help (alias kept for operators used to `-?`).
    #[arg(short = '?', action = clap::ArgAction::Help, hide = true)]
    help_alias: Option<bool>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version are a normal exit; anything else is a usage
            // error.
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            return ExitCode::from(code as u8);
        }
    };

    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(exit_codes::INVALID as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let store = TsEnvStore::detect();
    let automation = store.is_automation();
    logging::init(log_dir(&store, automation).as_deref());
    info!(
        version = env!("CARGO_PKG_VERSION"),
        automation,
        testing = cli.testing,
        silent = cli.silent,
        "starting"
    );

    let probe = TasklistProbe;
    if ensure_session(&probe, automation)? == SessionCheck::Relaunched {
        info!("relaunched into the reference session, this instance exits");
        return Ok(exit_codes::OK);
    }

    let provider = CimFactsProvider;
    let mut frontend = Console;

    if cli.silent {
        run_silent(&store, &provider, &mut frontend)?;
        return Ok(exit_codes::OK);
    }

    if cli.testing && automation {
        return Err(anyhow!(
            "task sequence environment detected; don't use --testing here"
        ));
    }

    if automation {
        kill_progress_ui();
    }

    let mut input = ConsoleInput;
    match run_gather(&store, &provider, &mut frontend, &mut input, cli.testing)? {
        GatherOutcome::Submitted => Ok(exit_codes::OK),
        GatherOutcome::ForcedFail => {
            info!("forced failure requested");
            Ok(exit_codes::FORCED_FAIL)
        }
    }
}

/// Log directory: the engine's log location in automation mode, else the
/// executable's directory.
fn log_dir(store: &dyn VariableStore, automation: bool) -> Option<PathBuf> {
    if automation
        && let Ok(Some(location)) = store.get(vars::LOG_LOCATION)
    {
        return Some(PathBuf::from(location));
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}
