//! dtb - run any command under dt-toolbox monitoring

#![allow(missing_docs)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use dt_toolbox::config::{ConfigOverrides, LogLevel};
use dt_toolbox::{LogHandle, Monitor};
use serde_json::Value;
use std::path::PathBuf;
use std::process::{ExitCode, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing_subscriber::EnvFilter;

/// Exit code when the command cannot be started, as in POSIX shells
const SPAWN_FAILURE_CODE: u8 = 127;

#[derive(Debug, Parser)]
#[command(name = "dtb", version, about = "Monitor ETL scripts: JSON logs, alerts and log archival")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a command as a monitored unit of work
    Run {
        #[command(flatten)]
        settings: Settings,

        /// Command and its arguments
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Print the resolved configuration with secrets masked
    Config {
        #[command(flatten)]
        settings: Settings,

        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

/// Explicit overrides shared by every subcommand
#[derive(Debug, Args)]
struct Settings {
    /// YAML config file, default ~/.dt_toolbox/config.yml
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[arg(long)]
    app_name: Option<String>,

    #[arg(long)]
    owner: Option<String>,

    /// Tag attached to every record, repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Notification recipient, repeatable
    #[arg(long = "recipient")]
    recipients: Vec<String>,

    /// Notify on success as well as on failure
    #[arg(long)]
    notify_on_success: bool,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<LogLevel>,
}

impl Settings {
    fn monitor(&self) -> Monitor {
        let mut overrides = ConfigOverrides::new();
        if let Some(app_name) = &self.app_name {
            overrides = overrides.with_app_name(app_name);
        }
        if let Some(owner) = &self.owner {
            overrides = overrides.with_owner(owner);
        }
        if !self.tags.is_empty() {
            overrides = overrides.with_tags(&self.tags);
        }
        if !self.recipients.is_empty() {
            overrides = overrides.with_recipients(&self.recipients);
        }
        if self.notify_on_success {
            overrides = overrides.with_notify_on_success(true);
        }
        if let Some(log_dir) = &self.log_dir {
            overrides = overrides.with_log_dir(log_dir);
        }
        if let Some(level) = self.log_level {
            overrides = overrides.with_log_level(level);
        }

        let monitor = Monitor::new(overrides);
        match &self.config {
            Some(path) => monitor.with_config_file(path),
            None => monitor,
        }
    }
}

/// Why the monitored command did not succeed
#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` exited with status {code}")]
    Exit { command: String, code: i32 },
    #[error("`{command}` was terminated by a signal")]
    Signal { command: String },
}

impl CommandError {
    fn exit_code(&self) -> u8 {
        match self {
            CommandError::Spawn { .. } => SPAWN_FAILURE_CODE,
            CommandError::Exit { code, .. } => u8::try_from(*code).unwrap_or(1),
            CommandError::Wait { .. } | CommandError::Signal { .. } => 1,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { settings, command } => run(&settings, command).await,
        Commands::Config { settings, format } => print_config(&settings, format),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings, command: Vec<String>) -> anyhow::Result<ExitCode> {
    let outcome = settings
        .monitor()
        .run(|log| execute(log, command))
        .await?;

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dtb: {}", e);
            ExitCode::from(e.exit_code())
        }
    })
}

fn print_config(settings: &Settings, format: Format) -> anyhow::Result<ExitCode> {
    let config = settings.monitor().resolve_config()?;
    let rendered = match format {
        Format::Yaml => config.to_yaml()?,
        Format::Json => config.to_json()?,
    };
    println!("{}", rendered);
    Ok(ExitCode::SUCCESS)
}

/// Run the child, turning its stdout into INFO and its stderr into WARNING records
async fn execute(log: LogHandle, command: Vec<String>) -> Result<(), CommandError> {
    let display = command.join(" ");
    let (program, args) = command.split_first().ok_or_else(|| CommandError::Spawn {
        command: display.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;

    log.info_with(
        "Starting command",
        serde_json::json!({ "command": display }),
    );

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            command: display.clone(),
            source,
        })?;

    let stdout = forward_lines(child.stdout.take(), log.named("stdout"), LogLevel::Info);
    let stderr = forward_lines(child.stderr.take(), log.named("stderr"), LogLevel::Warning);
    let (status, (), ()) = tokio::join!(child.wait(), stdout, stderr);

    let status = status.map_err(|source| CommandError::Wait {
        command: display.clone(),
        source,
    })?;

    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(CommandError::Exit {
            command: display,
            code,
        }),
        None => Err(CommandError::Signal { command: display }),
    }
}

async fn forward_lines<R>(reader: Option<R>, log: LogHandle, level: LogLevel)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };

    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log.log(level, line, Value::Null),
            Ok(None) => break,
            Err(e) => {
                log.warning(format!("stopped reading child output: {}", e));
                break;
            }
        }
    }
}
