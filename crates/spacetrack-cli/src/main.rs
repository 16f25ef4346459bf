#![forbid(unsafe_code)]

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spacetrack::{ClientConfig, SessionClient};
use spacetrack_bin_utils::completions_command::CompletionsCommand;

use crate::commands::{configure::ConfigureCommand, query::QueryCommand, tle::TleCommand};

#[derive(Parser)]
#[command(name = "spacetrack", version)]
struct Cli {
    /// Base URL of the API.
    #[clap(long, env = "SPACETRACK_URL")]
    url: Option<String>,
    #[clap(long, env = "SPACETRACK_USER")]
    username: Option<String>,
    #[clap(long, env = "SPACETRACK_PASS", hide_env_values = true)]
    password: Option<String>,
    /// Where to keep the session cookie; a temporary file is used if omitted.
    #[clap(long, env = "SPACETRACK_COOKIE_FILE")]
    cookie_file: Option<PathBuf>,
    /// Seconds to wait for each HTTP call.
    #[clap(long, env = "SPACETRACK_TIMEOUT")]
    timeout: Option<u64>,
    /// Log transport diagnostics to stderr.
    #[clap(long, env = "SPACETRACK_DEBUG")]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Layer the options given on the command line, or in the environment, over the saved ones.
    fn config(&self) -> anyhow::Result<ClientConfig> {
        let Self {
            url,
            username,
            password,
            cookie_file,
            timeout,
            debug,
            command: _,
        } = self;
        let mut config = ClientConfig::from_fs()?.unwrap_or_default();
        if let Some(url) = url {
            config.set_option("url", url)?;
        }
        if let Some(username) = username {
            config.username = username.clone();
        }
        if let Some(password) = password {
            config.password = password.clone();
        }
        if let Some(cookie_file) = cookie_file {
            config.cookie_file = Some(cookie_file.clone());
        }
        if let Some(timeout) = timeout {
            config.timeout = *timeout;
        }
        config.debug |= debug;
        Ok(config)
    }

    pub fn exec(self) -> anyhow::Result<()> {
        let config = self.config()?;
        match self.command {
            Commands::Tle(cmd) => cmd.exec(&mut SessionClient::new(config))?,
            Commands::Query(cmd) => cmd.exec(&mut SessionClient::new(config))?,
            Commands::Configure(cmd) => cmd.exec(config)?,
            Commands::Completions(cmd) => cmd.exec::<Self>()?,
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest two-line element set for an object.
    Tle(TleCommand),
    /// Print the raw response for any path, e.g. `/basicspacedata/query/class/boxscore`.
    Query(QueryCommand),
    /// Save the global options, except the password, as defaults for later runs.
    Configure(ConfigureCommand),
    /// Print a completion file for the given shell.
    ///
    /// Example: `spacetrack completions zsh | source /dev/stdin`.
    Completions(CompletionsCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut guard = spacetrack_bin_utils::logger::init(cli.debug);
    cli.exec()?;
    guard.disarm();
    Ok(())
}
