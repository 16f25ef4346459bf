use std::{fs::File, io::Write, path::PathBuf};

use anyhow::Context;
use clap_complete::{generate, Shell};
use log::info;

/// Print a completion file for the given shell.
///
/// Example: `spacetrack completions zsh | source /dev/stdin`.
#[derive(Debug, clap::Parser)]
pub struct CompletionsCommand {
    shell: Shell,
    /// Write the script to this file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl CompletionsCommand {
    pub fn exec<T: clap::CommandFactory>(self) -> anyhow::Result<()> {
        match &self.output {
            Some(path) => {
                let mut file =
                    File::create(path).with_context(|| format!("Could not create {path:?}"))?;
                self.exec_to::<T>(&mut file)?;
                info!("Wrote {} completions to {path:?}", self.shell);
                Ok(())
            }
            None => self.exec_to::<T>(&mut std::io::stdout().lock()),
        }
    }

    /// Generate the script for the command `T` into `out`.
    pub fn exec_to<T: clap::CommandFactory>(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let mut cmd = T::command();
        let name = cmd.get_name().to_string();
        generate(self.shell, &mut cmd, name, out);
        out.flush().context("Could not flush completions")
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(name = "satellites")]
    struct Cli {
        #[arg(long)]
        norad_id: Option<u32>,
    }

    #[test]
    fn script_names_the_command_and_its_flags() {
        let command = CompletionsCommand {
            shell: Shell::Bash,
            output: None,
        };
        let mut out = Vec::new();
        command.exec_to::<Cli>(&mut out).unwrap();
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("satellites"));
        assert!(script.contains("--norad-id"));
    }

    #[test]
    fn output_flag_writes_a_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("satellites.zsh");
        let command =
            CompletionsCommand::parse_from(["completions", "zsh", "--output", path.to_str().unwrap()]);
        command.exec::<Cli>().unwrap();
        let script = std::fs::read_to_string(&path).unwrap();
        assert!(script.contains("#compdef satellites"));
    }
}
