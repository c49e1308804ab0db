//! Shell completions command - Generate shell completion scripts

use std::io;

use clap::Command;
use clap_complete::{generate, Shell};
use colored::Colorize;
use serde::Serialize;

use crate::output::{Output, OutputConfig, Outputter};

/// Name completions are registered under.
pub const BIN_NAME: &str = "storage-delta";

/// Instructions for installing completions
#[derive(Debug, Serialize)]
pub struct CompletionInstructions {
    pub shell: String,
    pub instructions: Vec<String>,
}

impl Outputter for CompletionInstructions {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = format!(
            "{} completions for {}\n\n{}\n",
            BIN_NAME.cyan().bold(),
            self.shell.yellow(),
            "Installation:".cyan().bold()
        );
        for instruction in &self.instructions {
            output.push_str(&format!("  {}\n", instruction));
        }
        output.trim_end().to_string()
    }

    fn to_csv(&self, _config: &OutputConfig) -> String {
        let mut lines = vec!["shell,instruction".to_string()];
        lines.extend(
            self.instructions
                .iter()
                .filter(|i| !i.is_empty())
                .map(|i| format!("{},\"{}\"", self.shell, i.replace('"', "\"\""))),
        );
        lines.join("\n")
    }
}

fn get_instructions(shell: Shell) -> Vec<String> {
    match shell {
        Shell::Bash => vec![
            "# Add to ~/.bashrc:".into(),
            format!("eval \"$({} completions bash)\"", BIN_NAME),
            "".into(),
            "# Or save to a file:".into(),
            format!(
                "{0} completions bash > ~/.local/share/bash-completion/completions/{0}",
                BIN_NAME
            ),
        ],
        Shell::Zsh => vec![
            "# Save to a file in fpath:".into(),
            format!("{0} completions zsh > ~/.zfunc/_{0}", BIN_NAME),
            "# Then add to ~/.zshrc before compinit:".into(),
            "fpath=(~/.zfunc $fpath)".into(),
        ],
        Shell::Fish => vec![
            "# Save to fish completions directory:".into(),
            format!(
                "{0} completions fish > ~/.config/fish/completions/{0}.fish",
                BIN_NAME
            ),
        ],
        Shell::PowerShell => vec![
            "# Add to $PROFILE:".into(),
            format!(
                "Invoke-Expression (& {} completions powershell | Out-String)",
                BIN_NAME
            ),
        ],
        Shell::Elvish => vec![
            "# Add to ~/.elvish/rc.elv:".into(),
            format!("eval ({} completions elvish | slurp)", BIN_NAME),
        ],
        _ => vec![format!("{} completions {} > <completion file>", BIN_NAME, shell)],
    }
}

/// Run the completions command.
///
/// Writes the completion script for `shell` to stdout, or the install steps
/// when `show_instructions` is set.
pub fn run(
    shell: Shell,
    show_instructions: bool,
    cmd: &mut Command,
    config: OutputConfig,
) -> anyhow::Result<()> {
    if show_instructions {
        let instructions = CompletionInstructions {
            shell: shell.to_string(),
            instructions: get_instructions(shell),
        };
        return Output::with_config(instructions, config).render();
    }

    generate(shell, cmd, BIN_NAME, &mut io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_get_instructions() {
        let bash = get_instructions(Shell::Bash);
        assert!(bash.iter().any(|i| i.contains("bashrc")));
        assert!(bash.iter().any(|i| i.contains("storage-delta completions bash")));

        let zsh = get_instructions(Shell::Zsh);
        assert!(zsh.iter().any(|i| i.contains("_storage-delta")));
    }

    #[test]
    fn test_instructions_csv() {
        let instructions = CompletionInstructions {
            shell: "fish".to_string(),
            instructions: get_instructions(Shell::Fish),
        };
        let csv = instructions.to_csv(&OutputConfig::new(OutputFormat::Csv));
        assert!(csv.starts_with("shell,instruction\nfish,"));
    }
}
