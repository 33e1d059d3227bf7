//! Shell completion generation for `concord`.
//!
//! - concord completion bash > /etc/bash_completion.d/concord
//! - concord completion zsh  > ~/.zsh/completion/_concord
//! - concord completion fish > ~/.config/fish/completions/concord.fish

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;

pub fn run(shell: Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
