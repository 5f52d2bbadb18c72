use std::io::Write;

use anyhow::Result;

pub mod cli;
pub mod commands;
pub mod dataset;

use cli::{Cli, Commands};
use commands::{
    Session, run_choose_command, run_rank_command, run_reject_command, run_weights_command,
};

pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let session = Session::open(&cli.workspace, &cli.user)?;
    tracing::debug!(
        workspace = %session.workspace.display(),
        user = %session.user_key,
        backend = session.config.store.backend.as_str(),
        "session opened"
    );

    match cli.command {
        Commands::Rank(args) => run_rank_command(&session, args, out),
        Commands::Choose(args) => run_choose_command(&session, args, out),
        Commands::Reject(args) => run_reject_command(&session, args, out),
        Commands::Weights => run_weights_command(&session, out),
    }
}
