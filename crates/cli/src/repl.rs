//! Interactive loop and single-message mode.

use localcoder_agent::{AgentError, Command, CommandOutput, TurnOutcome, commands};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::console::Console;
use crate::setup::Workspace;

/// Run one user turn. Ctrl-C cancels it without ending the session.
pub async fn turn(console: &Console, workspace: &mut Workspace, input: &str) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = workspace
        .agent
        .run(&mut workspace.session, input, console, &cancel)
        .await;
    watcher.abort();

    match result {
        Ok(TurnOutcome::TaskComplete { .. }) => debug!("Turn ended with task_complete"),
        Ok(outcome) => debug!(?outcome, "Turn ended"),
        Err(AgentError::Interrupted) => console.info("Interrupted."),
        // Stream errors were already reported through the operator.
        Err(AgentError::Stream(_)) => {}
        Err(e) => console.error(&format!("Agent error: {e}")),
    }
}

pub async fn run(console: &Console, mut workspace: Workspace) -> Result<(), Box<dyn std::error::Error>> {
    banner(&workspace);

    loop {
        let line = tokio::select! {
            line = console.read_line("> ") => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = Command::parse(input) {
            let output = match commands::execute(command, &mut workspace.agent, &mut workspace.session).await {
                Ok(output) => output,
                Err(e) => CommandOutput::Error(e.to_string()),
            };
            if output == CommandOutput::Quit {
                break;
            }
            console.render(&output);
            continue;
        }

        turn(console, &mut workspace, input).await;
    }

    println!("Bye.");
    Ok(())
}

fn banner(workspace: &Workspace) {
    let session = &workspace.session;
    println!();
    println!("localcoder {}", env!("CARGO_PKG_VERSION"));
    println!("  Project:  {}", session.project_root.display());
    println!("  Model:    {}", session.model);
    println!("  Mode:     {}", session.mode_label());
    println!("  Memories: {}", session.memory_count);
    println!();
    println!("Type /help for commands, /quit to exit.");
    println!();
}
