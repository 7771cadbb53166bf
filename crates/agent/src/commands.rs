//! Slash commands typed at the prompt.

use localcoder_core::memory::MemoryRecord;
use localcoder_core::session::SessionContext;
use tracing::debug;

use crate::loop_runner::{AgentError, AgentLoop};

/// Command names and their help lines, in display order.
pub const HELP: &[(&str, &str)] = &[
    ("/plan", "Toggle planning mode (think before acting)"),
    ("/model [name]", "Show or switch the model"),
    ("/memory list", "List all project memories"),
    ("/memory search <q>", "Search project memories"),
    ("/memory forget <id>", "Delete a memory by id prefix"),
    ("/clear", "Clear the conversation"),
    ("/help", "Show this help"),
    ("/quit", "Exit"),
];

const MEMORY_USAGE: &str = "Usage: /memory [list | search <query> | forget <id>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Clear,
    TogglePlanning,
    Model(Option<String>),
    Memory(MemoryCommand),
    Help,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCommand {
    List,
    Search(String),
    Forget(String),
    Usage,
}

impl Command {
    /// Parse a line of input. Returns `None` when it is not a command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('/') {
            return None;
        }

        let (name, arg) = split_word(line);
        let name = name.to_lowercase();
        Some(match name.as_str() {
            "/quit" | "/exit" => Self::Quit,
            "/clear" => Self::Clear,
            "/plan" => Self::TogglePlanning,
            "/model" => Self::Model(Some(arg.to_string()).filter(|a| !a.is_empty())),
            "/memory" => Self::Memory(MemoryCommand::parse(arg)),
            "/help" => Self::Help,
            _ => Self::Unknown(name),
        })
    }
}

impl MemoryCommand {
    fn parse(arg: &str) -> Self {
        let (sub, rest) = split_word(arg);
        match (sub, rest) {
            ("" | "list", _) => Self::List,
            ("search", q) if !q.is_empty() => Self::Search(q.to_string()),
            ("forget", id) if !id.is_empty() => Self::Forget(id.to_string()),
            _ => Self::Usage,
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.trim().split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (s.trim(), ""),
    }
}

/// What the front end should show after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Info(String),
    Error(String),
    Memories(Vec<MemoryRecord>),
    Help,
    Quit,
}

pub async fn execute(
    command: Command,
    agent: &mut AgentLoop,
    session: &mut SessionContext,
) -> Result<CommandOutput, AgentError> {
    debug!(?command, "Running command");
    Ok(match command {
        Command::Quit => CommandOutput::Quit,
        Command::Clear => {
            agent.reset();
            CommandOutput::Info("Conversation cleared.".into())
        }
        Command::TogglePlanning => {
            session.toggle_planning();
            CommandOutput::Info(format!("Switched to {} mode.", session.mode_label()))
        }
        Command::Model(Some(name)) => {
            session.model = name;
            CommandOutput::Info(format!("Model set to: {}", session.model))
        }
        Command::Model(None) => CommandOutput::Info(format!("Current model: {}", session.model)),
        Command::Memory(sub) => memory_command(sub, agent, session).await?,
        Command::Help => CommandOutput::Help,
        Command::Unknown(name) => {
            CommandOutput::Error(format!("Unknown command: {name}. Type /help for commands."))
        }
    })
}

async fn memory_command(
    command: MemoryCommand,
    agent: &AgentLoop,
    session: &mut SessionContext,
) -> Result<CommandOutput, AgentError> {
    let memory = agent.memory();
    Ok(match command {
        MemoryCommand::List => CommandOutput::Memories(memory.list().await),
        MemoryCommand::Search(query) => {
            CommandOutput::Memories(memory.search(&query, agent.search_limit()).await)
        }
        MemoryCommand::Forget(id) => {
            if memory.delete(&id).await? {
                session.memory_count = memory.count().await;
                CommandOutput::Info(format!("Memory {id} deleted."))
            } else {
                CommandOutput::Error(format!("Memory '{id}' not found."))
            }
        }
        MemoryCommand::Usage => CommandOutput::Info(MEMORY_USAGE.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use localcoder_core::memory::MemoryKind;
    use localcoder_core::tool::ToolRegistry;
    use localcoder_memory::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/EXIT"), Some(Command::Quit));
        assert_eq!(Command::parse(" /plan "), Some(Command::TogglePlanning));
        assert_eq!(Command::parse("/model"), Some(Command::Model(None)));
        assert_eq!(
            Command::parse("/model  llama3.1:8b"),
            Some(Command::Model(Some("llama3.1:8b".into())))
        );
        assert_eq!(Command::parse("/frobnicate x"), Some(Command::Unknown("/frobnicate".into())));
    }

    #[test]
    fn parse_memory_subcommands() {
        let mem = |s: &str| match Command::parse(s) {
            Some(Command::Memory(m)) => m,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(mem("/memory"), MemoryCommand::List);
        assert_eq!(mem("/memory list"), MemoryCommand::List);
        assert_eq!(mem("/memory search error handling"), MemoryCommand::Search("error handling".into()));
        assert_eq!(mem("/memory forget 3fa2"), MemoryCommand::Forget("3fa2".into()));
        assert_eq!(mem("/memory search"), MemoryCommand::Usage);
        assert_eq!(mem("/memory drop all"), MemoryCommand::Usage);
    }

    fn agent(dir: &tempfile::TempDir) -> AgentLoop {
        let memory = Arc::new(MemoryStore::open(dir.path().join("memories.jsonl")));
        AgentLoop::new(
            Arc::new(ScriptedProvider::new(vec![])),
            Arc::new(ToolRegistry::new()),
            memory,
        )
    }

    #[tokio::test]
    async fn session_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(&dir);
        let mut session = SessionContext::new("qwen3:8b", dir.path());

        let out = execute(Command::TogglePlanning, &mut agent, &mut session).await.unwrap();
        assert_eq!(out, CommandOutput::Info("Switched to planning mode.".into()));
        assert!(session.planning);

        let out = execute(Command::Model(Some("llama3".into())), &mut agent, &mut session)
            .await
            .unwrap();
        assert_eq!(out, CommandOutput::Info("Model set to: llama3".into()));
        let out = execute(Command::Model(None), &mut agent, &mut session).await.unwrap();
        assert_eq!(out, CommandOutput::Info("Current model: llama3".into()));

        let out = execute(Command::Unknown("/x".into()), &mut agent, &mut session)
            .await
            .unwrap();
        assert_eq!(out, CommandOutput::Error("Unknown command: /x. Type /help for commands.".into()));
    }

    #[tokio::test]
    async fn memory_forget_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(&dir);
        let mut session = SessionContext::new("qwen3:8b", dir.path());
        let created = agent
            .memory()
            .insert("Use rustfmt defaults", vec![], MemoryKind::Project)
            .await
            .unwrap();
        let prefix = created[0].id[..4].to_string();

        let listed = execute(Command::Memory(MemoryCommand::List), &mut agent, &mut session)
            .await
            .unwrap();
        assert!(matches!(listed, CommandOutput::Memories(ref r) if r.len() == 1));

        let out = execute(Command::Memory(MemoryCommand::Forget(prefix.clone())), &mut agent, &mut session)
            .await
            .unwrap();
        assert_eq!(out, CommandOutput::Info(format!("Memory {prefix} deleted.")));
        assert_eq!(session.memory_count, 0);

        let out = execute(Command::Memory(MemoryCommand::Forget(prefix.clone())), &mut agent, &mut session)
            .await
            .unwrap();
        assert_eq!(out, CommandOutput::Error(format!("Memory '{prefix}' not found.")));
    }
}
