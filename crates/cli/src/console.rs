//! Terminal front end: line input, streamed output, and the operator
//! prompts the agent raises mid-turn.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use localcoder_agent::{AgentEvent, CommandOutput, Decision, HELP, Interrupted, Operator};
use localcoder_core::memory::MemoryRecord;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Lines of tool output echoed to the terminal.
const RESULT_PREVIEW_LINES: usize = 6;

pub struct Console {
    input: Mutex<Lines<BufReader<Stdin>>>,
    transient: AtomicBool,
    streaming: AtomicBool,
}

impl Console {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            transient: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
        }
    }

    /// Print `prompt` and read one line. `None` on end of input.
    pub async fn read_line(&self, prompt: &str) -> std::io::Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        self.input.lock().await.next_line().await
    }

    /// Ask a yes/no question; anything but y/yes is a no.
    pub async fn confirm_yes(&self, question: &str) -> std::io::Result<bool> {
        let answer = self.read_line(&format!("{question} [y/N] ")).await?;
        Ok(matches!(
            answer.as_deref().map(|a| a.trim().to_lowercase()).as_deref(),
            Some("y" | "yes")
        ))
    }

    pub fn info(&self, message: &str) {
        self.settle();
        println!("{message}");
    }

    pub fn error(&self, message: &str) {
        self.settle();
        eprintln!("{message}");
    }

    pub fn render(&self, output: &CommandOutput) {
        match output {
            CommandOutput::Info(message) => self.info(message),
            CommandOutput::Error(message) => self.error(message),
            CommandOutput::Memories(records) => self.memories(records),
            CommandOutput::Help => {
                println!("Commands:");
                for (name, help) in HELP {
                    println!("  {name:<22} {help}");
                }
            }
            CommandOutput::Quit => {}
        }
    }

    fn memories(&self, records: &[MemoryRecord]) {
        if records.is_empty() {
            println!("No memories found.");
            return;
        }
        for record in records {
            let preview: String = record.content.chars().take(100).collect();
            let tags = record.tag_label();
            let tags = if tags.is_empty() { String::new() } else { format!(" {tags}") };
            println!("  {DIM}{}{RESET} [{}]{tags} {preview}", record.id, record.kind);
        }
    }

    /// Replace the transient status line on stderr.
    pub fn progress(&self, line: &str) {
        self.transient.store(true, Ordering::SeqCst);
        eprint!("{CLEAR_LINE}{DIM}{line}{RESET}");
        let _ = std::io::stderr().flush();
    }

    /// Finish any transient line so the next output starts clean.
    fn settle(&self) {
        if self.transient.swap(false, Ordering::SeqCst) {
            eprint!("{CLEAR_LINE}");
        }
        if self.streaming.swap(false, Ordering::SeqCst) {
            println!();
        }
    }
}

#[async_trait]
impl Operator for Console {
    async fn confirm(&self, synopsis: &str) -> Result<Decision, Interrupted> {
        self.settle();
        println!("  {synopsis}");
        match self.confirm_yes("  Allow?").await {
            Ok(true) => Ok(Decision::Approve),
            Ok(false) => Ok(Decision::Deny),
            Err(_) => Err(Interrupted),
        }
    }

    async fn ask(&self, question: &str) -> Result<String, Interrupted> {
        self.settle();
        println!("? {question}");
        match self.read_line("  > ").await {
            Ok(Some(answer)) => Ok(answer.trim().to_string()),
            Ok(None) | Err(_) => Err(Interrupted),
        }
    }

    fn notify(&self, event: &AgentEvent) {
        match event {
            AgentEvent::Chunk { content } => {
                if self.transient.swap(false, Ordering::SeqCst) {
                    eprint!("{CLEAR_LINE}");
                }
                self.streaming.store(true, Ordering::SeqCst);
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            AgentEvent::Thought { .. } => {
                if !self.transient.swap(true, Ordering::SeqCst) {
                    eprint!("{DIM}thinking…{RESET}");
                }
            }
            AgentEvent::ToolCall { name, input } => {
                self.settle();
                let mut args = input.to_string();
                if args.chars().count() > 120 {
                    args = args.chars().take(120).collect::<String>() + "…";
                }
                println!("{DIM}⚙ {name} {args}{RESET}");
            }
            AgentEvent::ToolResult { output, success, .. } => {
                let marker = if *success { "✓" } else { "✗" };
                let lines: Vec<&str> = output.lines().collect();
                for line in lines.iter().take(RESULT_PREVIEW_LINES) {
                    println!("{DIM}  {marker} {line}{RESET}");
                }
                if lines.len() > RESULT_PREVIEW_LINES {
                    println!("{DIM}    … {} more lines{RESET}", lines.len() - RESULT_PREVIEW_LINES);
                }
            }
            AgentEvent::Denied { .. } => self.info("Action denied by user."),
            AgentEvent::Info { message } => self.info(message),
            AgentEvent::Done { .. } => self.settle(),
            AgentEvent::Error { message } => self.error(&format!("Agent error: {message}")),
        }
    }
}
