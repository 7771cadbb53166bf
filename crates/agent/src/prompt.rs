//! System prompt assembly.
//!
//! The prompt is rebuilt every round: base instructions, then any recalled
//! project memories, then the addendum for the current reasoning mode.

const BASE_PROMPT: &str = "\
You are a coding assistant that runs fully offline on the user's machine. \
You work inside one project directory: you read and change code, run commands, \
and keep notes about the project in a local memory.

## Tools
- read_file: show a file with line numbers (read before you edit)
- write_file: create a file or replace its contents
- edit_file: replace one exact occurrence of text in a file
- run_command: run a shell command in the project root
- search_files: list files matching a glob pattern
- search_content: find lines matching a regex
- remember: store a fact about the project
- recall: look up stored project facts
- ask_user: ask the user a question and wait for the answer
- task_complete: finish the task with a short summary

## Rules
1. Never edit a file you have not read in this conversation.
2. Check with ask_user before deleting files or running anything destructive.
3. Store conventions and decisions with remember; close finished work with task_complete.
4. edit_file needs old_text copied exactly from the file, with enough context to be unique.
5. Say what you are doing as you go.

## Workflow
For larger tasks, look around the codebase first, lay out a numbered plan, \
get the user's go-ahead, carry it out step by step, run the tests when there are any, \
and finish with a summary. Small questions and fixes can be handled directly.";

const PLANNING_ADDENDUM: &str = "\
## Planning Mode
Planning mode is on. Before changing anything:
1. Explore the relevant code with search_files and read_file
2. Check recall for anything already known about this area
3. Work out the approach
4. Present a numbered plan
5. Wait for the user to approve it

/think";

const DIRECT_ADDENDUM: &str = "\
## Direct Mode
Keep answers short. Answer simple questions right away and make small changes without a formal plan.

/no_think";

/// Build the system prompt for one round.
///
/// `memory_context` is the rendered memory block; it is left out when empty.
pub fn build_system_prompt(memory_context: &str, planning: bool) -> String {
    let mut parts = vec![BASE_PROMPT];
    if !memory_context.is_empty() {
        parts.push(memory_context);
    }
    parts.push(if planning {
        PLANNING_ADDENDUM
    } else {
        DIRECT_ADDENDUM
    });
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_mode_without_memories() {
        let prompt = build_system_prompt("", false);
        assert!(prompt.starts_with(BASE_PROMPT));
        assert!(prompt.ends_with("/no_think"));
        assert!(!prompt.contains("Planning Mode"));
        assert!(prompt.contains(&format!("{BASE_PROMPT}\n\n## Direct Mode")));
    }

    #[test]
    fn planning_mode_with_memories() {
        let memories = "## Relevant Project Memories\n- [project] uses tokio";
        let prompt = build_system_prompt(memories, true);
        assert!(prompt.contains(&format!("{BASE_PROMPT}\n\n{memories}\n\n## Planning Mode")));
        assert!(prompt.ends_with("/think"));
    }

    #[test]
    fn base_prompt_names_every_tool() {
        for tool in [
            "read_file",
            "write_file",
            "edit_file",
            "run_command",
            "search_files",
            "search_content",
            "remember",
            "recall",
            "ask_user",
            "task_complete",
        ] {
            assert!(BASE_PROMPT.contains(tool), "{tool} missing");
        }
    }
}
