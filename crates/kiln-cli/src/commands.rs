//! Slash commands
//!
//! A fixed table of zero-argument commands typed in place of a chat
//! message. The first whitespace-delimited token is matched exactly
//! (case-sensitive, prefix included); trailing tokens are ignored.
//! Unrecognized slash input is not sent to the model; the UI shows an
//! "unknown command" notice instead.

/// What a command asks the application to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Empty the conversation history
    ClearHistory,
    /// Open the model picker
    OpenModelPicker,
    /// Open the system prompt editor
    OpenSystemPrompt,
    /// Terminate the application
    Exit,
}

/// One entry in the command table
#[derive(Debug)]
pub struct CommandSpec {
    pub token: &'static str,
    pub description: &'static str,
    pub action: CommandAction,
}

/// The command table, in display order
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        token: "/clear",
        description: "Clear the chat history",
        action: CommandAction::ClearHistory,
    },
    CommandSpec {
        token: "/models",
        description: "Open model selection",
        action: CommandAction::OpenModelPicker,
    },
    CommandSpec {
        token: "/system",
        description: "Configure system prompt",
        action: CommandAction::OpenSystemPrompt,
    },
    CommandSpec {
        token: "/bye",
        description: "Exit the application",
        action: CommandAction::Exit,
    },
];

/// Completions for a partially typed command, in table order.
/// Anything not starting with the command prefix gets none.
pub fn predictions(partial: &str) -> Vec<&'static CommandSpec> {
    if !partial.starts_with('/') {
        return Vec::new();
    }
    COMMANDS
        .iter()
        .filter(|spec| spec.token.starts_with(partial))
        .collect()
}

/// Match input against the table; trailing arguments are ignored.
pub fn interpret(text: &str) -> Option<CommandAction> {
    let token = text.split_whitespace().next()?;
    COMMANDS
        .iter()
        .find(|spec| spec.token == token)
        .map(|spec| spec.action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictions_for_prefix() {
        let matches = predictions("/sy");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token, "/system");
        assert_eq!(matches[0].description, "Configure system prompt");
    }

    #[test]
    fn test_predictions_require_command_prefix() {
        assert!(predictions("hello").is_empty());
        assert!(predictions("").is_empty());
    }

    #[test]
    fn test_bare_slash_lists_all_commands_in_order() {
        let tokens: Vec<_> = predictions("/").iter().map(|s| s.token).collect();
        assert_eq!(tokens, vec!["/clear", "/models", "/system", "/bye"]);
    }

    #[test]
    fn test_interpret_ignores_trailing_arguments() {
        assert_eq!(
            interpret("/clear extra args"),
            Some(CommandAction::ClearHistory)
        );
    }

    #[test]
    fn test_interpret_is_case_sensitive_and_exact() {
        assert_eq!(interpret("/CLEAR"), None);
        assert_eq!(interpret("/clearhistory"), None);
        assert_eq!(interpret("/nope"), None);
        assert_eq!(interpret(""), None);
    }

    #[test]
    fn test_interpret_known_commands() {
        assert_eq!(interpret("/models"), Some(CommandAction::OpenModelPicker));
        assert_eq!(interpret("/system"), Some(CommandAction::OpenSystemPrompt));
        assert_eq!(interpret("/bye"), Some(CommandAction::Exit));
    }
}
