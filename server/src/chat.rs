// server/src/chat.rs
//
// Public chat, private system replies, and routing of slash commands.

use spacetimedb::{ReducerContext, Identity, Timestamp, Table};
use log;

use crate::config::load_config;
use crate::sort_button;

const MAX_MESSAGE_LEN: usize = 100;

// --- Table Definitions ---

#[spacetimedb::table(name = message, public)]
#[derive(Clone, Debug)]
pub struct Message {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub sender: Identity,
    pub recipient: Option<Identity>, // None = everyone
    pub text: String,
    pub sent: Timestamp, // Timestamp for sorting
}

/// Splits `/cmd arg1 arg2` into its arguments if `cmd` is one of `commands`.
/// Command matching ignores case.
pub fn parse_command(text: &str, commands: &[String]) -> Option<Vec<String>> {
    let mut words = text.strip_prefix('/')?.split_whitespace();
    let name = words.next()?;
    if !commands.iter().any(|c| c.eq_ignore_ascii_case(name)) {
        return None;
    }
    Some(words.map(str::to_string).collect())
}

/// Sends a message from the module to a single player.
pub(crate) fn send_system_message(ctx: &ReducerContext, recipient: Identity, text: String) {
    log::debug!("[Chat] -> {:?}: {}", recipient, text);
    ctx.db.message().insert(Message {
        id: 0, // Auto-incremented
        sender: ctx.identity(),
        recipient: Some(recipient),
        text,
        sent: ctx.timestamp,
    });
}

// --- Reducers ---

/// Sends a chat message visible to all players. Text starting with `/` is
/// treated as a command and never broadcast.
#[spacetimedb::reducer]
pub fn send_message(ctx: &ReducerContext, text: String) -> Result<(), String> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err("Message cannot be empty.".to_string());
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(format!("Message too long (max {} characters).", MAX_MESSAGE_LEN));
    }

    if text.starts_with('/') {
        let config = load_config(ctx);
        return match parse_command(&text, &config.commands) {
            Some(args) => sort_button::run_command(ctx, &args),
            None => Err(format!("Unknown command: {}", text.split_whitespace().next().unwrap_or("/"))),
        };
    }

    log::info!("[Chat] User {} sent message: {}", ctx.sender, text);
    ctx.db.message().insert(Message {
        id: 0, // Auto-incremented
        sender: ctx.sender,
        recipient: None,
        text,
        sent: ctx.timestamp,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Vec<String> {
        vec!["sortbutton".to_string(), "sb".to_string()]
    }

    #[test]
    fn bare_command_has_no_args() {
        assert_eq!(parse_command("/sortbutton", &commands()), Some(vec![]));
        assert_eq!(parse_command("/SB", &commands()), Some(vec![]));
    }

    #[test]
    fn arguments_are_split_on_whitespace() {
        assert_eq!(
            parse_command("/sortbutton   sort  now", &commands()),
            Some(vec!["sort".to_string(), "now".to_string()])
        );
    }

    #[test]
    fn other_text_is_not_a_command() {
        assert_eq!(parse_command("sortbutton", &commands()), None);
        assert_eq!(parse_command("/help", &commands()), None);
        assert_eq!(parse_command("/", &commands()), None);
    }
}
