//! Prompt assembly — turning stored history into a model-ready context.
//!
//! A pure function of its inputs: no side effects, nothing persisted.
//! The output sequence is rebuilt fresh every turn.

use crate::message::{Message, Role};
use serde::Serialize;

/// One role/content pair in the ephemeral prompt context sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

/// Builds the ordered prompt context from history plus an optional
/// system directive.
pub struct PromptAssembler;

impl PromptAssembler {
    /// Assemble the prompt: the system directive first (if present),
    /// followed by the history with user/assistant roles mapped through.
    ///
    /// System messages stored inside the history are skipped — only the
    /// leading directive carries the "system" role. Whether stored rows
    /// with other roles should instead be an error is deliberately left
    /// as-is; the tests pin the skipping behavior.
    pub fn build(history: &[Message], system_directive: Option<&str>) -> Vec<PromptMessage> {
        let mut prompt = Vec::with_capacity(history.len() + 1);

        if let Some(directive) = system_directive {
            prompt.push(PromptMessage {
                role: "system",
                content: directive.to_string(),
            });
        }

        for msg in history {
            match msg.role {
                Role::User | Role::Assistant => prompt.push(PromptMessage {
                    role: msg.role.as_str(),
                    content: msg.content.clone(),
                }),
                Role::System => continue,
            }
        }

        prompt
    }
}
