//! One player's dialogue with the monk.

use tracing::{debug, error, warn};

use crate::client::{IntegrationClient, PendingRequest};
use crate::error::IntegrationError;
use crate::settings::ChatSettings;
use crate::types::{ChatMessage, ResponsesRequest, ResponsesResponse};

/// Shown when the endpoint answered with an error status
pub const API_ERROR_MESSAGE: &str = "API error.";
/// Shown when the endpoint could not be reached
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error.";
/// Prefix of every reply shown to the player
const REPLY_PREFIX: &str = "Monk: ";

/// Append-only chat history with at most one request in flight.
pub struct Conversation {
    model: String,
    instructions: String,
    input_char_limit: usize,
    history: Vec<ChatMessage>,
    pending: Option<PendingRequest<ResponsesResponse>>,
}

impl Conversation {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            model: settings.model.clone(),
            instructions: settings.instructions.clone(),
            input_char_limit: settings.input_char_limit,
            history: Vec::new(),
            pending: None,
        }
    }

    /// Record the player's question and build the request for it.
    ///
    /// Blank input yields nothing. Input past the character limit is cut.
    pub fn begin_turn(&mut self, text: &str) -> Option<ResponsesRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let text: String = if text.chars().count() > self.input_char_limit {
            warn!(limit = self.input_char_limit, "Question too long, truncating");
            text.chars().take(self.input_char_limit).collect()
        } else {
            text.to_string()
        };

        self.history.push(ChatMessage::user(text));
        Some(ResponsesRequest {
            model: self.model.clone(),
            instructions: self.instructions.clone(),
            input: self.history.clone(),
        })
    }

    /// Turn the outcome of a request into the line shown to the player.
    pub fn finish_turn(&mut self, result: Result<ResponsesResponse, IntegrationError>) -> String {
        match result {
            Ok(response) => {
                let text = response.assistant_text();
                self.history.push(ChatMessage::assistant(text.clone()));
                format!("{}{}", REPLY_PREFIX, text)
            }
            Err(IntegrationError::ServerError { status, message }) => {
                error!(status, "Chat API error: {}", message);
                API_ERROR_MESSAGE.to_string()
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                CONNECTION_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Ask the model. Returns false if the input was blank or a reply is still pending.
    pub fn submit(&mut self, client: &IntegrationClient, text: &str) -> bool {
        if self.pending.is_some() {
            debug!("Still waiting for the previous reply");
            return false;
        }
        let Some(request) = self.begin_turn(text) else {
            return false;
        };
        self.pending = Some(client.send_chat(request));
        true
    }

    /// Check for the reply without blocking. Call once per frame.
    pub fn poll(&mut self) -> Option<String> {
        let result = self.pending.as_ref()?.try_recv()?;
        self.pending = None;
        Some(self.finish_turn(result))
    }

    /// Block until the pending reply arrives.
    pub fn wait(&mut self) -> Option<String> {
        let pending = self.pending.take()?;
        Some(self.finish_turn(pending.wait()))
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::pending_pair;
    use crate::types::{OutputContent, OutputItem, Role};

    fn reply(text: &str) -> ResponsesResponse {
        ResponsesResponse {
            output: vec![OutputItem {
                kind: "message".into(),
                content: vec![OutputContent {
                    kind: "output_text".into(),
                    text: Some(text.into()),
                }],
            }],
        }
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut conversation = Conversation::new(&ChatSettings::default());
        assert!(conversation.begin_turn("   ").is_none());
        assert!(conversation.history().is_empty());
    }

    #[test]
    fn test_request_carries_whole_history() {
        let mut conversation = Conversation::new(&ChatSettings::default());
        conversation.begin_turn("Who built this monastery?").unwrap();
        conversation.finish_turn(Ok(reply("The Benedictines.")));

        let request = conversation.begin_turn("When?").unwrap();
        assert_eq!(request.model, "gpt-5-mini");
        assert_eq!(request.input.len(), 3);
        assert_eq!(request.input[1].role, Role::Assistant);
        assert_eq!(request.input[2].content, "When?");
    }

    #[test]
    fn test_long_input_is_truncated() {
        let settings = ChatSettings {
            input_char_limit: 5,
            ..ChatSettings::default()
        };
        let mut conversation = Conversation::new(&settings);
        let request = conversation.begin_turn("ñañañañaña").unwrap();
        assert_eq!(request.input[0].content, "ñañañ");
    }

    #[test]
    fn test_reply_is_prefixed_and_recorded() {
        let mut conversation = Conversation::new(&ChatSettings::default());
        conversation.begin_turn("Kaixo").unwrap();
        let line = conversation.finish_turn(Ok(reply("Kaixo, lagun!")));
        assert_eq!(line, "Monk: Kaixo, lagun!");
        assert_eq!(
            conversation.history().last(),
            Some(&ChatMessage::assistant("Kaixo, lagun!"))
        );
    }

    #[test]
    fn test_failures_map_to_static_messages() {
        let mut conversation = Conversation::new(&ChatSettings::default());
        conversation.begin_turn("Hello").unwrap();

        let server = IntegrationError::ServerError {
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(conversation.finish_turn(Err(server)), API_ERROR_MESSAGE);
        assert_eq!(
            conversation.finish_turn(Err(IntegrationError::Timeout)),
            CONNECTION_ERROR_MESSAGE
        );
        // Failed turns add no assistant message
        assert_eq!(conversation.history().len(), 1);
    }

    #[test]
    fn test_poll_waits_for_pending_reply() {
        let mut conversation = Conversation::new(&ChatSettings::default());
        conversation.begin_turn("Hello").unwrap();
        let (tx, pending) = pending_pair();
        conversation.pending = Some(pending);

        assert!(conversation.poll().is_none());
        assert!(conversation.is_waiting());

        tx.send(Ok(reply("Peace be with you."))).unwrap();
        assert_eq!(
            conversation.poll().as_deref(),
            Some("Monk: Peace be with you.")
        );
        assert!(!conversation.is_waiting());
        assert!(conversation.poll().is_none());
    }
}
