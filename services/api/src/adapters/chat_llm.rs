//! services/api/src/adapters/chat_llm.rs
//!
//! The adapter for the clinic's chat assistant. It implements the
//! `ChatSession` port from the core crate on top of an OpenAI-compatible
//! chat completions API (Gemini's OpenAI endpoint by default).
//!
//! One adapter instance is one conversation: it keeps the running history and
//! sends it along with every new user turn.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_stream::try_stream;
use async_trait::async_trait;
use clinic_core::catalog::system_instruction;
use clinic_core::ports::{ChatSession, ChatSessionFactory, FragmentStream, PortError, PortResult};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Sampling temperature for every reply. Not configurable per call.
pub const CHAT_TEMPERATURE: f32 = 0.7;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatSession` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    /// The system prompt followed by every completed user/model exchange.
    history: Arc<Mutex<Vec<ChatCompletionRequestMessage>>>,
}

impl OpenAiChatAdapter {
    /// Creates the session, bound to `system_instruction` for its whole life.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        system_instruction: &str,
    ) -> PortResult<Self> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_instruction)
            .build()
            .map_err(to_port_error)?
            .into();
        Ok(Self {
            client,
            model,
            history: Arc::new(Mutex::new(vec![system])),
        })
    }

    /// Builds a client for the given endpoint.
    pub fn client(api_key: &str, api_base: &str) -> Client<OpenAIConfig> {
        Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base),
        )
    }
}

/// Opens one `OpenAiChatAdapter` per page, all sharing a single client.
#[derive(Clone)]
pub struct OpenAiChatFactory {
    client: Client<OpenAIConfig>,
    model: String,
    system_instruction: String,
}

impl OpenAiChatFactory {
    /// Creates a factory whose sessions use the clinic's system prompt.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self {
            client,
            model,
            system_instruction: system_instruction(),
        }
    }
}

impl ChatSessionFactory for OpenAiChatFactory {
    fn create_session(&self) -> PortResult<Arc<dyn ChatSession>> {
        let session = OpenAiChatAdapter::new(
            self.client.clone(),
            self.model.clone(),
            &self.system_instruction,
        )?;
        Ok(Arc::new(session))
    }
}

fn to_port_error(e: OpenAIError) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `ChatSession` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatSession for OpenAiChatAdapter {
    /// Requests a streamed reply to `message`. The exchange joins the history
    /// only once the reply has been received in full.
    async fn send_message_stream(&self, message: &str) -> PortResult<FragmentStream> {
        let user_message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(message)
            .build()
            .map_err(to_port_error)?
            .into();

        let mut messages = self.history.lock().await.clone();
        messages.push(user_message.clone());
        debug!("Requesting chat reply with {} messages of context", messages.len());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(CHAT_TEMPERATURE)
            .build()
            .map_err(to_port_error)?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(to_port_error)?;

        let history = self.history.clone();
        let fragments: FragmentStream = Box::pin(try_stream! {
            let mut reply = String::new();
            while let Some(chunk) = upstream.next().await {
                let chunk = chunk.map_err(to_port_error)?;
                for choice in chunk.choices {
                    if let Some(text) = choice.delta.content {
                        if !text.is_empty() {
                            reply.push_str(&text);
                            yield text;
                        }
                    }
                }
            }

            let model_message: ChatCompletionRequestMessage = ChatCompletionRequestAssistantMessageArgs::default()
                .content(reply.as_str())
                .build()
                .map_err(to_port_error)?
                .into();
            let mut history = history.lock().await;
            history.push(user_message);
            history.push(model_message);
            info!("Chat reply complete ({} chars); history now {} messages", reply.len(), history.len());
        });

        Ok(fragments)
    }
}
