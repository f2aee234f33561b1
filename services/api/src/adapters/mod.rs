pub mod chat_llm;
pub mod credentials;
pub mod storage;

pub use chat_llm::{OpenAiChatAdapter, OpenAiChatFactory};
pub use credentials::Argon2Credential;
pub use storage::SqliteStorage;
