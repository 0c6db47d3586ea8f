pub mod config;
pub mod conversation;
pub mod documents;
pub mod error;
pub mod illustrate;
pub mod images;
pub mod llm;
pub mod message;
pub mod prompts;
pub mod report;
pub mod session;

pub use config::{ChatSettings, Config};
pub use conversation::ConversationClient;
pub use error::LlmError;
pub use llm::{ChatBackend, ChatRequest, OpenAiClient};
pub use message::{ConversationHistory, Message, Role};
pub use prompts::Persona;
pub use session::{ChatSession, DocumentSession};
