use crate::conversation::ConversationClient;
use crate::documents::LoadedDocument;
use crate::error::Result;
use crate::llm::ChatBackend;
use crate::message::ConversationHistory;
use crate::prompts::{self, Persona};
use tracing::{debug, info};
use uuid::Uuid;

/// State of a general or persona chat, owned by the front-end between turns
#[derive(Debug, Clone)]
pub struct ChatSession {
    session_id: Uuid,
    persona: Option<Persona>,
    history: ConversationHistory,
}

impl ChatSession {
    pub fn new(persona: Option<Persona>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            persona,
            history: ConversationHistory::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn persona(&self) -> Option<Persona> {
        self.persona
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Change persona; history starts over when the persona actually changes
    pub fn switch_persona(&mut self, persona: Option<Persona>) {
        if persona == self.persona {
            return;
        }
        info!(
            session_id = %self.session_id,
            from = ?self.persona,
            to = ?persona,
            "switching persona"
        );
        self.persona = persona;
        self.history = ConversationHistory::new();
    }

    pub fn clear(&mut self) {
        self.history = ConversationHistory::new();
    }

    /// Run one turn. History only changes when the turn succeeds.
    pub async fn send<B: ChatBackend>(
        &mut self,
        client: &ConversationClient<B>,
        user_input: &str,
    ) -> Result<String> {
        let system_prompt = self.persona.map(|p| p.prompt());
        let (reply, history) = client.send(user_input, &self.history, system_prompt).await?;
        self.history = history;
        debug!(session_id = %self.session_id, turns = self.history.len() / 2, "chat turn done");
        Ok(reply)
    }
}

/// State of a document-grounded chat: loaded documents plus history
#[derive(Debug, Clone, Default)]
pub struct DocumentSession {
    documents: Vec<LoadedDocument>,
    history: ConversationHistory,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, replacing any loaded document with the same filename
    pub fn load(&mut self, document: LoadedDocument) {
        match self
            .documents
            .iter_mut()
            .find(|d| d.filename == document.filename)
        {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
    }

    pub fn remove(&mut self, filename: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.filename != filename);
        self.documents.len() != before
    }

    pub fn documents(&self) -> &[LoadedDocument] {
        &self.documents
    }

    pub fn total_words(&self) -> usize {
        self.documents.iter().map(LoadedDocument::word_count).sum()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history = ConversationHistory::new();
    }

    /// Every loaded document under its own header, in load order
    pub fn combined_content(&self) -> String {
        let mut combined = String::new();
        for document in &self.documents {
            combined.push_str(&format!(
                "\n\n--- Content from {} ---\n{}\n",
                document.filename, document.content
            ));
        }
        combined
    }

    /// Answer from loaded documents only. With nothing loaded the fixed
    /// [`prompts::NO_CONTENT_REPLY`] comes back and no request is made.
    pub async fn send<B: ChatBackend>(
        &mut self,
        client: &ConversationClient<B>,
        question: &str,
    ) -> Result<String> {
        if self.documents.iter().all(|d| d.content.trim().is_empty()) {
            return Ok(prompts::NO_CONTENT_REPLY.to_string());
        }

        let system_prompt = prompts::document_prompt(&self.combined_content());
        let (reply, history) = client
            .send(question, &self.history, Some(&system_prompt))
            .await?;
        self.history = history;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatSettings;
    use crate::conversation::testing::ScriptedBackend;
    use crate::message::{Message, Role};

    fn chat_client(backend: ScriptedBackend) -> ConversationClient<ScriptedBackend> {
        ConversationClient::new(backend, ChatSettings::chat_defaults())
    }

    fn doc(name: &str, content: &str) -> LoadedDocument {
        LoadedDocument {
            filename: name.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn teacher_persona_prepends_its_prompt() {
        let client = chat_client(ScriptedBackend::replying(&["4"]));
        let mut session = ChatSession::new(Some(Persona::Teacher));

        let reply = session.send(&client, "What is 2+2?").await.unwrap();

        let request = client.backend().last_request();
        let system: Vec<_> = request
            .messages
            .iter()
            .filter(|m| m.role() == Role::System)
            .collect();
        assert_eq!(system.len(), 1);
        assert_eq!(request.messages[0], Message::system(Persona::Teacher.prompt()));
        assert_eq!(reply, "4");
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn persona_prompt_is_sent_once_per_turn() {
        let client = chat_client(ScriptedBackend::replying(&["a", "b"]));
        let mut session = ChatSession::new(Some(Persona::Chef));

        session.send(&client, "first").await.unwrap();
        session.send(&client, "second").await.unwrap();

        let request = client.backend().last_request();
        assert_eq!(request.messages.len(), 4);
        assert_eq!(
            request.messages.iter().filter(|m| m.role() == Role::System).count(),
            1
        );
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn no_persona_sends_no_system_message() {
        let client = chat_client(ScriptedBackend::replying(&["hey"]));
        let mut session = ChatSession::new(None);

        session.send(&client, "Hi").await.unwrap();

        assert_eq!(client.backend().last_request().messages, vec![Message::user("Hi")]);
    }

    #[tokio::test]
    async fn switching_persona_resets_history() {
        let client = chat_client(ScriptedBackend::replying(&["a"]));
        let mut session = ChatSession::new(Some(Persona::Doctor));
        session.send(&client, "hello").await.unwrap();

        session.switch_persona(Some(Persona::Doctor));
        assert_eq!(session.history().len(), 2);

        session.switch_persona(Some(Persona::Programmer));
        assert!(session.history().is_empty());
        assert_eq!(session.persona(), Some(Persona::Programmer));
    }

    #[tokio::test]
    async fn failed_turn_keeps_session_history() {
        let backend = ScriptedBackend::replying(&["first reply"]);
        backend.push(Err(crate::error::LlmError::MalformedResponse("bad".into())));
        let client = chat_client(backend);
        let mut session = ChatSession::new(None);
        session.send(&client, "one").await.unwrap();
        let before = session.history().clone();

        assert!(session.send(&client, "two").await.is_err());
        assert_eq!(session.history(), &before);
    }

    #[tokio::test]
    async fn document_chat_without_content_skips_remote_call() {
        let client = chat_client(ScriptedBackend::default());
        let mut session = DocumentSession::new();

        let reply = session.send(&client, "What is in the file?").await.unwrap();
        assert_eq!(reply, prompts::NO_CONTENT_REPLY);

        session.load(doc("blank.pdf", "   \n"));
        let reply = session.send(&client, "And now?").await.unwrap();
        assert_eq!(reply, prompts::NO_CONTENT_REPLY);

        assert_eq!(client.backend().calls(), 0);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn document_chat_grounds_on_every_loaded_file() {
        let client = chat_client(ScriptedBackend::replying(&["Page 1 says hello"]));
        let mut session = DocumentSession::new();
        session.load(doc("a.pdf", "alpha text"));
        session.load(doc("b.pdf", "beta text"));

        let reply = session.send(&client, "What does it say?").await.unwrap();

        let request = client.backend().last_request();
        assert_eq!(request.messages.len(), 2);
        let system = request.messages[0].content();
        assert!(system.contains("--- Content from a.pdf ---\nalpha text"));
        assert!(system.contains("--- Content from b.pdf ---\nbeta text"));
        assert!(system.find("a.pdf").unwrap() < system.find("b.pdf").unwrap());
        assert_eq!(reply, "Page 1 says hello");
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn loading_same_filename_replaces_content() {
        let mut session = DocumentSession::new();
        session.load(doc("a.pdf", "one two"));
        session.load(doc("b.pdf", "three"));
        session.load(doc("a.pdf", "four five six"));

        assert_eq!(session.documents().len(), 2);
        assert_eq!(session.documents()[0].content, "four five six");
        assert_eq!(session.total_words(), 4);

        assert!(session.remove("b.pdf"));
        assert!(!session.remove("b.pdf"));
        assert_eq!(session.documents().len(), 1);
    }

    #[tokio::test]
    async fn session_id_is_unique_and_stable() {
        let client = chat_client(ScriptedBackend::replying(&["a"]));
        let mut session = ChatSession::new(None);
        let id = session.session_id();
        assert_ne!(id, ChatSession::new(None).session_id());

        session.send(&client, "hi").await.unwrap();
        session.switch_persona(Some(Persona::Teacher));
        session.clear();
        assert_eq!(session.session_id(), id);
    }

    #[tokio::test]
    async fn unreachable_provider_leaves_history_untouched() {
        let client = ConversationClient::new(
            crate::llm::OpenAiClient::new("http://127.0.0.1:1", "k"),
            ChatSettings::chat_defaults(),
        );
        let mut session = ChatSession::new(Some(Persona::Teacher));

        let err = session.send(&client, "hello?").await.unwrap_err();
        assert!(matches!(err, crate::error::LlmError::Transport(_)));
        assert!(session.history().is_empty());
    }
}
