// ABOUTME: In-memory collaborators for pipeline tests
// ABOUTME: Scripted completion provider, recording record/preference/blob stores and stub compressors

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use wingman_server::constants::limits;
use wingman_server::errors::{AppError, AppResult};
use wingman_server::llm::{
    ChatMessage, ChatRequest, ChatResponse, ChatStream, CompletionOptions, CompletionProvider,
    LlmCapabilities, LlmProvider,
};
use wingman_server::media::{CompressedImage, CompressionError, ImageCompressor};
use wingman_server::models::{ImageRecord, MessageRecord, Sender, UserPreferences};
use wingman_server::storage::{
    BlobStore, BlobStoreError, PreferencesStore, RecordStore, RecordStoreError,
};

// ============================================================================
// Completion provider
// ============================================================================

/// What a blocking completion call was for, told apart by its token hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Describe-only or describe-and-nickname
    Vision,
    /// Nickname from text and optional description
    Nickname,
    /// Second-pass critique
    Critique,
    /// Anything else (legacy suggestions)
    Other,
}

impl Purpose {
    fn of(options: CompletionOptions) -> Self {
        match options.max_tokens {
            Some(limits::IMAGE_ANALYSIS_MAX_TOKENS) => Self::Vision,
            Some(limits::NICKNAME_MAX_TOKENS) => Self::Nickname,
            Some(limits::CRITIQUE_MAX_TOKENS) => Self::Critique,
            _ => Self::Other,
        }
    }
}

/// One recorded provider call; `purpose` is `None` for the stream
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub purpose: Option<Purpose>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default)]
struct StreamScript {
    chunks: Vec<String>,
    fail_after: bool,
}

/// Completion provider answering from per-purpose queues
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<HashMap<Purpose, VecDeque<Result<String, String>>>>,
    stream: Mutex<StreamScript>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn respond(self, purpose: Purpose, text: &str) -> Self {
        self.queue(purpose, Ok(text.to_owned()));
        self
    }

    /// Queue a provider failure
    pub fn fail(self, purpose: Purpose, message: &str) -> Self {
        self.queue(purpose, Err(message.to_owned()));
        self
    }

    /// Chunks streamed by `stream_complete`
    pub fn stream(self, chunks: &[&str]) -> Self {
        *self.stream.lock().unwrap() = StreamScript {
            chunks: chunks.iter().map(|c| (*c).to_owned()).collect(),
            fail_after: false,
        };
        self
    }

    /// Stream `chunks`, then fail
    pub fn stream_then_fail(self, chunks: &[&str]) -> Self {
        *self.stream.lock().unwrap() = StreamScript {
            chunks: chunks.iter().map(|c| (*c).to_owned()).collect(),
            fail_after: true,
        };
        self
    }

    fn queue(&self, purpose: Purpose, response: Result<String, String>) {
        self.responses
            .lock()
            .unwrap()
            .entry(purpose)
            .or_default()
            .push_back(response);
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for one purpose
    pub fn calls_for(&self, purpose: Purpose) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.purpose == Some(purpose))
            .collect()
    }

    /// Number of `stream_complete` calls
    pub fn stream_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.purpose.is_none())
            .count()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> AppResult<String> {
        let purpose = Purpose::of(options);
        self.calls.lock().unwrap().push(RecordedCall {
            purpose: Some(purpose),
            messages: messages.to_vec(),
        });

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&purpose)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AppError::provider("scripted", message)),
            None => Err(AppError::provider("scripted", format!("no response for {purpose:?}"))),
        }
    }

    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> AppResult<()> {
        self.calls.lock().unwrap().push(RecordedCall {
            purpose: None,
            messages: messages.to_vec(),
        });

        let script = self.stream.lock().unwrap().clone();
        for chunk in &script.chunks {
            on_chunk(chunk);
        }
        if script.fail_after {
            return Err(AppError::provider("scripted", "stream interrupted"));
        }
        Ok(())
    }
}

// ============================================================================
// Record and preference store
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredConversation {
    pub owner: String,
    pub title: Option<String>,
    pub touches: usize,
}

/// Record and preference store backed by vectors
#[derive(Default)]
pub struct MemoryStore {
    conversations: Mutex<HashMap<String, StoredConversation>>,
    messages: Mutex<Vec<MessageRecord>>,
    images: Mutex<Vec<ImageRecord>>,
    preferences: Mutex<HashMap<String, UserPreferences>>,
    pub fail_preferences: bool,
    pub fail_touch: bool,
    pub fail_title: bool,
    pub fail_image_records: bool,
    pub fail_ai_message: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversation owned by `owner`
    pub fn with_conversation(self, conversation_id: &str, owner: &str) -> Self {
        self.conversations.lock().unwrap().insert(
            conversation_id.to_owned(),
            StoredConversation {
                owner: owner.to_owned(),
                title: None,
                touches: 0,
            },
        );
        self
    }

    /// Store preferences for `user_id`
    pub fn with_preferences(self, user_id: &str, preferences: UserPreferences) -> Self {
        self.preferences
            .lock()
            .unwrap()
            .insert(user_id.to_owned(), preferences);
        self
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<StoredConversation> {
        self.conversations
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
    }

    pub fn messages(&self) -> Vec<MessageRecord> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_from(&self, sender: Sender) -> Vec<MessageRecord> {
        self.messages()
            .into_iter()
            .filter(|message| message.sender == sender)
            .collect()
    }

    pub fn images(&self) -> Vec<ImageRecord> {
        self.images.lock().unwrap().clone()
    }

    fn insert(&self, conversation_id: &str, sender: Sender, content: Option<&str>) -> MessageRecord {
        let record = MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            sender,
            content: content.map(str::to_owned),
            image_description: None,
            created_at: Utc::now().to_rfc3339(),
        };
        self.messages.lock().unwrap().push(record.clone());
        record
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_message_stub(
        &self,
        user_id: &str,
        conversation_id: &str,
        content: Option<&str>,
    ) -> Result<MessageRecord, RecordStoreError> {
        let owned = self
            .conversations
            .lock()
            .unwrap()
            .get(conversation_id)
            .is_some_and(|conversation| conversation.owner == user_id);
        if !owned {
            return Err(RecordStoreError::ForeignKeyViolation);
        }
        Ok(self.insert(conversation_id, Sender::User, content))
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<(), RecordStoreError> {
        if self.fail_touch {
            return Err(RecordStoreError::Other("touch failed".to_owned()));
        }
        if let Some(conversation) = self.conversations.lock().unwrap().get_mut(conversation_id) {
            conversation.touches += 1;
        }
        Ok(())
    }

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), RecordStoreError> {
        if self.fail_title {
            return Err(RecordStoreError::Other("title update failed".to_owned()));
        }
        match self.conversations.lock().unwrap().get_mut(conversation_id) {
            Some(conversation) => {
                conversation.title = Some(title.to_owned());
                Ok(())
            }
            None => Err(RecordStoreError::Other("no such conversation".to_owned())),
        }
    }

    async fn update_message_image_description(&self, message_id: &str, description: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter_mut()
            .find(|message| message.id == message_id)
            .map(|message| message.image_description = Some(description.to_owned()))
            .is_some()
    }

    async fn insert_image_records(&self, records: &[ImageRecord]) -> Result<(), RecordStoreError> {
        if self.fail_image_records {
            return Err(RecordStoreError::Other("image batch rejected".to_owned()));
        }
        self.images.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn insert_ai_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<MessageRecord, RecordStoreError> {
        if self.fail_ai_message {
            return Err(RecordStoreError::Other("insert failed".to_owned()));
        }
        Ok(self.insert(conversation_id, Sender::Ai, Some(content)))
    }
}

#[async_trait]
impl PreferencesStore for MemoryStore {
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, RecordStoreError> {
        if self.fail_preferences {
            return Err(RecordStoreError::Other("profile service unavailable".to_owned()));
        }
        Ok(self
            .preferences
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Blob store and compressors
// ============================================================================

/// One stored blob
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

/// Blob store that fails for file names containing `fail`
#[derive(Default)]
pub struct MemoryBlobStore {
    uploads: Mutex<Vec<StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> Vec<StoredBlob> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError> {
        if path.contains("fail") {
            return Err(BlobStoreError::Upload(format!("refused {path}")));
        }
        self.uploads.lock().unwrap().push(StoredBlob {
            path: path.to_owned(),
            content_type: content_type.to_owned(),
            size: bytes.len(),
        });
        Ok(path.to_owned())
    }

    fn public_url(&self, path: &str) -> Option<String> {
        Some(format!("memory://{path}"))
    }
}

/// Compressor that returns its input unchanged
pub struct PassthroughCompressor;

#[async_trait]
impl ImageCompressor for PassthroughCompressor {
    async fn compress(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<CompressedImage, CompressionError> {
        Ok(CompressedImage {
            bytes: bytes.to_vec(),
            content_type: content_type.to_owned(),
        })
    }
}

/// Compressor that always fails
pub struct FailingCompressor;

#[async_trait]
impl ImageCompressor for FailingCompressor {
    async fn compress(
        &self,
        _bytes: &[u8],
        _content_type: &str,
    ) -> Result<CompressedImage, CompressionError> {
        Err(CompressionError::Decode("unsupported format".to_owned()))
    }
}

// ============================================================================
// Transport-level provider
// ============================================================================

/// Backend whose only behaviour is a fixed health-check answer
pub struct FixedHealthProvider {
    pub reachable: Result<bool, String>,
}

#[async_trait]
impl LlmProvider for FixedHealthProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn display_name(&self) -> &'static str {
        "Fixed"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::text_only()
    }

    fn default_model(&self) -> &str {
        "fixed-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, AppError> {
        Err(AppError::provider("fixed", "completions are not scripted"))
    }

    async fn complete_stream(&self, _request: &ChatRequest) -> Result<ChatStream, AppError> {
        Err(AppError::provider("fixed", "streams are not scripted"))
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        self.reachable
            .clone()
            .map_err(|message| AppError::provider("fixed", message))
    }
}
