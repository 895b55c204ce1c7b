//! The chat widget's controller.
//!
//! [`ChatClient`] owns the session state, talks to a [`ChatEndpoint`], keeps
//! session state in [`Storage`], and draws through a [`View`].  Every method
//! takes `&self`: a second call made while a turn is awaiting the endpoint
//! sees the busy flag and backs off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use time::OffsetDateTime;

use crate::chat::config::ClientConfig;
use crate::endpoint::ChatEndpoint;
use crate::error::Error;
use crate::markup::{MarkupPipeline, is_safe_url};
use crate::observability::{
    CHAT_SENDS_IGNORED, CHAT_TURN_DURATION, CHAT_TURN_FAILURES, CHAT_TURNS, PHOTO_UPLOAD_FAILURES,
    PHOTO_UPLOADS, STORAGE_WRITE_FAILURES,
};
use crate::render::View;
use crate::storage::{SESSION_ID_KEY, Storage, USER_DATA_KEY};
use crate::types::{
    ChatRequest, ChatResponse, CompletionLink, Message, PhotoUpload, UploadResponse, UserData,
};

/// User-data key a stored photo's location is recorded under.
pub const PHOTO_URL_KEY: &str = "photo_url";

/// What became of a `send_message` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing happened: the text was blank or a turn was already in flight.
    Ignored,
    /// The endpoint answered and its reply was displayed.
    Delivered,
    /// The turn failed and the error message was displayed.
    Failed,
}

/// What became of an `upload_photo` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The endpoint stored the photo and returned its location.
    Stored,
    /// The endpoint accepted the request without storing anything.
    NoPhoto,
    /// Validation or the request failed and the error message was displayed.
    Failed,
}

#[derive(Debug, Default)]
struct SessionState {
    user_data: UserData,
    options: Vec<String>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A chat widget bound to one endpoint, one store, and one view.
pub struct ChatClient<E: ChatEndpoint, S: Storage, V: View> {
    endpoint: E,
    storage: S,
    view: Mutex<V>,
    markup: MarkupPipeline,
    config: ClientConfig,
    session_id: String,
    state: Mutex<SessionState>,
    input: Mutex<String>,
    busy: AtomicBool,
}

impl<E: ChatEndpoint, S: Storage, V: View> ChatClient<E, S, V> {
    /// Create a client, restoring the session identifier and user data from
    /// `storage`.  A missing identifier is generated and persisted.
    pub fn new(endpoint: E, storage: S, view: V, config: ClientConfig) -> Self {
        let session_id = match storage.get(SESSION_ID_KEY) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                let id = new_session_id();
                if let Err(err) = storage.set(SESSION_ID_KEY, &id) {
                    STORAGE_WRITE_FAILURES.click();
                    tracing::warn!(error = %err, "failed to persist session id");
                }
                id
            }
        };
        let user_data = match storage.get(USER_DATA_KEY) {
            Some(text) => UserData::from_json_str(&text).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable user data");
                UserData::new()
            }),
            None => UserData::new(),
        };
        tracing::debug!(session_id = %session_id, keys = user_data.len(), "chat client ready");
        Self {
            endpoint,
            storage,
            view: Mutex::new(view),
            markup: MarkupPipeline::default(),
            config,
            session_id,
            state: Mutex::new(SessionState {
                user_data,
                options: Vec::new(),
            }),
            input: Mutex::new(String::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Replace the Markdown renderer and sanitizer.
    pub fn with_markup(mut self, markup: MarkupPipeline) -> Self {
        self.markup = markup;
        self
    }

    /// The session identifier sent with every request.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// A copy of the accumulated user data.
    pub fn user_data(&self) -> UserData {
        self.state().user_data.clone()
    }

    /// The quick-reply options currently offered.
    pub fn options(&self) -> Vec<String> {
        self.state().options.clone()
    }

    /// True while a turn is awaiting the endpoint.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The endpoint turns are sent to.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// The store session state is kept in.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Exclusive access to the view.  Do not hold across an await.
    pub fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send the configured greeting.
    pub async fn start(&self) -> SendOutcome {
        let greeting = self.config.greeting.clone();
        self.send_message(&greeting).await
    }

    /// Send one chat turn.
    ///
    /// Blank text, or a call made while another turn is in flight, is
    /// ignored.  Otherwise the user's message is displayed, the endpoint is
    /// called once, and either its reply or the error message is displayed.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            CHAT_SENDS_IGNORED.click();
            tracing::debug!("ignoring blank message");
            return SendOutcome::Ignored;
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            CHAT_SENDS_IGNORED.click();
            tracing::debug!("ignoring message while a turn is in flight");
            return SendOutcome::Ignored;
        }
        let _busy = BusyGuard(&self.busy);

        let body = self.markup.to_safe_html(text);
        {
            let mut view = self.view();
            view.append_message(&Message::user(body));
            view.clear_input();
        }
        self.input().clear();
        self.view().show_typing();

        let request = ChatRequest::new(text, self.session_id.as_str(), self.user_data());
        CHAT_TURNS.click();
        let started = Instant::now();
        let result = self.endpoint.send_turn(&request).await;
        CHAT_TURN_DURATION.add(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                self.apply_response(response);
                SendOutcome::Delivered
            }
            Err(err) => {
                CHAT_TURN_FAILURES.click();
                tracing::error!(error = %err, session_id = %self.session_id, "chat turn failed");
                let message = Message::bot(self.markup.to_safe_html(&self.config.error_message));
                let mut view = self.view();
                view.hide_typing();
                view.append_message(&message);
                SendOutcome::Failed
            }
        }
    }

    /// Upload a photo for this session.
    ///
    /// Does not consult the busy flag, so it may overlap a turn.
    pub async fn upload_photo(&self, photo: PhotoUpload) -> UploadOutcome {
        PHOTO_UPLOADS.click();
        if let Err(err) =
            photo.validate(&self.config.allowed_extensions, self.config.max_upload_bytes)
        {
            return self.upload_failed(err);
        }
        match self.endpoint.upload_photo(&self.session_id, &photo).await {
            Ok(UploadResponse {
                photo_url: Some(photo_url),
            }) => {
                tracing::debug!(photo_url = %photo_url, "photo stored");
                {
                    let mut state = self.state();
                    state.user_data.insert(PHOTO_URL_KEY, photo_url);
                    self.persist_user_data(&state.user_data);
                }
                let message =
                    Message::bot(self.markup.to_safe_html(&self.config.upload_succeeded_message));
                self.view().append_message(&message);
                UploadOutcome::Stored
            }
            Ok(UploadResponse { photo_url: None }) => {
                tracing::debug!("upload accepted without a photo url");
                UploadOutcome::NoPhoto
            }
            Err(err) => self.upload_failed(err),
        }
    }

    /// Replace the contents of the text input.
    pub fn set_input(&self, text: impl Into<String>) {
        *self.input() = text.into();
    }

    /// The contents of the text input.
    pub fn input_text(&self) -> String {
        self.input().clone()
    }

    /// The send button was pressed.
    pub async fn on_send_clicked(&self) -> SendOutcome {
        let text = self.input_text();
        self.send_message(&text).await
    }

    /// Enter was pressed in the text input.  With shift it starts a new line
    /// instead of sending.
    pub async fn on_enter_pressed(&self, shift: bool) -> SendOutcome {
        if shift {
            self.input().push('\n');
            return SendOutcome::Ignored;
        }
        self.on_send_clicked().await
    }

    /// The option at `index` was chosen.  The options are cleared before its
    /// label is sent.
    pub async fn on_option_selected(&self, index: usize) -> SendOutcome {
        let label = {
            let mut state = self.state();
            match state.options.get(index).cloned() {
                Some(label) => {
                    state.options.clear();
                    label
                }
                None => {
                    tracing::debug!(index, "no option at index");
                    return SendOutcome::Ignored;
                }
            }
        };
        self.view().clear_options();
        self.send_message(&label).await
    }

    /// A file was picked.  `None` means the picker was dismissed.
    pub async fn on_file_selected(&self, photo: Option<PhotoUpload>) -> Option<UploadOutcome> {
        match photo {
            Some(photo) => Some(self.upload_photo(photo).await),
            None => None,
        }
    }

    fn apply_response(&self, response: ChatResponse) {
        if let Some(fragment) = &response.user_data {
            let mut state = self.state();
            state.user_data.merge(fragment);
            self.persist_user_data(&state.user_data);
        }
        self.state().options = response.options.clone();

        let message = Message::bot(self.markup.to_safe_html(response.response_text()));
        let mut view = self.view();
        if let Some(progress) = response.progress() {
            view.set_progress(progress);
        }
        view.hide_typing();
        view.append_message(&message);
        view.show_options(&response.options);
        if response.completed {
            match response.resume_url.as_deref() {
                Some(url) if !url.trim().is_empty() && is_safe_url(url) => {
                    view.show_completion(&CompletionLink::download(url));
                }
                Some(url) => tracing::warn!(url, "not linking unsafe resume url"),
                None => tracing::debug!("conversation completed without a resume url"),
            }
        }
    }

    fn upload_failed(&self, err: Error) -> UploadOutcome {
        PHOTO_UPLOAD_FAILURES.click();
        tracing::error!(error = %err, session_id = %self.session_id, "photo upload failed");
        let message = Message::bot(self.markup.to_safe_html(&self.config.upload_failed_message));
        self.view().append_message(&message);
        UploadOutcome::Failed
    }

    fn persist_user_data(&self, user_data: &UserData) {
        let result = user_data
            .to_json_string()
            .and_then(|json| self.storage.set(USER_DATA_KEY, &json));
        if let Err(err) = result {
            STORAGE_WRITE_FAILURES.click();
            tracing::warn!(error = %err, "failed to persist user data");
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn input(&self) -> MutexGuard<'_, String> {
        self.input.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Current Unix time in milliseconds, in decimal.
fn new_session_id() -> String {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use pulldown_cmark::Options;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::Result;
    use crate::markup::{AllowlistSanitizer, CommonMarkRenderer};
    use crate::render::{MemoryView, ViewEvent};
    use crate::storage::MemoryStorage;
    use crate::types::{Progress, Sender};

    const SORRY: &str = "Sorry, something went wrong. Please try again.";

    #[derive(Default)]
    struct ScriptedEndpoint {
        turns: Mutex<VecDeque<Result<ChatResponse>>>,
        uploads: Mutex<VecDeque<Result<UploadResponse>>>,
        requests: Mutex<Vec<ChatRequest>>,
        uploaded: Mutex<Vec<(String, String)>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedEndpoint {
        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn reply(self, response: Result<ChatResponse>) -> Self {
            self.turns.lock().unwrap().push_back(response);
            self
        }

        fn upload_reply(self, response: Result<UploadResponse>) -> Self {
            self.uploads.lock().unwrap().push_back(response);
            self
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn uploaded(&self) -> Vec<(String, String)> {
            self.uploaded.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatEndpoint for ScriptedEndpoint {
        async fn send_turn(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self.turns.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(ChatResponse::default()))
        }

        async fn upload_photo(
            &self,
            session_id: &str,
            photo: &PhotoUpload,
        ) -> Result<UploadResponse> {
            self.uploaded
                .lock()
                .unwrap()
                .push((session_id.to_string(), photo.file_name.clone()));
            let next = self.uploads.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(UploadResponse::default()))
        }
    }

    type TestClient = ChatClient<ScriptedEndpoint, Arc<MemoryStorage>, MemoryView>;

    fn client_with(endpoint: ScriptedEndpoint, storage: Arc<MemoryStorage>) -> TestClient {
        ChatClient::new(endpoint, storage, MemoryView::new(), ClientConfig::new())
    }

    fn client(endpoint: ScriptedEndpoint) -> TestClient {
        client_with(endpoint, Arc::new(MemoryStorage::new()))
    }

    fn user_data(json: &str) -> UserData {
        UserData::from_json_str(json).unwrap()
    }

    #[tokio::test]
    async fn greeting_turn_shows_reply_options_and_progress() {
        let endpoint = ScriptedEndpoint::default().reply(Ok(ChatResponse::text("Hello!")
            .with_options(["A", "B"])
            .with_progress(40.0)));
        let client = client(endpoint);

        assert_eq!(client.start().await, SendOutcome::Delivered);

        let view = client.view();
        assert_eq!(view.texts_from(Sender::User), vec!["Hi"]);
        assert_eq!(view.texts_from(Sender::Bot), vec!["Hello!"]);
        assert_eq!(view.options, vec!["A", "B"]);
        assert_eq!(view.progress, Some(Progress::new(40.0)));
        assert_eq!(view.aria_valuenow, Some(40.0));
        assert!(!view.typing);
        drop(view);

        assert_eq!(client.options(), vec!["A", "B"]);
        assert!(!client.is_busy());
        let requests = client.endpoint().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "Hi");
        assert_eq!(requests[0].session_id, client.session_id());
    }

    #[tokio::test]
    async fn turn_side_effects_happen_in_order() {
        let endpoint = ScriptedEndpoint::default().reply(Ok(ChatResponse::text("Done")
            .with_progress(100.0)
            .completed(Some("/files/x.pdf".to_string()))));
        let client = client(endpoint);

        assert_eq!(client.send_message("  finish  ").await, SendOutcome::Delivered);

        let view = client.view();
        assert_eq!(
            view.events,
            vec![
                ViewEvent::Message(Sender::User, "finish".to_string()),
                ViewEvent::InputCleared,
                ViewEvent::TypingShown,
                ViewEvent::Progress(Progress::new(100.0)),
                ViewEvent::TypingHidden,
                ViewEvent::Message(Sender::Bot, "Done".to_string()),
                ViewEvent::Options(vec![]),
                ViewEvent::Completion("/files/x.pdf".to_string()),
            ]
        );
        assert_eq!(view.completions.len(), 1);
        assert_eq!(view.completions[0].label, "Download Resume");
    }

    #[tokio::test]
    async fn unsafe_resume_url_is_not_linked() {
        let endpoint = ScriptedEndpoint::default()
            .reply(Ok(ChatResponse::text("Done")
                .completed(Some("javascript:alert(1)".to_string()))))
            .reply(Ok(ChatResponse::text("Done").completed(None)));
        let client = client(endpoint);

        client.send_message("one").await;
        client.send_message("two").await;

        assert!(client.view().completions.is_empty());
    }

    #[tokio::test]
    async fn upload_overlaps_a_turn_in_flight() {
        let gate = Arc::new(Notify::new());
        let endpoint = ScriptedEndpoint::gated(Arc::clone(&gate))
            .reply(Ok(ChatResponse::text("Thanks").with_user_data(user_data(r#"{"age":30}"#))))
            .upload_reply(Ok(UploadResponse {
                photo_url: Some("/p.png".to_string()),
            }));
        let storage = Arc::new(MemoryStorage::new());
        let client = client_with(endpoint, Arc::clone(&storage));

        let turn = client.send_message("30");
        let upload = async {
            while !client.is_busy() {
                tokio::task::yield_now().await;
            }
            let outcome = client
                .upload_photo(PhotoUpload::new("me.png", vec![1u8, 2, 3]))
                .await;
            assert!(client.is_busy());
            gate.notify_one();
            outcome
        };
        let (sent, uploaded) = tokio::join!(turn, upload);

        assert_eq!(sent, SendOutcome::Delivered);
        assert_eq!(uploaded, UploadOutcome::Stored);
        let expected = user_data(r#"{"photo_url":"/p.png","age":30}"#);
        assert_eq!(client.user_data(), expected);
        let stored = storage.get(USER_DATA_KEY).unwrap();
        assert_eq!(UserData::from_json_str(&stored).unwrap(), expected);
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn custom_markup_pipeline_is_used() {
        let endpoint = ScriptedEndpoint::default().reply(Ok(ChatResponse::text("~~old~~ new")));
        let client = client(endpoint).with_markup(MarkupPipeline::new(
            CommonMarkRenderer::with_options(Options::empty()),
            AllowlistSanitizer::default(),
        ));

        client.send_message("hi").await;

        let view = client.view();
        let body = view.last_message().unwrap().body.as_str();
        assert!(!body.contains("<del>"));
        assert!(body.contains("~~old~~ new"));
    }

    #[tokio::test]
    async fn blank_text_is_ignored_without_a_request() {
        let client = client(ScriptedEndpoint::default());

        assert_eq!(client.send_message("").await, SendOutcome::Ignored);
        assert_eq!(client.send_message(" \n\t ").await, SendOutcome::Ignored);

        assert!(client.endpoint().requests().is_empty());
        assert!(client.view().events.is_empty());
    }

    #[tokio::test]
    async fn second_send_while_busy_is_ignored() {
        let gate = Arc::new(Notify::new());
        let endpoint =
            ScriptedEndpoint::gated(Arc::clone(&gate)).reply(Ok(ChatResponse::text("Hello!")));
        let client = client(endpoint);

        let first = client.send_message("one");
        let second = async {
            while !client.is_busy() {
                tokio::task::yield_now().await;
            }
            let outcome = client.send_message("two").await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, SendOutcome::Delivered);
        assert_eq!(second, SendOutcome::Ignored);
        assert_eq!(client.endpoint().requests().len(), 1);
        assert_eq!(client.view().texts_from(Sender::User), vec!["one"]);
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn failure_shows_fixed_message_and_clears_busy() {
        let endpoint = ScriptedEndpoint::default()
            .reply(Err(Error::api(500, "database exploded")))
            .reply(Ok(ChatResponse::text("Recovered")));
        let client = client(endpoint);

        assert_eq!(client.send_message("one").await, SendOutcome::Failed);
        assert!(!client.is_busy());
        {
            let view = client.view();
            assert_eq!(view.texts_from(Sender::Bot), vec![SORRY]);
            assert!(!view.typing);
            assert!(
                !view
                    .messages
                    .iter()
                    .any(|m| m.plain_text().contains("database"))
            );
        }

        assert_eq!(client.send_message("two").await, SendOutcome::Delivered);
        assert_eq!(
            client.view().texts_from(Sender::Bot),
            vec![SORRY, "Recovered"]
        );
    }

    #[tokio::test]
    async fn user_data_merges_and_persists() {
        let storage = Arc::new(MemoryStorage::with_entries([(
            USER_DATA_KEY,
            r#"{"name":"Ann"}"#,
        )]));
        let endpoint = ScriptedEndpoint::default()
            .reply(Ok(ChatResponse::text("Thanks").with_user_data(user_data(r#"{"age":30}"#))));
        let client = client_with(endpoint, Arc::clone(&storage));

        client.send_message("30").await;

        assert_eq!(client.user_data(), user_data(r#"{"name":"Ann","age":30}"#));
        let stored = storage.get(USER_DATA_KEY).unwrap();
        assert_eq!(
            UserData::from_json_str(&stored).unwrap(),
            user_data(r#"{"name":"Ann","age":30}"#)
        );
        assert_eq!(
            client.endpoint().requests()[0].user_data,
            user_data(r#"{"name":"Ann"}"#)
        );
    }

    #[tokio::test]
    async fn script_in_reply_is_inert() {
        let endpoint = ScriptedEndpoint::default()
            .reply(Ok(ChatResponse::text("<script>alert(1)</script>")));
        let client = client(endpoint);

        client.send_message("hi").await;

        let view = client.view();
        let bot = view.last_message().unwrap();
        assert_eq!(bot.sender, Sender::Bot);
        assert!(!bot.body.as_str().contains("<script"));
        assert!(bot.body.as_str().contains("&lt;script"));
    }

    #[tokio::test]
    async fn markdown_reply_is_rendered() {
        let endpoint = ScriptedEndpoint::default().reply(Ok(ChatResponse::text("**bold**")));
        let client = client(endpoint);

        client.send_message("hi").await;

        let view = client.view();
        let bot = view.last_message().unwrap();
        assert!(bot.body.as_str().contains("<strong>bold</strong>"));
    }

    #[tokio::test]
    async fn missing_response_text_renders_empty_message() {
        let client = client(ScriptedEndpoint::default().reply(Ok(ChatResponse::default())));

        assert_eq!(client.send_message("hi").await, SendOutcome::Delivered);

        assert_eq!(client.view().texts_from(Sender::Bot), vec![String::new()]);
    }

    #[tokio::test]
    async fn zero_progress_is_applied() {
        let endpoint =
            ScriptedEndpoint::default().reply(Ok(ChatResponse::text("Start").with_progress(0.0)));
        let client = client(endpoint);

        client.send_message("hi").await;

        assert_eq!(client.view().progress, Some(Progress::new(0.0)));
    }

    #[tokio::test]
    async fn selecting_an_option_clears_options_then_sends_label() {
        let endpoint = ScriptedEndpoint::default()
            .reply(Ok(ChatResponse::text("Pick one").with_options(["A", "B"])))
            .reply(Ok(ChatResponse::text("You picked B")));
        let client = client(endpoint);

        client.send_message("hi").await;
        assert_eq!(client.on_option_selected(5).await, SendOutcome::Ignored);
        assert_eq!(client.on_option_selected(1).await, SendOutcome::Delivered);

        assert_eq!(client.endpoint().requests()[1].message, "B");
        assert!(client.options().is_empty());
        let view = client.view();
        let cleared = view
            .events
            .iter()
            .position(|e| *e == ViewEvent::Options(vec![]))
            .unwrap();
        let sent = view
            .events
            .iter()
            .position(|e| *e == ViewEvent::Message(Sender::User, "B".to_string()))
            .unwrap();
        assert!(cleared < sent);
    }

    #[tokio::test]
    async fn input_methods_drive_sends() {
        let client = client(ScriptedEndpoint::default());

        client.set_input("hello");
        assert_eq!(client.on_enter_pressed(true).await, SendOutcome::Ignored);
        assert_eq!(client.input_text(), "hello\n");
        assert!(client.endpoint().requests().is_empty());

        assert_eq!(client.on_enter_pressed(false).await, SendOutcome::Delivered);
        assert_eq!(client.input_text(), "");
        assert_eq!(client.endpoint().requests()[0].message, "hello");

        client.set_input("again");
        assert_eq!(client.on_send_clicked().await, SendOutcome::Delivered);
        assert_eq!(client.endpoint().requests()[1].message, "again");
    }

    #[tokio::test]
    async fn session_survives_a_new_client() {
        let storage = Arc::new(MemoryStorage::new());
        let first = client_with(
            ScriptedEndpoint::default()
                .reply(Ok(ChatResponse::text("ok").with_user_data(user_data(r#"{"name":"Ann"}"#)))),
            Arc::clone(&storage),
        );
        first.send_message("Ann").await;
        let session_id = first.session_id().to_string();
        assert!(session_id.parse::<u64>().is_ok());
        drop(first);

        let second = client_with(ScriptedEndpoint::default(), Arc::clone(&storage));
        assert_eq!(second.session_id(), session_id);
        assert_eq!(second.user_data(), user_data(r#"{"name":"Ann"}"#));

        second.send_message("again").await;
        assert_eq!(second.endpoint().requests()[0].session_id, session_id);
    }

    #[test]
    fn stored_session_id_is_reused_and_bad_user_data_discarded() {
        let storage = Arc::new(MemoryStorage::with_entries([
            (SESSION_ID_KEY, "abc"),
            (USER_DATA_KEY, "not json"),
        ]));
        let client = client_with(ScriptedEndpoint::default(), storage);
        assert_eq!(client.session_id(), "abc");
        assert!(client.user_data().is_empty());
    }

    #[tokio::test]
    async fn upload_stores_photo_url() {
        let storage = Arc::new(MemoryStorage::new());
        let endpoint = ScriptedEndpoint::default().upload_reply(Ok(UploadResponse {
            photo_url: Some("/uploads/me.png".to_string()),
        }));
        let client = client_with(endpoint, Arc::clone(&storage));

        let outcome = client
            .on_file_selected(Some(PhotoUpload::new("me.png", vec![1u8, 2, 3])))
            .await;

        assert_eq!(outcome, Some(UploadOutcome::Stored));
        assert_eq!(
            client.user_data().get(PHOTO_URL_KEY),
            Some(&serde_json::json!("/uploads/me.png"))
        );
        assert!(storage.get(USER_DATA_KEY).unwrap().contains("/uploads/me.png"));
        assert_eq!(
            client.view().texts_from(Sender::Bot),
            vec!["Photo uploaded successfully!"]
        );
        assert_eq!(
            client.endpoint().uploaded(),
            vec![(client.session_id().to_string(), "me.png".to_string())]
        );
    }

    #[tokio::test]
    async fn upload_without_photo_url_is_silent() {
        let client = client(ScriptedEndpoint::default());

        let outcome = client
            .upload_photo(PhotoUpload::new("me.jpg", vec![1u8]))
            .await;

        assert_eq!(outcome, UploadOutcome::NoPhoto);
        assert!(client.view().messages.is_empty());
        assert!(client.user_data().is_empty());
    }

    #[tokio::test]
    async fn upload_failures_show_fixed_message() {
        let endpoint = ScriptedEndpoint::default().upload_reply(Err(Error::api(400, "nope")));
        let client = client(endpoint);

        assert_eq!(
            client.upload_photo(PhotoUpload::new("me.gif", vec![1u8])).await,
            UploadOutcome::Failed
        );
        assert_eq!(
            client.upload_photo(PhotoUpload::new("resume.pdf", vec![1u8])).await,
            UploadOutcome::Failed
        );
        let too_big = vec![0u8; 5 * 1024 * 1024 + 1];
        assert_eq!(
            client.upload_photo(PhotoUpload::new("big.png", too_big)).await,
            UploadOutcome::Failed
        );

        assert_eq!(client.endpoint().uploaded().len(), 1);
        assert_eq!(
            client.view().texts_from(Sender::Bot),
            vec!["Failed to upload photo. Please try again."; 3]
        );
        assert_eq!(client.on_file_selected(None).await, None);
    }
}
