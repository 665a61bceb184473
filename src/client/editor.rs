//! Post editor: edit buffer, autosave, markdown toolbar and publish flow.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    models::posts::{CreatePostDto, PostDetail, PostStatus, UpdatePostDto},
    utils::{
        markdown::{text_stats, TextStats},
        slug::slugify,
    },
};

use super::{local_store::LocalStore, visible, BlogApi, ClientError, ClientResult, Notice};

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);
pub const ADMIN_PATH: &str = "/admin";

/// Local cache key for the draft of `post_id`, or of a post not created yet.
pub fn draft_key(post_id: Option<Uuid>) -> String {
    match post_id {
        Some(id) => format!("draft_{id}"),
        None => "draft_new".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saving,
    Unsaved,
    Saved,
}

/// Snapshot handed out by [`PostEditor::begin_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    seq: u64,
    pub content: String,
    pub post_id: Option<Uuid>,
}

impl SaveTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug)]
pub struct PostEditor {
    content: String,
    last_saved: String,
    post_id: Option<Uuid>,
    in_flight: usize,
    issued_seq: u64,
    applied_seq: u64,
    notice: Option<Notice>,
}

impl PostEditor {
    pub fn new(post_id: Option<Uuid>, server_content: impl Into<String>) -> Self {
        let content = server_content.into();
        Self {
            last_saved: content.clone(),
            content,
            post_id,
            in_flight: 0,
            issued_seq: 0,
            applied_seq: 0,
            notice: None,
        }
    }

    /// Like [`PostEditor::new`], but picks up a locally cached draft that differs from
    /// the server copy. The restored text counts as unsaved.
    pub fn open(
        post_id: Option<Uuid>,
        server_content: impl Into<String>,
        store: &dyn LocalStore,
    ) -> Self {
        let mut editor = Self::new(post_id, server_content);
        if let Some(draft) = store.get(&draft_key(post_id)) {
            if draft != editor.content {
                debug!(?post_id, "restored local draft");
                editor.content = draft;
            }
        }
        editor
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn post_id(&self) -> Option<Uuid> {
        self.post_id
    }

    pub fn is_dirty(&self) -> bool {
        self.content != self.last_saved
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight > 0
    }

    pub fn status(&self) -> SaveStatus {
        if self.is_saving() {
            SaveStatus::Saving
        } else if self.is_dirty() {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        }
    }

    pub fn stats(&self) -> TextStats {
        text_stats(&self.content)
    }

    pub fn notice(&self) -> Option<&Notice> {
        visible(&self.notice)
    }

    /// `None` when there is nothing new to save. An empty buffer is never saved, so
    /// clearing the editor cannot overwrite the stored draft.
    pub fn begin_save(&mut self) -> Option<SaveTicket> {
        if self.content.is_empty() || !self.is_dirty() {
            return None;
        }
        self.issued_seq += 1;
        self.in_flight += 1;

        Some(SaveTicket {
            seq: self.issued_seq,
            content: self.content.clone(),
            post_id: self.post_id,
        })
    }

    /// Records the result of a save. A success older than one already applied is
    /// ignored; a failure keeps the buffer dirty. Returns whether `last_saved` moved.
    pub fn finish_save(&mut self, ticket: SaveTicket, outcome: ClientResult<()>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome {
            Ok(()) if ticket.seq > self.applied_seq => {
                self.applied_seq = ticket.seq;
                self.last_saved = ticket.content;
                self.notice = Some(Notice::success("Draft saved"));
                true
            }
            Ok(()) => false,
            Err(err) => {
                self.notice = Some(Notice::error(format!("Failed to save draft: {err}")));
                false
            }
        }
    }

    /// Called once the post was created or updated as a whole.
    pub fn mark_persisted(&mut self, post_id: Uuid, content: &str) {
        self.post_id = Some(post_id);
        self.last_saved = content.to_string();
        self.applied_seq = self.issued_seq;
    }

    pub fn apply_format(&mut self, action: FormatAction, selection: Selection) -> Selection {
        let (content, selection) = format_text(&self.content, action, selection);
        self.content = content;
        selection
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatAction {
    Bold,
    Italic,
    Code,
    Link,
    Image,
    Heading,
    Quote,
    BulletList,
    NumberedList,
}

enum Markup {
    Wrap(&'static str, &'static str),
    LinePrefix(&'static str),
}

impl FormatAction {
    fn markup(self) -> Markup {
        match self {
            Self::Bold => Markup::Wrap("**", "**"),
            Self::Italic => Markup::Wrap("*", "*"),
            Self::Code => Markup::Wrap("`", "`"),
            Self::Link => Markup::Wrap("[", "](url)"),
            Self::Image => Markup::Wrap("![", "](url)"),
            Self::Heading => Markup::LinePrefix("## "),
            Self::Quote => Markup::LinePrefix("> "),
            Self::BulletList => Markup::LinePrefix("- "),
            Self::NumberedList => Markup::LinePrefix("1. "),
        }
    }
}

/// Character offsets into the buffer; `start == end` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(i, _)| i)
}

/// Inserts the markup of `action` around (or at the line start of) `selection` and
/// returns the new text with the selection moved onto the originally selected text.
pub fn format_text(text: &str, action: FormatAction, selection: Selection) -> (String, Selection) {
    let len = text.chars().count();
    let selection = Selection::new(selection.start.min(len), selection.end.min(len));
    let start = byte_index(text, selection.start);
    let end = byte_index(text, selection.end);

    let (insertions, shift): (Vec<(usize, &str)>, usize) = match action.markup() {
        Markup::Wrap(before, after) => (
            vec![(start, before), (end, after)],
            before.chars().count(),
        ),
        Markup::LinePrefix(prefix) => {
            let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
            (vec![(line_start, prefix)], prefix.chars().count())
        }
    };

    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = 0;
    for (at, token) in insertions {
        out.push_str(&text[cursor..at]);
        out.push_str(token);
        cursor = at;
    }
    out.push_str(&text[cursor..]);

    (
        out,
        Selection::new(selection.start + shift, selection.end + shift),
    )
}

/// Title, slug and metadata fields of the new/edit post form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostForm {
    title: String,
    slug: String,
    slug_edited: bool,
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub cover_image: Option<String>,
    pub tag_ids: Vec<Uuid>,
}

impl PostForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form for an existing post; its slug is kept when the title changes.
    pub fn from_post(detail: &PostDetail) -> Self {
        Self {
            title: detail.post.title.clone(),
            slug: detail.post.slug.clone(),
            slug_edited: !detail.post.slug.is_empty(),
            excerpt: detail.post.excerpt.clone().unwrap_or_default(),
            category_id: detail.post.category_id,
            cover_image: detail.post.cover_image.clone(),
            tag_ids: detail.tags.iter().map(|t| t.id).collect(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        if !self.slug_edited {
            self.slug = slugify(&self.title);
        }
    }

    /// A hand-typed slug sticks until it is cleared again.
    pub fn set_slug(&mut self, slug: impl Into<String>) {
        self.slug = slug.into();
        self.slug_edited = !self.slug.trim().is_empty();
        if !self.slug_edited {
            self.slug = slugify(&self.title);
        }
    }

    pub fn validate_title(&self) -> ClientResult<()> {
        if self.title.trim().is_empty() {
            return Err(ClientError::Validation("Title is required".to_string()));
        }
        Ok(())
    }

    pub fn validate_for_publish(&self, content: &str) -> ClientResult<()> {
        self.validate_title()?;
        if content.trim().is_empty() {
            return Err(ClientError::Validation("Content is required".to_string()));
        }
        Ok(())
    }

    fn non_empty(value: &str) -> Option<String> {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn to_create(&self, content: &str, status: PostStatus) -> CreatePostDto {
        CreatePostDto {
            title: self.title.trim().to_string(),
            slug: Self::non_empty(&self.slug),
            content: content.to_string(),
            excerpt: Self::non_empty(&self.excerpt),
            cover_image: self.cover_image.clone(),
            status,
            category_id: self.category_id,
            tag_ids: self.tag_ids.clone(),
        }
    }

    pub fn to_update(&self, content: &str, status: PostStatus) -> UpdatePostDto {
        UpdatePostDto {
            title: Some(self.title.trim().to_string()),
            slug: Self::non_empty(&self.slug),
            content: Some(content.to_string()),
            excerpt: Some(Self::non_empty(&self.excerpt)),
            cover_image: Some(self.cover_image.clone()),
            status: Some(status),
            category_id: Some(self.category_id),
            tag_ids: Some(self.tag_ids.clone()),
        }
    }
}

fn storage_error(err: std::io::Error) -> ClientError {
    ClientError::Storage(err.to_string())
}

/// Periodically persists the editor buffer: always to the local cache, and to the
/// server once the post exists there. Saves never overlap.
pub struct Autosaver {
    editor: Arc<Mutex<PostEditor>>,
    api: Arc<dyn BlogApi>,
    store: Arc<dyn LocalStore>,
    save_lock: Mutex<()>,
}

impl Autosaver {
    pub fn new(
        editor: Arc<Mutex<PostEditor>>,
        api: Arc<dyn BlogApi>,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            editor,
            api,
            store,
            save_lock: Mutex::new(()),
        }
    }

    pub fn editor(&self) -> &Arc<Mutex<PostEditor>> {
        &self.editor
    }

    /// Saves the buffer if it changed. `None` means there was nothing to save.
    pub async fn save_now(&self) -> Option<ClientResult<()>> {
        let _serialized = self.save_lock.lock().await;

        let ticket = self.editor.lock().await.begin_save()?;
        let outcome = self.write(&ticket).await;
        self.editor
            .lock()
            .await
            .finish_save(ticket, outcome.clone());

        Some(outcome)
    }

    async fn write(&self, ticket: &SaveTicket) -> ClientResult<()> {
        self.store
            .set(&draft_key(ticket.post_id), &ticket.content)
            .map_err(storage_error)?;

        if let Some(post_id) = ticket.post_id {
            self.api
                .update_post(post_id, &UpdatePostDto::content_only(ticket.content.clone()))
                .await?;
        }
        Ok(())
    }

    /// Runs [`Autosaver::save_now`] every `every`, first after one full period.
    /// Failures are reported on the editor and retried on the next tick only.
    pub fn spawn(self: Arc<Self>, every: Duration) -> AutosaveHandle {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Some(Err(err)) = self.save_now().await {
                    warn!(%err, "autosave failed");
                }
            }
        });
        AutosaveHandle { task }
    }
}

/// Stops the autosave loop when dropped.
pub struct AutosaveHandle {
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn stop(self) {}
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub post: PostDetail,
    pub redirect_to: &'static str,
}

/// Create-or-update of the whole post from the form and the editor buffer.
pub struct Publisher {
    api: Arc<dyn BlogApi>,
    store: Arc<dyn LocalStore>,
}

impl Publisher {
    pub fn new(api: Arc<dyn BlogApi>, store: Arc<dyn LocalStore>) -> Self {
        Self { api, store }
    }

    pub async fn publish(
        &self,
        form: &PostForm,
        editor: &Mutex<PostEditor>,
    ) -> ClientResult<PublishOutcome> {
        self.submit(form, editor, PostStatus::Published).await
    }

    pub async fn save_draft(
        &self,
        form: &PostForm,
        editor: &Mutex<PostEditor>,
    ) -> ClientResult<PublishOutcome> {
        self.submit(form, editor, PostStatus::Draft).await
    }

    async fn submit(
        &self,
        form: &PostForm,
        editor: &Mutex<PostEditor>,
        status: PostStatus,
    ) -> ClientResult<PublishOutcome> {
        let (post_id, content) = {
            let editor = editor.lock().await;
            (editor.post_id(), editor.content().to_string())
        };

        match status {
            PostStatus::Published => form.validate_for_publish(&content)?,
            PostStatus::Draft => form.validate_title()?,
        }

        let post = match post_id {
            Some(id) => {
                self.api
                    .update_post(id, &form.to_update(&content, status))
                    .await?
            }
            None => self.api.create_post(&form.to_create(&content, status)).await?,
        };

        editor.lock().await.mark_persisted(post.post.id, &content);
        self.store
            .remove(&draft_key(post_id))
            .map_err(storage_error)?;

        Ok(PublishOutcome {
            post,
            redirect_to: ADMIN_PATH,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::local_store::MemoryLocalStore;

    #[test]
    fn dirty_tracks_difference_from_last_save() {
        let mut editor = PostEditor::new(None, "hello");
        assert!(!editor.is_dirty());
        assert_eq!(editor.status(), SaveStatus::Saved);

        editor.set_content("hello world");
        assert!(editor.is_dirty());
        assert_eq!(editor.status(), SaveStatus::Unsaved);

        editor.set_content("hello");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn stats_count_words_chars_and_minutes() {
        let mut editor = PostEditor::new(None, "");
        assert_eq!(editor.stats(), TextStats::default());

        editor.set_content("héllo  wörld\n\nthird");
        let stats = editor.stats();
        assert_eq!(stats.words, 3);
        assert_eq!(stats.chars, 19);
        assert_eq!(stats.reading_minutes, 1);

        editor.set_content("word ".repeat(201));
        assert_eq!(editor.stats().reading_minutes, 2);
    }

    #[test]
    fn open_restores_differing_local_draft() {
        let store = MemoryLocalStore::new();
        let id = Uuid::new_v4();
        store.set(&draft_key(Some(id)), "local copy").unwrap();

        let editor = PostEditor::open(Some(id), "server copy", &store);
        assert_eq!(editor.content(), "local copy");
        assert!(editor.is_dirty());

        let same = PostEditor::open(None, "server copy", &store);
        assert_eq!(same.content(), "server copy");
        assert!(!same.is_dirty());
    }

    #[test]
    fn begin_save_requires_changes() {
        let mut editor = PostEditor::new(None, "a");
        assert!(editor.begin_save().is_none());

        editor.set_content("ab");
        let first = editor.begin_save().unwrap();
        let second = editor.begin_save().unwrap();
        assert!(second.seq() > first.seq());
        assert!(editor.is_saving());
    }

    #[test]
    fn cleared_buffer_is_never_saved() {
        let mut editor = PostEditor::new(Some(Uuid::new_v4()), "server draft body");
        editor.set_content("");
        assert!(editor.is_dirty());
        assert!(editor.begin_save().is_none());
        assert!(!editor.is_saving());
    }

    #[test]
    fn failed_save_keeps_buffer_dirty_and_reports() {
        let mut editor = PostEditor::new(Some(Uuid::new_v4()), "a");
        editor.set_content("ab");
        let ticket = editor.begin_save().unwrap();

        let moved = editor.finish_save(ticket, Err(ClientError::Transport("down".into())));
        assert!(!moved);
        assert!(editor.is_dirty());
        assert_eq!(editor.content(), "ab");
        assert!(editor.notice().unwrap().message.contains("Failed to save draft"));
    }

    #[test]
    fn stale_save_completion_is_ignored() {
        let mut editor = PostEditor::new(None, "");
        editor.set_content("one");
        let older = editor.begin_save().unwrap();
        editor.set_content("two");
        let newer = editor.begin_save().unwrap();

        assert!(editor.finish_save(newer, Ok(())));
        assert!(!editor.finish_save(older, Ok(())));
        assert!(!editor.is_dirty());
        assert!(!editor.is_saving());
    }

    #[test]
    fn wraps_selection_and_keeps_it_selected() {
        let (text, sel) = format_text("make this bold", FormatAction::Bold, Selection::new(5, 9));
        assert_eq!(text, "make **this** bold");
        assert_eq!(sel, Selection::new(7, 11));
        assert_eq!(&text[7..11], "this");

        let (text, sel) = format_text("see docs", FormatAction::Link, Selection::new(4, 8));
        assert_eq!(text, "see [docs](url)");
        assert_eq!(sel, Selection::new(5, 9));
    }

    #[test]
    fn caret_insertion_and_unicode_offsets() {
        let (text, sel) = format_text("añb", FormatAction::Code, Selection::caret(2));
        assert_eq!(text, "añ``b");
        assert_eq!(sel, Selection::caret(3));

        let (text, _) = format_text("abc", FormatAction::Italic, Selection::new(10, 20));
        assert_eq!(text, "abc**");
    }

    #[test]
    fn line_prefix_goes_to_start_of_line() {
        let (text, sel) = format_text("intro\ntitle", FormatAction::Heading, Selection::new(8, 9));
        assert_eq!(text, "intro\n## title");
        assert_eq!(sel, Selection::new(11, 12));

        let (text, _) = format_text("item", FormatAction::BulletList, Selection::caret(0));
        assert_eq!(text, "- item");
    }

    #[test]
    fn slug_follows_title_until_edited() {
        let mut form = PostForm::new();
        form.set_title("Hello World");
        assert_eq!(form.slug(), "hello-world");

        form.set_slug("custom");
        form.set_title("Another Title");
        assert_eq!(form.slug(), "custom");

        form.set_slug("");
        assert_eq!(form.slug(), "another-title");
        form.set_title("Third");
        assert_eq!(form.slug(), "third");
    }

    #[test]
    fn publish_validation_needs_title_and_content() {
        let mut form = PostForm::new();
        assert!(matches!(
            form.validate_for_publish("body"),
            Err(ClientError::Validation(_))
        ));
        form.set_title("T");
        assert!(form.validate_for_publish("  ").is_err());
        assert!(form.validate_for_publish("body").is_ok());
    }
}
