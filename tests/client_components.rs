use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use inkpress::{
    client::{
        comments::{CommentForm, CommentList, MODERATION_NOTICE},
        delete_post::{DeletePostDialog, DeleteState},
        editor::{draft_key, Autosaver, PostEditor, PostForm, Publisher, SaveStatus, ADMIN_PATH},
        image_upload::ImageUpload,
        local_store::{LocalStore, MemoryLocalStore},
        search_box::{Key, SearchAction, SearchBox, SearchDriver, SearchHistory, SearchStatus},
        tag_manager::TagManager,
        BlogApi, ClientError, ClientResult, NoticeKind,
    },
    models::{
        comments::{Comment, CommentStatus, CommentWithAuthor, CreateCommentDto},
        posts::{AuthorRef, CreatePostDto, Post, PostDetail, PostSummary, SearchResponse, UpdatePostDto},
        tags::{CreateTagDto, Tag, TagWithCount},
        upload::{UploadKind, UploadResponse},
    },
    utils::slug::slugify,
};
use tokio::{sync::Mutex, time::sleep};
use uuid::Uuid;

/// Records every call and answers from in-memory fixtures.
#[derive(Default)]
struct FakeApi {
    calls: StdMutex<Vec<String>>,
    search_delays: StdMutex<HashMap<String, Duration>>,
    failing_updates: StdMutex<usize>,
    delete_error: StdMutex<Option<ClientError>>,
    search_error: StdMutex<Option<ClientError>>,
    tags: StdMutex<Vec<TagWithCount>>,
    comments: StdMutex<Vec<CommentWithAuthor>>,
}

impl FakeApi {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn delay_search(&self, query: &str, delay: Duration) {
        self.search_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
    }

    fn add_tag(&self, name: &str) -> Tag {
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            color: "#3B82F6".to_string(),
            created_at: Utc::now(),
        };
        self.tags.lock().unwrap().push(TagWithCount {
            tag: tag.clone(),
            post_count: 0,
        });
        tag
    }

    fn add_comment(&self, author_id: Uuid, content: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.comments.lock().unwrap().push(CommentWithAuthor {
            comment: Comment {
                id,
                content: content.to_string(),
                post_id: Uuid::nil(),
                author_id,
                parent_id: None,
                status: CommentStatus::Approved,
                created_at: Utc::now(),
            },
            author: Some(AuthorRef {
                name: "Reader".to_string(),
                avatar_url: None,
            }),
        });
        id
    }
}

fn summary(title: &str) -> PostSummary {
    PostSummary {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: slugify(title),
        excerpt: None,
        cover_image: None,
        created_at: Utc::now(),
        author: None,
        category: None,
    }
}

fn detail_from(id: Uuid, dto: &CreatePostDto) -> PostDetail {
    let now = Utc::now();
    PostDetail {
        post: Post {
            id,
            title: dto.title.clone(),
            slug: dto.slug.clone().unwrap_or_else(|| slugify(&dto.title)),
            content: dto.content.clone(),
            excerpt: dto.excerpt.clone(),
            cover_image: dto.cover_image.clone(),
            status: dto.status,
            author_id: Uuid::nil(),
            category_id: dto.category_id,
            view_count: 0,
            created_at: now,
            updated_at: now,
        },
        author: None,
        category: None,
        tags: Vec::new(),
    }
}

#[async_trait]
impl BlogApi for FakeApi {
    async fn search_posts(&self, query: &str) -> ClientResult<SearchResponse> {
        self.record(format!("search:{query}"));
        let delay = self.search_delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if let Some(err) = self.search_error.lock().unwrap().clone() {
            return Err(err);
        }
        let posts = vec![summary(query)];
        Ok(SearchResponse {
            count: posts.len(),
            query: query.to_string(),
            posts,
        })
    }

    async fn create_post(&self, post: &CreatePostDto) -> ClientResult<PostDetail> {
        self.record(format!("create_post:{}", post.title));
        Ok(detail_from(Uuid::new_v4(), post))
    }

    async fn update_post(&self, post_id: Uuid, update: &UpdatePostDto) -> ClientResult<PostDetail> {
        self.record(format!(
            "update_post:{}",
            update.content.as_deref().unwrap_or_default()
        ));
        {
            let mut failing = self.failing_updates.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(ClientError::Server("Internal Server Error".to_string()));
            }
        }
        let dto = CreatePostDto {
            title: update.title.clone().unwrap_or_default(),
            content: update.content.clone().unwrap_or_default(),
            status: update.status.unwrap_or_default(),
            ..Default::default()
        };
        Ok(detail_from(post_id, &dto))
    }

    async fn delete_post(&self, post_id: Uuid) -> ClientResult<()> {
        self.record(format!("delete_post:{post_id}"));
        match self.delete_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list_tags(&self) -> ClientResult<Vec<TagWithCount>> {
        self.record("list_tags");
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn create_tag(&self, tag: &CreateTagDto) -> ClientResult<Tag> {
        self.record(format!("create_tag:{}", tag.name));
        let slug = slugify(&tag.name);
        if self.tags.lock().unwrap().iter().any(|t| t.tag.slug == slug) {
            return Err(ClientError::Conflict("Tag already exists".to_string()));
        }
        Ok(self.add_tag(&tag.name))
    }

    async fn list_comments(&self, _slug: &str) -> ClientResult<Vec<CommentWithAuthor>> {
        self.record("list_comments");
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn create_comment(
        &self,
        _slug: &str,
        comment: &CreateCommentDto,
    ) -> ClientResult<CommentWithAuthor> {
        self.record("create_comment");
        Ok(CommentWithAuthor {
            comment: Comment {
                id: Uuid::new_v4(),
                content: comment.content.clone(),
                post_id: Uuid::nil(),
                author_id: Uuid::nil(),
                parent_id: comment.parent_id,
                status: CommentStatus::Pending,
                created_at: Utc::now(),
            },
            author: None,
        })
    }

    async fn delete_comment(&self, comment_id: Uuid) -> ClientResult<()> {
        self.record(format!("delete_comment:{comment_id}"));
        self.comments
            .lock()
            .unwrap()
            .retain(|c| c.comment.id != comment_id);
        Ok(())
    }

    async fn upload_image(&self, kind: UploadKind, bytes: &[u8]) -> ClientResult<UploadResponse> {
        self.record(format!("upload_image:{}:{}", kind.to_str(), bytes.len()));
        let filename = "1700000000000.gif".to_string();
        Ok(UploadResponse {
            success: true,
            url: format!("http://blog.test/api/uploads/user/{}/{filename}", kind.to_str()),
            filename,
            kind,
            size: bytes.len(),
        })
    }
}

fn search_driver(api: &Arc<FakeApi>) -> SearchDriver {
    SearchDriver::new(Arc::new(Mutex::new(SearchBox::new())), api.clone())
}

#[tokio::test(start_paused = true)]
async fn rapid_typing_sends_a_single_search() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryLocalStore::new());
    let history = Arc::new(SearchHistory::new(store));
    let driver = search_driver(&api).with_history(history.clone());

    let mut handles = Vec::new();
    for text in ["r", "ru", "rus", "rust"] {
        handles.extend(driver.on_input(text).await);
        sleep(Duration::from_millis(100)).await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(api.calls(), vec!["search:rust".to_string()]);
    let state = driver.state().lock().await;
    assert_eq!(state.status(), SearchStatus::Results(1));
    assert_eq!(state.results()[0].title, "rust");
    assert_eq!(history.entries()[0].query, "rust");
}

#[tokio::test(start_paused = true)]
async fn slow_stale_response_is_discarded() {
    let api = Arc::new(FakeApi::default());
    api.delay_search("ru", Duration::from_secs(1));
    let driver = search_driver(&api);

    let slow = driver.on_input("ru").await.unwrap();
    sleep(Duration::from_millis(400)).await;
    let fast = driver.on_input("rust").await.unwrap();

    fast.await.unwrap();
    slow.await.unwrap();

    assert_eq!(api.calls_starting_with("search:"), 2);
    let state = driver.state().lock().await;
    assert_eq!(state.results().len(), 1);
    assert_eq!(state.results()[0].title, "rust");
}

#[tokio::test(start_paused = true)]
async fn clearing_the_box_cancels_the_pending_search() {
    let api = Arc::new(FakeApi::default());
    let driver = search_driver(&api);

    let pending = driver.on_input("rust").await.unwrap();
    assert!(driver.on_input("   ").await.is_none());
    pending.await.unwrap();

    assert!(api.calls().is_empty());
    assert_eq!(driver.state().lock().await.status(), SearchStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn failed_search_reports_failure_not_empty_results() {
    let api = Arc::new(FakeApi::default());
    *api.search_error.lock().unwrap() = Some(ClientError::Server("boom".to_string()));
    let store = Arc::new(MemoryLocalStore::new());
    let history = Arc::new(SearchHistory::new(store));
    let driver = search_driver(&api).with_history(history.clone());

    driver.on_input("rust").await.unwrap().await.unwrap();

    assert_eq!(
        driver.state().lock().await.status(),
        SearchStatus::Failed("boom".to_string())
    );
    assert!(history.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn keyboard_selects_and_navigates_to_a_result() {
    let api = Arc::new(FakeApi::default());
    let driver = search_driver(&api);

    driver.on_input("hello world").await.unwrap().await.unwrap();

    assert_eq!(driver.on_key(Key::Down).await, SearchAction::None);
    assert_eq!(driver.state().lock().await.focused(), Some(0));
    assert_eq!(
        driver.on_key(Key::Enter).await,
        SearchAction::Navigate("/posts/hello-world".to_string())
    );

    let state = driver.state().lock().await;
    assert!(!state.is_open());
    assert!(state.query().is_empty());
}

fn autosaver(api: &Arc<FakeApi>, store: &Arc<MemoryLocalStore>, post_id: Uuid) -> Arc<Autosaver> {
    let mut editor = PostEditor::new(Some(post_id), "v1");
    editor.set_content("v2");
    Arc::new(Autosaver::new(
        Arc::new(Mutex::new(editor)),
        api.clone(),
        store.clone(),
    ))
}

#[tokio::test(start_paused = true)]
async fn autosave_persists_locally_and_remotely_every_period() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryLocalStore::new());
    let post_id = Uuid::new_v4();
    let saver = autosaver(&api, &store, post_id);

    let handle = saver.clone().spawn(Duration::from_secs(30));

    sleep(Duration::from_secs(29)).await;
    assert!(api.calls().is_empty());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(api.calls(), vec!["update_post:v2".to_string()]);
    assert_eq!(store.get(&draft_key(Some(post_id))).as_deref(), Some("v2"));
    {
        let editor = saver.editor().lock().await;
        assert_eq!(editor.status(), SaveStatus::Saved);
        assert_eq!(editor.notice().unwrap().kind, NoticeKind::Success);
    }

    sleep(Duration::from_secs(30)).await;
    assert_eq!(api.calls_starting_with("update_post"), 1);

    handle.stop();
    saver.editor().lock().await.set_content("v3");
    sleep(Duration::from_secs(60)).await;
    assert_eq!(api.calls_starting_with("update_post"), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_autosave_stays_dirty_and_retries_next_tick() {
    let api = Arc::new(FakeApi::default());
    *api.failing_updates.lock().unwrap() = 1;
    let store = Arc::new(MemoryLocalStore::new());
    let saver = autosaver(&api, &store, Uuid::new_v4());

    let _handle = saver.clone().spawn(Duration::from_secs(30));

    sleep(Duration::from_secs(31)).await;
    {
        let editor = saver.editor().lock().await;
        assert!(editor.is_dirty());
        let notice = editor.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.message.starts_with("Failed to save draft"));
    }

    sleep(Duration::from_secs(4)).await;
    assert!(saver.editor().lock().await.notice().is_none());

    sleep(Duration::from_secs(26)).await;
    assert_eq!(api.calls_starting_with("update_post"), 2);
    assert!(!saver.editor().lock().await.is_dirty());
}

#[tokio::test]
async fn cleared_buffer_is_not_autosaved() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryLocalStore::new());
    let post_id = Uuid::new_v4();
    let editor = Arc::new(Mutex::new(PostEditor::new(Some(post_id), "server draft body")));
    let saver = Autosaver::new(editor.clone(), api.clone(), store.clone());

    editor.lock().await.set_content("");
    assert!(saver.save_now().await.is_none());

    assert!(api.calls().is_empty());
    assert!(store.get(&draft_key(Some(post_id))).is_none());
    assert_eq!(editor.lock().await.status(), SaveStatus::Unsaved);
}

#[tokio::test]
async fn new_post_autosave_only_touches_the_local_store() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryLocalStore::new());
    let editor = Arc::new(Mutex::new(PostEditor::new(None, "")));
    let saver = Autosaver::new(editor.clone(), api.clone(), store.clone());

    assert!(saver.save_now().await.is_none());

    editor.lock().await.set_content("unsent");
    assert_eq!(saver.save_now().await, Some(Ok(())));
    assert!(api.calls().is_empty());
    assert_eq!(store.get(&draft_key(None)).as_deref(), Some("unsent"));

    let reopened = PostEditor::open(None, "", store.as_ref());
    assert_eq!(reopened.content(), "unsent");
    assert!(reopened.is_dirty());
}

#[tokio::test]
async fn publish_validates_then_clears_the_draft_and_redirects() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryLocalStore::new());
    store.set(&draft_key(None), "body").unwrap();
    let editor = Mutex::new(PostEditor::open(None, "", store.as_ref()));
    let publisher = Publisher::new(api.clone(), store.clone());

    let mut form = PostForm::new();
    let err = publisher.publish(&form, &editor).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(api.calls().is_empty());

    form.set_title("Hello World");
    assert_eq!(form.slug(), "hello-world");

    let outcome = publisher.publish(&form, &editor).await.unwrap();
    assert_eq!(api.calls(), vec!["create_post:Hello World".to_string()]);
    assert_eq!(outcome.redirect_to, ADMIN_PATH);
    assert_eq!(outcome.post.post.slug, "hello-world");
    assert!(store.get(&draft_key(None)).is_none());

    let editor = editor.lock().await;
    assert_eq!(editor.post_id(), Some(outcome.post.post.id));
    assert!(!editor.is_dirty());
}

#[tokio::test]
async fn publishing_empty_content_is_refused_locally() {
    let api = Arc::new(FakeApi::default());
    let store = Arc::new(MemoryLocalStore::new());
    let editor = Mutex::new(PostEditor::new(Some(Uuid::new_v4()), "   "));
    let publisher = Publisher::new(api.clone(), store);

    let mut form = PostForm::new();
    form.set_title("Title");
    assert_eq!(
        publisher.publish(&form, &editor).await,
        Err(ClientError::Validation("Content is required".to_string()))
    );

    publisher.save_draft(&form, &editor).await.unwrap();
    assert_eq!(api.calls(), vec!["update_post:   ".to_string()]);
}

#[tokio::test]
async fn creating_a_duplicate_tag_selects_the_existing_one() {
    let api = Arc::new(FakeApi::default());
    let rust = api.add_tag("Rust");
    let mut manager = TagManager::load(api.clone(), vec![rust.id, rust.id])
        .await
        .unwrap();
    assert_eq!(manager.selected(), [rust.id]);

    let go = api.add_tag("Go");
    manager.set_input("go");
    let picked = manager.create().await.unwrap();

    assert_eq!(picked.id, go.id);
    assert_eq!(manager.selected(), [rust.id, go.id]);
    assert!(manager.input().is_empty());
    assert_eq!(api.calls_starting_with("list_tags"), 2);

    manager.set_input("Zig");
    let zig = manager.create().await.unwrap();
    assert_eq!(zig.slug, "zig");
    assert_eq!(manager.selected().len(), 3);
    assert!(manager.suggestions().is_empty());
}

#[tokio::test]
async fn comment_list_shows_five_then_expands() {
    let api = Arc::new(FakeApi::default());
    let reader = Uuid::new_v4();
    for i in 0..7 {
        api.add_comment(reader, &format!("comment {i}"));
    }

    let mut list = CommentList::load(api.clone(), "post").await.unwrap();
    assert_eq!(list.visible().len(), 5);
    assert_eq!(list.hidden_count(), 2);

    list.show_all();
    assert_eq!(list.visible().len(), 7);
    assert_eq!(list.hidden_count(), 0);
}

#[tokio::test]
async fn comment_delete_is_refused_for_other_viewers() {
    let api = Arc::new(FakeApi::default());
    let author = Uuid::new_v4();
    let comment_id = api.add_comment(author, "mine");
    let mut list = CommentList::load(api.clone(), "post").await.unwrap();

    let err = list.delete(comment_id, Some(Uuid::new_v4())).await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));
    let err = list.delete(comment_id, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert_eq!(api.calls_starting_with("delete_comment"), 0);

    list.delete(comment_id, Some(author)).await.unwrap();
    assert_eq!(api.calls_starting_with("delete_comment"), 1);
    assert!(list.comments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn comment_form_validates_before_submitting() {
    let api = Arc::new(FakeApi::default());
    let mut form = CommentForm::new(api.clone());

    form.set_content("x".repeat(1001));
    assert_eq!(form.remaining_chars(), -1);
    let err = form.submit("post", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    form.set_content("   ");
    assert!(form.submit("post", None).await.is_err());
    assert!(api.calls().is_empty());

    form.set_content("  Nice post  ");
    let created = form.submit("post", None).await.unwrap();
    assert_eq!(created.comment.content, "Nice post");
    assert_eq!(created.comment.status, CommentStatus::Pending);
    assert!(form.content().is_empty());
    assert_eq!(form.notice().unwrap().message, MODERATION_NOTICE);

    sleep(Duration::from_secs(3)).await;
    assert!(form.notice().is_none());
}

#[tokio::test]
async fn delete_dialog_needs_confirmation_and_keeps_server_errors() {
    let api = Arc::new(FakeApi::default());
    let post_id = Uuid::new_v4();
    let mut dialog = DeletePostDialog::new(api.clone(), post_id);

    assert_eq!(dialog.confirm().await, Ok(false));
    assert!(api.calls().is_empty());

    *api.delete_error.lock().unwrap() = Some(ClientError::Forbidden("Forbidden".to_string()));
    dialog.open();
    assert!(dialog.confirm().await.is_err());
    assert_eq!(dialog.state(), DeleteState::Confirming);
    assert_eq!(dialog.error(), Some("Forbidden"));

    *api.delete_error.lock().unwrap() = None;
    assert_eq!(dialog.confirm().await, Ok(true));
    assert_eq!(dialog.state(), DeleteState::Closed);
    assert_eq!(api.calls_starting_with("delete_post"), 2);
}

#[tokio::test]
async fn image_upload_checks_locally_then_sets_the_cover() {
    let api = Arc::new(FakeApi::default());
    let mut form = PostForm::new();
    let mut picker = ImageUpload::new(api.clone(), None);

    let mut oversized = b"GIF89a".to_vec();
    oversized.resize(5 * 1024 * 1024 + 1, 0);
    assert!(matches!(picker.select(oversized), Err(ClientError::Validation(_))));
    assert!(matches!(
        picker.select(b"not an image".to_vec()),
        Err(ClientError::Validation(_))
    ));
    assert!(!picker.has_file());
    assert!(matches!(picker.upload().await, Err(ClientError::Validation(_))));
    assert!(api.calls().is_empty());

    let gif = b"GIF89a\x01\x00\x01\x00".to_vec();
    assert_eq!(picker.select(gif.clone()).unwrap(), "gif");
    let uploaded = picker.upload_into(&mut form).await.unwrap();

    assert_eq!(api.calls(), vec![format!("upload_image:cover:{}", gif.len())]);
    assert_eq!(form.cover_image.as_deref(), Some(uploaded.url.as_str()));
    assert_eq!(picker.url(), Some(uploaded.url.as_str()));
    assert!(!picker.has_file());

    picker.set_kind(UploadKind::Gallery);
    picker.select(gif).unwrap();
    let gallery = picker.upload().await.unwrap();
    assert_eq!(gallery.kind, UploadKind::Gallery);
    assert!(api.calls()[1].starts_with("upload_image:gallery:"));

    picker.remove(&mut form);
    assert!(form.cover_image.is_none());
    assert!(picker.url().is_none());
}
