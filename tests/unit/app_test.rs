//! End-to-end tests for a mounted client: sign-in, add, delete, live sync
//! between client instances, teardown and cancellation on sign-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use smartmark::app::{App, Services};
use smartmark::backend::{AuthService, Backend, BookmarkStore, LocalAuth};
use smartmark::client::{AppState, CommandOutcome};
use smartmark::config::AppConfig;
use smartmark::types::bookmark::{Bookmark, NewBookmark};
use smartmark::types::errors::{AuthError, StoreError};
use smartmark::types::session::{AuthEvent, OAuthCallback, OAuthRedirect, Session};
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(2);

fn setup() -> Arc<Backend> {
    Arc::new(Backend::in_memory(&AppConfig::default()).expect("Failed to open in-memory backend"))
}

async fn sign_in(app: &App, subject: &str) {
    let redirect = app.commands().sign_in("google").await.expect("sign-in should start");
    let outcome = app
        .commands()
        .complete_sign_in(OAuthCallback {
            state: redirect.state,
            subject: subject.to_string(),
            email: format!("{}@example.com", subject),
        })
        .await;
    assert_eq!(outcome, CommandOutcome::Applied);
}

/// Waits for the sync controller's first snapshot, i.e. its change
/// subscription is open.
async fn wait_synced(app: &App) {
    assert!(
        app.store().wait_until(WAIT, |s| s.snapshot_version >= 1).await,
        "initial snapshot never arrived"
    );
}

fn titles(state: &AppState) -> Vec<String> {
    state.bookmarks.iter().map(|b| b.title.clone()).collect()
}

async fn wait_for_channels(backend: &Backend, expected: usize) -> bool {
    for _ in 0..100 {
        if backend.active_channels() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_dashboard_shown_iff_signed_in() {
    let app = App::mount(Services::local(setup())).await;
    assert!(!app.render().is_dashboard());

    sign_in(&app, "u1").await;
    assert!(app.render().is_dashboard());

    assert_eq!(app.commands().sign_out().await, CommandOutcome::Applied);
    assert_eq!(app.state().session, None);
    assert!(!app.render().is_dashboard());
}

#[tokio::test]
async fn test_paper_then_blog_scenario() {
    let app = App::mount(Services::local(setup())).await;
    sign_in(&app, "u1").await;

    assert_eq!(app.commands().add("Paper", "https://example.com/a").await, CommandOutcome::Applied);
    assert_eq!(app.commands().add("Blog", "https://example.com/b").await, CommandOutcome::Applied);

    let state = app.state();
    assert_eq!(titles(&state), vec!["Blog", "Paper"]);
    let user_id = state.session.as_ref().unwrap().user_id.clone();
    assert!(state.bookmarks.iter().all(|b| b.user_id == user_id));

    let blog_id = state.bookmarks[0].id.clone();
    assert_eq!(app.commands().delete(&blog_id).await, CommandOutcome::Applied);

    let state = app.state();
    assert_eq!(titles(&state), vec!["Paper"]);
    assert!(state.bookmarks.iter().all(|b| b.id != blog_id));
}

#[tokio::test]
async fn test_submit_uses_and_clears_inputs() {
    let app = App::mount(Services::local(setup())).await;
    sign_in(&app, "u1").await;

    app.commands().set_title("Paper");
    app.commands().set_url("https://example.com/a");
    assert_eq!(app.commands().submit().await, CommandOutcome::Applied);

    let state = app.state();
    assert!(state.title_input.is_empty());
    assert!(state.url_input.is_empty());
    assert_eq!(titles(&state), vec!["Paper"]);
}

#[tokio::test]
async fn test_add_guards_skip_remote_write() {
    let backend = setup();
    let app = App::mount(Services::local(backend.clone())).await;

    // No session
    assert_eq!(app.commands().add("Paper", "https://example.com/a").await, CommandOutcome::Skipped);

    sign_in(&app, "u1").await;
    wait_synced(&app).await;
    let before = app.state();

    assert_eq!(app.commands().add("", "https://example.com/a").await, CommandOutcome::Skipped);
    assert_eq!(app.commands().add("Paper", "").await, CommandOutcome::Skipped);

    app.commands().set_title("Only a title");
    assert_eq!(app.commands().submit().await, CommandOutcome::Skipped);
    assert_eq!(app.state().title_input, "Only a title", "skipped add keeps the inputs");

    let user_id = before.session.as_ref().unwrap().user_id.clone();
    assert!(backend.list_for_owner(&user_id).await.unwrap().is_empty());
    assert_eq!(app.state().bookmarks, before.bookmarks);
    assert_eq!(app.state().snapshot_version, before.snapshot_version);
}

#[tokio::test]
async fn test_delete_of_other_users_bookmark_fails_silently() {
    let backend = setup();
    let owner = App::mount(Services::local(backend.clone())).await;
    let intruder = App::mount(Services::local(backend.clone())).await;
    sign_in(&owner, "owner").await;
    sign_in(&intruder, "intruder").await;

    owner.commands().add("Private", "https://example.com/p").await;
    let id = owner.state().bookmarks[0].id.clone();

    assert_eq!(intruder.commands().delete(&id).await, CommandOutcome::Failed);
    assert!(intruder.render().is_dashboard(), "failure is not surfaced to the view");

    let owner_id = owner.state().session.unwrap().user_id;
    assert_eq!(backend.list_for_owner(&owner_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remote_changes_sync_across_sessions() {
    let backend = setup();
    let tab_a = App::mount(Services::local(backend.clone())).await;
    let tab_b = App::mount(Services::local(backend.clone())).await;
    sign_in(&tab_a, "u1").await;
    sign_in(&tab_b, "u1").await;
    wait_synced(&tab_b).await;

    tab_a.commands().add("Paper", "https://example.com/a").await;
    assert!(
        tab_b.store().wait_until(WAIT, |s| titles(s) == vec!["Paper"]).await,
        "insert in one session should reach the other"
    );

    let id = tab_a.state().bookmarks[0].id.clone();
    tab_a.commands().delete(&id).await;
    assert!(
        tab_b.store().wait_until(WAIT, |s| s.bookmarks.is_empty()).await,
        "delete in one session should reach the other"
    );
}

#[tokio::test]
async fn test_other_users_changes_do_not_refresh() {
    let backend = setup();
    let alice = App::mount(Services::local(backend.clone())).await;
    let bob = App::mount(Services::local(backend.clone())).await;
    sign_in(&alice, "alice").await;
    sign_in(&bob, "bob").await;
    wait_synced(&alice).await;
    wait_synced(&bob).await;
    let version = alice.state().snapshot_version;

    bob.commands().add("Bob's", "https://example.com/bob").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(alice.state().snapshot_version, version);
    assert!(alice.state().bookmarks.is_empty());
}

#[tokio::test]
async fn test_sign_out_closes_subscription_and_teardown_releases() {
    let backend = setup();
    let app = App::mount(Services::local(backend.clone())).await;
    sign_in(&app, "u1").await;
    wait_synced(&app).await;
    assert_eq!(backend.active_channels(), 1);

    app.commands().sign_out().await;
    assert!(wait_for_channels(&backend, 0).await, "sign-out must close the change subscription");

    sign_in(&app, "u1").await;
    assert!(wait_for_channels(&backend, 1).await, "a new session opens a new subscription");

    app.teardown();
    assert!(wait_for_channels(&backend, 0).await, "teardown must close the change subscription");
}

#[tokio::test]
async fn test_token_refresh_keeps_cache() {
    let app = App::mount(Services::local(setup())).await;
    sign_in(&app, "u1").await;
    app.commands().add("Paper", "https://example.com/a").await;
    let before = app.state();

    assert_eq!(app.commands().refresh_token().await, CommandOutcome::Applied);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let after = app.state();
    assert_eq!(after.session_generation, before.session_generation);
    assert_eq!(titles(&after), vec!["Paper"]);
}

#[tokio::test]
async fn test_mount_restores_existing_session() {
    let backend = setup();
    let first = Arc::new(LocalAuth::new(backend.clone()));
    let app = App::mount(Services::with_auth(backend.clone(), first.clone())).await;
    sign_in(&app, "u1").await;
    app.commands().add("Paper", "https://example.com/a").await;
    let token = first.access_token().map(|t| t.as_str().to_owned()).unwrap();
    app.teardown();

    let resumed = Arc::new(LocalAuth::resume(backend.clone(), token));
    let app = App::mount(Services::with_auth(backend, resumed)).await;
    assert!(app.render().is_dashboard());
    assert!(app.store().wait_until(WAIT, |s| titles(s) == vec!["Paper"]).await);
}

#[tokio::test]
async fn test_invalid_callback_leaves_signed_out() {
    let app = App::mount(Services::local(setup())).await;
    app.commands().sign_in("google").await.unwrap();

    let outcome = app
        .commands()
        .complete_sign_in(OAuthCallback {
            state: "forged".to_string(),
            subject: "u1".to_string(),
            email: "u1@example.com".to_string(),
        })
        .await;
    assert_eq!(outcome, CommandOutcome::Failed);
    assert!(!app.render().is_dashboard());
}

#[tokio::test]
async fn test_unknown_provider_yields_no_redirect() {
    let app = App::mount(Services::local(setup())).await;
    assert!(app.commands().sign_in("myspace").await.is_none());
}

/// Store whose inserts take long enough to sign out in between.
struct SlowStore {
    inner: Arc<Backend>,
    delay: Duration,
}

#[async_trait]
impl BookmarkStore for SlowStore {
    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        self.inner.list_for_owner(user_id).await
    }

    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(new).await
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<(), StoreError> {
        self.inner.delete(id, user_id).await
    }
}

#[tokio::test]
async fn test_sign_out_cancels_in_flight_add() {
    let backend = setup();
    let services = Services {
        auth: Arc::new(LocalAuth::new(backend.clone())),
        bookmarks: Arc::new(SlowStore {
            inner: backend.clone(),
            delay: Duration::from_millis(300),
        }),
        feed: backend.clone(),
    };
    let app = App::mount(services).await;
    sign_in(&app, "u1").await;
    let user_id = app.state().session.unwrap().user_id;

    let commands = app.commands().clone();
    let pending = tokio::spawn(async move { commands.add("Late", "https://example.com/late").await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    app.commands().sign_out().await;
    assert_eq!(pending.await.unwrap(), CommandOutcome::Cancelled);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(app.state().bookmarks.is_empty());
    assert!(backend.list_for_owner(&user_id).await.unwrap().is_empty());
}

/// Auth handle whose session lookup is unreachable, while still holding a
/// token the backend accepts.
struct LookupFails {
    inner: Arc<LocalAuth>,
}

#[async_trait]
impl AuthService for LookupFails {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Err(AuthError::DatabaseError("backend unreachable".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.subscribe()
    }

    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError> {
        self.inner.sign_in_with_oauth(provider).await
    }

    async fn handle_redirect(&self, callback: OAuthCallback) -> Result<Session, AuthError> {
        self.inner.handle_redirect(callback).await
    }

    async fn refresh_session(&self) -> Result<Session, AuthError> {
        self.inner.refresh_session().await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.sign_out().await
    }
}

#[tokio::test]
async fn test_sign_out_revokes_token_the_store_never_saw() {
    let backend = setup();
    let issuer = LocalAuth::new(backend.clone());
    let redirect = issuer.sign_in_with_oauth("google").await.unwrap();
    issuer
        .handle_redirect(OAuthCallback {
            state: redirect.state,
            subject: "u1".to_string(),
            email: "u1@example.com".to_string(),
        })
        .await
        .unwrap();
    let token = issuer.access_token().unwrap().as_str().to_owned();

    let held = Arc::new(LocalAuth::resume(backend.clone(), token.clone()));
    let auth = Arc::new(LookupFails { inner: held.clone() });
    let app = App::mount(Services::with_auth(backend.clone(), auth)).await;
    assert_eq!(app.state().session, None);

    assert_eq!(app.commands().sign_out().await, CommandOutcome::Applied);
    assert!(held.access_token().is_none());
    let check = LocalAuth::resume(backend, token);
    assert_eq!(check.current_session().await.unwrap(), None);
}
