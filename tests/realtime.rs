use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use livetodo::application::{
    actions::{TodoActions, TodoForm},
    live_list::{ListState, LiveTodos},
    view::{is_overdue, Stats},
};
use livetodo::config::BackendConfig;
use livetodo::domain::repository::TodoRepository;
use livetodo::domain::todo::{NewTodo, Priority, Todo, TodoChanges, TodoId, UserId};
use livetodo::domain::user::Session;
use livetodo::infrastructure::Backend;

async fn backend() -> Backend {
    Backend::connect(&BackendConfig { url: "sqlite::memory:".into(), api_key: "anon-key".into() })
        .await
        .unwrap()
}

async fn session(backend: &Backend, email: &str) -> Session {
    backend.auth.sign_up(email, "hunter22", "http://localhost:3000/dashboard").await.unwrap();
    backend.auth.sign_in_with_password(email, "hunter22").await.unwrap()
}

async fn open(backend: &Backend, session: &Session) -> LiveTodos {
    LiveTodos::open(backend.todos.as_ref(), backend.feed.as_ref(), session.user.id).await
}

fn form(title: &str) -> TodoForm {
    TodoForm { title: Some(title.into()), ..Default::default() }
}

#[tokio::test]
async fn live_list_follows_only_its_owner() {
    let backend = backend().await;
    let actions = TodoActions::new(backend.auth.clone(), backend.todos.clone());
    let alice = session(&backend, "alice@example.com").await;
    let bob = session(&backend, "bob@example.com").await;

    let mut alice_live = open(&backend, &alice).await;
    let mut bob_live = open(&backend, &bob).await;
    assert!(alice_live.is_live());
    assert_eq!(alice_live.store().state(), &ListState::Ready(vec![]));

    let created = actions
        .create(Some(&alice.token), TodoForm { priority: Some("high".into()), ..form("Buy milk") })
        .await
        .unwrap();
    assert_eq!(alice_live.drain(), 1);
    assert_eq!(alice_live.todos()[0].title, "Buy milk");
    assert_eq!(alice_live.todos()[0], created.todo.unwrap());
    assert_eq!(bob_live.drain(), 0);
    assert!(bob_live.todos().is_empty());
}

#[tokio::test]
async fn toggle_and_delete_reach_the_live_list() {
    let backend = backend().await;
    let actions = TodoActions::new(backend.auth.clone(), backend.todos.clone());
    let alice = session(&backend, "alice@example.com").await;
    let token = Some(alice.token.as_str());

    actions.create(token, form("Walk dog")).await.unwrap();
    let yesterday = (Utc::now() - Duration::days(1)).date_naive().to_string();
    let late = actions.create(token, TodoForm { due_date: Some(yesterday), ..form("Pay rent") }).await.unwrap();
    let late = late.todo.unwrap();

    let mut live = open(&backend, &alice).await;
    assert_eq!(live.todos().len(), 2);
    assert_eq!(Stats::of(live.todos(), Utc::now()).overdue, 1);

    let toggle = TodoForm { todo_id: Some(late.id.to_string()), completed: Some("true".into()), ..Default::default() };
    actions.toggle(token, toggle).await.unwrap();
    assert!(live.next().await);
    let toggled = live.todos().iter().find(|t| t.id == late.id).unwrap();
    assert!(toggled.completed);
    assert!(!is_overdue(toggled, Utc::now()));
    assert_eq!(Stats::of(live.todos(), Utc::now()).overdue, 0);

    let delete = TodoForm { todo_id: Some(late.id.to_string()), ..Default::default() };
    assert_eq!(actions.delete(token, delete).await.unwrap().affected, 1);
    assert_eq!(live.drain(), 1);
    assert_eq!(live.todos().len(), 1);
    assert_eq!(live.todos()[0].title, "Walk dog");
}

#[tokio::test]
async fn switching_user_resubscribes() {
    let backend = backend().await;
    let actions = TodoActions::new(backend.auth.clone(), backend.todos.clone());
    let alice = session(&backend, "alice@example.com").await;
    let bob = session(&backend, "bob@example.com").await;

    let mut live = open(&backend, &alice).await;
    live.switch_user(backend.todos.as_ref(), backend.feed.as_ref(), bob.user.id).await;
    assert_eq!(live.owner(), bob.user.id);

    actions.create(Some(&alice.token), form("Buy milk")).await.unwrap();
    actions.create(Some(&bob.token), form("Fix bike")).await.unwrap();
    assert_eq!(live.drain(), 1);
    assert_eq!(live.todos()[0].title, "Fix bike");

    live.close();
    assert!(!live.is_live());
    assert!(!live.next().await);
}

#[tokio::test]
async fn unconfigured_backend_reports_instead_of_listing() {
    let backend = Backend::unconfigured();
    let owner = UserId(uuid::Uuid::new_v4());
    let mut live = LiveTodos::open(backend.todos.as_ref(), backend.feed.as_ref(), owner).await;
    assert!(!live.is_live());
    assert_eq!(live.store().state(), &ListState::Error("backend is not configured".into()));
    assert!(!live.next().await);
}

/// Commits an insert for the owner right before serving the list, so the row
/// is both in the fetch result and waiting in the feed.
struct WritesDuringFetch {
    inner: Arc<dyn TodoRepository>,
}

#[async_trait]
impl TodoRepository for WritesDuringFetch {
    async fn init(&self) -> anyhow::Result<()> { self.inner.init().await }

    async fn insert(&self, owner: UserId, input: NewTodo) -> anyhow::Result<Todo> { self.inner.insert(owner, input).await }

    async fn list_for_owner(&self, owner: UserId) -> anyhow::Result<Vec<Todo>> {
        let racing = NewTodo { title: "Added mid-fetch".into(), description: None, due_date: None, priority: Priority::Medium };
        self.inner.insert(owner, racing).await?;
        self.inner.list_for_owner(owner).await
    }

    async fn update(&self, id: TodoId, owner: UserId, changes: TodoChanges) -> anyhow::Result<Option<Todo>> {
        self.inner.update(id, owner, changes).await
    }

    async fn set_completed(&self, id: TodoId, owner: UserId, completed: bool) -> anyhow::Result<Option<Todo>> {
        self.inner.set_completed(id, owner, completed).await
    }

    async fn delete(&self, id: TodoId, owner: UserId) -> anyhow::Result<bool> { self.inner.delete(id, owner).await }
}

#[tokio::test]
async fn insert_during_initial_fetch_is_listed_once() {
    let backend = backend().await;
    let alice = session(&backend, "alice@example.com").await;
    let repo = WritesDuringFetch { inner: backend.todos.clone() };

    let mut live = LiveTodos::open(&repo, backend.feed.as_ref(), alice.user.id).await;
    assert_eq!(live.todos().len(), 1);
    assert_eq!(live.drain(), 0);
    assert_eq!(live.todos().len(), 1);
    assert_eq!(backend.todos.list_for_owner(alice.user.id).await.unwrap().len(), 1);

    // later changes still arrive
    let actions = TodoActions::new(backend.auth.clone(), backend.todos.clone());
    actions.create(Some(&alice.token), form("Buy milk")).await.unwrap();
    assert_eq!(live.drain(), 1);
    assert_eq!(live.todos()[0].title, "Buy milk");
    assert_eq!(live.todos().len(), 2);
}
