//! Local mirror of one user's list, seeded by a fetch and kept current by the
//! change feed.

use crate::domain::{
    feed::Subscription,
    repository::{ChangeFeed, TodoRepository},
    todo::{ChangeEvent, Todo, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Ready(Vec<Todo>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListStore {
    state: ListState,
}

impl Default for TodoListStore {
    fn default() -> Self { Self { state: ListState::Loading } }
}

impl TodoListStore {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> &ListState { &self.state }

    /// Items when ready, empty otherwise.
    pub fn todos(&self) -> &[Todo] {
        match &self.state {
            ListState::Ready(todos) => todos,
            _ => &[],
        }
    }

    /// Result of the initial fetch replaces whatever was held before.
    pub fn load(&mut self, fetched: anyhow::Result<Vec<Todo>>) {
        self.state = match fetched {
            Ok(todos) => ListState::Ready(todos),
            Err(err) => ListState::Error(err.to_string()),
        };
    }

    /// Applies one feed event. Returns whether the list changed. Events are only
    /// applied once the list is ready; the latest payload for an id wins.
    pub fn apply(&mut self, event: ChangeEvent) -> bool {
        let ListState::Ready(todos) = &mut self.state else { return false };
        match event {
            // Not de-duplicated against the fetched rows.
            ChangeEvent::Insert(todo) => {
                todos.insert(0, todo);
                true
            }
            ChangeEvent::Update(todo) => match todos.iter_mut().find(|t| t.id == todo.id) {
                Some(slot) => {
                    *slot = todo;
                    true
                }
                None => false,
            },
            ChangeEvent::Delete { id, .. } => {
                let before = todos.len();
                todos.retain(|t| t.id != id);
                todos.len() != before
            }
        }
    }
}

/// A [`TodoListStore`] wired to the backend for one owner. Dropping it (or
/// switching user) tears the feed subscription down.
pub struct LiveTodos {
    owner: UserId,
    store: TodoListStore,
    subscription: Option<Subscription>,
}

impl LiveTodos {
    /// Subscribes first, then fetches. Events delivered while the fetch ran are
    /// discarded: the fetched rows already reflect them.
    pub async fn open(repo: &dyn TodoRepository, feed: &dyn ChangeFeed, owner: UserId) -> Self {
        let mut subscription = match feed.subscribe(owner) {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                tracing::warn!(%owner, error = %err, "live updates unavailable");
                None
            }
        };
        let mut store = TodoListStore::new();
        store.load(repo.list_for_owner(owner).await);
        if let Some(subscription) = subscription.as_mut() {
            let mut skipped = 0;
            while subscription.try_recv().is_some() {
                skipped += 1;
            }
            if skipped > 0 {
                tracing::debug!(%owner, skipped, "dropped events covered by the initial fetch");
            }
        }
        Self { owner, store, subscription }
    }

    pub fn owner(&self) -> UserId { self.owner }
    pub fn store(&self) -> &TodoListStore { &self.store }
    pub fn todos(&self) -> &[Todo] { self.store.todos() }
    pub fn is_live(&self) -> bool { self.subscription.is_some() }

    /// Waits for the next event and applies it. `false` once the feed has
    /// stopped; live updates then end silently.
    pub async fn next(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else { return false };
        match subscription.recv().await {
            Some(event) => {
                self.store.apply(event);
                true
            }
            None => {
                self.subscription = None;
                false
            }
        }
    }

    /// Applies every event already delivered, without waiting. Returns how many
    /// changed the list.
    pub fn drain(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else { return 0 };
        let mut changed = 0;
        while let Some(event) = subscription.try_recv() {
            if self.store.apply(event) {
                changed += 1;
            }
        }
        changed
    }

    pub async fn switch_user(&mut self, repo: &dyn TodoRepository, feed: &dyn ChangeFeed, owner: UserId) {
        self.close();
        *self = Self::open(repo, feed, owner).await;
    }

    pub fn close(&mut self) { self.subscription = None; }
}
