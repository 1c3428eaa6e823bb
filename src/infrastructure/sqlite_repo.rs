use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::feed::BroadcastFeed;
use crate::domain::{
    repository::TodoRepository,
    todo::{ChangeEvent, NewTodo, Priority, Todo, TodoChanges, TodoId, UserId},
};

const COLUMNS: &str = "id, owner, title, description, completed, due_date, priority, created_at, updated_at";

/// Live item storage. Every committed write is echoed on the change feed.
#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: SqlitePool,
    feed: BroadcastFeed,
}

impl SqliteTodoRepository {
    pub fn new(pool: SqlitePool, feed: BroadcastFeed) -> Self { Self { pool, feed } }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                title TEXT NOT NULL CHECK (length(title) > 0),
                description TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                due_date TEXT,
                priority TEXT NOT NULL DEFAULT 'medium' CHECK (priority IN ('low', 'medium', 'high')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS todos_owner_created ON todos (owner, created_at)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert(&self, owner: UserId, input: NewTodo) -> Result<Todo> {
        let now = now();
        let todo = Todo {
            id: TodoId(Uuid::new_v4()),
            owner,
            title: input.title,
            description: input.description,
            completed: false,
            due_date: input.due_date,
            priority: input.priority,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO todos (id, owner, title, description, completed, due_date, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(todo.id.to_string())
        .bind(owner.to_string())
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.due_date.map(|d| d.to_string()))
        .bind(todo.priority.as_str())
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await?;

        self.feed.publish(ChangeEvent::Insert(todo.clone()));
        Ok(todo)
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Todo>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM todos WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_todo).collect()
    }

    async fn update(&self, id: TodoId, owner: UserId, changes: TodoChanges) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!(
            "UPDATE todos SET title = ?3, description = ?4, due_date = ?5, priority = ?6, updated_at = ?7
             WHERE id = ?1 AND owner = ?2
             RETURNING {COLUMNS}"
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.due_date.map(|d| d.to_string()))
        .bind(changes.priority.as_str())
        .bind(timestamp(now()))
        .fetch_optional(&self.pool)
        .await?;
        self.publish_update(row)
    }

    async fn set_completed(&self, id: TodoId, owner: UserId, completed: bool) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!(
            "UPDATE todos SET completed = ?3, updated_at = ?4
             WHERE id = ?1 AND owner = ?2
             RETURNING {COLUMNS}"
        ))
        .bind(id.to_string())
        .bind(owner.to_string())
        .bind(completed)
        .bind(timestamp(now()))
        .fetch_optional(&self.pool)
        .await?;
        self.publish_update(row)
    }

    async fn delete(&self, id: TodoId, owner: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?1 AND owner = ?2")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            self.feed.publish(ChangeEvent::Delete { id, owner });
        }
        Ok(deleted)
    }
}

impl SqliteTodoRepository {
    fn publish_update(&self, row: Option<SqliteRow>) -> Result<Option<Todo>> {
        let Some(row) = row else { return Ok(None) };
        let todo = row_to_todo(row)?;
        self.feed.publish(ChangeEvent::Update(todo.clone()));
        Ok(Some(todo))
    }
}

/// Storage keeps microsecond precision.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String { at.to_rfc3339_opts(SecondsFormat::Micros, true) }

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("bad timestamp `{value}`"))?
        .with_timezone(&Utc))
}

fn row_to_todo(row: SqliteRow) -> Result<Todo> {
    let id: String = row.try_get("id")?;
    let owner: String = row.try_get("owner")?;
    let due_date: Option<String> = row.try_get("due_date")?;
    let priority: String = row.try_get("priority")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Todo {
        id: id.parse().with_context(|| format!("bad todo id `{id}`"))?,
        owner: owner.parse().with_context(|| format!("bad owner id `{owner}`"))?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        completed: row.try_get("completed")?,
        due_date: due_date
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").with_context(|| format!("bad due date `{d}`")))
            .transpose()?,
        priority: Priority::from_form(Some(priority.as_str())),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::ChangeFeed;
    use crate::infrastructure::db;

    async fn repo() -> (SqliteTodoRepository, BroadcastFeed) {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let feed = BroadcastFeed::default();
        let repo = SqliteTodoRepository::new(pool, feed.clone());
        repo.init().await.unwrap();
        (repo, feed)
    }

    fn new_todo(title: &str) -> NewTodo {
        NewTodo { title: title.into(), description: None, due_date: None, priority: Priority::default() }
    }

    #[tokio::test]
    async fn lists_newest_first_and_only_for_owner() {
        let (repo, _) = repo().await;
        let alice = UserId(Uuid::new_v4());
        let bob = UserId(Uuid::new_v4());
        repo.insert(alice, new_todo("first")).await.unwrap();
        repo.insert(alice, new_todo("second")).await.unwrap();
        repo.insert(bob, new_todo("bob's")).await.unwrap();

        let titles: Vec<_> = repo.list_for_owner(alice).await.unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["second", "first"]);
        assert_eq!(repo.list_for_owner(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writes_are_scoped_to_owner() {
        let (repo, feed) = repo().await;
        let alice = UserId(Uuid::new_v4());
        let mallory = UserId(Uuid::new_v4());
        let todo = repo.insert(alice, new_todo("private")).await.unwrap();
        let mut alice_feed = feed.subscribe(alice).unwrap();

        assert!(repo.set_completed(todo.id, mallory, true).await.unwrap().is_none());
        assert!(!repo.delete(todo.id, mallory).await.unwrap());
        assert_eq!(alice_feed.try_recv(), None);

        let done = repo.set_completed(todo.id, alice, true).await.unwrap().unwrap();
        assert!(done.completed);
        assert_eq!(alice_feed.try_recv(), Some(ChangeEvent::Update(done)));

        assert!(repo.delete(todo.id, alice).await.unwrap());
        assert_eq!(alice_feed.try_recv(), Some(ChangeEvent::Delete { id: todo.id, owner: alice }));
    }

    #[tokio::test]
    async fn update_replaces_editable_fields() {
        let (repo, _) = repo().await;
        let alice = UserId(Uuid::new_v4());
        let todo = repo.insert(alice, new_todo("draft")).await.unwrap();
        let due = NaiveDate::from_ymd_opt(2030, 1, 2).unwrap();

        let updated = repo
            .update(todo.id, alice, TodoChanges {
                title: "final".into(),
                description: Some("notes".into()),
                due_date: Some(due),
                priority: Priority::High,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(updated.due_date, Some(due));
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.created_at, todo.created_at);
        assert_eq!(repo.list_for_owner(alice).await.unwrap(), vec![updated]);
    }
}
