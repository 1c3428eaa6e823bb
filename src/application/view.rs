//! Derived, side-effect free view of a todo list: search, status, priority and
//! overdue filtering plus the summary counts shown above the list.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::todo::{Priority, Todo};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Pending => "Pending",
            StatusFilter::Completed => "Completed",
        }
    }

    fn admits(self, todo: &Todo) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !todo.completed,
            StatusFilter::Completed => todo.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "completed" => Ok(StatusFilter::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoQuery {
    pub search: String,
    pub status: StatusFilter,
    /// `None` admits every priority.
    pub priority: Option<Priority>,
    pub overdue_only: bool,
}

impl TodoQuery {
    pub fn matches(&self, todo: &Todo, now: DateTime<Utc>) -> bool {
        self.matches_search(todo)
            && self.status.admits(todo)
            && self.priority.is_none_or(|p| todo.priority == p)
            && (!self.overdue_only || is_overdue(todo, now))
    }

    fn matches_search(&self, todo: &Todo) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        todo.title.to_lowercase().contains(&needle)
            || todo.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// A due date counts from midnight UTC of that day.
fn due_at(todo: &Todo) -> Option<DateTime<Utc>> {
    todo.due_date.map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

pub fn is_overdue(todo: &Todo, now: DateTime<Utc>) -> bool {
    !todo.completed && due_at(todo).is_some_and(|due| due < now)
}

/// Due within the next 24 hours (or already overdue) and still open.
pub fn is_due_soon(todo: &Todo, now: DateTime<Utc>) -> bool {
    !todo.completed && due_at(todo).is_some_and(|due| due <= now + Duration::hours(24))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl Stats {
    /// Counts over the whole list, independent of the active filters.
    pub fn of(todos: &[Todo], now: DateTime<Utc>) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total: todos.len(),
            pending: todos.len() - completed,
            completed,
            overdue: todos.iter().filter(|t| is_overdue(t, now)).count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TodoView<'a> {
    pub visible: Vec<&'a Todo>,
    pub stats: Stats,
}

impl<'a> TodoView<'a> {
    pub fn compute(todos: &'a [Todo], query: &TodoQuery, now: DateTime<Utc>) -> Self {
        Self {
            visible: todos.iter().filter(|t| query.matches(t, now)).collect(),
            stats: Stats::of(todos, now),
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &'a Todo> + '_ {
        self.visible.iter().copied().filter(|t| !t.completed)
    }

    pub fn completed(&self) -> impl Iterator<Item = &'a Todo> + '_ {
        self.visible.iter().copied().filter(|t| t.completed)
    }

    /// Message shown when nothing is visible.
    pub fn empty_message(&self) -> Option<&'static str> {
        match (self.visible.is_empty(), self.stats.total) {
            (false, _) => None,
            (true, 0) => Some("No todos yet. Create your first todo above!"),
            (true, _) => Some("No todos match your current filters."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::todo::{TodoId, UserId};
    use chrono::NaiveDate;

    fn todo(title: &str, description: Option<&str>, completed: bool, due: Option<NaiveDate>, priority: Priority) -> Todo {
        let now = Utc::now();
        Todo {
            id: TodoId::default(),
            owner: UserId(uuid::Uuid::nil()),
            title: title.into(),
            description: description.map(String::from),
            completed,
            due_date: due,
            priority,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample(now: DateTime<Utc>) -> Vec<Todo> {
        let yesterday = (now - Duration::days(1)).date_naive();
        let next_week = (now + Duration::days(7)).date_naive();
        vec![
            todo("Buy milk", Some("2 litres"), false, Some(yesterday), Priority::High),
            todo("File taxes", None, true, Some(yesterday), Priority::Medium),
            todo("Call mum", Some("about the MILK order"), false, Some(next_week), Priority::Low),
            todo("Read", None, true, None, Priority::High),
        ]
    }

    fn ids(view: &[&Todo]) -> Vec<TodoId> { view.iter().map(|t| t.id).collect() }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let now = Utc::now();
        let todos = sample(now);
        let query = TodoQuery { search: "MiLk".into(), ..Default::default() };
        let view = TodoView::compute(&todos, &query, now);
        assert_eq!(ids(&view.visible), vec![todos[0].id, todos[2].id]);
    }

    #[test]
    fn pending_and_completed_partition_the_filtered_set() {
        let now = Utc::now();
        let todos = sample(now);
        for priority in [None, Some(Priority::High)] {
            let base = TodoQuery { search: "".into(), priority, ..Default::default() };
            let all = ids(&TodoView::compute(&todos, &base, now).visible);
            let pending = ids(&TodoView::compute(&todos, &TodoQuery { status: StatusFilter::Pending, ..base.clone() }, now).visible);
            let completed = ids(&TodoView::compute(&todos, &TodoQuery { status: StatusFilter::Completed, ..base.clone() }, now).visible);

            assert!(pending.iter().all(|id| !completed.contains(id)));
            let mut union: Vec<_> = pending.iter().chain(&completed).copied().collect();
            union.sort_by_key(|id| all.iter().position(|a| a == id));
            assert_eq!(union, all);
        }
    }

    #[test]
    fn completing_an_overdue_item_clears_overdue() {
        let now = Utc::now();
        let mut todos = sample(now);
        assert!(is_overdue(&todos[0], now));
        assert_eq!(Stats::of(&todos, now), Stats { total: 4, pending: 2, completed: 2, overdue: 1 });

        todos[0].completed = true;
        assert!(!is_overdue(&todos[0], now));
        assert_eq!(Stats::of(&todos, now).overdue, 0);
    }

    #[test]
    fn overdue_and_priority_filters() {
        let now = Utc::now();
        let todos = sample(now);
        let overdue = TodoView::compute(&todos, &TodoQuery { overdue_only: true, ..Default::default() }, now);
        assert_eq!(ids(&overdue.visible), vec![todos[0].id]);

        let low = TodoView::compute(&todos, &TodoQuery { priority: Some(Priority::Low), ..Default::default() }, now);
        assert_eq!(ids(&low.visible), vec![todos[2].id]);
    }

    #[test]
    fn due_soon_window_and_sections() {
        let now = Utc::now();
        let todos = sample(now);
        assert!(is_due_soon(&todos[0], now));
        assert!(!is_due_soon(&todos[2], now));

        let view = TodoView::compute(&todos, &TodoQuery::default(), now);
        assert_eq!(view.pending().count(), 2);
        assert_eq!(view.completed().count(), 2);
        assert_eq!(view.empty_message(), None);

        let none = TodoView::compute(&todos, &TodoQuery { search: "zzz".into(), ..Default::default() }, now);
        assert_eq!(none.empty_message(), Some("No todos match your current filters."));
        assert_eq!(TodoView::compute(&[], &TodoQuery::default(), now).empty_message(), Some("No todos yet. Create your first todo above!"));
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!("".parse(), Ok(StatusFilter::All));
        assert_eq!("Completed".parse(), Ok(StatusFilter::Completed));
        assert!("done".parse::<StatusFilter>().is_err());
    }
}
