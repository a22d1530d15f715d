//! Pure derived views over the task collection.
//!
//! Nothing here mutates the collection. Every function skips records
//! with a pending delete, which are stored but never presented.

use crate::{Task, TaskCollection};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sentinel category id that matches every task.
pub const ALL_CATEGORIES: &str = "all";

/// Category assigned to tasks that have none.
pub const DEFAULT_CATEGORY: &str = "general";

/// Field to sort derived views by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Title,
    Date,
    Category,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Completion statistics over a set of visible tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    /// Tasks not yet completed (completion pending, not sync pending)
    pub pending: usize,
    /// completed / total * 100, 0 when there are no tasks
    pub completion_rate: f64,
}

/// Per-category counts over a set of visible tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub task_count: usize,
    pub completed_count: usize,
}

fn matches_search(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let fields = [
        Some(task.title.as_str()),
        task.description.as_deref(),
        task.team_members.as_deref(),
    ];
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(query))
}

fn category_of(task: &Task) -> &str {
    task.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
}

fn matches_category(task: &Task, category_id: &str) -> bool {
    category_id == ALL_CATEGORIES || category_of(task) == category_id
}

fn compare(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Date => {
            let key = |t: &Task| {
                (
                    t.date.clone().unwrap_or_default(),
                    t.start_time.clone().unwrap_or_default(),
                )
            };
            key(a).cmp(&key(b))
        }
        SortField::Category => category_of(a).cmp(category_of(b)),
    }
}

/// Case-insensitive substring match against title, description and team
/// members. A blank query returns every visible task.
pub fn filter_by_search<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    let query = query.trim().to_lowercase();
    tasks
        .iter()
        .filter(|t| t.is_visible() && matches_search(t, &query))
        .collect()
}

/// Exact category match; tasks without a category count as `"general"`.
/// The `"all"` sentinel returns every visible task.
pub fn filter_by_category<'a>(tasks: &'a [Task], category_id: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.is_visible() && matches_category(t, category_id))
        .collect()
}

/// Exact calendar-date match.
pub fn filter_by_date<'a>(tasks: &'a [Task], date: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.is_visible() && t.date.as_deref() == Some(date))
        .collect()
}

/// Stable sort of a derived view. ISO dates and `HH:MM` times order
/// chronologically under plain string comparison.
pub fn sort_tasks<'a>(
    mut tasks: Vec<&'a Task>,
    field: SortField,
    order: SortOrder,
) -> Vec<&'a Task> {
    tasks.sort_by(|a, b| {
        let ordering = compare(a, b, field);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    tasks
}

/// Completion statistics over the visible tasks.
pub fn stats(tasks: &[Task]) -> TaskStats {
    let visible: Vec<&Task> = tasks.iter().filter(|t| t.is_visible()).collect();
    stats_of(&visible)
}

fn stats_of(tasks: &[&Task]) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let completion_rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    TaskStats {
        total,
        completed,
        pending: total - completed,
        completion_rate,
    }
}

/// Task and completion counts for each of the given category ids.
pub fn category_stats(tasks: &[Task], categories: &[&str]) -> Vec<CategoryStats> {
    categories
        .iter()
        .map(|category| {
            let in_category: Vec<&Task> = tasks
                .iter()
                .filter(|t| t.is_visible() && category_of(t) == *category)
                .collect();
            CategoryStats {
                category: (*category).to_string(),
                task_count: in_category.len(),
                completed_count: in_category.iter().filter(|t| t.completed).count(),
            }
        })
        .collect()
}

/// Builder for filtered, sorted views over a collection.
///
/// Starts from the visible records and never touches the collection.
#[derive(Debug)]
pub struct TaskQuery<'a> {
    tasks: Vec<&'a Task>,
}

impl<'a> TaskQuery<'a> {
    pub(crate) fn new(collection: &'a TaskCollection) -> Self {
        Self {
            tasks: collection.visible().collect(),
        }
    }

    /// Keep tasks matching the search query.
    pub fn search(mut self, query: &str) -> Self {
        let query = query.trim().to_lowercase();
        self.tasks.retain(|t| matches_search(t, &query));
        self
    }

    /// Keep tasks in the given category (`"all"` keeps everything).
    pub fn category(mut self, category_id: &str) -> Self {
        self.tasks.retain(|t| matches_category(t, category_id));
        self
    }

    /// Keep tasks scheduled on the given date.
    pub fn date(mut self, date: &str) -> Self {
        self.tasks.retain(|t| t.date.as_deref() == Some(date));
        self
    }

    /// Sort the view.
    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.tasks = sort_tasks(self.tasks, field, order);
        self
    }

    /// All matching tasks.
    pub fn all(self) -> Vec<&'a Task> {
        self.tasks
    }

    /// Number of matching tasks.
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Completion statistics over the matching tasks.
    pub fn stats(&self) -> TaskStats {
        stats_of(&self.tasks)
    }
}
