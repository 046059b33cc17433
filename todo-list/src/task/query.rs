use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::Task;

/// Length of the window in which a pending task counts as due soon.
pub fn due_soon_window() -> Duration {
    Duration::hours(24)
}

/// Date bucket selected by the `filter` query parameter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    /// Due on the current calendar day, at any time.
    Today,
    /// Pending and due strictly before the current instant.
    Overdue,
    #[default]
    All,
}

impl TaskFilter {
    /// Unknown keywords fall back to no filtering.
    pub fn parse(keyword: &str) -> Self {
        match keyword {
            "today" => TaskFilter::Today,
            "overdue" => TaskFilter::Overdue,
            _ => TaskFilter::All,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            TaskFilter::Today => "today",
            TaskFilter::Overdue => "overdue",
            TaskFilter::All => "",
        }
    }

    fn admits(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::Today => task.due_date().date_naive() == now.date_naive(),
            TaskFilter::Overdue => task.is_pending() && task.due_date() < now,
            TaskFilter::All => true,
        }
    }
}

/// Search and filter parameters of the list page.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl TaskQuery {
    /// The search text, or `None` when it is absent or blank.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn task_filter(&self) -> TaskFilter {
        self.filter
            .as_deref()
            .map(TaskFilter::parse)
            .unwrap_or_default()
    }

    /// Text search and date filter must both admit the task.
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let needle = self.search_text().map(str::to_lowercase);
        matches_search(task, needle.as_deref()) && self.task_filter().admits(task, now)
    }
}

fn matches_search(task: &Task, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => {
            task.title().to_lowercase().contains(needle)
                || task.description().to_lowercase().contains(needle)
        }
    }
}

/// Everything the list page shows for one search/filter combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBoard {
    pub todos: Vec<Task>,
    pub pending: Vec<Task>,
    pub completed: Vec<Task>,
    pub due_soon: Vec<Task>,
    pub progress: u8,
}

impl TaskBoard {
    pub fn build(tasks: Vec<Task>, query: &TaskQuery, now: DateTime<Utc>) -> Self {
        let mut todos: Vec<Task> = tasks
            .into_iter()
            .filter(|task| query.matches(task, now))
            .collect();
        todos.sort_by(|a, b| a.due_date().cmp(&b.due_date()).then(a.id().cmp(&b.id())));

        let pending: Vec<Task> = todos
            .iter()
            .filter(|task| task.is_pending())
            .cloned()
            .collect();

        let mut completed: Vec<Task> = todos
            .iter()
            .filter(|task| task.is_resolved())
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));

        let due_soon_until = now + due_soon_window();
        let due_soon = pending
            .iter()
            .filter(|task| task.due_date() >= now && task.due_date() <= due_soon_until)
            .cloned()
            .collect();

        let progress = progress(completed.len(), todos.len());

        Self {
            todos,
            pending,
            completed,
            due_soon,
            progress,
        }
    }
}

/// Percentage of resolved tasks, rounded half away from zero.
pub fn progress(resolved: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (200 * resolved + total) / (2 * total);
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use crate::task::TaskStatus::{Pending, Resolved};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
    }

    fn task(id: u32, title: &str, due_date: DateTime<Utc>, status: TaskStatus) -> Task {
        Task::new(
            id,
            title.to_string(),
            String::new(),
            due_date,
            status,
            now(),
            now(),
        )
    }

    fn query(search: &str, filter: &str) -> TaskQuery {
        TaskQuery {
            search: Some(search.to_string()),
            filter: Some(filter.to_string()),
        }
    }

    fn ids(tasks: &[Task]) -> Vec<u32> {
        tasks.iter().map(Task::id).collect()
    }

    #[test]
    fn can_compute_progress() {
        assert_eq!(progress(0, 0), 0);
        assert_eq!(progress(0, 4), 0);
        assert_eq!(progress(1, 3), 33);
        assert_eq!(progress(2, 3), 67);
        assert_eq!(progress(1, 8), 13);
        assert_eq!(progress(3, 3), 100);
    }

    #[test]
    fn can_order_unfiltered_tasks_by_due_date() {
        let tasks = vec![
            task(1, "later", now() + Duration::days(3), Pending),
            task(2, "earlier", now() - Duration::days(1), Resolved),
            task(3, "middle", now() + Duration::hours(1), Pending),
        ];

        let board = TaskBoard::build(tasks, &TaskQuery::default(), now());

        assert_eq!(ids(&board.todos), vec![2, 3, 1]);
        assert_eq!(ids(&board.pending), vec![3, 1]);
    }

    #[test]
    fn can_order_completed_by_most_recent_update() {
        let first = Task::new(
            1,
            "a".to_string(),
            String::new(),
            now(),
            Resolved,
            now(),
            now() - Duration::hours(5),
        );
        let second = Task::new(
            2,
            "b".to_string(),
            String::new(),
            now() + Duration::days(2),
            Resolved,
            now(),
            now() - Duration::hours(1),
        );

        let board = TaskBoard::build(vec![first, second], &TaskQuery::default(), now());

        assert_eq!(ids(&board.completed), vec![2, 1]);
        assert_eq!(board.progress, 100);
    }

    #[test]
    fn can_bound_due_soon_window_inclusively() {
        let tasks = vec![
            task(1, "now", now(), Pending),
            task(2, "edge", now() + due_soon_window(), Pending),
            task(
                3,
                "past edge",
                now() + due_soon_window() + Duration::seconds(1),
                Pending,
            ),
            task(4, "just missed", now() - Duration::seconds(1), Pending),
            task(5, "resolved", now() + Duration::hours(2), Resolved),
        ];

        let board = TaskBoard::build(tasks, &TaskQuery::default(), now());

        assert_eq!(ids(&board.due_soon), vec![1, 2]);
        assert_eq!(board.progress, 20);
    }

    #[test]
    fn can_search_title_and_description_case_insensitively() {
        let mut tasks = vec![task(1, "Groceries", now(), Pending)];
        tasks.push(Task::new(
            2,
            "Errands".to_string(),
            "pick up MILK and bread".to_string(),
            now(),
            Pending,
            now(),
            now(),
        ));
        tasks.push(task(3, "Dentist", now(), Pending));

        let board = TaskBoard::build(tasks.clone(), &query("milk", ""), now());
        assert_eq!(ids(&board.todos), vec![2]);

        let board = TaskBoard::build(tasks, &query("GROC", ""), now());
        assert_eq!(ids(&board.todos), vec![1]);
    }

    #[test]
    fn can_ignore_blank_search() {
        let tasks = vec![
            task(1, "open", now(), Pending),
            task(2, "done", now(), Resolved),
        ];

        let board = TaskBoard::build(tasks, &query("   ", "unknown"), now());

        assert_eq!(ids(&board.todos), vec![1, 2]);
        assert_eq!(board.progress, 50);
    }

    #[test]
    fn can_filter_today_by_calendar_date() {
        let start_of_day = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let tasks = vec![
            task(1, "this morning", start_of_day, Resolved),
            task(2, "tonight", start_of_day + Duration::hours(23), Pending),
            task(3, "tomorrow", start_of_day + Duration::days(1), Pending),
            task(4, "before", start_of_day - Duration::seconds(1), Pending),
        ];

        let board = TaskBoard::build(tasks, &query("", "today"), now());

        assert_eq!(ids(&board.todos), vec![1, 2]);
    }

    #[test]
    fn can_filter_overdue_by_instant_and_status() {
        let tasks = vec![
            task(1, "late", now() - Duration::minutes(1), Pending),
            task(2, "late but done", now() - Duration::hours(2), Resolved),
            task(3, "due exactly now", now(), Pending),
            task(4, "upcoming", now() + Duration::hours(1), Pending),
        ];

        let board = TaskBoard::build(tasks, &query("", "overdue"), now());

        assert_eq!(ids(&board.todos), vec![1]);
        assert!(board.due_soon.is_empty());
    }

    #[test]
    fn can_combine_search_with_filter() {
        let tasks = vec![
            task(1, "Pay rent", now() - Duration::hours(1), Pending),
            task(2, "Pay phone bill", now() + Duration::days(2), Pending),
            task(3, "Walk dog", now() - Duration::hours(3), Pending),
        ];

        let search_and_filter = query("pay", "overdue");
        let board = TaskBoard::build(tasks.clone(), &search_and_filter, now());

        assert_eq!(ids(&board.todos), vec![1]);
        assert!(search_and_filter.matches(&tasks[0], now()));
        assert!(!search_and_filter.matches(&tasks[1], now()));
        assert!(!search_and_filter.matches(&tasks[2], now()));
    }

    #[test]
    fn can_move_toggled_task_between_groups() {
        let due_in_two_hours = now() + Duration::hours(2);
        let pending = vec![task(1, "Submit form", due_in_two_hours, Pending)];

        let board = TaskBoard::build(pending, &TaskQuery::default(), now());
        assert_eq!(ids(&board.pending), vec![1]);
        assert_eq!(ids(&board.due_soon), vec![1]);
        assert!(board.completed.is_empty());

        let resolved = vec![task(1, "Submit form", due_in_two_hours, Resolved)];
        let board = TaskBoard::build(resolved, &TaskQuery::default(), now());
        assert!(board.pending.is_empty());
        assert!(board.due_soon.is_empty());
        assert_eq!(ids(&board.completed), vec![1]);
    }
}
