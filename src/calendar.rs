//! Home screen: a month calendar, the task list of the selected day, and the add/edit modals.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{DateKey, Task, TaskId, WeekStart};
use crate::month::{month_grid, MonthGrid, YearMonth};
use crate::store::{Commit, Notice, Revision, TaskRepository, TaskSession, TaskStore};

pub const NO_DATE_SELECTED: &str = "Please select a date first";
pub const NO_TASKS_FOR_DATE: &str = "No tasks for this date";

/// Blocking message the shell must acknowledge before anything else happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    NoDateSelected,
}

impl Alert {
    pub fn message(&self) -> &'static str {
        match self {
            Alert::NoDateSelected => NO_DATE_SELECTED,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AddModal {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditModal {
    date: DateKey,
    task_id: TaskId,
    text: String,
}

pub struct CalendarScreen {
    session: TaskSession,
    week_start: WeekStart,
    today: NaiveDate,
    visible_month: YearMonth,
    selected_date: Option<DateKey>,
    add_modal: Option<AddModal>,
    edit_modal: Option<EditModal>,
}

impl CalendarScreen {
    /// Loads the store; a first launch shows the example tasks when `seed_example_tasks` is set.
    pub fn mount(
        repo: TaskRepository,
        week_start: WeekStart,
        seed_example_tasks: bool,
        today: NaiveDate,
    ) -> Self {
        let fallback = if seed_example_tasks {
            TaskStore::seeded
        } else {
            TaskStore::new
        };
        let mut session = TaskSession::open(repo, fallback);
        if seed_example_tasks && session.revision() == Revision::Missing {
            // First launch: persist the examples so the all-tasks list shows them too.
            session.commit(|_| {});
        }
        Self {
            session,
            week_start,
            today,
            visible_month: YearMonth::containing(today),
            selected_date: None,
            add_modal: None,
            edit_modal: None,
        }
    }

    pub fn tasks(&self) -> &TaskStore {
        self.session.tasks()
    }

    pub fn revision(&self) -> Revision {
        self.session.revision()
    }

    pub fn selected_date(&self) -> Option<DateKey> {
        self.selected_date
    }

    pub fn visible_month(&self) -> YearMonth {
        self.visible_month
    }

    pub fn add_modal_visible(&self) -> bool {
        self.add_modal.is_some()
    }

    pub fn edit_modal_visible(&self) -> bool {
        self.edit_modal.is_some()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.session.take_notice()
    }

    pub fn set_week_start(&mut self, week_start: WeekStart) {
        self.week_start = week_start;
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn select_day(&mut self, date: DateKey) {
        self.selected_date = Some(date);
        self.visible_month = YearMonth::containing(date.date());
    }

    pub fn show_month(&mut self, offset: i32) {
        self.visible_month = self.visible_month.shift(offset);
    }

    pub fn selected_tasks(&self) -> &[Task] {
        match self.selected_date {
            Some(date) => self.session.tasks().tasks_for(&date),
            None => &[],
        }
    }

    /// Opens the add modal, or asks for a date first.
    pub fn press_add(&mut self) -> Result<(), Alert> {
        if self.selected_date.is_none() {
            return Err(Alert::NoDateSelected);
        }
        self.add_modal = Some(AddModal::default());
        Ok(())
    }

    pub fn set_new_task_text(&mut self, text: impl Into<String>) {
        if let Some(modal) = self.add_modal.as_mut() {
            modal.text = text.into();
        }
    }

    /// Saves the add modal's text under the selected date. Blank text does nothing.
    pub fn save_new_task(&mut self) -> Option<Commit> {
        let date = self.selected_date?;
        let text = self.add_modal.as_ref()?.text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        let outcome = self.session.commit(|tasks| {
            tasks.add(date, text);
        });
        self.add_modal = None;
        Some(outcome)
    }

    pub fn cancel_add(&mut self) {
        self.add_modal = None;
    }

    /// Opens the edit modal for a task of the selected day, prefilled with its text.
    pub fn open_edit(&mut self, task_id: TaskId) -> bool {
        let Some(date) = self.selected_date else {
            return false;
        };
        let Some(task) = self.session.tasks().find(&date, task_id) else {
            return false;
        };
        self.edit_modal = Some(EditModal {
            date,
            task_id,
            text: task.task.clone(),
        });
        true
    }

    pub fn set_edited_text(&mut self, text: impl Into<String>) {
        if let Some(modal) = self.edit_modal.as_mut() {
            modal.text = text.into();
        }
    }

    /// Replaces the edited task's text. Blank text keeps the modal open and changes nothing.
    pub fn save_edit(&mut self) -> Option<Commit> {
        let modal = self.edit_modal.as_ref()?;
        let text = modal.text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        let (date, task_id) = (modal.date, modal.task_id);
        let outcome = self.session.commit(|tasks| {
            tasks.edit(&date, task_id, text);
        });
        self.edit_modal = None;
        Some(outcome)
    }

    pub fn delete_task(&mut self) -> Option<Commit> {
        let modal = self.edit_modal.take()?;
        Some(self.session.commit(|tasks| {
            tasks.remove(&modal.date, modal.task_id);
        }))
    }

    pub fn cancel_edit(&mut self) {
        self.edit_modal = None;
    }

    /// Picks up writes made by the other screen.
    pub fn refresh(&mut self) {
        self.session.reload();
        let tasks = self.session.tasks();
        let stale = self
            .edit_modal
            .as_ref()
            .is_some_and(|modal| tasks.find(&modal.date, modal.task_id).is_none());
        if stale {
            self.edit_modal = None;
        }
    }

    pub fn view(&self) -> CalendarView {
        let tasks = self.session.tasks();
        let selected_label = self
            .selected_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "Select a date".to_string());
        CalendarView {
            grid: month_grid(
                self.visible_month,
                self.week_start,
                &tasks.marked_dates(),
                self.selected_date,
                self.today,
            ),
            selected_date: self.selected_date,
            header: format!("Tasks for {selected_label}:"),
            tasks: self.selected_tasks().to_vec(),
            empty_text: NO_TASKS_FOR_DATE,
            add_modal: self.add_modal.as_ref().map(|modal| AddModalView {
                title: format!("Add Task for {selected_label}"),
                text: modal.text.clone(),
            }),
            edit_modal: self.edit_modal.as_ref().map(|modal| EditModalView {
                task_id: modal.task_id,
                text: modal.text.clone(),
            }),
            notice: self.session.notice().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddModalView {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditModalView {
    pub task_id: TaskId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub grid: MonthGrid,
    pub selected_date: Option<DateKey>,
    pub header: String,
    pub tasks: Vec<Task>,
    pub empty_text: &'static str,
    pub add_modal: Option<AddModalView>,
    pub edit_modal: Option<EditModalView>,
    pub notice: Option<Notice>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, StorageError};

    fn date(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 17).unwrap()
    }

    fn mount(repo: &TaskRepository) -> CalendarScreen {
        CalendarScreen::mount(repo.clone(), WeekStart::Monday, true, today())
    }

    fn memory_repo() -> TaskRepository {
        TaskRepository::new(Arc::new(MemoryStore::new()))
    }

    struct FailingWrites(MemoryStore);

    impl KeyValueStore for FailingWrites {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn first_launch_shows_and_persists_seeded_tasks() {
        let repo = memory_repo();
        let screen = mount(&repo);
        assert_eq!(screen.tasks(), &TaskStore::seeded());
        assert_eq!(repo.load().tasks, Some(TaskStore::seeded()));
        assert_eq!(screen.visible_month(), YearMonth::new(2025, 4).unwrap());
        assert!(!screen.add_modal_visible());
        assert!(!screen.edit_modal_visible());
    }

    #[test]
    fn seeding_can_be_disabled() {
        let repo = memory_repo();
        let screen = CalendarScreen::mount(repo.clone(), WeekStart::Monday, false, today());
        assert!(screen.tasks().is_empty());
        assert!(repo.load().tasks.is_none());
    }

    #[test]
    fn persisted_store_wins_over_seed() {
        let repo = memory_repo();
        let mut existing = TaskStore::new();
        existing.add(date("2025-01-05"), "persisted");
        repo.save(&existing, Revision::Missing).unwrap();

        let screen = mount(&repo);
        assert_eq!(screen.tasks(), &existing);
    }

    #[test]
    fn add_without_selected_date_alerts_and_keeps_modal_hidden() {
        let mut screen = mount(&memory_repo());
        let alert = screen.press_add().unwrap_err();
        assert_eq!(alert, Alert::NoDateSelected);
        assert_eq!(alert.message(), "Please select a date first");
        assert!(!screen.add_modal_visible());
    }

    #[test]
    fn adding_to_an_empty_date_persists_and_marks_it() {
        let repo = memory_repo();
        let mut screen = mount(&repo);
        screen.select_day(date("2025-04-10"));
        assert!(screen.selected_tasks().is_empty());

        screen.press_add().unwrap();
        assert!(screen.add_modal_visible());
        screen.set_new_task_text("  Buy milk  ");
        assert_eq!(screen.save_new_task(), Some(Commit::Saved));

        assert!(!screen.add_modal_visible());
        let tasks = screen.selected_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task, "Buy milk");
        assert!(screen.tasks().marked_dates().contains(&date("2025-04-10")));

        let reloaded = repo.load().tasks.unwrap();
        assert_eq!(
            reloaded.tasks_for(&date("2025-04-10")).last().map(|t| t.task.as_str()),
            Some("Buy milk")
        );

        let view = screen.view();
        let cell = view
            .grid
            .weeks
            .iter()
            .flatten()
            .find(|c| c.date == date("2025-04-10"))
            .unwrap();
        assert!(cell.marked);
        assert!(cell.selected);
    }

    #[test]
    fn whitespace_only_text_is_ignored() {
        let repo = memory_repo();
        let mut screen = mount(&repo);
        screen.select_day(date("2025-04-10"));
        screen.press_add().unwrap();
        screen.set_new_task_text("   \t ");

        let before = repo.load().revision;
        assert_eq!(screen.save_new_task(), None);
        assert_eq!(screen.tasks(), &TaskStore::seeded());
        assert_eq!(repo.load().revision, before);

        screen.cancel_add();
        assert!(!screen.add_modal_visible());
    }

    #[test]
    fn editing_replaces_only_the_chosen_task() {
        let repo = memory_repo();
        let mut screen = mount(&repo);
        screen.select_day(date("2025-04-02"));
        assert!(screen.open_edit(TaskId(1)));
        assert_eq!(screen.view().edit_modal.unwrap().text, "Test task 02");

        screen.set_edited_text("Call the bank");
        assert_eq!(screen.save_edit(), Some(Commit::Saved));
        assert!(!screen.edit_modal_visible());

        let stored = repo.load().tasks.unwrap();
        assert_eq!(
            stored.tasks_for(&date("2025-04-02")),
            &[Task::new(1, "Call the bank"), Task::new(2, "Test task 03")]
        );
        assert_eq!(
            stored.tasks_for(&date("2025-04-01")),
            &[Task::new(1, "Test task 01")]
        );
    }

    #[test]
    fn open_edit_requires_a_task_on_the_selected_day() {
        let mut screen = mount(&memory_repo());
        assert!(!screen.open_edit(TaskId(1)));
        screen.select_day(date("2025-04-01"));
        assert!(!screen.open_edit(TaskId(2)));
        assert!(!screen.edit_modal_visible());
    }

    #[test]
    fn deleting_the_last_task_removes_the_date() {
        let repo = memory_repo();
        let mut screen = mount(&repo);
        screen.select_day(date("2025-04-01"));
        screen.open_edit(TaskId(1));
        assert_eq!(screen.delete_task(), Some(Commit::Saved));

        assert!(!screen.edit_modal_visible());
        assert!(!screen.tasks().as_map().contains_key(&date("2025-04-01")));
        let stored = repo.load().tasks.unwrap();
        assert!(!stored.as_map().contains_key(&date("2025-04-01")));
        assert!(!screen.tasks().marked_dates().contains(&date("2025-04-01")));
    }

    #[test]
    fn save_failure_keeps_change_and_raises_notice() {
        let repo = TaskRepository::new(Arc::new(FailingWrites(MemoryStore::new())));
        let mut screen = mount(&repo);
        screen.select_day(date("2025-04-10"));
        screen.press_add().unwrap();
        screen.set_new_task_text("Buy milk");

        assert_eq!(screen.save_new_task(), Some(Commit::Unsaved));
        assert_eq!(screen.selected_tasks().len(), 1);
        assert!(matches!(screen.view().notice, Some(Notice::SaveFailed(_))));
        assert!(screen.take_notice().is_some());
        assert!(screen.view().notice.is_none());
    }

    #[test]
    fn refresh_picks_up_external_writes_and_closes_stale_editor() {
        let repo = memory_repo();
        let mut screen = mount(&repo);
        screen.select_day(date("2025-04-01"));
        screen.open_edit(TaskId(1));

        let mut elsewhere = TaskStore::seeded();
        elsewhere.remove(&date("2025-04-01"), TaskId(1));
        repo.save(&elsewhere, repo.load().revision).unwrap();

        screen.refresh();
        assert_eq!(screen.tasks(), &elsewhere);
        assert!(!screen.edit_modal_visible());
    }

    #[test]
    fn view_texts_follow_selection() {
        let mut screen = mount(&memory_repo());
        let view = screen.view();
        assert_eq!(view.header, "Tasks for Select a date:");
        assert!(view.tasks.is_empty());
        assert_eq!(view.empty_text, "No tasks for this date");

        screen.select_day(date("2025-04-02"));
        screen.press_add().unwrap();
        let view = screen.view();
        assert_eq!(view.header, "Tasks for 2025-04-02:");
        assert_eq!(view.tasks.len(), 2);
        assert_eq!(view.add_modal.unwrap().title, "Add Task for 2025-04-02");
    }

    #[test]
    fn month_navigation_and_day_selection() {
        let mut screen = mount(&memory_repo());
        screen.show_month(-1);
        assert_eq!(screen.visible_month(), YearMonth::new(2025, 3).unwrap());
        screen.show_month(2);
        assert_eq!(screen.visible_month(), YearMonth::new(2025, 5).unwrap());

        screen.select_day(date("2024-12-25"));
        assert_eq!(screen.visible_month(), YearMonth::new(2024, 12).unwrap());
        assert_eq!(screen.view().grid.title, "December 2024");
    }
}
