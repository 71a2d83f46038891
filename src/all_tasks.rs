//! "Profile" screen: every date's tasks, newest date first, with inline edit and confirmed delete.

use serde::Serialize;

use crate::models::{DateKey, TaskId};
use crate::store::{Commit, Notice, Revision, TaskRepository, TaskSession, TaskStore};

pub const TITLE: &str = "All Tasks";
pub const NO_TASKS: &str = "No tasks available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskRef {
    pub date: DateKey,
    pub id: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Viewing,
    Editing,
    ConfirmingDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Editing {
    target: TaskRef,
    text: String,
}

pub struct AllTasksScreen {
    session: TaskSession,
    editing: Option<Editing>,
    pending_delete: Option<TaskRef>,
}

impl AllTasksScreen {
    /// Loads the store; nothing persisted means an empty list.
    pub fn mount(repo: TaskRepository) -> Self {
        Self {
            session: TaskSession::open(repo, TaskStore::new),
            editing: None,
            pending_delete: None,
        }
    }

    pub fn tasks(&self) -> &TaskStore {
        self.session.tasks()
    }

    pub fn revision(&self) -> Revision {
        self.session.revision()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.session.take_notice()
    }

    pub fn row_state(&self, target: TaskRef) -> RowState {
        if self.editing.as_ref().map(|e| e.target) == Some(target) {
            RowState::Editing
        } else if self.pending_delete == Some(target) {
            RowState::ConfirmingDelete
        } else {
            RowState::Viewing
        }
    }

    /// Puts one row into edit mode with its current text. Any other editing row goes back to viewing.
    pub fn begin_edit(&mut self, target: TaskRef) -> bool {
        let Some(task) = self.session.tasks().find(&target.date, target.id) else {
            return false;
        };
        self.editing = Some(Editing {
            target,
            text: task.task.clone(),
        });
        if self.pending_delete == Some(target) {
            self.pending_delete = None;
        }
        true
    }

    pub fn set_edit_text(&mut self, text: impl Into<String>) {
        if let Some(editing) = self.editing.as_mut() {
            editing.text = text.into();
        }
    }

    /// Commits the inline edit. Blank text keeps the row editing.
    pub fn commit_edit(&mut self) -> Option<Commit> {
        let editing = self.editing.as_ref()?;
        let text = editing.text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        let target = editing.target;
        let outcome = self.session.commit(|tasks| {
            tasks.edit(&target.date, target.id, text);
        });
        self.editing = None;
        Some(outcome)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Asks for confirmation before deleting a row.
    pub fn request_delete(&mut self, target: TaskRef) -> bool {
        if self.session.tasks().find(&target.date, target.id).is_none() {
            return false;
        }
        self.pending_delete = Some(target);
        true
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the confirmed row; its date disappears with its last task.
    pub fn confirm_delete(&mut self) -> Option<Commit> {
        let target = self.pending_delete.take()?;
        let outcome = self.session.commit(|tasks| {
            tasks.remove(&target.date, target.id);
        });
        if self.editing.as_ref().map(|e| e.target) == Some(target) {
            self.editing = None;
        }
        Some(outcome)
    }

    pub fn view(&self) -> AllTasksView {
        let sections: Vec<DateSection> = self
            .session
            .tasks()
            .entries_desc()
            .map(|(date, tasks)| DateSection {
                date: *date,
                tasks: tasks
                    .iter()
                    .map(|task| {
                        let target = TaskRef {
                            date: *date,
                            id: task.id,
                        };
                        let state = self.row_state(target);
                        let text = match (&self.editing, state) {
                            (Some(editing), RowState::Editing) => editing.text.clone(),
                            _ => task.task.clone(),
                        };
                        TaskRow {
                            id: task.id,
                            text,
                            state,
                        }
                    })
                    .collect(),
            })
            .collect();
        AllTasksView {
            title: TITLE,
            empty_text: sections.is_empty().then_some(NO_TASKS),
            sections,
            confirm_delete: self.pending_delete.map(|target| ConfirmDialog {
                target,
                title: "Delete Task",
                message: "Are you sure you want to delete this task?",
                cancel_label: "Cancel",
                confirm_label: "Delete",
            }),
            notice: self.session.notice().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub id: TaskId,
    /// The edit buffer while the row is editing, the stored text otherwise.
    pub text: String,
    pub state: RowState,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateSection {
    pub date: DateKey,
    pub tasks: Vec<TaskRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmDialog {
    pub target: TaskRef,
    pub title: &'static str,
    pub message: &'static str,
    pub cancel_label: &'static str,
    pub confirm_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllTasksView {
    pub title: &'static str,
    pub empty_text: Option<&'static str>,
    pub sections: Vec<DateSection>,
    pub confirm_delete: Option<ConfirmDialog>,
    pub notice: Option<Notice>,
}
