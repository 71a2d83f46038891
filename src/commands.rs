use std::path::PathBuf;

use chrono::NaiveDate;

use crate::all_tasks::{AllTasksScreen, AllTasksView, TaskRef};
use crate::calendar::{CalendarScreen, CalendarView};
use crate::events::StoreUpdatedPayload;
#[cfg(all(feature = "app", not(test)))]
use crate::events::EVENT_STORE_UPDATED;
use crate::models::{DateKey, Settings, TaskId};
use crate::state::{AppState, Route};
use crate::storage::{Storage, StorageError};
use crate::store::{Commit, Revision};

#[cfg(all(feature = "app", not(test)))]
use tauri::{AppHandle, Emitter, Manager, Runtime, State};
#[cfg(all(feature = "app", not(test)))]
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

trait CommandCtx {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_store_updated(&self, payload: StoreUpdatedPayload);
    /// Blocking alert; the user has to dismiss it.
    fn show_alert(&self, message: &str);
    fn today(&self) -> NaiveDate;
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

const ALL_TASKS_CLOSED: &str = "all tasks screen is not open";

fn notify_saved(ctx: &impl CommandCtx, route: Route, outcome: Option<Commit>, revision: Revision) {
    if outcome == Some(Commit::Saved) {
        ctx.emit_store_updated(StoreUpdatedPayload { route, revision });
    }
}

/// Builds the view and consumes its notice so a toast shows once.
fn calendar_view_once(screen: &mut CalendarScreen) -> CalendarView {
    let view = screen.view();
    screen.take_notice();
    view
}

fn all_tasks_view_once(screen: &mut AllTasksScreen) -> AllTasksView {
    let view = screen.view();
    screen.take_notice();
    view
}

fn parse_date(date: &str) -> Result<DateKey, String> {
    date.parse::<DateKey>().map_err(|e| e.to_string())
}

#[cfg(all(feature = "app", not(test)))]
struct TauriCommandCtx<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> CommandCtx for TauriCommandCtx<'_, R> {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError> {
        self.app
            .path()
            .app_data_dir()
            .map_err(|err| StorageError::Io(std::io::Error::other(err.to_string())))
    }

    fn emit_store_updated(&self, payload: StoreUpdatedPayload) {
        if let Err(error) = self.app.emit(EVENT_STORE_UPDATED, payload) {
            log::warn!("failed to emit {EVENT_STORE_UPDATED}: {error}");
        }
    }

    fn show_alert(&self, message: &str) {
        self.app
            .dialog()
            .message(message)
            .kind(MessageDialogKind::Warning)
            .show(|_| {});
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

fn calendar_view_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<CalendarView> {
    let today = ctx.today();
    ok(state.with_calendar(|screen| {
        screen.set_today(today);
        calendar_view_once(screen)
    }))
}

fn calendar_select_day_impl(state: &AppState, date: String) -> CommandResult<CalendarView> {
    let date = match parse_date(&date) {
        Ok(date) => date,
        Err(e) => return err(&e),
    };
    ok(state.with_calendar(|screen| {
        screen.select_day(date);
        calendar_view_once(screen)
    }))
}

fn calendar_show_month_impl(state: &AppState, offset: i32) -> CommandResult<CalendarView> {
    ok(state.with_calendar(|screen| {
        screen.show_month(offset);
        calendar_view_once(screen)
    }))
}

fn calendar_press_add_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<CalendarView> {
    let (pressed, view) = state.with_calendar(|screen| {
        let pressed = screen.press_add();
        (pressed, calendar_view_once(screen))
    });
    if let Err(alert) = pressed {
        log::debug!("add pressed without a selected date");
        ctx.show_alert(alert.message());
    }
    ok(view)
}

fn calendar_save_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    text: String,
) -> CommandResult<CalendarView> {
    let (outcome, revision, view) = state.with_calendar(|screen| {
        screen.set_new_task_text(text);
        let outcome = screen.save_new_task();
        (outcome, screen.revision(), calendar_view_once(screen))
    });
    notify_saved(ctx, Route::Calendar, outcome, revision);
    ok(view)
}

fn calendar_cancel_add_impl(state: &AppState) -> CommandResult<CalendarView> {
    ok(state.with_calendar(|screen| {
        screen.cancel_add();
        calendar_view_once(screen)
    }))
}

fn calendar_open_edit_impl(state: &AppState, task_id: u64) -> CommandResult<CalendarView> {
    state.with_calendar(|screen| {
        if !screen.open_edit(TaskId(task_id)) {
            return err("task not found");
        }
        ok(calendar_view_once(screen))
    })
}

fn calendar_save_edit_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    text: String,
) -> CommandResult<CalendarView> {
    let (outcome, revision, view) = state.with_calendar(|screen| {
        screen.set_edited_text(text);
        let outcome = screen.save_edit();
        (outcome, screen.revision(), calendar_view_once(screen))
    });
    notify_saved(ctx, Route::Calendar, outcome, revision);
    ok(view)
}

fn calendar_delete_task_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<CalendarView> {
    let (outcome, revision, view) = state.with_calendar(|screen| {
        let outcome = screen.delete_task();
        (outcome, screen.revision(), calendar_view_once(screen))
    });
    notify_saved(ctx, Route::Calendar, outcome, revision);
    ok(view)
}

fn calendar_cancel_edit_impl(state: &AppState) -> CommandResult<CalendarView> {
    ok(state.with_calendar(|screen| {
        screen.cancel_edit();
        calendar_view_once(screen)
    }))
}

fn calendar_refresh_impl(state: &AppState) -> CommandResult<CalendarView> {
    ok(state.with_calendar(|screen| {
        screen.refresh();
        calendar_view_once(screen)
    }))
}

fn open_all_tasks_impl(state: &AppState) -> CommandResult<AllTasksView> {
    state.open_all_tasks();
    all_tasks_view_impl(state)
}

/// Going back re-reads the store so the calendar sees the all-tasks writes.
fn close_all_tasks_impl(state: &AppState) -> CommandResult<CalendarView> {
    state.close_all_tasks();
    ok(state.with_calendar(|screen| {
        screen.refresh();
        calendar_view_once(screen)
    }))
}

fn all_tasks_view_impl(state: &AppState) -> CommandResult<AllTasksView> {
    match state.with_all_tasks(all_tasks_view_once) {
        Some(view) => ok(view),
        None => err(ALL_TASKS_CLOSED),
    }
}

fn with_target<T>(
    state: &AppState,
    date: &str,
    task_id: u64,
    f: impl FnOnce(&mut AllTasksScreen, TaskRef) -> CommandResult<T>,
) -> CommandResult<T> {
    let date = match parse_date(date) {
        Ok(date) => date,
        Err(e) => return err(&e),
    };
    let target = TaskRef {
        date,
        id: TaskId(task_id),
    };
    state
        .with_all_tasks(|screen| f(screen, target))
        .unwrap_or_else(|| err(ALL_TASKS_CLOSED))
}

fn all_tasks_begin_edit_impl(
    state: &AppState,
    date: String,
    task_id: u64,
) -> CommandResult<AllTasksView> {
    with_target(state, &date, task_id, |screen, target| {
        if !screen.begin_edit(target) {
            return err("task not found");
        }
        ok(all_tasks_view_once(screen))
    })
}

fn all_tasks_commit_edit_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    text: String,
) -> CommandResult<AllTasksView> {
    let Some((outcome, revision, view)) = state.with_all_tasks(|screen| {
        screen.set_edit_text(text);
        let outcome = screen.commit_edit();
        (outcome, screen.revision(), all_tasks_view_once(screen))
    }) else {
        return err(ALL_TASKS_CLOSED);
    };
    notify_saved(ctx, Route::AllTasks, outcome, revision);
    ok(view)
}

fn all_tasks_cancel_edit_impl(state: &AppState) -> CommandResult<AllTasksView> {
    match state.with_all_tasks(|screen| {
        screen.cancel_edit();
        all_tasks_view_once(screen)
    }) {
        Some(view) => ok(view),
        None => err(ALL_TASKS_CLOSED),
    }
}

fn all_tasks_request_delete_impl(
    state: &AppState,
    date: String,
    task_id: u64,
) -> CommandResult<AllTasksView> {
    with_target(state, &date, task_id, |screen, target| {
        if !screen.request_delete(target) {
            return err("task not found");
        }
        ok(all_tasks_view_once(screen))
    })
}

fn all_tasks_confirm_delete_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
) -> CommandResult<AllTasksView> {
    let Some((outcome, revision, view)) = state.with_all_tasks(|screen| {
        let outcome = screen.confirm_delete();
        (outcome, screen.revision(), all_tasks_view_once(screen))
    }) else {
        return err(ALL_TASKS_CLOSED);
    };
    notify_saved(ctx, Route::AllTasks, outcome, revision);
    ok(view)
}

fn all_tasks_cancel_delete_impl(state: &AppState) -> CommandResult<AllTasksView> {
    match state.with_all_tasks(|screen| {
        screen.cancel_delete();
        all_tasks_view_once(screen)
    }) {
        Some(view) => ok(view),
        None => err(ALL_TASKS_CLOSED),
    }
}

fn load_settings_impl(state: &AppState) -> CommandResult<Settings> {
    ok(state.settings())
}

fn update_settings_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    settings: Settings,
) -> CommandResult<Settings> {
    let root = match ctx.app_data_dir() {
        Ok(path) => path,
        Err(e) => return err(&format!("app_data_dir error: {e}")),
    };
    let storage = Storage::new(root);
    if let Err(error) = storage.ensure_dirs() {
        return err(&format!("storage error: {error}"));
    }
    if let Err(error) = storage.save_settings(&settings) {
        log::error!("failed to save settings: {error}");
        return err(&format!("storage error: {error}"));
    }
    state.update_settings(settings.clone());
    ok(settings)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_view(app: AppHandle, state: State<AppState>) -> CommandResult<CalendarView> {
    let ctx = TauriCommandCtx { app: &app };
    calendar_view_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_select_day(state: State<AppState>, date: String) -> CommandResult<CalendarView> {
    calendar_select_day_impl(state.inner(), date)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_show_month(state: State<AppState>, offset: i32) -> CommandResult<CalendarView> {
    calendar_show_month_impl(state.inner(), offset)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_press_add(app: AppHandle, state: State<AppState>) -> CommandResult<CalendarView> {
    let ctx = TauriCommandCtx { app: &app };
    calendar_press_add_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_save_task(
    app: AppHandle,
    state: State<AppState>,
    text: String,
) -> CommandResult<CalendarView> {
    let ctx = TauriCommandCtx { app: &app };
    calendar_save_task_impl(&ctx, state.inner(), text)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_cancel_add(state: State<AppState>) -> CommandResult<CalendarView> {
    calendar_cancel_add_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_open_edit(state: State<AppState>, task_id: u64) -> CommandResult<CalendarView> {
    calendar_open_edit_impl(state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_save_edit(
    app: AppHandle,
    state: State<AppState>,
    text: String,
) -> CommandResult<CalendarView> {
    let ctx = TauriCommandCtx { app: &app };
    calendar_save_edit_impl(&ctx, state.inner(), text)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_delete_task(app: AppHandle, state: State<AppState>) -> CommandResult<CalendarView> {
    let ctx = TauriCommandCtx { app: &app };
    calendar_delete_task_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_cancel_edit(state: State<AppState>) -> CommandResult<CalendarView> {
    calendar_cancel_edit_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn calendar_refresh(state: State<AppState>) -> CommandResult<CalendarView> {
    calendar_refresh_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn open_all_tasks(state: State<AppState>) -> CommandResult<AllTasksView> {
    open_all_tasks_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn close_all_tasks(state: State<AppState>) -> CommandResult<CalendarView> {
    close_all_tasks_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_view(state: State<AppState>) -> CommandResult<AllTasksView> {
    all_tasks_view_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_begin_edit(
    state: State<AppState>,
    date: String,
    task_id: u64,
) -> CommandResult<AllTasksView> {
    all_tasks_begin_edit_impl(state.inner(), date, task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_commit_edit(
    app: AppHandle,
    state: State<AppState>,
    text: String,
) -> CommandResult<AllTasksView> {
    let ctx = TauriCommandCtx { app: &app };
    all_tasks_commit_edit_impl(&ctx, state.inner(), text)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_cancel_edit(state: State<AppState>) -> CommandResult<AllTasksView> {
    all_tasks_cancel_edit_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_request_delete(
    state: State<AppState>,
    date: String,
    task_id: u64,
) -> CommandResult<AllTasksView> {
    all_tasks_request_delete_impl(state.inner(), date, task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_confirm_delete(app: AppHandle, state: State<AppState>) -> CommandResult<AllTasksView> {
    let ctx = TauriCommandCtx { app: &app };
    all_tasks_confirm_delete_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn all_tasks_cancel_delete(state: State<AppState>) -> CommandResult<AllTasksView> {
    all_tasks_cancel_delete_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn load_settings(state: State<AppState>) -> CommandResult<Settings> {
    load_settings_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn update_settings(
    app: AppHandle,
    state: State<AppState>,
    settings: Settings,
) -> CommandResult<Settings> {
    let ctx = TauriCommandCtx { app: &app };
    update_settings_impl(&ctx, state.inner(), settings)
}
