use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;

use crate::all_tasks::AllTasksScreen;
use crate::calendar::CalendarScreen;
use crate::models::Settings;
use crate::store::TaskRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Calendar,
    /// The all-tasks list, linked from the calendar's profile icon.
    AllTasks,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(repo: TaskRepository, settings: Settings, today: NaiveDate) -> Self {
        let calendar = CalendarScreen::mount(
            repo.clone(),
            settings.week_start,
            settings.seed_example_tasks,
            today,
        );
        Self {
            inner: Arc::new(Mutex::new(AppData {
                repo,
                settings,
                route: Route::Calendar,
                calendar,
                all_tasks: None,
            })),
        }
    }

    pub fn route(&self) -> Route {
        let guard = self.inner.lock().expect("state poisoned");
        guard.route
    }

    pub fn settings(&self) -> Settings {
        let guard = self.inner.lock().expect("state poisoned");
        guard.settings.clone()
    }

    /// Applies new settings to the mounted screens. The tasks key only takes effect on next launch.
    pub fn update_settings(&self, settings: Settings) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.calendar.set_week_start(settings.week_start);
        guard.settings = settings;
    }

    pub fn with_calendar<R>(&self, f: impl FnOnce(&mut CalendarScreen) -> R) -> R {
        let mut guard = self.inner.lock().expect("state poisoned");
        f(&mut guard.calendar)
    }

    /// Runs `f` against the all-tasks screen, or returns `None` when it is not open.
    pub fn with_all_tasks<R>(&self, f: impl FnOnce(&mut AllTasksScreen) -> R) -> Option<R> {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.all_tasks.as_mut().map(f)
    }

    /// Navigates to the all-tasks route, mounting a fresh screen that loads the store.
    pub fn open_all_tasks(&self) {
        let mut guard = self.inner.lock().expect("state poisoned");
        let screen = AllTasksScreen::mount(guard.repo.clone());
        guard.all_tasks = Some(screen);
        guard.route = Route::AllTasks;
    }

    /// Back to the calendar, which stayed mounted underneath.
    pub fn close_all_tasks(&self) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.all_tasks = None;
        guard.route = Route::Calendar;
    }
}

struct AppData {
    repo: TaskRepository,
    settings: Settings,
    route: Route,
    calendar: CalendarScreen,
    all_tasks: Option<AllTasksScreen>,
}
