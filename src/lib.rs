pub mod all_tasks;
pub mod calendar;
#[cfg_attr(not(feature = "app"), allow(dead_code))]
mod commands;
pub mod events;
pub mod logging;
pub mod models;
pub mod month;
pub mod state;
pub mod storage;
pub mod store;

#[cfg(all(feature = "app", not(test)))]
use std::sync::Arc;

#[cfg(all(feature = "app", not(test)))]
use tauri::Manager;

#[cfg(all(feature = "app", not(test)))]
use crate::commands::*;
#[cfg(all(feature = "app", not(test)))]
use crate::logging::init_logging;
#[cfg(all(feature = "app", not(test)))]
use crate::models::Settings;
#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::storage::Storage;
#[cfg(all(feature = "app", not(test)))]
use crate::store::TaskRepository;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
#[cfg(all(feature = "app", not(test)))]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            if let Err(error) = init_logging(&data_dir) {
                eprintln!("failed to initialize logging: {error}");
            }

            let storage = Storage::new(data_dir);
            storage.ensure_dirs()?;
            let settings = match storage.load_settings() {
                Ok(file) => file.settings,
                Err(error) => {
                    log::info!("using default settings: {error}");
                    Settings::default()
                }
            };

            let repo = TaskRepository::with_key(Arc::new(storage), settings.tasks_key.clone());
            let state = AppState::new(repo, settings, chrono::Local::now().date_naive());
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            calendar_view,
            calendar_select_day,
            calendar_show_month,
            calendar_press_add,
            calendar_save_task,
            calendar_cancel_add,
            calendar_open_edit,
            calendar_save_edit,
            calendar_delete_task,
            calendar_cancel_edit,
            calendar_refresh,
            open_all_tasks,
            close_all_tasks,
            all_tasks_view,
            all_tasks_begin_edit,
            all_tasks_commit_edit,
            all_tasks_cancel_edit,
            all_tasks_request_delete,
            all_tasks_confirm_delete,
            all_tasks_cancel_delete,
            load_settings,
            update_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
