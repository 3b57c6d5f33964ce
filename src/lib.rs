pub mod app;
pub mod debounce;
pub mod listing;
pub mod picker;
pub mod pipeline;
pub mod search;
pub mod ui_model;
pub mod watcher;
