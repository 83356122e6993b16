pub mod codec;
pub mod config;
pub mod editor;
pub mod editor_display;
pub mod error;
pub mod grading;
pub mod preview;
pub mod render;
pub mod segment;
pub mod task_file;
pub mod theme;
