//! Application runtime composition modules.

pub(crate) mod config;
pub(crate) mod exit_handler;
pub(crate) mod progress_display;
pub(crate) mod runtime;
pub(crate) mod terminal;
