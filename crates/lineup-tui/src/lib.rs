// Library root: re-exports the front end's modules so integration tests can
// drive the orchestrator and render widgets.

pub mod app;
pub mod protocol;
pub mod tui;
