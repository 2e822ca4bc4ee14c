// TUI widget modules for each editor panel.

pub mod pitch;
pub mod quit_confirm;
pub mod roster;
pub mod status_bar;
