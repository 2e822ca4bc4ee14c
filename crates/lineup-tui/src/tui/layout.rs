// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-----------------+--------------------------------+
// | Squad (30%)     | Pitch (70%)                    |
// |                 |                                |
// +-----------------+--------------------------------+
// | Help / Notice Bar (1 row)                         |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Club, target, formation, roster and save status.
    pub status_bar: Rect,
    /// Available (unassigned) squad members.
    pub roster: Rect,
    /// Formation slots drawn at their pitch positions.
    pub pitch: Rect,
    /// Key hints, or the latest notice.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(10),   // squad + pitch
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(vertical[1]);

    AppLayout {
        status_bar: vertical[0],
        roster: horizontal[0],
        pitch: horizontal[1],
        help_bar: vertical[2],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
