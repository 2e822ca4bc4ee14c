// Status bar widget: club, lineup target, formation fill, roster and save
// state.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use lineup_core::lineup::{RosterStatus, SaveStatus};

use crate::protocol::EditorSnapshot;
use crate::tui::ViewState;

/// Layout: [club] | [target] | [formation filled/total] | [roster] | [save]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let spans = match &state.snapshot {
        Some(snapshot) => snapshot_spans(snapshot),
        None => vec![Span::styled(" Loading...", Style::default().fg(Color::Gray))],
    };
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

fn snapshot_spans(snapshot: &EditorSnapshot) -> Vec<Span<'static>> {
    let sep = || Span::styled(" | ", Style::default().fg(Color::Gray));

    let mut spans = vec![
        Span::styled(
            format!(" {}", snapshot.club_name),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(snapshot.target.clone(), Style::default().fg(Color::White)),
        sep(),
        Span::styled(formation_text(snapshot), Style::default().fg(Color::Cyan)),
    ];

    let (roster, roster_color) = roster_indicator(&snapshot.roster_status);
    spans.push(sep());
    spans.push(Span::styled(roster, Style::default().fg(roster_color)));

    let (save, save_color) = save_indicator(&snapshot.save_status);
    spans.push(sep());
    spans.push(Span::styled(save, Style::default().fg(save_color)));
    spans
}

/// e.g. "F7 3/7" or "F7 3/7 (+2 hidden)".
pub fn formation_text(snapshot: &EditorSnapshot) -> String {
    let mut text = format!(
        "{} {}/{}",
        snapshot.formation,
        snapshot.filled_count(),
        snapshot.slots.len()
    );
    if snapshot.hidden_count > 0 {
        text.push_str(&format!(" (+{} hidden)", snapshot.hidden_count));
    }
    text
}

pub fn roster_indicator(status: &RosterStatus) -> (&'static str, Color) {
    match status {
        RosterStatus::Loading => ("Roster loading", Color::Yellow),
        RosterStatus::Ready => ("Roster ready", Color::Green),
        RosterStatus::Failed(_) => ("Roster unavailable", Color::Red),
    }
}

pub fn save_indicator(status: &SaveStatus) -> (&'static str, Color) {
    match status {
        SaveStatus::Idle => ("Not saved", Color::Gray),
        SaveStatus::Saving => ("Saving...", Color::Yellow),
        SaveStatus::Saved => ("● Saved", Color::Green),
        SaveStatus::Failed(_) => ("● Save failed", Color::Red),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::fixtures;

    #[test]
    fn formation_text_counts_filled_slots() {
        let mut snapshot = fixtures::snapshot();
        assert_eq!(formation_text(&snapshot), "F7 1/7");
        snapshot.hidden_count = 2;
        assert_eq!(formation_text(&snapshot), "F7 1/7 (+2 hidden)");
    }

    #[test]
    fn indicators() {
        assert_eq!(roster_indicator(&RosterStatus::Ready).1, Color::Green);
        assert_eq!(roster_indicator(&RosterStatus::Failed("x".into())).1, Color::Red);
        assert_eq!(save_indicator(&SaveStatus::Saving).0, "Saving...");
        assert_eq!(save_indicator(&SaveStatus::Failed("x".into())).1, Color::Red);
    }

    #[test]
    fn spans_include_target_and_save_state() {
        let mut snapshot = fixtures::snapshot();
        snapshot.save_status = SaveStatus::Saved;
        let text: String = snapshot_spans(&snapshot)
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(
            text,
            " CF Demo | match m1 | F7 1/7 | Roster ready | ● Saved"
        );
    }

    #[test]
    fn render_does_not_panic_with_defaults() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
