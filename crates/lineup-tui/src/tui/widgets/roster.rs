// Squad widget: roster members not yet on the pitch.
//
// "[A] Anna Puig", cursor row highlighted when the panel has focus, the
// carried member marked while a drag is pending. Shows loading and failure
// states instead of the list.

use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use ratatui::Frame;

use lineup_core::lineup::{RosterMember, RosterStatus};

use crate::tui::{Focus, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let focused = state.focus == Focus::Roster && !state.show_viewer;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let Some(snapshot) = &state.snapshot else {
        render_message(frame, area, "Squad", border_style, "  Waiting for editor...", Color::DarkGray);
        return;
    };

    match &snapshot.roster_status {
        RosterStatus::Loading => {
            render_message(frame, area, "Squad", border_style, "  Loading roster...", Color::Yellow);
            return;
        }
        RosterStatus::Failed(message) => {
            let text = format!("  Could not load roster: {}\n  Press r to retry.", message);
            render_message(frame, area, "Squad", border_style, &text, Color::Red);
            return;
        }
        RosterStatus::Ready => {}
    }

    let title = format!("Squad ({} available)", snapshot.available.len());
    if snapshot.available.is_empty() {
        render_message(frame, area, &title, border_style, "  Everyone is on the pitch.", Color::DarkGray);
        return;
    }

    let carried = snapshot.pending.as_ref().map(|p| &p.member.id);
    let visible_rows = (area.height as usize).saturating_sub(2);
    let total = snapshot.available.len();
    let scroll_offset = scroll_offset(state.roster_cursor, visible_rows, total);

    let items: Vec<ListItem> = snapshot
        .available
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_rows.max(1))
        .map(|(i, member)| {
            let selected = focused && i == state.roster_cursor;
            let is_carried = carried == Some(&member.id);
            format_member(member, selected, is_carried)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    frame.render_widget(list, area);

    if total > visible_rows {
        let mut scrollbar_state =
            ScrollbarState::new(total.saturating_sub(visible_rows)).position(scroll_offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }
}

fn render_message(frame: &mut Frame, area: Rect, title: &str, border: Style, text: &str, color: Color) {
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title.to_string()),
        );
    frame.render_widget(paragraph, area);
}

/// First visible row so that `cursor` stays on screen.
fn scroll_offset(cursor: usize, visible_rows: usize, total: usize) -> usize {
    let max_offset = total.saturating_sub(visible_rows);
    cursor.saturating_sub(visible_rows.saturating_sub(1)).min(max_offset)
}

fn format_member<'a>(member: &RosterMember, selected: bool, carried: bool) -> ListItem<'a> {
    let marker = if carried { "›" } else { " " };
    let text = format!("{}{}", marker, format_member_text(member));
    let style = if selected {
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else if carried {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    ListItem::new(Line::from(Span::styled(text, style)))
}

/// Plain text form of a squad row, with the initial standing in for the
/// avatar.
pub fn format_member_text(member: &RosterMember) -> String {
    format!("[{}] {}", member.initial(), member.full_name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
