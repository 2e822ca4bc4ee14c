// Pitch widget: formation slots drawn at their anchor positions.
//
// `render` draws the editable lineup from the snapshot; `render_saved` draws
// the read-only projection of the last saved lineup.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use lineup_core::formation::Anchor;
use lineup_core::lineup::DragSource;
use lineup_core::viewer::{self, LineupView, PitchView};

use crate::protocol::{EditorSnapshot, SlotRow};
use crate::tui::{Focus, ViewState};

const MARKER_MIN_WIDTH: u16 = 8;
const MARKER_MAX_WIDTH: u16 = 18;

/// Terminal cell rectangle of a marker `width` x `height` centered on
/// `anchor`, clamped so it stays inside `area`.
pub fn marker_rect(anchor: Anchor, area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let center_x = area.x as f32 + area.width as f32 * anchor.x_percent / 100.0;
    let center_y = area.y as f32 + area.height as f32 * anchor.y_percent / 100.0;

    let x = (center_x - width as f32 / 2.0).round().max(area.x as f32) as u16;
    let y = (center_y - height as f32 / 2.0).round().max(area.y as f32) as u16;
    Rect::new(
        x.min(area.right() - width),
        y.min(area.bottom() - height),
        width,
        height,
    )
}

fn marker_width(area: Rect) -> u16 {
    (area.width / 5).clamp(MARKER_MIN_WIDTH, MARKER_MAX_WIDTH)
}

/// Editor text for a slot: `GK Anna Puig` or `GK ·`.
pub fn format_slot_text(slot: &SlotRow) -> String {
    match &slot.occupant {
        Some(member) => format!("{} {}", slot.label, member.full_name),
        None => format!("{} ·", slot.label),
    }
}

// ---------------------------------------------------------------------------
// Editor pitch
// ---------------------------------------------------------------------------

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let focused = state.focus == Focus::Pitch;
    let Some(snapshot) = &state.snapshot else {
        let block = pitch_block("Pitch".to_string(), focused);
        frame.render_widget(Paragraph::new("  Waiting for editor...").block(block), area);
        return;
    };

    let block = pitch_block(editor_title(snapshot), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    draw_halfway_line(frame, inner);

    let width = marker_width(inner);
    let carried_from = snapshot.pending.as_ref().and_then(|p| match p.source {
        DragSource::Slot(id) => Some(id),
        DragSource::Roster => None,
    });

    for (i, slot) in snapshot.slots.iter().enumerate() {
        let rect = marker_rect(slot.anchor, inner, width, 1);
        let style = if focused && i == state.pitch_cursor {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else if carried_from == Some(slot.slot_id) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if slot.occupant.is_some() {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let marker = Paragraph::new(Line::from(Span::styled(format_slot_text(slot), style)))
            .alignment(Alignment::Center);
        frame.render_widget(marker, rect);
    }
}

fn editor_title(snapshot: &EditorSnapshot) -> String {
    let mut title = format!("Pitch {}", snapshot.formation);
    if let Some(pending) = &snapshot.pending {
        title.push_str(&format!(" | placing {}", pending.member.full_name));
    }
    title
}

// ---------------------------------------------------------------------------
// Saved lineup preview
// ---------------------------------------------------------------------------

pub fn render_saved(frame: &mut Frame, area: Rect, state: &ViewState) {
    let view = state.snapshot.as_ref().map(|s| &s.saved_view);
    match view {
        Some(LineupView::Pitch(pitch)) => render_pitch_view(frame, area, pitch),
        _ => {
            let block = pitch_block("Saved lineup".to_string(), false);
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let message = Paragraph::new(Span::styled(
                "Lineup not available",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center);
            let row = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, inner.height.min(1));
            frame.render_widget(message, row);
        }
    }
}

fn render_pitch_view(frame: &mut Frame, area: Rect, pitch: &PitchView) {
    let title = format!(
        "Saved lineup {} ({}/{})",
        pitch.formation,
        pitch.filled_count(),
        pitch.markers.len()
    );
    let block = pitch_block(title, false);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    draw_halfway_line(frame, inner);

    let width = marker_width(inner);
    for marker in &pitch.markers {
        let rect = marker_rect(marker.anchor, inner, width, 1);
        let (text, style) = match &marker.occupant {
            Some(occupant) => (
                format!("({}) {}", occupant.initial, occupant.name),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            None => (viewer::format_marker_text(marker), Style::default().fg(Color::DarkGray)),
        };
        let paragraph =
            Paragraph::new(Line::from(Span::styled(text, style))).alignment(Alignment::Center);
        frame.render_widget(paragraph, rect);
    }
}

// ---------------------------------------------------------------------------
// Shared drawing
// ---------------------------------------------------------------------------

fn pitch_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::Green };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn draw_halfway_line(frame: &mut Frame, inner: Rect) {
    if inner.height < 3 || inner.width == 0 {
        return;
    }
    let row = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1);
    let line = Paragraph::new("─".repeat(inner.width as usize))
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::DIM));
    frame.render_widget(line, row);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
