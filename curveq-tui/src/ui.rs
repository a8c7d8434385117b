use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
};

use crate::{
    router::{Router, tab_names},
    state::{AppState, PlaybackStatus},
};

/// Draw the TUI interface
pub fn draw(f: &mut Frame, state: &AppState, router: &Router) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Route content
            Constraint::Length(3), // Controls info
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], router);
    router.current().render(f, chunks[1], state);
    draw_controls(f, chunks[2], state, router);
    draw_status(f, chunks[3], state);
}

fn draw_tabs(f: &mut Frame, area: Rect, router: &Router) {
    let names = tab_names();
    let selected = names
        .iter()
        .position(|n| *n == router.current().name())
        .unwrap_or(0);

    let tabs = Tabs::new(names.iter().copied())
        .block(
            Block::default()
                .title(" curveq ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

/// Key hints come from the active route
fn draw_controls(f: &mut Frame, area: Rect, state: &AppState, router: &Router) {
    let controls: Vec<Span> = router
        .current()
        .help_items(state)
        .into_iter()
        .flat_map(|(key, label)| {
            let key_style = match key {
                "Tab" => Style::default().fg(Color::Magenta),
                "Q" => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::Yellow),
            };
            [
                Span::styled(format!("[{}]", key), key_style),
                Span::raw(format!(" {}  ", label)),
            ]
        })
        .collect();

    let paragraph = Paragraph::new(Line::from(controls))
        .block(Block::default().borders(Borders::ALL).title(" Controls "));
    f.render_widget(paragraph, area);
}

fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let status_style = if state.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if state.is_playing() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let playback = match state.playback {
        PlaybackStatus::Idle => "⏹ Idle",
        PlaybackStatus::Playing => "▶ Playing",
        PlaybackStatus::Paused => "⏸ Paused",
        PlaybackStatus::Stopped => "⏹ Stopped",
    };
    let track = state
        .track
        .as_ref()
        .map(|t| format!("{} Hz, {} ch", t.sample_rate, t.channels))
        .unwrap_or_else(|| "no track".to_string());
    let points = format!(
        "Points: {}/{}",
        state.editor.points().len(),
        state.editor.config().max_points
    );
    let message = state
        .error_message
        .as_deref()
        .unwrap_or(&state.status_message);

    let status_text = format!("{}  |  {}  |  {}  |  {}", message, playback, track, points);

    let paragraph = Paragraph::new(status_text)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL).title(" Status "));

    f.render_widget(paragraph, area);
}
