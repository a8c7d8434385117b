use std::cell::RefCell;

use curveq_core::{
    dsp::eq::Equalizer,
    engine::AudioEngineHandle,
    mapping::{MAX_FREQUENCY, MIN_FREQUENCY},
    render::frequency_label,
};
use ratatui::{
    Frame,
    crossterm::event::KeyCode,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState},
};

use crate::{
    router::{RouteAction, RouteHandler},
    state::{AppState, DEFAULT_SAMPLE_RATE},
};

/// Points plotted for the realised response
const RESPONSE_POINTS: usize = 120;

/// What the filter bank is actually doing: the combined biquad response and
/// the param of every band.
#[derive(Debug)]
pub struct BandsRoute {
    list_state: RefCell<ListState>,
}

impl BandsRoute {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            list_state: RefCell::new(list_state),
        }
    }
}

impl RouteHandler for BandsRoute {
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(34)])
            .split(area);

        draw_response(frame, chunks[0], state);

        let items: Vec<ListItem> = state
            .audio
            .params()
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let gain_style = if p.gain > 0.05 {
                    Style::default().fg(Color::Green)
                } else if p.gain < -0.05 {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::Gray)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:>2} ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::raw(format!("{:>6} ", frequency_label(p.frequency))),
                    Span::styled(format!("{:>+6.1} dB ", p.gain), gain_style),
                    Span::styled(p.shape.to_string(), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Bands ({}) ", state.audio.bands().len()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut list_state = self.list_state.borrow_mut();
        frame.render_stateful_widget(list, chunks[1], &mut *list_state);
    }

    fn handle_input(
        &mut self,
        key: KeyCode,
        state: &mut AppState,
        _handle: &AudioEngineHandle,
    ) -> anyhow::Result<RouteAction> {
        let count = state.audio.params().len();
        if count == 0 {
            return Ok(RouteAction::None);
        }

        let mut list_state = self.list_state.borrow_mut();
        let selected = list_state.selected().unwrap_or(0);
        match key {
            KeyCode::Up => list_state.select(Some(selected.saturating_sub(1))),
            KeyCode::Down => list_state.select(Some((selected + 1).min(count - 1))),
            KeyCode::Home => list_state.select(Some(0)),
            KeyCode::End => list_state.select(Some(count - 1)),
            _ => {}
        }
        Ok(RouteAction::None)
    }

    fn name(&self) -> &str {
        "Bands"
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![
            ("↑/↓", "Scroll"),
            ("Space", "Play/Pause"),
            ("Tab", "Switch Tab"),
            ("Q", "Quit"),
        ]
    }
}

fn draw_response(f: &mut Frame, area: Rect, state: &AppState) {
    // Build a throwaway equalizer from the last params to plot what the
    // biquads realise, as opposed to what the curve asked for
    let sample_rate = state.audio.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE);
    let mut eq = Equalizer::new(sample_rate, 1);
    eq.set_params(state.audio.params());

    let response: Vec<(f64, f64)> = eq
        .response_curve(RESPONSE_POINTS)
        .iter()
        .map(|(freq, db)| ((*freq as f64).log10(), *db as f64))
        .collect();

    let requested: Vec<(f64, f64)> = state
        .audio
        .params()
        .iter()
        .map(|p| ((p.frequency as f64).log10(), p.gain as f64))
        .collect();

    let datasets = vec![
        Dataset::default()
            .name("Response")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&response),
        Dataset::default()
            .name("Bands")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Yellow))
            .data(&requested),
    ];

    // labels must sit a decade apart to line up with the log axis
    let x_labels = vec![
        Span::styled("20", Style::default().fg(Color::Gray)),
        Span::styled("200", Style::default().fg(Color::Gray)),
        Span::styled("2k", Style::default().fg(Color::Gray)),
        Span::styled("20k", Style::default().fg(Color::Gray)),
    ];

    let range = state.editor.config().gain_range_db as f64;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(" Filter Response @ {} Hz ", sample_rate)),
        )
        .x_axis(
            Axis::default()
                .title("Freq (Hz)")
                .bounds([
                    (MIN_FREQUENCY as f64).log10(),
                    (MAX_FREQUENCY as f64).log10(),
                ])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Gain (dB)")
                .bounds([-range, range])
                .labels(vec![
                    Span::raw(format!("-{:.0}", range)),
                    Span::raw("0"),
                    Span::raw(format!("+{:.0}", range)),
                ]),
        );

    f.render_widget(chart, area);
}
