use curveq_core::{
    config::DEFAULT_SIGMA,
    engine::AudioEngineHandle,
    mapping::{GAIN_RANGE_NARROW_DB, GAIN_RANGE_WIDE_DB},
};
use ratatui::{
    Frame,
    crossterm::event::KeyCode,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::{
    router::{RouteAction, RouteHandler},
    state::{AppState, SettingsOption},
};

const SIGMA_STEP: f32 = 10.0;
const MIN_SIGMA: f32 = 10.0;

/// Settings route
#[derive(Debug, Clone)]
pub struct SettingsRoute;

impl SettingsRoute {
    /// Step the selected option; `forward` is false for Left
    fn adjust(option: SettingsOption, forward: bool, state: &mut AppState) {
        let accepted = state.editor.update_config(|c| match option {
            SettingsOption::Blend => c.blend = c.blend.next(),
            SettingsOption::Sigma => {
                let step = if forward { SIGMA_STEP } else { -SIGMA_STEP };
                c.sigma = (c.sigma + step).max(MIN_SIGMA);
            }
            SettingsOption::Sampling => c.sampling = c.sampling.next(),
            SettingsOption::GainRange => {
                c.gain_range_db = if c.gain_range_db > GAIN_RANGE_NARROW_DB {
                    GAIN_RANGE_NARROW_DB
                } else {
                    GAIN_RANGE_WIDE_DB
                };
            }
            SettingsOption::CurveFrequency => c.use_curve_frequency = !c.use_curve_frequency,
            SettingsOption::LockAnchors => c.lock_anchor_x = !c.lock_anchor_x,
        });
        if accepted {
            log::info!("{} -> {}", option, value_label(option, state));
        }
    }
}

impl RouteHandler for SettingsRoute {
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        draw_settings_list(frame, area, state);
    }

    fn handle_input(
        &mut self,
        key: KeyCode,
        state: &mut AppState,
        _handle: &AudioEngineHandle,
    ) -> anyhow::Result<RouteAction> {
        match key {
            KeyCode::Up => state.settings.prev_item(),
            KeyCode::Down => state.settings.next_item(),
            KeyCode::Enter | KeyCode::Right | KeyCode::Left => {
                if let Some(option) = state.settings.selected() {
                    Self::adjust(option, key != KeyCode::Left, state);
                }
            }
            KeyCode::Char('d') => {
                state.editor.update_config(|c| c.sigma = DEFAULT_SIGMA);
            }
            _ => {}
        }
        Ok(RouteAction::None)
    }

    fn name(&self) -> &str {
        "Settings"
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![
            ("↑/↓", "Select"),
            ("←/→/Enter", "Change"),
            ("D", "Default Width"),
            ("Tab", "Switch Tab"),
            ("Q", "Quit"),
        ]
    }
}

fn value_label(option: SettingsOption, state: &AppState) -> String {
    let config = state.editor.config();
    let on_off = |flag: bool| String::from(if flag { "On" } else { "Off" });
    match option {
        SettingsOption::Blend => config.blend.to_string(),
        SettingsOption::Sigma => format!("{:.0} px", config.sigma),
        SettingsOption::Sampling => config.sampling.to_string(),
        SettingsOption::GainRange => format!("±{:.0} dB", config.gain_range_db),
        SettingsOption::CurveFrequency => on_off(config.use_curve_frequency),
        SettingsOption::LockAnchors => on_off(config.lock_anchor_x),
    }
}

fn draw_settings_list(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" Settings ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let items: Vec<ListItem> = state
        .settings
        .items
        .iter()
        .enumerate()
        .map(|(i, &option)| {
            let is_selected = state.settings.selected_index == i;
            let prefix = if is_selected { "▶ " } else { "  " };
            let style = if is_selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{:<24}", prefix, option.to_string()), style),
                Span::styled(
                    format!("[{}]", value_label(option, state)),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    f.render_widget(List::new(items), inner);
}
