use std::{cell::Cell, time::Instant};

use curveq_core::{
    CurveConfig, InteractionOutcome, InteractionState, Point, PointerEvent,
    engine::AudioEngineHandle,
    render::{FrameData, render_frame},
};
use ratatui::{
    Frame,
    crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind},
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    widgets::{Block, Borders, canvas::Canvas},
};

use crate::{
    canvas::CanvasPainter,
    router::{RouteAction, RouteHandler},
    state::AppState,
};

/// The editor itself: the curve on a canvas, driven by the mouse
#[derive(Debug)]
pub struct CurveRoute {
    // render() only gets &self; mouse mapping needs the last canvas area
    canvas_area: Cell<Rect>,
    pressed_at: Option<(u16, u16)>,
    dragged: bool,
}

impl CurveRoute {
    pub fn new() -> Self {
        Self {
            canvas_area: Cell::new(Rect::default()),
            pressed_at: None,
            dragged: false,
        }
    }

    /// Terminal cells are far coarser than the plane, so the hit radius
    /// follows the size of one cell.
    fn sync_hit_radius(&self, state: &mut AppState) {
        let area = self.canvas_area.get();
        if area.width == 0 || area.height == 0 {
            return;
        }
        let config = state.editor.config();
        let radius = cell_hit_radius(config, area);
        if (radius - config.hit_radius).abs() > 0.5 {
            state.editor.update_config(|c| c.hit_radius = radius);
        }
    }
}

/// Map a terminal cell to the centre of its patch of curve-space.
/// None when the cell lies outside the canvas.
pub fn cell_to_curve(column: u16, row: u16, area: Rect, config: &CurveConfig) -> Option<Point> {
    let inside = column >= area.x
        && column < area.x + area.width
        && row >= area.y
        && row < area.y + area.height;
    if !inside {
        return None;
    }
    let x = (column - area.x) as f32 + 0.5;
    let y = (row - area.y) as f32 + 0.5;
    Some(Point::new(
        x / area.width as f32 * config.width,
        y / area.height as f32 * config.height,
    ))
}

pub fn cell_hit_radius(config: &CurveConfig, area: Rect) -> f32 {
    let cell_w = config.width / area.width.max(1) as f32;
    let cell_h = config.height / area.height.max(1) as f32;
    cell_w.hypot(cell_h) * 0.6
}

impl RouteHandler for CurveRoute {
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let config = state.editor.config();
        let dragging = matches!(
            state.editor.interaction_state(),
            InteractionState::Dragging(_)
        );

        let title = format!(
            " Curve  [{} | {} | ±{:.0} dB] ",
            config.blend, config.sampling, config.gain_range_db
        );
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if dragging {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            });

        let inner = block.inner(area);
        self.canvas_area.set(inner);

        let snapshot = state.editor.snapshot();
        let spectrum = state
            .audio
            .spectrum()
            .zip(state.audio.sample_rate());
        let frame_data = FrameData::build(&snapshot, config, spectrum);

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds([0.0, config.width as f64])
            .y_bounds([0.0, config.height as f64])
            .paint(|ctx| {
                let mut painter = CanvasPainter::new(ctx, frame_data.height);
                render_frame(&frame_data, &mut painter);
            });

        frame.render_widget(canvas, area);
    }

    fn handle_input(
        &mut self,
        key: KeyCode,
        state: &mut AppState,
        _handle: &AudioEngineHandle,
    ) -> anyhow::Result<RouteAction> {
        match key {
            KeyCode::Char('b') => {
                state.editor.update_config(|c| c.blend = c.blend.next());
            }
            KeyCode::Char('m') => {
                state.editor.update_config(|c| c.sampling = c.sampling.next());
            }
            _ => {}
        }
        Ok(RouteAction::None)
    }

    fn handle_mouse(
        &mut self,
        mouse: MouseEvent,
        state: &mut AppState,
        now: Instant,
    ) -> anyhow::Result<RouteAction> {
        self.sync_hit_radius(state);
        let area = self.canvas_area.get();
        let cell = (mouse.column, mouse.row);
        let pos = cell_to_curve(mouse.column, mouse.row, area, state.editor.config());

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(pos) = pos else {
                    return Ok(RouteAction::None);
                };
                self.pressed_at = Some(cell);
                self.dragged = false;
                state.editor.handle_pointer(PointerEvent::Down(pos), now);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let event = match pos {
                    Some(pos) => {
                        self.dragged |= self.pressed_at != Some(cell);
                        PointerEvent::Move(pos)
                    }
                    None => PointerEvent::Leave,
                };
                state.editor.handle_pointer(event, now);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                state.editor.handle_pointer(PointerEvent::Up, now);
                // the terminal has no click event; a press and release on the
                // same cell without movement is one
                let clicked = self.pressed_at.take() == Some(cell) && !self.dragged;
                if let (true, Some(pos)) = (clicked, pos) {
                    if let InteractionOutcome::PointAdded(i) =
                        state.editor.handle_pointer(PointerEvent::Click(pos), now)
                    {
                        state.status_message = format!("Added point {}", i);
                    }
                }
            }
            _ => {}
        }
        Ok(RouteAction::None)
    }

    fn name(&self) -> &str {
        "Curve"
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![
            ("Click", "Add Point"),
            ("Drag", "Move Point"),
            ("B", "Blend"),
            ("M", "Sampling"),
            ("Space", "Play/Pause"),
            ("Tab", "Switch Tab"),
            ("Q", "Quit"),
        ]
    }
}
