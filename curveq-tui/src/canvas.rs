use curveq_core::{
    Point, PointRole,
    render::{Renderer, SpectrumBar},
};
use ratatui::{
    style::{Color, Style},
    text::Span,
    widgets::canvas::{Circle, Context, Line},
};

/// Draws a curveq frame onto a ratatui canvas whose bounds are the curve plane.
///
/// The plane's y axis points down, the canvas' points up, so every y is
/// flipped on the way through.
pub struct CanvasPainter<'a, 'b> {
    ctx: &'a mut Context<'b>,
    height: f64,
}

impl<'a, 'b> CanvasPainter<'a, 'b> {
    pub fn new(ctx: &'a mut Context<'b>, height: f32) -> Self {
        Self {
            ctx,
            height: height as f64,
        }
    }

    fn flip(&self, y: f32) -> f64 {
        self.height - y as f64
    }
}

pub fn role_color(role: PointRole) -> Color {
    match role {
        PointRole::Anchor => Color::Yellow,
        PointRole::Interior => Color::Magenta,
    }
}

impl Renderer for CanvasPainter<'_, '_> {
    fn stroke_path(&mut self, path: &[Point]) {
        for segment in path.windows(2) {
            let (a, b) = (segment[0], segment[1]);
            let line = Line::new(
                a.x as f64,
                self.flip(a.y),
                b.x as f64,
                self.flip(b.y),
                Color::Cyan,
            );
            self.ctx.draw(&line);
        }
        self.ctx.layer();
    }

    fn fill_circle(&mut self, center: Point, radius: f32, role: PointRole) {
        let circle = Circle {
            x: center.x as f64,
            y: self.flip(center.y),
            radius: radius as f64,
            color: role_color(role),
        };
        self.ctx.draw(&circle);
        self.ctx.print(
            center.x as f64,
            self.flip(center.y),
            Span::styled("●", Style::default().fg(role_color(role))),
        );
    }

    fn fill_text(&mut self, text: &str, at: Point) {
        self.ctx.print(
            at.x as f64,
            self.flip(at.y),
            Span::styled(text.to_string(), Style::default().fg(Color::Gray)),
        );
    }

    fn draw_spectrum_bars(&mut self, bars: &[SpectrumBar], _width: f32, height: f32) {
        let floor = self.flip(height);
        for bar in bars {
            let x = ((bar.x_start + bar.x_end) / 2.0) as f64;
            self.ctx.draw(&Line::new(
                x,
                floor,
                x,
                floor + bar.height as f64,
                Color::DarkGray,
            ));
        }
        self.ctx.layer();
    }
}
