// Frame description for whatever draws the editor. The core never touches
// a drawing surface; it hands over geometry in curve-space.

use crate::{
    config::CurveConfig,
    curve::{ControlPoint, Point, PointRole},
    mapping::CoordinateMapping,
    session::CurveSnapshot,
};

pub const POINT_RADIUS: f32 = 5.0;

/// Frequencies labelled along the bottom of the plane
pub const SCALE_FREQUENCIES: [f32; 10] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0,
];

/// Drawing primitives the editor needs
pub trait Renderer {
    fn stroke_path(&mut self, path: &[Point]);
    fn fill_circle(&mut self, center: Point, radius: f32, role: PointRole);
    fn fill_text(&mut self, text: &str, at: Point);
    /// Bars are already placed on the plane; `width`/`height` is the plane size
    fn draw_spectrum_bars(&mut self, bars: &[SpectrumBar], width: f32, height: f32);
}

/// One analyser bin, mapped onto curve-space x
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBar {
    pub x_start: f32,
    pub x_end: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub at: Point,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameData {
    pub width: f32,
    pub height: f32,
    pub curve: Vec<Point>,
    pub points: Vec<ControlPoint>,
    pub labels: Vec<Label>,
    pub spectrum: Vec<SpectrumBar>,
}

impl FrameData {
    /// `spectrum` is an analyser snapshot together with its sample rate
    pub fn build(
        snapshot: &CurveSnapshot,
        config: &CurveConfig,
        spectrum: Option<(&[u8], u32)>,
    ) -> Self {
        let mapping = CoordinateMapping::new(config);
        let curve = snapshot.view(config).polyline(config.polyline_steps);

        let labels = SCALE_FREQUENCIES
            .iter()
            .map(|&f| Label {
                text: frequency_label(f),
                at: Point::new(mapping.to_x(f), config.height),
            })
            .collect();

        let spectrum = spectrum
            .map(|(magnitudes, sample_rate)| spectrum_bars(&mapping, magnitudes, sample_rate))
            .unwrap_or_default();

        Self {
            width: config.width,
            height: config.height,
            curve,
            points: snapshot.points.to_vec(),
            labels,
            spectrum,
        }
    }
}

/// Analyser overlay: place each audible bin on the plane.
/// Silent bins and bins outside 20 Hz..20 kHz produce no bar.
pub fn spectrum_bars(
    mapping: &CoordinateMapping,
    magnitudes: &[u8],
    sample_rate: u32,
) -> Vec<SpectrumBar> {
    magnitudes
        .iter()
        .enumerate()
        .filter(|(_, m)| **m > 0)
        .filter_map(|(bin, &m)| {
            let (x_start, x_end) = mapping.bin_span(bin, magnitudes.len(), sample_rate)?;
            Some(SpectrumBar {
                x_start,
                x_end,
                height: mapping.magnitude_to_height(m),
            })
        })
        .collect()
}

/// Draw back to front: spectrum, curve, points, scale
pub fn render_frame(frame: &FrameData, renderer: &mut impl Renderer) {
    if !frame.spectrum.is_empty() {
        renderer.draw_spectrum_bars(&frame.spectrum, frame.width, frame.height);
    }
    renderer.stroke_path(&frame.curve);
    for point in &frame.points {
        renderer.fill_circle(point.pos, POINT_RADIUS, point.role);
    }
    for label in &frame.labels {
        renderer.fill_text(&label.text, label.at);
    }
}

pub fn frequency_label(frequency: f32) -> String {
    if frequency >= 1000.0 {
        let khz = frequency / 1000.0;
        if khz.fract() == 0.0 {
            format!("{}k", khz as u32)
        } else {
            format!("{:.1}k", khz)
        }
    } else {
        format!("{}", frequency.round() as u32)
    }
}
