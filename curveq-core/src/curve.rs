// Curve model: control points and the two blending families used to turn
// them into a smooth curve. Everything here is in curve-space pixels.

use strum::{EnumIter, IntoEnumIterator};

use crate::config::CurveConfig;

/// Gaussian weights below this sum are treated as "no point nearby"
const MIN_GAUSSIAN_WEIGHT: f64 = 1e-6;

/// A position in curve-space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn lerp(&self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PointRole {
    /// Curve endpoint, x pinned to a domain edge
    Anchor,
    /// User placed point between the anchors
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub pos: Point,
    pub role: PointRole,
}

impl ControlPoint {
    pub const fn anchor(x: f32, y: f32) -> Self {
        Self {
            pos: Point::new(x, y),
            role: PointRole::Anchor,
        }
    }

    pub const fn interior(x: f32, y: f32) -> Self {
        Self {
            pos: Point::new(x, y),
            role: PointRole::Interior,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.role == PointRole::Anchor
    }

    /// Same role, new position
    pub fn moved_to(&self, pos: Point) -> Self {
        Self {
            pos,
            role: self.role,
        }
    }
}

/// How the control points are blended into a curve
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum BlendMode {
    /// Bernstein weighted blend of all points, parameterised by t
    #[default]
    Bezier,
    /// Normalised sum of Gaussian bumps centred on the interior points, parameterised by x
    Gaussian,
}

impl BlendMode {
    pub fn next(&self) -> BlendMode {
        let mut modes = BlendMode::iter();
        for mode in modes.by_ref() {
            if mode == *self {
                break;
            }
        }
        modes.next().unwrap_or(BlendMode::Bezier)
    }
}

/// Ordered control points with an anchor at each end.
///
/// Interior points keep their insertion order; they are never re-sorted by x.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPointSet {
    points: Vec<ControlPoint>,
}

impl ControlPointSet {
    /// Two anchors at the domain edges, forming a straight line
    pub fn new(width: f32, left_y: f32, right_y: f32) -> Self {
        Self {
            points: vec![
                ControlPoint::anchor(0.0, left_y),
                ControlPoint::anchor(width, right_y),
            ],
        }
    }

    /// The flat 0 dB seed every editor starts from
    pub fn flat(config: &CurveConfig) -> Self {
        Self::new(config.width, config.midline_y, config.midline_y)
    }

    /// Build from raw positions: first and last become anchors, the rest interior.
    /// Anchor x is pinned to 0 and `width`. Returns `None` for fewer than two positions.
    pub fn from_positions(width: f32, positions: &[(f32, f32)]) -> Option<Self> {
        if positions.len() < 2 {
            return None;
        }
        let last = positions.len() - 1;
        let points = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                if i == 0 || i == last {
                    ControlPoint::anchor(x, y)
                } else {
                    ControlPoint::interior(x, y)
                }
            })
            .collect();
        let mut set = Self { points };
        set.pin_anchors(width);
        Some(set)
    }

    /// Put the left anchor at x = 0 and the right one at x = `width`
    pub fn pin_anchors(&mut self, width: f32) {
        if let Some(first) = self.points.first_mut() {
            first.pos.x = 0.0;
        }
        if let Some(last) = self.points.last_mut() {
            last.pos.x = width;
        }
    }

    /// y of the straight line through the two anchors at `x`
    pub fn anchor_line_y(&self, x: f32) -> f32 {
        let (Some(left), Some(right)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        let span = right.pos.x - left.pos.x;
        if !(span.abs() > f32::EPSILON) {
            return left.pos.y;
        }
        let t = ((x - left.pos.x) / span).clamp(0.0, 1.0);
        left.pos.lerp(right.pos, t).y
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, index: usize) -> Option<&ControlPoint> {
        self.points.get(index)
    }

    pub fn interior_count(&self) -> usize {
        self.points.iter().filter(|p| !p.is_anchor()).count()
    }

    /// Replace the position of point `index`, keeping its role
    pub fn move_point(&mut self, index: usize, pos: Point) -> bool {
        match self.points.get_mut(index) {
            Some(point) => {
                *point = point.moved_to(pos);
                true
            }
            None => false,
        }
    }

    /// Insert an interior point right before the right anchor, returning its index
    pub fn insert_interior(&mut self, pos: Point) -> usize {
        let index = self.points.len() - 1;
        self.points
            .insert(index, ControlPoint::interior(pos.x, pos.y));
        index
    }

    /// First point strictly within `radius` of `pos`.
    ///
    /// Anchors are scanned before interior points (left anchor, right anchor,
    /// then interior points in insertion order), so an anchor always wins a tie.
    pub fn hit_test(&self, pos: Point, radius: f32) -> Option<usize> {
        let anchors = self
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_anchor());
        let interior = self
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_anchor());

        anchors
            .chain(interior)
            .find(|(_, p)| p.pos.distance(pos) < radius)
            .map(|(i, _)| i)
    }

    pub fn evaluate(&self, t: f32) -> Point {
        bezier(&self.points, t)
    }
}

/// Bezier blend of `points` at `t` (clamped to [0, 1]).
///
/// Two points give plain linear interpolation. Three or more use the
/// Bernstein basis of degree n - 1, with binomials built up
/// multiplicatively in f64 so large point counts stay exact.
pub fn bezier(points: &[ControlPoint], t: f32) -> Point {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    match points {
        [] => Point::default(),
        [only] => only.pos,
        [a, b] => a.pos.lerp(b.pos, t),
        _ => {
            let degree = points.len() - 1;
            let t = t as f64;
            let s = 1.0 - t;
            let mut binomial = 1.0f64;
            let (mut x, mut y) = (0.0f64, 0.0f64);
            for (i, point) in points.iter().enumerate() {
                let weight = binomial * s.powi((degree - i) as i32) * t.powi(i as i32);
                x += weight * point.pos.x as f64;
                y += weight * point.pos.y as f64;
                binomial = binomial * (degree - i) as f64 / (i + 1) as f64;
            }
            Point::new(x as f32, y as f32)
        }
    }
}

/// Gaussian blend value at `x`: every interior point is a bump of height
/// `pos.y` centred at `pos.x`. Falls back to `midline_y` where no bump reaches.
pub fn gaussian(points: &[ControlPoint], x: f32, sigma: f32, midline_y: f32) -> f32 {
    if !(sigma > 0.0) || x.is_nan() {
        return midline_y;
    }
    let two_sigma_sq = 2.0 * (sigma as f64).powi(2);
    let (mut weighted, mut total) = (0.0f64, 0.0f64);
    for point in points.iter().filter(|p| !p.is_anchor()) {
        let dx = (x - point.pos.x) as f64;
        let weight = (-(dx * dx) / two_sigma_sq).exp();
        weighted += weight * point.pos.y as f64;
        total += weight;
    }
    if total < MIN_GAUSSIAN_WEIGHT {
        midline_y
    } else {
        (weighted / total) as f32
    }
}

/// A read-only view of a point slice together with the blend settings,
/// so both families can be sampled the same way.
#[derive(Debug, Clone, Copy)]
pub struct CurveView<'a> {
    points: &'a [ControlPoint],
    blend: BlendMode,
    sigma: f32,
    width: f32,
    midline_y: f32,
}

impl<'a> CurveView<'a> {
    pub fn new(points: &'a [ControlPoint], config: &CurveConfig) -> Self {
        Self {
            points,
            blend: config.blend,
            sigma: config.sigma,
            width: config.width,
            midline_y: config.midline_y,
        }
    }

    pub fn points(&self) -> &'a [ControlPoint] {
        self.points
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    /// Curve point for parameter `t`. Gaussian mode walks x linearly across the plane.
    pub fn point_at(&self, t: f32) -> Point {
        match self.blend {
            BlendMode::Bezier if self.points.len() >= 2 => bezier(self.points, t),
            BlendMode::Bezier => Point::new(t.clamp(0.0, 1.0) * self.width, self.midline_y),
            BlendMode::Gaussian => {
                let x = t.clamp(0.0, 1.0) * self.width;
                Point::new(x, gaussian(self.points, x, self.sigma, self.midline_y))
            }
        }
    }

    /// Sample the curve at `steps + 1` evenly spaced parameters for drawing.
    /// A straight two-point Bezier only needs its endpoints.
    pub fn polyline(&self, steps: usize) -> Vec<Point> {
        if self.blend == BlendMode::Bezier && self.points.len() == 2 {
            return vec![self.points[0].pos, self.points[1].pos];
        }
        let steps = steps.max(1);
        (0..=steps)
            .map(|k| self.point_at(k as f32 / steps as f32))
            .collect()
    }

    /// Precompute a y-for-x lookup so the curve can be read column by column
    pub fn y_lookup(&self, steps: usize) -> YLookup<'a> {
        match self.blend {
            BlendMode::Gaussian => YLookup::Gaussian {
                points: self.points,
                sigma: self.sigma,
                midline_y: self.midline_y,
            },
            BlendMode::Bezier => {
                let mut samples = self.polyline(steps);
                samples.retain(|p| p.x.is_finite() && p.y.is_finite());
                samples.sort_by(|a, b| a.x.total_cmp(&b.x));
                YLookup::Sampled {
                    samples,
                    midline_y: self.midline_y,
                }
            }
        }
    }
}

/// y of the curve at a given x.
///
/// Gaussian curves are already functions of x. Bezier curves are sampled
/// once and read back by linear interpolation between the bracketing
/// samples; a self-intersecting curve resolves to whichever samples sort
/// next to each other.
#[derive(Debug, Clone)]
pub enum YLookup<'a> {
    Gaussian {
        points: &'a [ControlPoint],
        sigma: f32,
        midline_y: f32,
    },
    Sampled {
        samples: Vec<Point>,
        midline_y: f32,
    },
}

impl YLookup<'_> {
    pub fn y_at(&self, x: f32) -> f32 {
        match self {
            YLookup::Gaussian {
                points,
                sigma,
                midline_y,
            } => gaussian(points, x, *sigma, *midline_y),
            YLookup::Sampled { samples, midline_y } => {
                let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
                    return *midline_y;
                };
                if x <= first.x {
                    return first.y;
                }
                if x >= last.x {
                    return last.y;
                }
                let upper = samples.partition_point(|p| p.x < x);
                let (a, b) = (samples[upper - 1], samples[upper]);
                let span = b.x - a.x;
                if span <= f32::EPSILON {
                    b.y
                } else {
                    a.lerp(b, (x - a.x) / span).y
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_point(actual: Point, x: f32, y: f32) {
        assert!(
            (actual.x - x).abs() < EPSILON && (actual.y - y).abs() < EPSILON,
            "expected ({x}, {y}), got ({}, {})",
            actual.x,
            actual.y
        );
    }

    fn bernstein_weights(n: usize, t: f64) -> Vec<f64> {
        // reuse the blend itself: weight i is the x of a set with a single unit x
        (0..n)
            .map(|i| {
                let points: Vec<ControlPoint> = (0..n)
                    .map(|j| ControlPoint::interior(if i == j { 1.0 } else { 0.0 }, 0.0))
                    .collect();
                bezier(&points, t as f32).x as f64
            })
            .collect()
    }

    #[test]
    fn two_points_interpolate_linearly() {
        let set = ControlPointSet::from_positions(800.0, &[(0.0, 300.0), (800.0, 100.0)]).unwrap();
        for k in 0..=20 {
            let t = k as f32 / 20.0;
            assert_point(set.evaluate(t), 800.0 * t, 300.0 - 200.0 * t);
        }
    }

    #[test]
    fn quadratic_midpoint() {
        let set =
            ControlPointSet::from_positions(
                800.0,
                &[(0.0, 300.0), (400.0, 100.0), (800.0, 300.0)],
            )
            .unwrap();
        assert_point(set.evaluate(0.5), 400.0, 200.0);
        assert_point(set.evaluate(0.0), 0.0, 300.0);
        assert_point(set.evaluate(1.0), 800.0, 300.0);
    }

    #[test]
    fn endpoints_are_exact_for_many_points() {
        let positions: Vec<(f32, f32)> =
            (0..16).map(|i| (i as f32 * 50.0, 100.0 + (i % 3) as f32 * 90.0)).collect();
        let set = ControlPointSet::from_positions(750.0, &positions).unwrap();
        assert_eq!(set.evaluate(0.0), Point::new(0.0, 100.0));
        assert_eq!(set.evaluate(1.0), Point::new(750.0, 100.0));
    }

    #[test]
    fn bernstein_weights_sum_to_one() {
        for n in 3..=16 {
            for k in 0..=10 {
                let t = k as f64 / 10.0;
                let sum: f64 = bernstein_weights(n, t).iter().sum();
                assert!((sum - 1.0).abs() < 1e-5, "n={n} t={t} sum={sum}");
            }
        }
    }

    #[test]
    fn evaluate_clamps_parameter() {
        let set = ControlPointSet::new(800.0, 300.0, 100.0);
        assert_point(set.evaluate(-1.0), 0.0, 300.0);
        assert_point(set.evaluate(2.0), 800.0, 100.0);
        assert_point(set.evaluate(f32::NAN), 0.0, 300.0);
    }

    #[test]
    fn anchors_land_on_the_domain_edges() {
        let set = ControlPointSet::from_positions(800.0, &[(5.0, 300.0), (700.0, 280.0)]).unwrap();
        assert_eq!(set.points()[0].pos, Point::new(0.0, 300.0));
        assert_eq!(set.points()[1].pos, Point::new(800.0, 280.0));
    }

    #[test]
    fn anchor_line_follows_the_anchors() {
        let mut set = ControlPointSet::new(800.0, 100.0, 500.0);
        set.insert_interior(Point::new(400.0, 20.0));
        // interior points do not tilt the line
        assert!((set.anchor_line_y(200.0) - 200.0).abs() < EPSILON);
        assert_eq!(set.anchor_line_y(-50.0), 100.0);
        assert_eq!(set.anchor_line_y(900.0), 500.0);

        let pinched = ControlPointSet::new(0.0, 120.0, 480.0);
        assert_eq!(pinched.anchor_line_y(0.0), 120.0);
    }

    #[test]
    fn roles_follow_position_once() {
        let mut set =
            ControlPointSet::from_positions(
                800.0,
                &[(0.0, 300.0), (200.0, 250.0), (800.0, 300.0)],
            )
            .unwrap();
        let roles: Vec<PointRole> = set.points().iter().map(|p| p.role).collect();
        assert_eq!(
            roles,
            [PointRole::Anchor, PointRole::Interior, PointRole::Anchor]
        );

        let index = set.insert_interior(Point::new(100.0, 120.0));
        assert_eq!(index, 2);
        assert_eq!(set.points().last().map(|p| p.role), Some(PointRole::Anchor));
        assert_eq!(set.interior_count(), 2);

        set.move_point(0, Point::new(0.0, 50.0));
        assert_eq!(set.points()[0].role, PointRole::Anchor);
        assert!(ControlPointSet::from_positions(800.0, &[(0.0, 0.0)]).is_none());
    }

    #[test]
    fn hit_test_prefers_anchors() {
        let mut set = ControlPointSet::new(800.0, 300.0, 300.0);
        set.insert_interior(Point::new(2.0, 300.0));
        // both the left anchor and the interior point are in range
        assert_eq!(set.hit_test(Point::new(1.0, 300.0), 5.0), Some(0));
        assert_eq!(set.hit_test(Point::new(5.0, 300.0), 5.0), Some(1));
        assert_eq!(set.hit_test(Point::new(400.0, 300.0), 5.0), None);
        // strictly less than the radius
        assert_eq!(set.hit_test(Point::new(795.0, 300.0), 5.0), None);
    }

    #[test]
    fn gaussian_without_interior_points_is_midline() {
        let set = ControlPointSet::new(800.0, 120.0, 480.0);
        for x in [0.0, 250.0, 800.0] {
            assert_eq!(gaussian(set.points(), x, 60.0, 300.0), 300.0);
        }
    }

    #[test]
    fn gaussian_single_bump_peaks_at_its_height() {
        let mut set = ControlPointSet::new(800.0, 300.0, 300.0);
        set.insert_interior(Point::new(400.0, 150.0));
        assert!((gaussian(set.points(), 400.0, 60.0, 300.0) - 150.0).abs() < EPSILON);
        // far away the weight underflows and the midline takes over
        assert_eq!(gaussian(set.points(), 0.0, 20.0, 300.0), 300.0);
    }

    #[test]
    fn gaussian_blends_neighbouring_bumps() {
        let mut set = ControlPointSet::new(800.0, 300.0, 300.0);
        set.insert_interior(Point::new(300.0, 100.0));
        set.insert_interior(Point::new(500.0, 200.0));
        let between = gaussian(set.points(), 400.0, 60.0, 300.0);
        assert!((between - 150.0).abs() < EPSILON);
    }

    #[test]
    fn polyline_of_straight_line_is_its_endpoints() {
        let config = CurveConfig::default();
        let set = ControlPointSet::flat(&config);
        let view = CurveView::new(set.points(), &config);
        assert_eq!(view.polyline(100).len(), 2);
    }

    #[test]
    fn polyline_samples_every_step() {
        let config = CurveConfig::default();
        let set =
            ControlPointSet::from_positions(
                800.0,
                &[(0.0, 300.0), (400.0, 100.0), (800.0, 300.0)],
            )
            .unwrap();
        let line = CurveView::new(set.points(), &config).polyline(100);
        assert_eq!(line.len(), 101);
        assert_point(line[50], 400.0, 200.0);
    }

    #[test]
    fn lookup_reads_bezier_by_x() {
        let config = CurveConfig::default();
        let set =
            ControlPointSet::from_positions(
                800.0,
                &[(0.0, 300.0), (400.0, 100.0), (800.0, 300.0)],
            )
            .unwrap();
        let lookup = CurveView::new(set.points(), &config).y_lookup(800);
        assert!((lookup.y_at(400.0) - 200.0).abs() < 0.1);
        assert_eq!(lookup.y_at(-10.0), 300.0);
        assert_eq!(lookup.y_at(900.0), 300.0);
    }

    #[test]
    fn blend_mode_cycles() {
        assert_eq!(BlendMode::Bezier.next(), BlendMode::Gaussian);
        assert_eq!(BlendMode::Gaussian.next(), BlendMode::Bezier);
    }
}
