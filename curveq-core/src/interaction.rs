// Pointer handling for the curve editor.
//
// Idle --down on a point--> Dragging --up/leave--> (release pending) --debounce--> Idle
//
// The release is deferred so that the click a pointer pipeline emits right
// after a pointer-up does not add a point. Pending releases are keyed to the
// session they were scheduled for and are dropped once that session is gone.

use std::time::{Duration, Instant};

use crate::{
    config::CurveConfig,
    curve::{ControlPoint, ControlPointSet, Point},
};

/// Identifies one drag from pointer-down to its release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub id: SessionId,
    pub point_index: usize,
    /// The point as it was when the drag started
    pub origin: ControlPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRelease {
    session: SessionId,
    due: Instant,
}

/// Pointer input in curve-space coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
    Click(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Ignored,
    DragStarted(usize),
    PointMoved(usize),
    ReleaseScheduled,
    Released,
    PointAdded(usize),
}

impl InteractionOutcome {
    /// Whether the control points were modified
    pub fn curve_changed(&self) -> bool {
        matches!(
            self,
            InteractionOutcome::PointMoved(_) | InteractionOutcome::PointAdded(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interaction {
    state: InteractionState,
    pending: Option<PendingRelease>,
    next_session: u64,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging(_))
    }

    /// Live session, if any
    pub fn session(&self) -> Option<DragSession> {
        match self.state {
            InteractionState::Dragging(session) => Some(session),
            InteractionState::Idle => None,
        }
    }

    /// True while a release is scheduled for the live session
    pub fn release_pending(&self) -> bool {
        match (self.pending, self.session()) {
            (Some(pending), Some(session)) => pending.session == session.id,
            _ => false,
        }
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        points: &mut ControlPointSet,
        config: &CurveConfig,
        now: Instant,
    ) -> InteractionOutcome {
        match event {
            PointerEvent::Down(pos) => self.pointer_down(pos, points, config, now),
            PointerEvent::Move(pos) => self.pointer_move(pos, points, config),
            PointerEvent::Up | PointerEvent::Leave => {
                self.pointer_release(config.release_debounce, now)
            }
            PointerEvent::Click(pos) => self.click(pos, points, config, now),
        }
    }

    pub fn pointer_down(
        &mut self,
        pos: Point,
        points: &ControlPointSet,
        config: &CurveConfig,
        now: Instant,
    ) -> InteractionOutcome {
        self.tick(now);
        if self.is_dragging() && !self.release_pending() {
            log::trace!("pointer down during a live drag ignored");
            return InteractionOutcome::Ignored;
        }

        let Some(index) = points.hit_test(pos, config.hit_radius) else {
            return InteractionOutcome::Ignored;
        };
        let Some(&origin) = points.get(index) else {
            return InteractionOutcome::Ignored;
        };

        let id = SessionId(self.next_session);
        self.next_session += 1;
        // starting a new session strands any release scheduled for the old one
        self.pending = None;
        self.state = InteractionState::Dragging(DragSession {
            id,
            point_index: index,
            origin,
        });
        log::debug!("drag {:?} started on point {} ({})", id, index, origin.role);
        InteractionOutcome::DragStarted(index)
    }

    pub fn pointer_move(
        &mut self,
        pos: Point,
        points: &mut ControlPointSet,
        config: &CurveConfig,
    ) -> InteractionOutcome {
        let Some(session) = self.session() else {
            return InteractionOutcome::Ignored;
        };
        if self.release_pending() {
            return InteractionOutcome::Ignored;
        }
        let Some(current) = points.get(session.point_index).copied() else {
            return InteractionOutcome::Ignored;
        };

        let x = if current.is_anchor() && config.lock_anchor_x {
            current.pos.x
        } else {
            pos.x.clamp(0.0, config.width)
        };
        let y = pos.y.clamp(0.0, config.height);
        let target = Point::new(x, y);
        if target == current.pos {
            return InteractionOutcome::Ignored;
        }

        points.move_point(session.point_index, target);
        InteractionOutcome::PointMoved(session.point_index)
    }

    /// Pointer-up and pointer-leave: end the drag after `debounce`
    pub fn pointer_release(&mut self, debounce: Duration, now: Instant) -> InteractionOutcome {
        let Some(session) = self.session() else {
            return InteractionOutcome::Ignored;
        };
        if self.release_pending() {
            return InteractionOutcome::Ignored;
        }
        self.pending = Some(PendingRelease {
            session: session.id,
            due: now + debounce,
        });
        InteractionOutcome::ReleaseScheduled
    }

    /// Fire a due release. A release whose session is no longer live is discarded.
    pub fn tick(&mut self, now: Instant) -> InteractionOutcome {
        let Some(pending) = self.pending else {
            return InteractionOutcome::Ignored;
        };
        if now < pending.due {
            return InteractionOutcome::Ignored;
        }
        self.pending = None;

        match self.session() {
            Some(session) if session.id == pending.session => {
                self.state = InteractionState::Idle;
                log::debug!("drag {:?} released", session.id);
                InteractionOutcome::Released
            }
            _ => {
                log::trace!("stale release for {:?} dropped", pending.session);
                InteractionOutcome::Ignored
            }
        }
    }

    /// A click on empty curve-space adds an interior point, but only while idle.
    ///
    /// The point keeps the click's x and sits on the line between the two
    /// anchors, so adding it leaves the curve's shape alone until it is dragged.
    pub fn click(
        &mut self,
        pos: Point,
        points: &mut ControlPointSet,
        config: &CurveConfig,
        now: Instant,
    ) -> InteractionOutcome {
        self.tick(now);
        if self.is_dragging() {
            log::trace!("click during drag discarded");
            return InteractionOutcome::Ignored;
        }
        if points.hit_test(pos, config.hit_radius).is_some() {
            return InteractionOutcome::Ignored;
        }
        if points.len() >= config.max_points {
            log::debug!("point limit of {} reached", config.max_points);
            return InteractionOutcome::Ignored;
        }

        let x = pos.x.clamp(0.0, config.width);
        let pos = Point::new(x, points.anchor_line_y(x).clamp(0.0, config.height));
        let index = points.insert_interior(pos);
        log::debug!("added point {} at ({:.1}, {:.1})", index, pos.x, pos.y);
        InteractionOutcome::PointAdded(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn setup() -> (Interaction, ControlPointSet, CurveConfig, Instant) {
        let config = CurveConfig::default();
        let points =
            ControlPointSet::from_positions(
                800.0,
                &[(0.0, 300.0), (400.0, 100.0), (800.0, 300.0)],
            )
            .unwrap();
        (Interaction::new(), points, config, Instant::now())
    }

    #[test]
    fn down_on_a_point_starts_a_drag_for_that_point_only() {
        let (mut fsm, mut points, config, t0) = setup();
        let outcome = fsm.handle(
            PointerEvent::Down(Point::new(402.0, 101.0)),
            &mut points,
            &config,
            t0,
        );
        assert_eq!(outcome, InteractionOutcome::DragStarted(1));
        assert_eq!(fsm.session().map(|s| s.point_index), Some(1));
        assert_eq!(fsm.session().map(|s| s.origin.pos), Some(Point::new(400.0, 100.0)));
    }

    #[test]
    fn down_on_empty_space_stays_idle() {
        let (mut fsm, mut points, config, t0) = setup();
        let outcome = fsm.handle(
            PointerEvent::Down(Point::new(200.0, 200.0)),
            &mut points,
            &config,
            t0,
        );
        assert_eq!(outcome, InteractionOutcome::Ignored);
        assert_eq!(fsm.state(), InteractionState::Idle);
    }

    #[test]
    fn release_is_deferred_by_the_debounce() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        assert_eq!(
            fsm.handle(PointerEvent::Up, &mut points, &config, t0 + MS),
            InteractionOutcome::ReleaseScheduled
        );
        assert!(fsm.is_dragging());
        assert_eq!(fsm.tick(t0 + 50 * MS), InteractionOutcome::Ignored);
        assert!(fsm.is_dragging());
        assert_eq!(fsm.tick(t0 + 101 * MS), InteractionOutcome::Released);
        assert_eq!(fsm.state(), InteractionState::Idle);
    }

    #[test]
    fn click_before_release_fires_is_discarded() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Up, &mut points, &config, t0 + MS);
        let outcome = fsm.handle(
            PointerEvent::Click(Point::new(600.0, 250.0)),
            &mut points,
            &config,
            t0 + 2 * MS,
        );
        assert_eq!(outcome, InteractionOutcome::Ignored);
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn click_while_idle_adds_an_interior_point() {
        let (mut fsm, mut points, config, t0) = setup();
        let outcome = fsm.handle(
            PointerEvent::Click(Point::new(600.0, 250.0)),
            &mut points,
            &config,
            t0,
        );
        assert_eq!(outcome, InteractionOutcome::PointAdded(2));
        // x from the click, y from the line between the anchors
        assert_eq!(points.get(2).map(|p| p.pos), Some(Point::new(600.0, 300.0)));
        assert!(!points.get(2).unwrap().is_anchor());
        assert!(points.get(3).unwrap().is_anchor());
    }

    #[test]
    fn click_lands_on_a_sloped_anchor_line() {
        let config = CurveConfig::default();
        let mut points = ControlPointSet::new(800.0, 100.0, 500.0);
        let mut fsm = Interaction::new();
        let outcome = fsm.click(Point::new(200.0, 550.0), &mut points, &config, Instant::now());
        assert_eq!(outcome, InteractionOutcome::PointAdded(1));
        assert_eq!(points.get(1).map(|p| p.pos), Some(Point::new(200.0, 200.0)));
    }

    #[test]
    fn click_after_release_adds_a_point() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Up, &mut points, &config, t0 + MS);
        let outcome = fsm.handle(
            PointerEvent::Click(Point::new(600.0, 250.0)),
            &mut points,
            &config,
            t0 + 200 * MS,
        );
        assert_eq!(outcome, InteractionOutcome::PointAdded(2));
    }

    #[test]
    fn click_on_an_existing_point_or_at_the_limit_is_ignored() {
        let (mut fsm, mut points, _, t0) = setup();
        let config = CurveConfig {
            max_points: 4,
            ..CurveConfig::default()
        };
        assert_eq!(
            fsm.click(Point::new(401.0, 100.0), &mut points, &config, t0),
            InteractionOutcome::Ignored
        );
        assert_eq!(
            fsm.click(Point::new(200.0, 200.0), &mut points, &config, t0),
            InteractionOutcome::PointAdded(2)
        );
        assert_eq!(
            fsm.click(Point::new(600.0, 200.0), &mut points, &config, t0),
            InteractionOutcome::Ignored
        );
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn dragging_moves_the_point() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        let outcome = fsm.handle(
            PointerEvent::Move(Point::new(420.0, 150.0)),
            &mut points,
            &config,
            t0 + MS,
        );
        assert_eq!(outcome, InteractionOutcome::PointMoved(1));
        assert_eq!(points.get(1).map(|p| p.pos), Some(Point::new(420.0, 150.0)));
        // origin is the position at pointer-down, not the latest one
        assert_eq!(fsm.session().map(|s| s.origin.pos), Some(Point::new(400.0, 100.0)));
    }

    #[test]
    fn anchor_x_stays_pinned() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(0.0, 300.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Move(Point::new(35.0, 100.0)), &mut points, &config, t0);
        assert_eq!(points.get(0).map(|p| p.pos), Some(Point::new(0.0, 100.0)));
        assert_eq!(points.evaluate(0.0), Point::new(0.0, 100.0));
    }

    #[test]
    fn unlocked_anchor_follows_the_pointer() {
        let (mut fsm, mut points, _, t0) = setup();
        let config = CurveConfig {
            lock_anchor_x: false,
            ..CurveConfig::default()
        };
        fsm.handle(PointerEvent::Down(Point::new(800.0, 300.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Move(Point::new(760.0, 310.0)), &mut points, &config, t0);
        assert_eq!(points.get(2).map(|p| p.pos), Some(Point::new(760.0, 310.0)));
    }

    #[test]
    fn moves_are_clamped_to_the_plane() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Move(Point::new(-20.0, 900.0)), &mut points, &config, t0);
        assert_eq!(points.get(1).map(|p| p.pos), Some(Point::new(0.0, 600.0)));
    }

    #[test]
    fn a_second_down_during_a_live_drag_is_ignored() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        let outcome = fsm.handle(
            PointerEvent::Down(Point::new(0.0, 300.0)),
            &mut points,
            &config,
            t0 + MS,
        );
        assert_eq!(outcome, InteractionOutcome::Ignored);
        assert_eq!(fsm.session().map(|s| s.point_index), Some(1));
    }

    #[test]
    fn stale_release_does_not_end_a_newer_drag() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Up, &mut points, &config, t0 + MS);
        let first = fsm.session().unwrap().id;

        // new drag before the first release fires
        let outcome = fsm.handle(
            PointerEvent::Down(Point::new(0.0, 300.0)),
            &mut points,
            &config,
            t0 + 20 * MS,
        );
        assert_eq!(outcome, InteractionOutcome::DragStarted(0));
        let second = fsm.session().unwrap().id;
        assert_ne!(first, second);

        assert_eq!(fsm.tick(t0 + 500 * MS), InteractionOutcome::Ignored);
        assert_eq!(fsm.session().map(|s| s.id), Some(second));
        assert_eq!(
            fsm.handle(PointerEvent::Move(Point::new(0.0, 200.0)), &mut points, &config, t0),
            InteractionOutcome::PointMoved(0)
        );
    }

    #[test]
    fn moves_after_release_are_ignored() {
        let (mut fsm, mut points, config, t0) = setup();
        fsm.handle(PointerEvent::Down(Point::new(400.0, 100.0)), &mut points, &config, t0);
        fsm.handle(PointerEvent::Leave, &mut points, &config, t0 + MS);
        assert_eq!(
            fsm.handle(PointerEvent::Move(Point::new(10.0, 10.0)), &mut points, &config, t0),
            InteractionOutcome::Ignored
        );
        assert_eq!(points.get(1).map(|p| p.pos), Some(Point::new(400.0, 100.0)));
        // a second release does not push the deadline back
        assert_eq!(
            fsm.handle(PointerEvent::Up, &mut points, &config, t0 + 50 * MS),
            InteractionOutcome::Ignored
        );
        assert_eq!(fsm.tick(t0 + 101 * MS), InteractionOutcome::Released);
    }

    #[test]
    fn release_while_idle_is_ignored() {
        let (mut fsm, mut points, config, t0) = setup();
        assert_eq!(
            fsm.handle(PointerEvent::Up, &mut points, &config, t0),
            InteractionOutcome::Ignored
        );
        assert_eq!(fsm.tick(t0 + 200 * MS), InteractionOutcome::Ignored);
    }
}
