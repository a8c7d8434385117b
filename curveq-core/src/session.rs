use std::{sync::Arc, time::Instant};

use crate::{
    bands::{BAND_FREQUENCIES, FilterParam, sample_bands},
    config::CurveConfig,
    curve::{ControlPoint, ControlPointSet, CurveView},
    interaction::{Interaction, InteractionOutcome, InteractionState, PointerEvent},
    mapping::CoordinateMapping,
};

/// Immutable view of the curve handed to each tick
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSnapshot {
    pub points: Arc<[ControlPoint]>,
    /// Bumped on every change to the points or the config
    pub revision: u64,
}

impl CurveSnapshot {
    pub fn view<'a>(&'a self, config: &CurveConfig) -> CurveView<'a> {
        CurveView::new(&self.points, config)
    }
}

/// Owns the control points and funnels every mutation through one place.
///
/// Input events and config edits go through `&mut self`; ticks read a
/// [`CurveSnapshot`], which can not write back.
#[derive(Debug, Clone)]
pub struct CurveEditor {
    config: CurveConfig,
    points: ControlPointSet,
    interaction: Interaction,
    snapshot: CurveSnapshot,
}

impl CurveEditor {
    pub fn new(config: CurveConfig) -> Self {
        let points = ControlPointSet::flat(&config);
        Self::with_points(config, points)
    }

    /// Start from `points`; the anchors are moved onto the plane's edges
    pub fn with_points(config: CurveConfig, mut points: ControlPointSet) -> Self {
        points.pin_anchors(config.width);
        let snapshot = CurveSnapshot {
            points: Arc::from(points.points()),
            revision: 0,
        };
        Self {
            config,
            points,
            interaction: Interaction::new(),
            snapshot,
        }
    }

    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    pub fn points(&self) -> &ControlPointSet {
        &self.points
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn snapshot(&self) -> CurveSnapshot {
        self.snapshot.clone()
    }

    pub fn revision(&self) -> u64 {
        self.snapshot.revision
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> InteractionOutcome {
        let outcome = self
            .interaction
            .handle(event, &mut self.points, &self.config, now);
        if outcome.curve_changed() {
            self.publish();
        }
        outcome
    }

    /// Let time-based transitions (the deferred release) happen
    pub fn tick(&mut self, now: Instant) -> InteractionOutcome {
        self.interaction.tick(now)
    }

    /// Edit the config in place. Invalid results are rejected and the old config kept.
    pub fn update_config(&mut self, edit: impl FnOnce(&mut CurveConfig)) -> bool {
        let mut config = self.config.clone();
        edit(&mut config);
        if let Err(e) = config.validate() {
            log::warn!("config change rejected: {}", e);
            return false;
        }
        if config != self.config {
            if config.width != self.config.width {
                self.points.pin_anchors(config.width);
            }
            self.config = config;
            self.publish();
        }
        true
    }

    fn publish(&mut self) {
        self.snapshot = CurveSnapshot {
            points: Arc::from(self.points.points()),
            revision: self.snapshot.revision + 1,
        };
    }
}

/// The filter bank and analyser the curve drives
pub trait AudioChain {
    /// Push one param per filter stage, in band order
    fn set_stages(&mut self, params: &[FilterParam]) -> anyhow::Result<()>;

    /// Copy the latest magnitude spectrum (0..=255 per bin) into `out`.
    /// Returns false when there is nothing to show yet.
    fn magnitudes(&mut self, out: &mut Vec<u8>) -> bool;

    fn sample_rate(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Params recomputed and pushed
    Applied,
    /// Nothing changed since the last push
    Unchanged,
    /// Params recomputed but no chain is attached
    NoBackend,
    /// The chain refused the params
    Failed,
}

/// Explicitly owned link between the curve and an [`AudioChain`].
///
/// Created once, passed by reference to whatever needs it and dropped with
/// the widget. Without a chain it still computes params, so they can be
/// shown, but pushing is a no-op.
pub struct AudioSession {
    chain: Option<Box<dyn AudioChain>>,
    bands: Vec<f32>,
    params: Vec<FilterParam>,
    computed_revision: Option<u64>,
    pushed_revision: Option<u64>,
    spectrum: Vec<u8>,
    has_spectrum: bool,
}

impl std::fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSession")
            .field("attached", &self.chain.is_some())
            .field("bands", &self.bands.len())
            .field("pushed_revision", &self.pushed_revision)
            .finish()
    }
}

impl Default for AudioSession {
    fn default() -> Self {
        Self::new(BAND_FREQUENCIES.to_vec())
    }
}

impl AudioSession {
    pub fn new(bands: Vec<f32>) -> Self {
        Self {
            chain: None,
            bands,
            params: Vec::new(),
            computed_revision: None,
            pushed_revision: None,
            spectrum: Vec::new(),
            has_spectrum: false,
        }
    }

    /// Attach a chain; the next `apply` pushes unconditionally
    pub fn attach(&mut self, chain: Box<dyn AudioChain>) {
        log::info!("audio chain attached at {} Hz", chain.sample_rate());
        self.chain = Some(chain);
        self.pushed_revision = None;
    }

    pub fn detach(&mut self) -> Option<Box<dyn AudioChain>> {
        self.pushed_revision = None;
        self.has_spectrum = false;
        self.chain.take()
    }

    pub fn is_attached(&self) -> bool {
        self.chain.is_some()
    }

    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    /// Params from the most recent `apply`
    pub fn params(&self) -> &[FilterParam] {
        &self.params
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.chain.as_ref().map(|chain| chain.sample_rate())
    }

    /// Recompute band params from `snapshot` and push them in one step
    pub fn apply(&mut self, snapshot: &CurveSnapshot, config: &CurveConfig) -> ApplyOutcome {
        if self.computed_revision != Some(snapshot.revision) {
            let view = snapshot.view(config);
            let mapping = CoordinateMapping::new(config);
            let steps = config.polyline_steps.max(config.width.ceil() as usize);
            self.params = sample_bands(
                &view,
                &mapping,
                &self.bands,
                config.sampling,
                config.use_curve_frequency,
                steps,
            );
            self.computed_revision = Some(snapshot.revision);
        }

        let Some(chain) = self.chain.as_mut() else {
            log::trace!("no audio chain, skipping push");
            return ApplyOutcome::NoBackend;
        };
        if self.pushed_revision == Some(snapshot.revision) {
            return ApplyOutcome::Unchanged;
        }

        match chain.set_stages(&self.params) {
            Ok(()) => {
                self.pushed_revision = Some(snapshot.revision);
                ApplyOutcome::Applied
            }
            Err(e) => {
                log::warn!("failed to push filter params: {:#}", e);
                ApplyOutcome::Failed
            }
        }
    }

    /// Pull a fresh magnitude snapshot from the chain
    pub fn refresh_spectrum(&mut self) -> Option<&[u8]> {
        let chain = self.chain.as_mut()?;
        self.has_spectrum = chain.magnitudes(&mut self.spectrum);
        self.spectrum()
    }

    /// Last spectrum pulled by [`Self::refresh_spectrum`]
    pub fn spectrum(&self) -> Option<&[u8]> {
        self.has_spectrum.then_some(self.spectrum.as_slice())
    }
}
