use std::{
    sync::{
        Arc, Mutex, TryLockError,
        atomic::{AtomicBool, AtomicU16, Ordering},
    },
    time::Duration,
};

use rodio::Source;

use crate::{bands::FilterParam, dsp::eq::Equalizer};

/// Samples kept for the analyser before the oldest are dropped
pub const MAX_TAP_SAMPLES: usize = 1 << 15;

/// Samples batched by the source before it touches the tap
const TAP_BATCH: usize = 512;

/// Latest filter params, shared between the engine thread and the playing source
#[derive(Clone, Default)]
pub struct StageSlot {
    params: Arc<Mutex<Vec<FilterParam>>>,
    dirty: Arc<AtomicBool>,
}

impl StageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, params: Vec<FilterParam>) -> anyhow::Result<()> {
        let mut slot = self
            .params
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock stage slot: {}", e))?;
        *slot = params;
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Current params, regardless of whether they were already picked up
    pub fn current(&self) -> Vec<FilterParam> {
        match self.params.lock() {
            Ok(params) => params.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Params stored since the last call. Never blocks: if the engine holds
    /// the lock the update is picked up on a later call.
    pub fn take_if_dirty(&self) -> Option<Vec<FilterParam>> {
        if !self.dirty.load(Ordering::Acquire) {
            return None;
        }
        match self.params.try_lock() {
            Ok(params) => {
                self.dirty.store(false, Ordering::Release);
                Some(params.clone())
            }
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(poisoned)) => {
                self.dirty.store(false, Ordering::Release);
                Some(poisoned.into_inner().clone())
            }
        }
    }
}

/// Post-filter samples handed from the audio thread to the analyser
#[derive(Clone, Default)]
pub struct AnalysisTap {
    samples: Arc<Mutex<Vec<f32>>>,
    channels: Arc<AtomicU16>,
}

impl AnalysisTap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_channels(&self, channels: u16) {
        self.channels.store(channels, Ordering::Relaxed);
    }

    pub fn channels(&self) -> u16 {
        self.channels.load(Ordering::Relaxed).max(1)
    }

    /// Returns false when the reader held the lock and the batch was dropped
    pub fn push(&self, batch: &[f32]) -> bool {
        let Ok(mut samples) = self.samples.try_lock() else {
            return false;
        };
        samples.extend_from_slice(batch);
        if samples.len() > MAX_TAP_SAMPLES {
            let excess = samples.len() - MAX_TAP_SAMPLES;
            samples.drain(..excess);
        }
        true
    }

    /// Move everything buffered into `out`
    pub fn drain_into(&self, out: &mut Vec<f32>) {
        if let Ok(mut samples) = self.samples.lock() {
            out.append(&mut samples);
        }
    }
}

/// Runs every sample of `inner` through the equalizer, one frame at a time.
pub struct EqSource<S> {
    inner: S,
    eq: Equalizer,
    stages: StageSlot,
    tap: AnalysisTap,
    channels: u16,
    sample_rate: u32,
    frame: Vec<f32>,
    frame_pos: usize,
    pending_tap: Vec<f32>,
}

impl<S: Source> EqSource<S> {
    pub fn new(inner: S, stages: StageSlot, tap: AnalysisTap) -> Self {
        let channels = inner.channels();
        let sample_rate = inner.sample_rate();
        let mut eq = Equalizer::new(sample_rate, channels);
        eq.set_params(&stages.current());
        tap.set_channels(channels);

        Self {
            inner,
            eq,
            stages,
            tap,
            channels,
            sample_rate,
            frame: Vec::with_capacity(channels as usize),
            frame_pos: 0,
            pending_tap: Vec::with_capacity(TAP_BATCH),
        }
    }

    /// Pull, filter and tap the next frame. Returns false at end of stream.
    fn next_frame(&mut self) -> bool {
        if let Some(params) = self.stages.take_if_dirty() {
            self.eq.set_params(&params);
        }

        self.frame.clear();
        self.frame_pos = 0;
        for _ in 0..self.channels.max(1) {
            match self.inner.next() {
                Some(sample) => self.frame.push(sample),
                None => break,
            }
        }
        if self.frame.is_empty() {
            self.flush_tap();
            return false;
        }

        self.eq.process_frame(&mut self.frame);

        self.pending_tap.extend_from_slice(&self.frame);
        if self.pending_tap.len() >= TAP_BATCH {
            self.flush_tap();
        }
        true
    }

    fn flush_tap(&mut self) {
        if !self.pending_tap.is_empty() && self.tap.push(&self.pending_tap) {
            self.pending_tap.clear();
        } else if self.pending_tap.len() > MAX_TAP_SAMPLES {
            // reader never let go, drop the backlog
            self.pending_tap.clear();
        }
    }
}

impl<S: Source> Iterator for EqSource<S> {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame_pos >= self.frame.len() && !self.next_frame() {
            return None;
        }
        let sample = self.frame[self.frame_pos];
        self.frame_pos += 1;
        Some(sample)
    }
}

impl<S: Source> Source for EqSource<S> {
    fn current_span_len(&self) -> Option<usize> {
        self.inner
            .current_span_len()
            .map(|len| len + (self.frame.len() - self.frame_pos))
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
