use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use log::{debug, trace};
use crate::drivers::buffer::SharedRing;
use crate::drivers::frame::FrameSync;
use crate::drivers::source::SignalSource;
use crate::drivers::ScopeError;
use crate::types::PlotEvent;
/// Decides when the ingest side should ask for a redraw.
pub struct RedrawTimer {
    interval: Option<Duration>,
    last: Instant,
}
impl RedrawTimer {
    /// A zero interval disables timed redraws.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval: (!interval.is_zero()).then_some(interval),
            last: now,
        }
    }
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.interval {
            Some(interval) if now.saturating_duration_since(self.last) >= interval => {
                self.last = now;
                true
            }
            _ => false,
        }
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub decoded: u64,
    pub stored: u64,
    pub dropped_busy: u64,
    pub resyncs: u64,
}
/// Feeds decoded samples into the shared ring and requests timed redraws.
pub struct IngestPipeline<S: SignalSource> {
    sync: FrameSync<S>,
    timer: RedrawTimer,
    epoch: Instant,
    stats: IngestStats,
}
impl<S: SignalSource> IngestPipeline<S> {
    pub fn new(source: S, refresh: Duration) -> Self {
        let now = Instant::now();
        Self {
            sync: FrameSync::new(source),
            timer: RedrawTimer::new(refresh, now),
            epoch: now,
            stats: IngestStats::default(),
        }
    }
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            resyncs: self.sync.resyncs(),
            ..self.stats
        }
    }
    /// Decodes one sample and offers it to the ring. Returns `Ok(false)` once
    /// nobody is listening for redraw requests any more.
    pub fn pump_once(
        &mut self,
        ring: &SharedRing,
        events: &Sender<PlotEvent>,
    ) -> Result<bool, ScopeError> {
        let value = self.sync.next_sample()?;
        let now = Instant::now();
        let timestamp_us = now.saturating_duration_since(self.epoch).as_micros() as u64;
        trace!("{value}");
        self.stats.decoded += 1;
        if ring.offer(value, timestamp_us) {
            self.stats.stored += 1;
        } else {
            self.stats.dropped_busy += 1;
        }
        if self.timer.poll(now) {
            debug!("refresh due, requesting redraw");
            if events.send(PlotEvent::Redraw).is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }
    /// Pumps until `keep_running` says stop, the event receiver goes away, or
    /// the source fails.
    pub fn run(
        &mut self,
        ring: &SharedRing,
        events: &Sender<PlotEvent>,
        keep_running: impl Fn() -> bool,
    ) -> Result<IngestStats, ScopeError> {
        while keep_running() {
            match self.pump_once(ring, events) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    debug!("source failed, decoder {:?}", self.sync.state());
                    return Err(err);
                }
            }
        }
        Ok(self.stats())
    }
}
