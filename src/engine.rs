// src/engine.rs
use crate::drivers::{IngestPipeline, RenderPipeline, SampleRing, ScopeError, SharedRing, SignalSource, Surface};
use crate::types::PlotEvent;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State shared by the ingest thread, the render thread and the window.
///
/// Lock order: the ring lock is only ever taken on its own; `failure` is
/// never held while touching the ring.
pub struct ScopeContext {
    ring: SharedRing,
    terminated: AtomicBool,
    failure: Mutex<Option<String>>,
}

impl ScopeContext {
    pub fn new(ring: SampleRing) -> Self {
        Self { ring: SharedRing::new(ring), terminated: AtomicBool::new(false), failure: Mutex::new(None) }
    }

    pub fn ring(&self) -> &SharedRing {
        &self.ring
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Records a fatal data-path error and shuts everything down.
    pub fn fail(&self, err: &ScopeError) {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        failure.get_or_insert_with(|| err.to_string());
        self.terminate();
    }

    pub fn failure(&self) -> Option<String> {
        self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: u64,
    pub samples_drawn: u64,
}

// 采集线程：阻塞读取设备，写入环形缓冲区，按刷新间隔请求重绘
pub fn spawn_ingest<S>(source: S, scope: Arc<ScopeContext>, events: Sender<PlotEvent>, refresh: Duration) -> JoinHandle<()>
where
    S: SignalSource + Send + 'static,
{
    thread::spawn(move || {
        let mut pipeline = IngestPipeline::new(source, refresh);
        match pipeline.run(scope.ring(), &events, || !scope.is_terminated()) {
            Ok(stats) => info!("ingest stopped: {stats:?}, {} dropped while busy", scope.ring().dropped()),
            Err(err) => {
                error!("read from device: {err}");
                info!("ingest totals before failure: {:?}", pipeline.stats());
                scope.fail(&err);
                // wake the render loop so it can exit
                events.send(PlotEvent::Quit).ok();
            }
        }
    })
}

// 绘图线程：等待事件，绘制下一个时间窗口
pub fn spawn_render<S>(scope: Arc<ScopeContext>, pipeline: RenderPipeline, mut surface: S, events: Receiver<PlotEvent>) -> JoinHandle<RenderStats>
where
    S: Surface + Send + 'static,
{
    thread::spawn(move || {
        let stats = run_render_loop(&scope, &pipeline, &mut surface, &events);
        info!("render stopped after {} frames", stats.frames);
        stats
    })
}

/// Draws the empty grid, then one frame per pointer release or redraw
/// request until quit. Marks the scope terminated on the way out.
pub fn run_render_loop<S: Surface>(scope: &ScopeContext, pipeline: &RenderPipeline, surface: &mut S, events: &Receiver<PlotEvent>) -> RenderStats {
    let mut stats = RenderStats::default();
    pipeline.draw_grid(surface);
    surface.present();

    // Disconnected senders end the loop like a quit
    while let Ok(event) = events.recv() {
        match event {
            PlotEvent::PointerRelease | PlotEvent::Redraw => {
                let drawn = scope.ring().with_ring(|ring| pipeline.render(ring, surface));
                stats.frames += 1;
                if let Some(range) = drawn {
                    stats.samples_drawn += range.len as u64;
                    debug!("{event:?}: drew {} samples from {}", range.len, range.start);
                }
            }
            PlotEvent::Quit => break,
        }
    }

    scope.terminate();
    stats
}
