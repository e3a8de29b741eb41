// src/drivers/mod.rs
// Real-time data path: device bytes -> frames -> ring -> window -> plot
pub mod buffer;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod plot;
pub mod source;
pub mod window;
// Re-export the types the engine and GUI wire together
pub use buffer::{SampleRing, SharedRing, DEFAULT_CAPACITY};
pub use error::ScopeError;
pub use pipeline::IngestPipeline;
pub use plot::{render_png, FrontBuffer, PresentedFrame, RecordingSurface, RenderPipeline, Surface};
pub use source::{open_serial, SignalSource, SimulatedSource};
