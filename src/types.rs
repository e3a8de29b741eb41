// src/types.rs
use serde::{Deserialize, Serialize};

// Plot parameters, fixed after startup
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub max_y: u32,         // amplitude mapped to the top of the plot
    pub sample_msecs: u64,  // time span drawn per frame
    pub refresh_ms: u64,    // 0 = redraw only on click
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { width: 800, height: 600, max_y: 1200, sample_msecs: 1000, refresh_ms: 0 }
    }
}

// Events the render thread waits on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotEvent {
    PointerRelease,
    Redraw, // refresh timer fired on the ingest side
    Quit,
}
