use std::sync::{Arc, Mutex, PoisonError};
use log::trace;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::backend::BitMapBackend;
use plotters::drawing::IntoDrawingArea;
use plotters::element::{PathElement, Pixel};
use plotters::style::RGBColor;
use crate::drivers::buffer::SampleRing;
use crate::drivers::error::ScopeError;
use crate::drivers::window::{select_window, WindowRange};
use crate::types::PlotConfig;
/// Left and bottom margin reserved for the axes, in pixels.
pub const GUTTER: i32 = 40;
const GRID_LINES: i32 = 11;
const DASH_LEN: i32 = 5;
const DASH_GAP: i32 = 3;
const EDGE_MARGIN: i32 = 10;
const AXIS_TOP: i32 = 20;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);
pub const BACKGROUND: Color = Color(0, 0, 0);
pub const GRID_COLOR: Color = Color(7, 65, 110);
pub const AXIS_COLOR: Color = Color(7, 41, 176);
pub const TRACE_COLOR: Color = Color(0, 200, 0);
/// Display the render pipeline draws on.
pub trait Surface {
    fn set_color(&mut self, color: Color);
    /// Fills the whole surface with the current color.
    fn clear(&mut self);
    fn line(&mut self, from: (i32, i32), to: (i32, i32));
    fn point(&mut self, at: (i32, i32));
    fn present(&mut self);
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCommand {
    Clear(Color),
    Line {
        from: (i32, i32),
        to: (i32, i32),
        color: Color,
    },
    Point {
        at: (i32, i32),
        color: Color,
    },
}
/// Last frame handed over by `present`, shared with whoever displays it.
#[derive(Clone, Debug, Default)]
pub struct PresentedFrame {
    pub generation: u64,
    pub commands: Vec<DrawCommand>,
}
#[derive(Clone, Default)]
pub struct FrontBuffer {
    inner: Arc<Mutex<PresentedFrame>>,
}
impl FrontBuffer {
    pub fn latest(&self) -> PresentedFrame {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
    pub fn generation(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }
}
/// Surface that records draw calls and publishes them to a [`FrontBuffer`]
/// on `present`.
pub struct RecordingSurface {
    color: Color,
    pending: Vec<DrawCommand>,
    front: FrontBuffer,
}
impl RecordingSurface {
    pub fn new(front: FrontBuffer) -> Self {
        Self {
            color: BACKGROUND,
            pending: Vec::new(),
            front,
        }
    }
}
impl Surface for RecordingSurface {
    fn set_color(&mut self, color: Color) {
        self.color = color;
    }
    fn clear(&mut self) {
        self.pending.clear();
        self.pending.push(DrawCommand::Clear(self.color));
    }
    fn line(&mut self, from: (i32, i32), to: (i32, i32)) {
        self.pending.push(DrawCommand::Line {
            from,
            to,
            color: self.color,
        });
    }
    fn point(&mut self, at: (i32, i32)) {
        self.pending.push(DrawCommand::Point {
            at,
            color: self.color,
        });
    }
    fn present(&mut self) {
        let mut front = self.front.inner.lock().unwrap_or_else(PoisonError::into_inner);
        front.generation += 1;
        front.commands = std::mem::take(&mut self.pending);
    }
}
/// Pixel mapping of the plot area.
#[derive(Clone, Copy, Debug)]
pub struct PlotGeometry {
    pub width: i32,
    pub height: i32,
    pub max_y: i32,
}
impl PlotGeometry {
    pub fn from_config(config: &PlotConfig) -> Self {
        Self {
            width: config.width as i32,
            height: config.height as i32,
            max_y: config.max_y.max(1) as i32,
        }
    }
    pub fn plot_width(&self) -> i32 {
        self.width - GUTTER
    }
    pub fn plot_height(&self) -> i32 {
        self.height - GUTTER
    }
    pub fn baseline(&self) -> i32 {
        self.height - GUTTER
    }
    /// X of the `n`th sample of a `len`-sample range; the last sample lands on
    /// the right edge.
    pub fn x_at(&self, n: usize, len: usize) -> i32 {
        if len <= 1 {
            return GUTTER;
        }
        let offset = i64::from(self.plot_width()) * n as i64 / (len as i64 - 1);
        GUTTER + offset as i32
    }
    /// Canvas Y grows downward, so larger values sit higher.
    pub fn y_at(&self, value: u16) -> i32 {
        let offset = i64::from(self.plot_height()) * i64::from(value) / i64::from(self.max_y);
        self.baseline() - offset as i32
    }
}
/// Draws the grid and the current window of samples.
pub struct RenderPipeline {
    geometry: PlotGeometry,
    window_us: u64,
}
impl RenderPipeline {
    pub fn new(config: &PlotConfig) -> Self {
        Self {
            geometry: PlotGeometry::from_config(config),
            window_us: config.sample_msecs.saturating_mul(1000),
        }
    }
    /// Draws one frame from the ring's head and consumes the drawn samples.
    /// Returns the range that was drawn, if any.
    pub fn render<S: Surface>(&self, ring: &mut SampleRing, surface: &mut S) -> Option<WindowRange> {
        self.draw_grid(surface);
        let range = select_window(ring, self.window_us);
        if let Some(range) = range {
            self.plot_points(ring, range, surface);
            ring.consume_to(range.end);
        }
        surface.present();
        range
    }
    /// Clears the surface and draws eleven dashed gridlines plus both axes.
    pub fn draw_grid<S: Surface>(&self, surface: &mut S) {
        let PlotGeometry { width, height, .. } = self.geometry;
        surface.set_color(BACKGROUND);
        surface.clear();
        surface.set_color(GRID_COLOR);
        let ygap = (height - GUTTER) / GRID_LINES;
        for i in 0..GRID_LINES {
            let y = height - (GUTTER + i * ygap);
            draw_dashed(surface, (GUTTER, y), (width - EDGE_MARGIN, y), DASH_LEN);
        }
        surface.set_color(AXIS_COLOR);
        for k in 1..=3 {
            surface.line((GUTTER - k, height - EDGE_MARGIN), (GUTTER - k, AXIS_TOP));
        }
        for k in 1..=3 {
            let y = height - GUTTER + k;
            surface.line((EDGE_MARGIN, y), (width - EDGE_MARGIN, y));
        }
    }
    pub fn plot_points<S: Surface>(&self, ring: &SampleRing, range: WindowRange, surface: &mut S) {
        let geometry = self.geometry;
        surface.set_color(TRACE_COLOR);
        let mut prev = (GUTTER, geometry.baseline());
        for (n, sample) in ring.iter_range(range.start, range.end).enumerate() {
            let at = (geometry.x_at(n, range.len), geometry.y_at(sample.value));
            trace!("{} @ {}us -> {:?}", sample.value, sample.timestamp_us, at);
            surface.line(prev, at);
            surface.point(at);
            prev = at;
        }
    }
}
/// Dashes of `len` pixels separated by a fixed gap, horizontal when the x
/// coordinates differ and vertical otherwise.
pub fn draw_dashed<S: Surface>(surface: &mut S, from: (i32, i32), to: (i32, i32), len: i32) {
    let (mut x, mut y) = from;
    if from.0 != to.0 {
        while x < to.0 {
            surface.line((x, y), ((x + len).min(to.0), to.1));
            x += len + DASH_GAP;
        }
    } else {
        while y < to.1 {
            surface.line((x, y), (x, (y + len).min(to.1)));
            y += len + DASH_GAP;
        }
    }
}
/// Replays a presented frame onto a bitmap and encodes it as PNG.
pub fn render_png(frame: &PresentedFrame, width: u32, height: u32) -> Result<Vec<u8>, ScopeError> {
    if frame.commands.is_empty() {
        return Err(ScopeError::Plot("nothing has been presented yet".into()));
    }
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        for command in &frame.commands {
            match *command {
                DrawCommand::Clear(color) => root.fill(&to_rgb(color))?,
                DrawCommand::Line { from, to, color } => {
                    root.draw(&PathElement::new(vec![from, to], &to_rgb(color)))?
                }
                DrawCommand::Point { at, color } => root.draw(&Pixel::new(at, &to_rgb(color)))?,
            }
        }
        root.present()?;
    }
    encode_png(&buffer, width, height)
}
fn to_rgb(color: Color) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}
/// `buffer` is packed RGB, three bytes per pixel, row by row.
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScopeError> {
    let mut png = Vec::with_capacity(buffer.len() / 4);
    PngEncoder::new(&mut png).write_image(buffer, width, height, ExtendedColorType::Rgb8)?;
    Ok(png)
}
#[cfg(test)]
mod tests {
    use super::*;
    fn config(width: u32, height: u32) -> PlotConfig {
        PlotConfig {
            width,
            height,
            max_y: 1000,
            sample_msecs: 1,
            refresh_ms: 0,
        }
    }
    fn lines(commands: &[DrawCommand], color: Color) -> Vec<((i32, i32), (i32, i32))> {
        commands
            .iter()
            .filter_map(|c| match *c {
                DrawCommand::Line { from, to, color: c } if c == color => Some((from, to)),
                _ => None,
            })
            .collect()
    }
    fn points(commands: &[DrawCommand]) -> Vec<(i32, i32)> {
        commands
            .iter()
            .filter_map(|c| match *c {
                DrawCommand::Point { at, .. } => Some(at),
                _ => None,
            })
            .collect()
    }
    #[test]
    fn two_sample_range_spans_plot_width() {
        let geometry = PlotGeometry::from_config(&config(100, 140));
        assert_eq!(geometry.x_at(0, 2), 40);
        assert_eq!(geometry.x_at(1, 2), 100);
        assert_eq!(geometry.x_at(0, 1), 40);
    }
    #[test]
    fn amplitude_maps_upward_from_baseline() {
        let geometry = PlotGeometry::from_config(&config(100, 140));
        assert_eq!(geometry.y_at(0), 100);
        assert_eq!(geometry.y_at(500), 50);
        assert_eq!(geometry.y_at(1000), 0);
    }
    #[test]
    fn dashes_are_identical_in_both_orientations() {
        let horizontal = {
            let mut s = RecordingSurface::new(FrontBuffer::default());
            draw_dashed(&mut s, (0, 7), (20, 7), 5);
            lines(&s.pending, BACKGROUND)
        };
        let vertical = {
            let mut s = RecordingSurface::new(FrontBuffer::default());
            draw_dashed(&mut s, (7, 0), (7, 20), 5);
            lines(&s.pending, BACKGROUND)
        };
        assert_eq!(
            horizontal,
            vec![((0, 7), (5, 7)), ((8, 7), (13, 7)), ((16, 7), (20, 7))]
        );
        let swapped: Vec<_> = vertical
            .iter()
            .map(|&((x1, y1), (x2, y2))| ((y1, x1), (y2, x2)))
            .collect();
        assert_eq!(swapped, horizontal);
    }
    #[test]
    fn grid_has_eleven_dashed_rows_and_thick_axes() {
        let pipeline = RenderPipeline::new(&config(800, 600));
        let mut surface = RecordingSurface::new(FrontBuffer::default());
        pipeline.draw_grid(&mut surface);
        assert_eq!(surface.pending[0], DrawCommand::Clear(BACKGROUND));
        let grid = lines(&surface.pending, GRID_COLOR);
        let mut rows: Vec<i32> = grid.iter().map(|(from, _)| from.1).collect();
        rows.dedup();
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0], 560);
        assert_eq!(lines(&surface.pending, AXIS_COLOR).len(), 6);
    }
    #[test]
    fn render_draws_window_and_consumes_it() {
        let pipeline = RenderPipeline::new(&config(100, 140));
        let mut ring = SampleRing::with_capacity(16).unwrap();
        for (value, ts) in [(0, 0), (1000, 500), (500, 1500)] {
            ring.push(value, ts);
        }
        let front = FrontBuffer::default();
        let mut surface = RecordingSurface::new(front.clone());
        let range = pipeline.render(&mut ring, &mut surface).unwrap();
        assert_eq!(range.len, 2);
        let frame = front.latest();
        assert_eq!(frame.generation, 1);
        assert_eq!(points(&frame.commands), vec![(40, 100), (100, 0)]);
        let trace = lines(&frame.commands, TRACE_COLOR);
        assert_eq!(trace, vec![((40, 100), (40, 100)), ((40, 100), (100, 0))]);
        assert_eq!(ring.head(), 2);
        assert_eq!(ring.len(), 1);
    }
    #[test]
    fn empty_ring_renders_grid_only() {
        let pipeline = RenderPipeline::new(&config(200, 200));
        let mut ring = SampleRing::with_capacity(8).unwrap();
        let front = FrontBuffer::default();
        let mut surface = RecordingSurface::new(front.clone());
        assert_eq!(pipeline.render(&mut ring, &mut surface), None);
        let frame = front.latest();
        assert!(points(&frame.commands).is_empty());
        assert!(lines(&frame.commands, TRACE_COLOR).is_empty());
        assert!(!frame.commands.is_empty());
    }
    #[test]
    fn identical_ring_states_draw_identically() {
        let pipeline = RenderPipeline::new(&config(300, 200));
        let mut ring = SampleRing::with_capacity(32).unwrap();
        for i in 0..10u16 {
            ring.push(i * 50, u64::from(i) * 200);
        }
        let mut copy = ring.clone();
        let front_a = FrontBuffer::default();
        let front_b = FrontBuffer::default();
        pipeline.render(&mut ring, &mut RecordingSurface::new(front_a.clone()));
        pipeline.render(&mut copy, &mut RecordingSurface::new(front_b.clone()));
        assert_eq!(front_a.latest().commands, front_b.latest().commands);
        // once drained, renders without pushes repeat the same frame
        let front = FrontBuffer::default();
        let mut surface = RecordingSurface::new(front.clone());
        while pipeline.render(&mut ring, &mut surface).is_some() {}
        let drained = front.latest().commands;
        pipeline.render(&mut ring, &mut surface);
        pipeline.render(&mut ring, &mut surface);
        assert_eq!(front.latest().commands, drained);
        assert!(lines(&drained, TRACE_COLOR).is_empty());
    }
    #[test]
    fn png_snapshot_of_presented_frame() {
        let pipeline = RenderPipeline::new(&config(120, 90));
        let mut ring = SampleRing::with_capacity(8).unwrap();
        ring.push(300, 0);
        ring.push(600, 100);
        let front = FrontBuffer::default();
        pipeline.render(&mut ring, &mut RecordingSurface::new(front.clone()));
        let png = render_png(&front.latest(), 120, 90).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert!(render_png(&PresentedFrame::default(), 120, 90).is_err());
    }
}
