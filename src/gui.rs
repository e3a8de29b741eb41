// src/gui.rs
use anyhow::{Context, Result};
use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};
use log::{error, info};
use std::fs;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use crate::drivers::plot::{Color, DrawCommand};
use crate::drivers::{render_png, FrontBuffer, PresentedFrame};
use crate::engine::ScopeContext;
use crate::types::{PlotConfig, PlotEvent};

// 默认界面刷新间隔（实际帧由绘图线程产生）
const DEFAULT_REPAINT: Duration = Duration::from_millis(30);

pub struct OsciiApp {
    config: PlotConfig,
    front: FrontBuffer,
    scope: Arc<ScopeContext>,
    events: Sender<PlotEvent>,
    repaint: Duration,
}

impl OsciiApp {
    pub fn new(config: PlotConfig, front: FrontBuffer, scope: Arc<ScopeContext>, events: Sender<PlotEvent>) -> Self {
        let repaint = match config.refresh_ms {
            0 => DEFAULT_REPAINT,
            ms => Duration::from_millis(ms).min(DEFAULT_REPAINT),
        };
        Self { config, front, scope, events, repaint }
    }

    fn canvas_size(&self) -> Vec2 {
        Vec2::new(self.config.width as f32, self.config.height as f32)
    }

    // 按 S 保存当前画面为 PNG，文件名带时间戳
    fn save_snapshot(&self) -> Result<String> {
        let png = render_png(&self.front.latest(), self.config.width, self.config.height)?;
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let filename = format!("oscii_snapshot_{}.png", timestamp);
        fs::write(&filename, png).with_context(|| format!("write {filename}"))?;
        Ok(filename)
    }
}

impl eframe::App for OsciiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.scope.is_terminated() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default().frame(egui::Frame::none()).show(ctx, |ui| {
            let (response, painter) = ui.allocate_painter(self.canvas_size(), Sense::click());
            paint_frame(&painter, response.rect.min, &self.front.latest());
            // clicked() 在鼠标释放时触发
            if response.clicked() {
                self.events.send(PlotEvent::PointerRelease).ok();
            }
        });

        if ctx.input(|i| i.key_pressed(egui::Key::S)) {
            match self.save_snapshot() {
                Ok(filename) => info!("snapshot saved: {}", filename),
                Err(err) => error!("snapshot failed: {err:#}"),
            }
        }
        ctx.request_repaint_after(self.repaint);
    }
}

impl Drop for OsciiApp {
    fn drop(&mut self) {
        // 窗口关闭 -> 通知绘图线程退出
        self.events.send(PlotEvent::Quit).ok();
    }
}

fn to_color32(color: Color) -> Color32 {
    Color32::from_rgb(color.0, color.1, color.2)
}

/// Replays a presented frame with `origin` as canvas (0, 0).
pub fn paint_frame(painter: &egui::Painter, origin: Pos2, frame: &PresentedFrame) {
    let at = |(x, y): (i32, i32)| origin + Vec2::new(x as f32, y as f32);
    for command in &frame.commands {
        match *command {
            DrawCommand::Clear(color) => {
                painter.rect_filled(painter.clip_rect(), 0.0, to_color32(color));
            }
            DrawCommand::Line { from, to, color } => {
                painter.line_segment([at(from), at(to)], Stroke::new(1.0, to_color32(color)));
            }
            DrawCommand::Point { at: p, color } => {
                painter.rect_filled(Rect::from_center_size(at(p), Vec2::splat(2.0)), 0.0, to_color32(color));
            }
        }
    }
}
