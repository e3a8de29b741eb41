// src/main.rs
mod config;
mod drivers;
mod engine;
mod gui;
mod types;
use anyhow::{anyhow, Context, Result};
use config::{AppConfig, Command, DeviceConfig};
use drivers::{open_serial, FrontBuffer, RecordingSurface, RenderPipeline, SampleRing, SimulatedSource};
use eframe::egui;
use engine::ScopeContext;
use types::PlotEvent;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;
// 模拟设备参数
const SIM_SAMPLE_RATE_HZ: f64 = 2000.0;
const SIM_WAVE_HZ: f64 = 3.0;
const SIM_DROP_PROBABILITY: f64 = 0.001;
fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // -v 打开逐字节回显 (trace)
    if verbose {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.init();
}
fn parse_command_line() -> AppConfig {
    let mut args = std::env::args();
    let exe = args.next().unwrap_or_else(|| "oscii".to_owned());
    match config::parse_args(args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            print!("{}", config::usage(&exe));
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{}", config::usage(&exe));
            std::process::exit(1);
        }
    }
}
// 入口函数
fn main() -> Result<()> {
    let app_config = parse_command_line();
    init_logging(app_config.verbose);
    let plot = app_config.plot;
    let ring = SampleRing::with_capacity(app_config.capacity)?;
    let scope = Arc::new(ScopeContext::new(ring));
    let (tx, rx) = channel();
    let refresh = Duration::from_millis(plot.refresh_ms);
    // 1. 打开数据源并启动采集线程
    let ingest = match &app_config.device {
        DeviceConfig::Serial { path, baud } => {
            let source = open_serial(path, *baud).with_context(|| format!("open device {path}"))?;
            log::info!("reading {path} at {} baud", drivers::source::standard_baud(*baud));
            engine::spawn_ingest(source, scope.clone(), tx.clone(), refresh)
        }
        DeviceConfig::Simulated => {
            log::info!("reading simulated device");
            let source = SimulatedSource::new(SIM_SAMPLE_RATE_HZ, SIM_WAVE_HZ)
                .with_drop_probability(SIM_DROP_PROBABILITY);
            engine::spawn_ingest(source, scope.clone(), tx.clone(), refresh)
        }
    };
    // 2. 绘图线程
    let front = FrontBuffer::default();
    let render = engine::spawn_render(
        scope.clone(),
        RenderPipeline::new(&plot),
        RecordingSurface::new(front.clone()),
        rx,
    );
    // 3. 窗口
    let size = [plot.width as f32, plot.height as f32];
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(size)
            .with_resizable(false)
            .with_title("Oscii"),
        ..Default::default()
    };
    let gui_scope = scope.clone();
    let presented = front.clone();
    let quit = tx.clone();
    eframe::run_native(
        "Oscii",
        options,
        Box::new(move |_cc| Box::new(gui::OsciiApp::new(plot, front, gui_scope, tx))),
    )
    .map_err(|e| anyhow!("window failed: {e}"))?;
    // 窗口关闭后收尾
    scope.terminate();
    quit.send(PlotEvent::Quit).ok();
    if let Ok(stats) = render.join() {
        log::info!(
            "rendered {} frames, {} samples, {} presented",
            stats.frames,
            stats.samples_drawn,
            presented.generation()
        );
    }
    // the ingest thread may be parked in a device read; only reap it if it already stopped
    if ingest.is_finished() {
        ingest.join().ok();
    }
    match scope.failure() {
        Some(reason) => Err(anyhow!("read from device: {reason}")),
        None => Ok(()),
    }
}
