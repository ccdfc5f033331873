#![allow(clippy::single_match)]

mod app_delegation;
mod app_initialized;
mod app_uninit;
mod backend;
mod cli;
mod demo;
mod egui_renderer;
#[cfg(feature = "gamepad")]
mod gamepad;
mod graphics;

use std::time::Instant;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::util::SubscriberInitExt;
use winit::event_loop::{ControlFlow, EventLoop};
use manga_core::backend::headless::HeadlessBackend;
use manga_core::{Depth, MainLoop, Palette, RenderContext, TextureFormat};
use crate::app_delegation::DelegatedApp::Uninitialized;
use crate::app_delegation::InstantClock;
use crate::app_uninit::App;
use crate::cli::Cli;
use crate::demo::DemoGame;

fn setup_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .finish()
        .init();
}

/// Runs the game without a window, e.g. to measure how fast it composes.
fn run_headless(cli: &Cli) -> anyhow::Result<()> {
    let depth = cli.depth().unwrap_or(Depth::Rgb32);
    let mut backend = HeadlessBackend::new(TextureFormat::of(depth));
    let render = RenderContext::init(&mut backend, &Palette::default())?;
    let clock = InstantClock { instant: Instant::now() };
    let game = DemoGame::new(0, cli.frames.or(Some(70 * 10)));

    let mut main_loop = MainLoop::new(render, cli.settings(), clock, game);
    main_loop.run(&mut backend);

    info!(
        "{} frames presented, last checksum {:08x}",
        backend.frames_presented(),
        backend.last_frame_checksum()
    );
    Ok(())
}

fn run_windowed(cli: &Cli) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    use thread_priority::*;
    // if it didn't work, oh well
    let _ = set_current_thread_priority(ThreadPriority::Max);

    let mut app = Uninitialized(App::new(cli.settings(), cli.depth(), cli.frames));
    event_loop.run_app(&mut app)?;
    Ok(())
}

pub fn main() {
    let cli = Cli::parse();
    setup_logging(cli.level());
    info!("stdout logger started");

    let result = if cli.headless {
        run_headless(&cli)
    } else {
        run_windowed(&cli)
    };

    // exit status stays 0
    if let Err(e) = result {
        error!("{:#}", e);
    }
}
