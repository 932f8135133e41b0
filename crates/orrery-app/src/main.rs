//! Offscreen orrery demo.
//!
//! Loads `config.ron`, builds every configured body and renders the
//! requested number of frames into an offscreen texture. Without a GPU
//! adapter (or with `--headless`) the same scene is recorded on the CPU.
//!
//! Run with: `cargo run -p orrery-app -- --frames 3`

mod offscreen;
mod scene;

use std::path::PathBuf;

use clap::Parser;
use orrery_config::{CliArgs, Config, default_bodies};
use orrery_planet::vertex_lighting;
use orrery_render::{
    GpuContext, GraphicsDevice, HeadlessDevice, RenderPassBuilder, WgpuDevice,
    init_gpu_context_blocking,
};
use tracing::{debug, error, info, warn};

use crate::offscreen::{COLOR_FORMAT, DEPTH_FORMAT, OffscreenTarget};
use crate::scene::{Scene, SceneError};

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("orrery")
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if config.bodies.is_empty() {
        config.bodies = default_bodies();
    }

    let log_dir = config_dir.join("logs");
    orrery_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        "Orrery: {} bodies, {}x{} target, {} frames",
        config.bodies.len(),
        config.render.width,
        config.render.height,
        config.render.frames
    );

    let result = if args.headless {
        run_headless(&config)
    } else {
        match init_gpu_context_blocking() {
            Ok(context) => run_gpu(context, &config),
            Err(e) => {
                warn!("GPU unavailable ({e}), recording on the CPU instead");
                run_headless(&config)
            }
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run_gpu(context: GpuContext, config: &Config) -> Result<(), SceneError> {
    let GpuContext { device, queue, .. } = context;
    let target = OffscreenTarget::new(&device, config.render.width, config.render.height);
    let mut gpu = WgpuDevice::new(device, queue, COLOR_FORMAT, Some(DEPTH_FORMAT));
    let scene = Scene::build(&mut gpu, config)?;
    debug!("Projection: {:?}", scene.projection());
    log_lighting(&scene);

    let [r, g, b, a] = config.render.clear_color;
    let pass = RenderPassBuilder::new()
        .clear_color(wgpu::Color { r, g, b, a })
        .depth(target.depth_view())
        .label("bodies");

    for frame in 0..config.render.frames {
        scene.draw(&mut gpu);
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        let draws = gpu.encode_frame(&mut encoder, &target.color_view, &pass);
        gpu.queue().submit(std::iter::once(encoder.finish()));
        debug!("Frame {frame}: {draws} draws submitted");
    }

    info!(
        "Rendered {} frames into {}x{} offscreen target",
        config.render.frames,
        target.color.width(),
        target.color.height()
    );
    Ok(())
}

fn run_headless(config: &Config) -> Result<(), SceneError> {
    let mut device = HeadlessDevice::new();
    let scene = Scene::build(&mut device, config)?;
    log_lighting(&scene);

    let mut recorded = 0;
    for _ in 0..config.render.frames {
        scene.draw(&mut device);
        recorded += device.take_draws().len();
    }

    info!(
        "Recorded {} draws over {} frames ({} rejected, {} live buffers)",
        recorded,
        config.render.frames,
        device.rejected_draws(),
        device.live_buffers()
    );
    Ok(())
}

/// Log the lighting range each body will be drawn with.
fn log_lighting<D: GraphicsDevice>(scene: &Scene<D>) {
    for body in scene.bodies() {
        let (min, max) = body.mesh().positions().iter().fold(
            (f32::MAX, f32::MIN),
            |(min, max), position| {
                let light = vertex_lighting(
                    body.model_view_matrix(),
                    body.normal_matrix(),
                    scene.sun_position(),
                    glam::Vec3::from_array(*position),
                );
                (min.min(light.x), max.max(light.x))
            },
        );
        info!(
            "Body '{}' at {:?}: {} vertices, lighting {:.2}..{:.2}",
            body.name(),
            body.position(),
            body.vertex_count(),
            min,
            max
        );
    }
}
