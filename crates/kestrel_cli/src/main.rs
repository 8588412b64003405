use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use kestrel_renderer::{render, IntegratorKind, RenderConfig};
use log::info;

mod cli;
mod scenes;

use cli::Args;

fn load_config(path: &Path) -> Result<RenderConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let config =
        serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))?;
    info!("Loaded render config from {}", path.display());
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RenderConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let (scene, camera) = match &args.obj {
        Some(path) => scenes::obj_scene(path, args.backend.into())?,
        None => scenes::demo_scene(args.fog, args.backend.into())?,
    };
    if scene.has_media() && config.integrator == IntegratorKind::Path {
        log::warn!("Scene contains media but the path integrator ignores them; use --integrator volpath");
    }

    let image = render(&scene, &camera, &config).context("render failed")?;
    image
        .save_png(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    Ok(())
}
