// src/cli/run.rs
// Headless pipeline: load raster, render, export shaded texture and depth capture
// RELEVANT FILES: src/cli/args.rs, src/renderer.rs, src/loader.rs

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use super::args::{CaptureArgs, USAGE};
use crate::backend::{OutputConfig, RasterBackend, SoftwareBackend};
use crate::loader::{DirectorySource, TerrainLoader};
use crate::renderer::TerrainRenderer;
use crate::settings::RendererConfig;
use crate::util::image_write::write_png_rgba8;

pub fn run_capture_cli(argv: &[String]) -> Result<()> {
    let args = CaptureArgs::parse(argv)?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => RendererConfig::load_json(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RendererConfig::default(),
    };
    args.apply(&mut config);
    let key = args.key().ok_or_else(|| anyhow!("raster path has no file name"))?;
    if args.sea_level && !config.is_sea_level_key(&key) {
        config.sea_level_keys.push(key.clone());
    }
    config.validate()?;

    let root = args.raster.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let loader = TerrainLoader::new(DirectorySource::new(root)).with_sea_level_keys(config.sea_level_keys.clone());
    let field = loader
        .load_blocking(&key)
        .with_context(|| format!("failed to load {}", args.raster.display()))?;
    println!("{}", serde_json::to_string(field.stats())?);

    if let Some(path) = &args.raw {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        field.write_raw(BufWriter::new(file))?;
    }

    let output = OutputConfig::new(config.capture.width, config.capture.height, 1.0);
    let mut renderer = TerrainRenderer::new(&config)?.with_backend(make_backend(&args, output)?);
    renderer.set_terrain(key, field)?;
    renderer.tick(0)?;

    if let Some(path) = &args.texture {
        let node = renderer.terrain().ok_or_else(|| anyhow!("terrain slot empty after load"))?;
        let tex = &node.texture;
        write_png_rgba8(path, &tex.rgba, tex.width, tex.height)?;
        log::info!("wrote shaded texture to {}", path.display());
    }

    if let Some(path) = &args.depth {
        match renderer.capture_depth()? {
            Some(result) => {
                result.write_png(path)?;
                println!("{}", serde_json::to_string(&result.camera)?);
            }
            None => bail!("depth capture failed; see log for details"),
        }
    }
    Ok(())
}

#[cfg(feature = "gpu")]
fn make_backend(args: &CaptureArgs, output: OutputConfig) -> Result<Box<dyn RasterBackend>> {
    if args.gpu {
        return Ok(Box::new(crate::backend::WgpuBackend::new(output)?));
    }
    Ok(Box::new(SoftwareBackend::new(output)))
}

#[cfg(not(feature = "gpu"))]
fn make_backend(args: &CaptureArgs, output: OutputConfig) -> Result<Box<dyn RasterBackend>> {
    if args.gpu {
        log::warn!("built without the gpu feature; using the software backend");
    }
    Ok(Box::new(SoftwareBackend::new(output)))
}
