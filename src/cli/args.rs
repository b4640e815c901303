// src/cli/args.rs
// Argument parsing for the headless capture command
// RELEVANT FILES: src/cli/run.rs, src/bin/relief_capture.rs, src/settings/config.rs

use std::fmt;
use std::path::PathBuf;

use crate::settings::{MeshQuality, RendererConfig, ShadowQuality};

pub const USAGE: &str = "usage: relief_capture <raster.png> [--quality low|medium|high|ultra|extreme] \
[--height-scale F] [--sun DEG] [--shadow low|medium|high|ultra] [--softness F] [--size N] \
[--config FILE.json] [--sea-level] [--texture OUT.png] [--depth OUT.png] [--raw OUT.f32] [--gpu]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    msg: String,
}

impl CliError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {}

/// Parsed command line. `None` fields fall back to the config file or defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureArgs {
    pub raster: PathBuf,
    pub quality: Option<MeshQuality>,
    pub height_scale: Option<f32>,
    pub sun: Option<f32>,
    pub shadow: Option<ShadowQuality>,
    pub softness: Option<f32>,
    pub size: Option<u32>,
    pub config: Option<PathBuf>,
    pub sea_level: bool,
    pub texture: Option<PathBuf>,
    pub depth: Option<PathBuf>,
    pub raw: Option<PathBuf>,
    pub gpu: bool,
    pub help: bool,
}

fn value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, CliError> {
    args.get(idx + 1)
        .map(String::as_str)
        .ok_or_else(|| CliError::new(format!("missing value for {flag}")))
}

/// Parse a float argument value.
pub fn parse_f32(args: &[String], idx: usize, flag: &str) -> Result<f32, CliError> {
    let raw = value(args, idx, flag)?;
    raw.parse::<f32>()
        .map_err(|_| CliError::new(format!("invalid float value '{raw}' for {flag}")))
}

/// Parse an unsigned integer argument value.
pub fn parse_u32(args: &[String], idx: usize, flag: &str) -> Result<u32, CliError> {
    let raw = value(args, idx, flag)?;
    raw.parse::<u32>()
        .map_err(|_| CliError::new(format!("invalid integer value '{raw}' for {flag}")))
}

fn parse_enum<T>(args: &[String], idx: usize, flag: &str) -> Result<T, CliError>
where
    T: std::str::FromStr<Err = &'static str>,
{
    let raw = value(args, idx, flag)?;
    raw.parse::<T>().map_err(|e| CliError::new(format!("{flag}: {e}")))
}

impl CaptureArgs {
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut out = CaptureArgs::default();
        let mut raster = None;
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut takes_value = true;
            match flag {
                "--quality" => out.quality = Some(parse_enum(args, i, flag)?),
                "--height-scale" => out.height_scale = Some(parse_f32(args, i, flag)?),
                "--sun" => out.sun = Some(parse_f32(args, i, flag)?),
                "--shadow" => out.shadow = Some(parse_enum(args, i, flag)?),
                "--softness" => out.softness = Some(parse_f32(args, i, flag)?),
                "--size" => out.size = Some(parse_u32(args, i, flag)?),
                "--config" => out.config = Some(PathBuf::from(value(args, i, flag)?)),
                "--texture" => out.texture = Some(PathBuf::from(value(args, i, flag)?)),
                "--depth" => out.depth = Some(PathBuf::from(value(args, i, flag)?)),
                "--raw" => out.raw = Some(PathBuf::from(value(args, i, flag)?)),
                "--sea-level" => {
                    out.sea_level = true;
                    takes_value = false;
                }
                "--gpu" => {
                    out.gpu = true;
                    takes_value = false;
                }
                "-h" | "--help" => {
                    out.help = true;
                    takes_value = false;
                }
                other if other.starts_with('-') => {
                    return Err(CliError::new(format!("unknown flag '{other}'")));
                }
                positional => {
                    if raster.is_some() {
                        return Err(CliError::new(format!("unexpected argument '{positional}'")));
                    }
                    raster = Some(PathBuf::from(positional));
                    takes_value = false;
                }
            }
            i += if takes_value { 2 } else { 1 };
        }
        if out.help {
            return Ok(out);
        }
        out.raster = raster.ok_or_else(|| CliError::new("missing raster path"))?;
        if out.size == Some(0) {
            return Err(CliError::new("--size must be positive"));
        }
        Ok(out)
    }

    /// Layer command-line overrides over `config`.
    pub fn apply(&self, config: &mut RendererConfig) {
        if let Some(q) = self.quality {
            config.mesh_quality = q;
        }
        if let Some(v) = self.height_scale {
            config.settings.height_scale = v;
        }
        if let Some(v) = self.sun {
            config.settings.sun_position = v;
        }
        if let Some(q) = self.shadow {
            config.settings.shadow_quality = q;
        }
        if let Some(v) = self.softness {
            config.settings.shadow_softness = v;
        }
        if let Some(n) = self.size {
            config.capture.width = n;
            config.capture.height = n;
        }
    }

    /// Terrain key: the raster file stem.
    pub fn key(&self) -> Option<String> {
        self.raster.file_stem().map(|s| s.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn parse_full_command() {
        let args = CaptureArgs::parse(&argv(
            "maps/alps.png --quality ultra --height-scale 45 --sun 200 --shadow high \
             --softness 1.5 --size 256 --texture t.png --depth d.png --sea-level",
        ))
        .unwrap();
        assert_eq!(args.raster, PathBuf::from("maps/alps.png"));
        assert_eq!(args.quality, Some(MeshQuality::Ultra));
        assert_eq!(args.height_scale, Some(45.0));
        assert_eq!(args.sun, Some(200.0));
        assert_eq!(args.shadow, Some(ShadowQuality::High));
        assert_eq!(args.softness, Some(1.5));
        assert_eq!(args.size, Some(256));
        assert_eq!(args.depth, Some(PathBuf::from("d.png")));
        assert!(args.sea_level);
        assert_eq!(args.key().as_deref(), Some("alps"));
    }

    #[test]
    fn overrides_layer_over_config() {
        let args = CaptureArgs::parse(&argv("a.png --sun 10 --size 64")).unwrap();
        let mut cfg = RendererConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.settings.sun_position, 10.0);
        assert_eq!(cfg.capture.width, 64);
        assert_eq!(cfg.settings.height_scale, 30.0);
    }

    #[test]
    fn oversized_capture_fails_config_validation() {
        let args = CaptureArgs::parse(&argv("a.png --size 70000")).unwrap();
        let mut cfg = RendererConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.validate().unwrap_err().category(), "Config");
    }

    #[test]
    fn reports_bad_input() {
        let err = CaptureArgs::parse(&argv("a.png --sun")).unwrap_err();
        assert!(err.to_string().contains("missing value for --sun"));
        let err = CaptureArgs::parse(&argv("a.png --quality potato")).unwrap_err();
        assert!(err.to_string().starts_with("--quality"));
        assert!(CaptureArgs::parse(&argv("--sun 5")).is_err());
        assert!(CaptureArgs::parse(&argv("a.png b.png")).is_err());
        assert!(CaptureArgs::parse(&argv("a.png --bogus")).is_err());
        assert!(CaptureArgs::parse(&argv("a.png --size 0")).is_err());
        assert!(CaptureArgs::parse(&argv("--help")).unwrap().help);
    }
}
