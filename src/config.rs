use std::fs;
use std::num::IntErrorKind;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::lights::{LightCounts, LightKind};
use crate::scene::Scene;

pub const USAGE: &str = "Usage: deferred-lights [--assets DIR] [--scene FILE] [--points N] \
[--spots N] [--directionals N] [--describe]";

/// Settings resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Root that `shaders/` and `textures/` are resolved against.
    pub assets: PathBuf,
    pub scene: Option<PathBuf>,
    pub counts: LightCounts,
    /// Print the frame plan and exit instead of opening a window.
    pub describe: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            assets: PathBuf::from("."),
            scene: None,
            counts: LightCounts::default(),
            describe: false,
        }
    }
}

impl RenderConfig {
    /// Loads the scene file, or the built-in scene when none was given.
    pub fn load_scene(&self) -> Result<Scene> {
        let Some(path) = &self.scene else {
            return Ok(Scene::default());
        };
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        Scene::from_xml(&xml).with_context(|| format!("failed to parse scene {}", path.display()))
    }
}

pub struct CliOptions;

impl CliOptions {
    pub fn parse() -> Result<RenderConfig> {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parses arguments without the program name.
    pub fn parse_from<I>(args: I) -> Result<RenderConfig>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = RenderConfig::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--assets" => config.assets = PathBuf::from(value(&mut args, &arg)?),
                "--scene" => config.scene = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--points" => set_count(&mut config, LightKind::Point, &mut args, &arg)?,
                "--spots" => set_count(&mut config, LightKind::Spot, &mut args, &arg)?,
                "--directionals" => {
                    set_count(&mut config, LightKind::Directional, &mut args, &arg)?
                }
                "--describe" => config.describe = true,
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(config)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
}

fn set_count(
    config: &mut RenderConfig,
    kind: LightKind,
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<()> {
    let raw = value(args, flag)?;
    // Out-of-range integers still clamp.
    let count = match raw.parse::<i64>() {
        Ok(count) => count,
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => {
                return Err(anyhow::Error::new(err)
                    .context(format!("{flag} expects an integer, got '{raw}'")))
            }
        },
    };
    config.counts.set(kind, count);
    Ok(())
}
