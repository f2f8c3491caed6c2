//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::info;

use tonescope::error::ConfigResult;
use tonescope::params::{AnalysisParams, TuningPreset};
use tonescope::scene::SceneKind;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "tonescope")]
#[command(about = "Real-time pitch, beat and spectrum analysis for audio visuals", long_about = None)]
pub struct Args {
    /// Analyse a WAV file instead of the microphone
    #[arg(long, value_name = "WAV")]
    pub input: Option<PathBuf>,

    /// Scene: cosmos (default), bass-geo, heightmap, faraday, falling
    #[arg(long, value_name = "SCENE", default_value = "cosmos")]
    pub scene: String,

    /// Tuning preset: standard (default), sensitive, stable
    #[arg(long, value_name = "PRESET", default_value = "standard")]
    pub preset: String,

    /// TOML file overriding individual parameters
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Render ticks per second (overrides the config file)
    #[arg(long, value_name = "N")]
    pub fps: Option<u32>,

    /// Stop after N frames
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Print the HUD every N frames (0 = never)
    #[arg(long, value_name = "N", default_value = "60")]
    pub hud_every: u64,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse scene name from command-line arguments
    pub fn parse_scene(&self) -> ConfigResult<SceneKind> {
        let scene: SceneKind = self.scene.parse()?;
        info!("Scene: {} ({})", scene, scene.description());
        Ok(scene)
    }

    /// Preset, then config file, then `--fps`
    pub fn load_params(&self) -> ConfigResult<AnalysisParams> {
        let preset: TuningPreset = self.preset.parse()?;
        let mut params = match &self.config {
            Some(path) => {
                info!("Config: {} (base preset {})", path.display(), preset);
                AnalysisParams::load(path, preset)?
            }
            None => {
                info!("Preset: {}", preset);
                preset.params()
            }
        };
        if let Some(fps) = self.fps {
            params.frame.fps = fps;
        }
        params.validate()?;
        Ok(params)
    }
}
