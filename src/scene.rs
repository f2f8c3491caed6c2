//! Scene selection and the read-only data each scene receives.
//!
//! The set of scenes is closed: [`SceneKind`] names them and
//! [`SceneRenderer`] has one method per scene, so [`dispatch`] is a plain
//! `match`. Drawing itself is the renderer's business.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

use crate::analysis::{FrequencyBands, Note, ToneRipple, RIPPLE_CHANNELS};
use crate::error::ConfigError;
use crate::pipeline::AnalysisFrame;

/// The five visual scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SceneKind {
    #[default]
    Cosmos,
    BassGeometry,
    Heightmap,
    Faraday,
    Falling,
}

impl SceneKind {
    pub const ALL: [SceneKind; 5] = [
        Self::Cosmos,
        Self::BassGeometry,
        Self::Heightmap,
        Self::Faraday,
        Self::Falling,
    ];

    /// Position in the scene cycle (0-based)
    pub fn index(self) -> usize {
        match self {
            Self::Cosmos => 0,
            Self::BassGeometry => 1,
            Self::Heightmap => 2,
            Self::Faraday => 3,
            Self::Falling => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// HUD label
    pub fn name(self) -> &'static str {
        match self {
            Self::Cosmos => "COSMOS",
            Self::BassGeometry => "BASS GEO",
            Self::Heightmap => "HEIGHTMAP",
            Self::Faraday => "FARADAY",
            Self::Falling => "FALLING",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Cosmos => "Pitch drives colour, spectrum drives the waves",
            Self::BassGeometry => "Bass lifts the blocks, beats trigger flashes",
            Self::Heightmap => "Band energies stack into contour lines",
            Self::Faraday => "Pitch class picks the zone colour, ripples linger",
            Self::Falling => "Sound spawns rings that bounce and vanish on the grid",
        }
    }

    /// Next scene in the cycle, wrapping around
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = ConfigError;

    /// Accepts the HUD label, a short alias or the 1-based scene number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        let kind = match key.as_str() {
            "cosmos" | "1" => Self::Cosmos,
            "bass geo" | "bass geometry" | "bass" | "2" => Self::BassGeometry,
            "heightmap" | "height map" | "3" => Self::Heightmap,
            "faraday" | "4" => Self::Faraday,
            "falling" | "rings" | "5" => Self::Falling,
            _ => {
                return Err(ConfigError::UnknownName {
                    kind: "scene",
                    name: s.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

/// Inputs of the four colour/flash driven scenes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneInput {
    pub bands: FrequencyBands,
    pub hue: f32,
    pub peak_flash: f32,
    pub beat_flash: f32,
}

impl SceneInput {
    pub fn from_frame(frame: &AnalysisFrame) -> Self {
        Self {
            bands: frame.bands,
            hue: frame.pitch.hue,
            peak_flash: frame.peak_flash(),
            beat_flash: frame.beat_flash(),
        }
    }
}

/// Inputs of the Faraday scene, which also reads the spectrum and ripples
#[derive(Debug, Clone, Copy)]
pub struct FaradayInput<'a> {
    pub bands: FrequencyBands,
    pub note: Option<Note>,
    pub current_frequency_hz: f32,
    pub peak_flash: f32,
    pub beat_flash: f32,
    pub spectrum: &'a [f32],
    pub ripples: &'a [ToneRipple; RIPPLE_CHANNELS],
}

impl<'a> FaradayInput<'a> {
    pub fn from_frame(frame: &'a AnalysisFrame) -> Self {
        Self {
            bands: frame.bands,
            note: frame.pitch.note,
            current_frequency_hz: frame.pitch.current_frequency_hz,
            peak_flash: frame.peak_flash(),
            beat_flash: frame.beat_flash(),
            spectrum: &frame.spectrum,
            ripples: &frame.ripples,
        }
    }

    pub fn note_index(&self) -> Option<usize> {
        self.note.map(|note| note.index)
    }
}

/// A renderer able to draw every scene
pub trait SceneRenderer {
    fn draw_cosmos(&mut self, input: &SceneInput);

    fn draw_bass_geometry(&mut self, input: &SceneInput);

    fn draw_heightmap(&mut self, input: &SceneInput);

    fn draw_faraday(&mut self, input: &FaradayInput<'_>);

    fn draw_falling(&mut self, input: &SceneInput);

    /// Backdrop shown while no capture is running
    fn draw_static_stars(&mut self);
}

/// Draw `kind` from `frame`, or the static starfield when there is no frame
pub fn dispatch<R: SceneRenderer + ?Sized>(
    kind: SceneKind,
    frame: Option<&AnalysisFrame>,
    renderer: &mut R,
) {
    let Some(frame) = frame else {
        renderer.draw_static_stars();
        return;
    };

    match kind {
        SceneKind::Cosmos => renderer.draw_cosmos(&SceneInput::from_frame(frame)),
        SceneKind::BassGeometry => renderer.draw_bass_geometry(&SceneInput::from_frame(frame)),
        SceneKind::Heightmap => renderer.draw_heightmap(&SceneInput::from_frame(frame)),
        SceneKind::Faraday => renderer.draw_faraday(&FaradayInput::from_frame(frame)),
        SceneKind::Falling => renderer.draw_falling(&SceneInput::from_frame(frame)),
    }
}

/// Uniform block for scene shaders (one per frame)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    /// low, mid, high (0..255), vol (0..1)
    pub bands: [f32; 4],
    pub hue: f32,
    pub peak_flash: f32,
    pub beat_flash: f32,
    pub confidence: f32,
    pub smoothed_frequency_hz: f32,
    pub current_frequency_hz: f32,
    /// Pitch class 0..=11, -1 when no pitch
    pub note_index: i32,
    pub scene: u32,
    pub ripple_amplitude: [f32; RIPPLE_CHANNELS],
    pub ripple_time: [f32; RIPPLE_CHANNELS],
}

impl SceneUniforms {
    /// Neutral block for the mic-off state
    pub fn idle(kind: SceneKind) -> Self {
        Self {
            note_index: -1,
            scene: kind.index() as u32,
            ..Self::zeroed()
        }
    }

    pub fn from_frame(kind: SceneKind, frame: &AnalysisFrame) -> Self {
        let bands = frame.bands;
        Self {
            bands: [bands.low, bands.mid, bands.high, bands.vol],
            hue: frame.pitch.hue,
            peak_flash: frame.peak_flash(),
            beat_flash: frame.beat_flash(),
            confidence: frame.pitch.confidence,
            smoothed_frequency_hz: frame.pitch.smoothed_frequency_hz,
            current_frequency_hz: frame.pitch.current_frequency_hz,
            note_index: frame.pitch.note_index_i32(),
            scene: kind.index() as u32,
            ripple_amplitude: frame.ripples.map(|r| r.amplitude),
            ripple_time: frame.ripples.map(|r| r.time),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalysisParams;
    use crate::pipeline::AnalysisPipeline;

    /// Records which scene method ran
    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        faraday_spectrum_len: usize,
    }

    impl SceneRenderer for Recorder {
        fn draw_cosmos(&mut self, _: &SceneInput) {
            self.calls.push("cosmos");
        }
        fn draw_bass_geometry(&mut self, _: &SceneInput) {
            self.calls.push("bass");
        }
        fn draw_heightmap(&mut self, _: &SceneInput) {
            self.calls.push("heightmap");
        }
        fn draw_faraday(&mut self, input: &FaradayInput<'_>) {
            self.faraday_spectrum_len = input.spectrum.len();
            self.calls.push("faraday");
        }
        fn draw_falling(&mut self, _: &SceneInput) {
            self.calls.push("falling");
        }
        fn draw_static_stars(&mut self) {
            self.calls.push("stars");
        }
    }

    fn frame() -> AnalysisFrame {
        let mut pipeline = AnalysisPipeline::new(AnalysisParams::default(), 44100).unwrap();
        pipeline.tick(&[0.0; 735])
    }

    #[test]
    fn test_dispatch_selects_scene() {
        let frame = frame();
        let mut recorder = Recorder::default();
        for kind in SceneKind::ALL {
            dispatch(kind, Some(&frame), &mut recorder);
        }
        assert_eq!(
            recorder.calls,
            ["cosmos", "bass", "heightmap", "faraday", "falling"]
        );
        assert_eq!(recorder.faraday_spectrum_len, 1024);
    }

    #[test]
    fn test_dispatch_without_frame_draws_stars() {
        let mut recorder = Recorder::default();
        dispatch(SceneKind::Faraday, None, &mut recorder);
        assert_eq!(recorder.calls, ["stars"]);
    }

    #[test]
    fn test_scene_parsing() {
        assert_eq!("cosmos".parse::<SceneKind>().unwrap(), SceneKind::Cosmos);
        assert_eq!("BASS GEO".parse::<SceneKind>().unwrap(), SceneKind::BassGeometry);
        assert_eq!("bass-geometry".parse::<SceneKind>().unwrap(), SceneKind::BassGeometry);
        assert_eq!("4".parse::<SceneKind>().unwrap(), SceneKind::Faraday);
        assert!("ocean".parse::<SceneKind>().is_err());
    }

    #[test]
    fn test_scene_cycle() {
        assert_eq!(SceneKind::Falling.next(), SceneKind::Cosmos);
        for kind in SceneKind::ALL {
            assert_eq!(SceneKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(SceneKind::from_index(5), None);
    }

    #[test]
    fn test_uniform_block_layout() {
        // 16-byte aligned for uniform buffers
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 144);
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);

        let frame = frame();
        let uniforms = SceneUniforms::from_frame(SceneKind::Heightmap, &frame);
        assert_eq!(uniforms.note_index, -1);
        assert_eq!(uniforms.scene, 2);
        // One silent tick drifts the hue 10% from 200 toward 220
        assert_eq!(uniforms.hue, frame.pitch.hue);
        assert!((uniforms.hue - 202.0).abs() < 1e-4);
        assert_eq!(uniforms.as_bytes().len(), 144);
    }

    #[test]
    fn test_idle_uniforms() {
        let uniforms = SceneUniforms::idle(SceneKind::Falling);
        assert_eq!(uniforms.note_index, -1);
        assert_eq!(uniforms.scene, 4);
        assert_eq!(uniforms.bands, [0.0; 4]);
    }
}
