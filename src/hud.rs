//! Text readout of the current analysis frame and the pitch colour.

use std::fmt;

use crate::pipeline::AnalysisFrame;
use crate::scene::SceneKind;

/// Flash level above which the HUD reports a beat / peak
const FLASH_ON: f32 = 0.25;

/// Pitch colour while no note is identified
pub const IDLE_PITCH_COLOR: Rgb = Rgb {
    r: 0xd6,
    g: 0xff,
    b: 0xfc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// HSB (hue in degrees, saturation and brightness in percent) to 8-bit RGB
pub fn hsb_to_rgb(hue: f32, saturation: f32, brightness: f32) -> Rgb {
    let h = if hue.is_finite() { hue.rem_euclid(360.0) } else { 0.0 };
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let v = (brightness / 100.0).clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    // Round half up
    let to_byte = |channel: f32| ((channel + m) * 255.0 + 0.5).floor().clamp(0.0, 255.0) as u8;
    Rgb {
        r: to_byte(r),
        g: to_byte(g),
        b: to_byte(b),
    }
}

/// One HUD snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum HudReadout {
    /// No capture running
    MicOff,
    Live(LiveReadout),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveReadout {
    pub scene: SceneKind,
    pub note_text: String,
    /// Smoothed frequency, `None` at rest
    pub frequency_hz: Option<f32>,
    pub confidence_pct: f32,
    pub low: i32,
    pub mid: i32,
    pub high: i32,
    pub volume_pct: f32,
    pub beat: bool,
    pub peak: bool,
    pub note_name: Option<String>,
    pub color: Rgb,
}

impl HudReadout {
    pub fn from_frame(scene: SceneKind, frame: Option<&AnalysisFrame>) -> Self {
        let Some(frame) = frame else {
            return Self::MicOff;
        };
        let pitch = &frame.pitch;
        let color = match pitch.note {
            Some(_) => hsb_to_rgb(pitch.hue, 80.0, 95.0),
            None => IDLE_PITCH_COLOR,
        };

        Self::Live(LiveReadout {
            scene,
            note_text: pitch.note_text(),
            frequency_hz: (pitch.smoothed_frequency_hz > 0.0).then_some(pitch.smoothed_frequency_hz),
            confidence_pct: pitch.confidence * 100.0,
            low: frame.bands.low.round() as i32,
            mid: frame.bands.mid.round() as i32,
            high: frame.bands.high.round() as i32,
            volume_pct: frame.bands.vol * 100.0,
            beat: frame.beat_flash() > FLASH_ON,
            peak: frame.peak_flash() > FLASH_ON,
            note_name: pitch.note.map(|note| note.name()),
            color,
        })
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

impl fmt::Display for HudReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hud = match self {
            Self::MicOff => return writeln!(f, "STATUS : MIC OFF\nWaiting for input..."),
            Self::Live(hud) => hud,
        };

        let freq = match hud.frequency_hz {
            Some(hz) => format!("{hz:.1} Hz"),
            None => "--".to_string(),
        };
        let note = hud.note_name.as_deref().unwrap_or("--");

        writeln!(f, "SCENE : {}", hud.scene)?;
        writeln!(f, "PITCH : {} ({}) {}", hud.note_text, note, hud.color)?;
        writeln!(f, "FREQ  : {}", freq)?;
        writeln!(f, "CONF  : {:.0}%", hud.confidence_pct)?;
        writeln!(f, "LOW   : {}", hud.low)?;
        writeln!(f, "MID   : {}", hud.mid)?;
        writeln!(f, "HIGH  : {}", hud.high)?;
        writeln!(f, "VOL   : {:.1}%", hud.volume_pct)?;
        writeln!(f, "BEAT  : {}", yes_no(hud.beat))?;
        writeln!(f, "PEAK  : {}", yes_no(hud.peak))?;
        writeln!(f, "{}", hud.scene.description())
    }
}
