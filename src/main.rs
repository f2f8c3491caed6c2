//! Tonescope - listens to a microphone or WAV file and turns it into
//! per-frame visual drive: band energies, a smoothed pitch colour, beat and
//! peak flashes and twelve tone ripples.
//!
//! This binary runs the analysis headless: every frame is dispatched to a
//! renderer that packs the scene uniform block, and the HUD is printed to
//! stdout at a fixed interval.

mod cli;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, trace, warn};

use tonescope::analysis::Note;
use tonescope::audio::{read_wav_mono, MicCapture};
use tonescope::hud::HudReadout;
use tonescope::logging;
use tonescope::params::AnalysisParams;
use tonescope::scene::{
    dispatch, FaradayInput, SceneInput, SceneKind, SceneRenderer, SceneUniforms,
};
use tonescope::{AnalysisFrame, AnalysisPipeline};

use cli::Args;

/// Headless renderer: keeps the latest uniform block ready for upload
struct UniformRenderer {
    scene: SceneKind,
    uniforms: SceneUniforms,
    frames_drawn: u64,
}

impl UniformRenderer {
    fn new(scene: SceneKind) -> Self {
        Self {
            scene,
            uniforms: SceneUniforms::idle(scene),
            frames_drawn: 0,
        }
    }

    fn draw(&mut self, scene: &str, input: &SceneInput) {
        self.frames_drawn += 1;
        trace!(
            "{}: hue={:.0} low={:.0} peak={:.2} beat={:.2} ({} uniform bytes)",
            scene,
            input.hue,
            input.bands.low,
            input.peak_flash,
            input.beat_flash,
            self.uniforms.as_bytes().len()
        );
    }
}

impl SceneRenderer for UniformRenderer {
    fn draw_cosmos(&mut self, input: &SceneInput) {
        self.draw("cosmos", input);
    }

    fn draw_bass_geometry(&mut self, input: &SceneInput) {
        self.draw("bass geometry", input);
    }

    fn draw_heightmap(&mut self, input: &SceneInput) {
        self.draw("heightmap", input);
    }

    fn draw_faraday(&mut self, input: &FaradayInput<'_>) {
        self.frames_drawn += 1;
        let active = input.ripples.iter().filter(|r| r.is_active).count();
        trace!(
            "faraday: note={:?} freq={:.1} Hz active_ripples={} bins={}",
            input.note.map(|n| n.name()),
            input.current_frequency_hz,
            active,
            input.spectrum.len()
        );
    }

    fn draw_falling(&mut self, input: &SceneInput) {
        self.draw("falling", input);
    }

    fn draw_static_stars(&mut self) {
        self.uniforms = SceneUniforms::idle(self.scene);
    }
}

/// Running totals printed when the input ends
#[derive(Default)]
struct Summary {
    frames: u64,
    beats: u64,
    peaks: u64,
    notes: HashMap<Note, u64>,
}

impl Summary {
    fn record(&mut self, frame: &AnalysisFrame) {
        self.frames += 1;
        self.beats += u64::from(frame.onset.beat_detected);
        self.peaks += u64::from(frame.onset.peak_detected);
        if let Some(note) = frame.pitch.note {
            *self.notes.entry(note).or_default() += 1;
        }
    }

    fn most_frequent_note(&self) -> Option<(Note, u64)> {
        self.notes
            .iter()
            .max_by_key(|(note, count)| (**count, note.octave, note.index))
            .map(|(note, count)| (*note, *count))
    }

    fn print(&self) {
        println!("\nFrames : {}", self.frames);
        println!("Beats  : {}", self.beats);
        println!("Peaks  : {}", self.peaks);
        match self.most_frequent_note() {
            Some((note, count)) => println!("Note   : {} ({} frames)", note, count),
            None => println!("Note   : --"),
        }
    }
}

/// Per-frame presentation shared by both input modes
struct Presenter {
    scene: SceneKind,
    renderer: UniformRenderer,
    summary: Summary,
    hud_every: u64,
}

impl Presenter {
    fn new(scene: SceneKind, hud_every: u64) -> Self {
        Self {
            scene,
            renderer: UniformRenderer::new(scene),
            summary: Summary::default(),
            hud_every,
        }
    }

    fn present(&mut self, frame: &AnalysisFrame) {
        self.renderer.uniforms = SceneUniforms::from_frame(self.scene, frame);
        dispatch(self.scene, Some(frame), &mut self.renderer);
        self.summary.record(frame);

        if self.hud_every > 0 && frame.index % self.hud_every == 0 {
            println!("{}", HudReadout::from_frame(self.scene, Some(frame)));
        }
    }

    /// Frame while no capture is running
    fn present_idle(&mut self) {
        dispatch(self.scene, None, &mut self.renderer);
    }

    fn finish(self) {
        if self.hud_every > 0 {
            println!("{}", HudReadout::from_frame(self.scene, None));
        }
        debug!("{} frames drawn", self.renderer.frames_drawn);
        self.summary.print();
    }
}

/// Set by Ctrl+C; the frame loops finish the current frame and wind down
#[derive(Clone, Default)]
struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Route Ctrl+C to this signal
    ///
    /// Without a handler Ctrl+C kills the process and `--frames` is the
    /// only graceful exit.
    fn install() -> Self {
        let signal = Self::default();
        let flag = signal.0.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            warn!("Ctrl+C handler not installed ({e}); use --frames to stop cleanly");
        }
        signal
    }

    #[cfg(test)]
    fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn should_stop(frames: u64, limit: Option<u64>, stop: &StopSignal) -> bool {
    stop.requested() || limit.is_some_and(|limit| frames >= limit)
}

/// Analyse a WAV file as fast as possible, one chunk of `sample_rate / fps` per frame
fn run_wav(
    path: &Path,
    params: AnalysisParams,
    args: &Args,
    stop: &StopSignal,
    presenter: &mut Presenter,
) -> Result<()> {
    let wav = read_wav_mono(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut pipeline = AnalysisPipeline::new(params, wav.sample_rate)?;
    let chunk = pipeline.samples_per_frame();

    info!(
        "Analysing {:.1}s of audio in {}-sample frames",
        wav.duration_secs(),
        chunk
    );

    for block in wav.samples.chunks(chunk) {
        let frame = pipeline.tick(block);
        presenter.present(&frame);
        if should_stop(pipeline.frame_count(), args.frames, stop) {
            break;
        }
    }

    pipeline.stop();
    Ok(())
}

/// Analyse the default microphone, paced to the frame rate
fn run_microphone(
    params: AnalysisParams,
    args: &Args,
    stop: &StopSignal,
    presenter: &mut Presenter,
) -> Result<()> {
    let capture = MicCapture::start().context("Failed to start microphone capture")?;
    let mut pipeline = AnalysisPipeline::new(params, capture.sample_rate())?;

    let frame_interval = Duration::from_secs_f32(pipeline.params().frame.frame_interval_s());
    let warmup = Duration::from_millis(pipeline.params().frame.warmup_ms);
    let mut samples = Vec::with_capacity(capture.sample_rate() as usize);

    // Input is not trusted until the device has settled
    info!("Listening on {} (warm-up {:?})", capture.device_name(), warmup);
    let warmup_start = Instant::now();
    while warmup_start.elapsed() < warmup && !stop.requested() {
        presenter.present_idle();
        pipeline.idle_tick();
        thread::sleep(frame_interval);
    }
    capture.drain_into(&mut samples);

    println!("Tonescope is listening. Press Ctrl+C to stop.\n");

    while !stop.requested() {
        let tick_start = Instant::now();

        capture.drain_into(&mut samples);
        let frame = pipeline.tick(&samples);
        presenter.present(&frame);

        if should_stop(pipeline.frame_count(), args.frames, stop) {
            break;
        }
        thread::sleep(frame_interval.saturating_sub(tick_start.elapsed()));
    }

    info!("Stopping after {} frames", pipeline.frame_count());
    capture.stop();
    pipeline.stop();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let scene = args.parse_scene()?;
    let params = args.load_params().context("Invalid analysis parameters")?;
    let mut presenter = Presenter::new(scene, args.hud_every);
    let stop = StopSignal::install();

    match &args.input {
        Some(path) => run_wav(path, params, &args, &stop, &mut presenter)?,
        None => run_microphone(params, &args, &stop, &mut presenter)?,
    }

    presenter.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_stop_on_limit_or_signal() {
        let stop = StopSignal::default();
        assert!(!should_stop(10, None, &stop));
        assert!(!should_stop(9, Some(10), &stop));
        assert!(should_stop(10, Some(10), &stop));

        stop.clone().request();
        assert!(should_stop(0, None, &stop));
    }
}
