// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// One subcommand per workflow. Defaults are the constants the
// experiments were tuned with; every one can be overridden.
//
// Each *Args struct converts into its application-layer run
// config through `From`, so Layer 2 never sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::num::NonZeroUsize;

use clap::{
    builder::{RangedI64ValueParser, RangedU64ValueParser},
    Args, Subcommand, ValueEnum,
};

use crate::application::{
    audio_input::AudioInput,
    audio_transformer_use_case::AudioTransformerRunConfig,
    forecast_use_case::{ForecastMode, ForecastRunConfig},
    shapes_use_case::ShapesRunConfig,
    translate_use_case::TranslateRunConfig,
    wavenet_use_case::WaveNetRunConfig,
};
use crate::data::{shapes::MIN_SIZE, windowing::WindowSpec};

/// A count flag with a lower bound, checked while parsing.
fn at_least(min: u64) -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(min..)
}

/// Image side lengths the generator and the CNN both accept.
fn image_side() -> RangedI64ValueParser<u32> {
    RangedI64ValueParser::new().range(i64::from(MIN_SIZE)..)
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Draw a synthetic circle / square dataset with its CSV manifest
    GenShapes(GenShapesArgs),

    /// Train the shape CNN on a CSV manifest of images
    Shapes(ShapesArgs),

    /// Train the WaveNet generator and sample audio from it
    Wavenet(WaveNetArgs),

    /// Train an LSTM forecaster on audio
    Forecast(ForecastArgs),

    /// Train the encoder–decoder transformer on sentence pairs
    Translate(TranslateArgs),

    /// Train the audio transformer and sample audio from it
    AudioTransformer(AudioTransformerArgs),

    /// Generate audio again from a saved checkpoint
    Generate(GenerateArgs),
}

// ─── Shared audio flags ──────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct AudioArgs {
    /// Directory of .wav files; a sine wave is used when omitted
    #[arg(long)]
    pub audio_dir: Option<String>,

    /// Samples kept per file (truncated or zero-padded)
    #[arg(long)]
    pub desired_samples: Option<usize>,

    /// Use only the first N files in name order
    #[arg(long)]
    pub limit: Option<usize>,

    /// Sample rate of the written audio and of the sine source
    #[arg(long, default_value_t = 22050)]
    pub sample_rate: u32,

    /// Frequency of the fallback sine wave in Hz
    #[arg(long, default_value_t = 440.0)]
    pub sine_frequency: f32,

    /// Number of sine waves when no audio directory is given
    #[arg(long)]
    pub sine_waves: Option<usize>,
}

impl AudioArgs {
    /// Override the per-workflow defaults in `base` with the flags given.
    pub fn apply(self, base: AudioInput) -> AudioInput {
        AudioInput {
            audio_dir:       self.audio_dir.or(base.audio_dir),
            desired_samples: self.desired_samples.unwrap_or(base.desired_samples),
            limit:           self.limit.or(base.limit),
            sample_rate:     self.sample_rate,
            sine_frequency:  self.sine_frequency,
            sine_waves:      self.sine_waves.unwrap_or(base.sine_waves),
        }
    }
}

// ─── gen-shapes ──────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct GenShapesArgs {
    /// Output directory for the PNG files and dataset.csv
    #[arg(long, default_value = "data/shapes")]
    pub out_dir: String,

    /// Number of images; must be even (half circles, half squares)
    #[arg(long, default_value_t = 1000)]
    pub count: usize,

    /// Side length of every image in pixels
    #[arg(long, default_value_t = 54, value_parser = image_side())]
    pub size: u32,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

// ─── shapes ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ShapesArgs {
    /// CSV manifest with `image_path,label` rows
    #[arg(long, default_value = "data/shapes/dataset.csv")]
    pub manifest: String,

    /// Generate this many synthetic images next to the manifest first
    #[arg(long)]
    pub generate: Option<usize>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Images are resized to size × size
    #[arg(long, default_value_t = 54, value_parser = image_side())]
    pub image_size: u32,

    /// Channels of every convolution
    #[arg(long, default_value_t = 8, value_parser = at_least(1))]
    pub channels: usize,

    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 32, value_parser = at_least(1))]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Log training progress every N batches
    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<ShapesArgs> for ShapesRunConfig {
    fn from(a: ShapesArgs) -> Self {
        ShapesRunConfig {
            manifest:       a.manifest,
            generate:       a.generate,
            checkpoint_dir: a.checkpoint_dir,
            image_size:     a.image_size,
            channels:       a.channels,
            train_ratio:    a.train_ratio,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            log_every:      a.log_every,
            seed:           a.seed,
        }
    }
}

// ─── wavenet ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct WaveNetArgs {
    #[command(flatten)]
    pub audio: AudioArgs,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Where the generated audio is written
    #[arg(long, default_value = "output/wavenet.wav")]
    pub output: String,

    /// Past samples the model sees per prediction
    #[arg(long, default_value_t = 2048, value_parser = at_least(1))]
    pub time_steps: usize,

    /// Distance between the starts of consecutive training windows
    #[arg(long, default_value_t = 32)]
    pub hop: usize,

    /// Amplitude bins, i.e. output classes
    #[arg(long, default_value_t = 256, value_parser = at_least(2))]
    pub bins: usize,

    #[arg(long, default_value_t = 32, value_parser = at_least(1))]
    pub residual_channels: usize,

    #[arg(long, default_value_t = 64, value_parser = at_least(1))]
    pub skip_channels: usize,

    /// Residual blocks; block i has dilation 2^i
    #[arg(long, default_value_t = 8, value_parser = at_least(1))]
    pub layers: usize,

    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 32, value_parser = at_least(1))]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    /// Samples to generate after training
    #[arg(long, default_value_t = 22050)]
    pub generate: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<WaveNetArgs> for WaveNetRunConfig {
    fn from(a: WaveNetArgs) -> Self {
        WaveNetRunConfig {
            audio:             a.audio.apply(WaveNetRunConfig::default().audio),
            checkpoint_dir:    a.checkpoint_dir,
            output:            a.output,
            time_steps:        a.time_steps,
            hop:               a.hop,
            bins:              a.bins,
            residual_channels: a.residual_channels,
            skip_channels:     a.skip_channels,
            layers:            a.layers,
            train_ratio:       a.train_ratio,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            lr:                a.lr,
            log_every:         a.log_every,
            generate:          a.generate,
            seed:              a.seed,
        }
    }
}

// ─── forecast ────────────────────────────────────────────────────────────────
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// 4000 past samples → next sample
    Single,
    /// 8000 past samples → next 4410 samples
    Multi,
    /// 1200 past samples → sample 720 steps later, tanh output
    Delayed,
}

impl From<ModeArg> for ForecastMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Single  => ForecastMode::Single,
            ModeArg::Multi   => ForecastMode::Multi,
            ModeArg::Delayed => ForecastMode::Delayed,
        }
    }
}

/// Flags left unset take the defaults of `--mode`.
#[derive(Args, Debug)]
pub struct ForecastArgs {
    #[arg(long, value_enum, default_value_t = ModeArg::Single)]
    pub mode: ModeArg,

    #[command(flatten)]
    pub audio: AudioArgs,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "output/forecast.wav")]
    pub output: String,

    /// Past samples per window
    #[arg(long)]
    pub past: Option<NonZeroUsize>,

    /// Values predicted per window
    #[arg(long)]
    pub future: Option<NonZeroUsize>,

    /// Gap between the window and its target
    #[arg(long)]
    pub delay: Option<usize>,

    /// Keep every step-th value of the past window
    #[arg(long)]
    pub step: Option<usize>,

    /// Distance between the starts of consecutive windows
    #[arg(long)]
    pub hop: Option<usize>,

    /// LSTM hidden units
    #[arg(long, value_parser = at_least(1))]
    pub hidden: Option<usize>,

    #[arg(long)]
    pub train_ratio: Option<f64>,

    #[arg(long, value_parser = at_least(1))]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub lr: Option<f64>,

    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    /// Samples to continue autoregressively (single-step models)
    #[arg(long, default_value_t = 22050)]
    pub generate: usize,

    /// Held-out windows to forecast after training
    #[arg(long, default_value_t = 5)]
    pub preview: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<ForecastArgs> for ForecastRunConfig {
    fn from(a: ForecastArgs) -> Self {
        let base = ForecastRunConfig::for_mode(a.mode.into());
        let w    = base.window;
        let window = WindowSpec {
            past:   a.past.map_or(w.past, NonZeroUsize::get),
            future: a.future.map_or(w.future, NonZeroUsize::get),
            ..w
        }
        .with_delay(a.delay.unwrap_or(w.delay))
        .with_step(a.step.unwrap_or(w.step))
        .with_hop(a.hop.unwrap_or(w.hop));

        ForecastRunConfig {
            audio:          a.audio.apply(base.audio.clone()),
            checkpoint_dir: a.checkpoint_dir,
            output:         a.output,
            window,
            hidden:         a.hidden.unwrap_or(base.hidden),
            tanh_output:    base.tanh_output,
            train_ratio:    a.train_ratio.unwrap_or(base.train_ratio),
            batch_size:     a.batch_size.unwrap_or(base.batch_size),
            epochs:         a.epochs.unwrap_or(base.epochs),
            lr:             a.lr.unwrap_or(base.lr),
            log_every:      a.log_every,
            generate:       a.generate,
            preview:        a.preview,
            seed:           a.seed,
        }
    }
}

// ─── translate ───────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Tab-separated file, one `source<TAB>target` pair per line
    #[arg(long, default_value = "data/pt_en.tsv")]
    pub pairs: String,

    #[arg(long, default_value = "pt")]
    pub source_lang: String,

    #[arg(long, default_value = "en")]
    pub target_lang: String,

    /// Also holds the tokenizers
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Vocabulary size per language, special tokens included
    #[arg(long, default_value_t = 8192)]
    pub vocab_size: usize,

    /// Pairs with a side longer than this many tokens are dropped
    #[arg(long, default_value_t = 40)]
    pub max_length: usize,

    #[arg(long, default_value_t = 4, value_parser = at_least(1))]
    pub num_layers: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 8, value_parser = at_least(1))]
    pub num_heads: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Optimiser steps of linear learning-rate warm-up
    #[arg(long, default_value_t = 4000)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 64, value_parser = at_least(1))]
    pub batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 50)]
    pub log_every: usize,

    /// Held-out sentences to translate after training
    #[arg(long, default_value_t = 10)]
    pub samples: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<TranslateArgs> for TranslateRunConfig {
    fn from(a: TranslateArgs) -> Self {
        TranslateRunConfig {
            pairs:          a.pairs,
            source_lang:    a.source_lang,
            target_lang:    a.target_lang,
            checkpoint_dir: a.checkpoint_dir,
            vocab_size:     a.vocab_size,
            max_length:     a.max_length,
            num_layers:     a.num_layers,
            d_model:        a.d_model,
            d_ff:           a.d_ff,
            num_heads:      a.num_heads,
            dropout:        a.dropout,
            warmup_steps:   a.warmup_steps,
            train_ratio:    a.train_ratio,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            log_every:      a.log_every,
            samples:        a.samples,
            seed:           a.seed,
        }
    }
}

// ─── audio-transformer ───────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct AudioTransformerArgs {
    #[command(flatten)]
    pub audio: AudioArgs,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "output/audio_transformer.wav")]
    pub output: String,

    /// Amplitude bins of the input embedding
    #[arg(long, default_value_t = 4096, value_parser = at_least(2))]
    pub bins: usize,

    /// Also the generation context length
    #[arg(long, default_value_t = 1024, value_parser = at_least(1))]
    pub d_model: usize,

    #[arg(long, default_value_t = 2048, value_parser = at_least(1))]
    pub d_ff: usize,

    #[arg(long, default_value_t = 1, value_parser = at_least(1))]
    pub num_heads: usize,

    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    #[arg(long, default_value_t = 64, value_parser = at_least(1))]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    #[arg(long, default_value_t = 22050)]
    pub generate: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<AudioTransformerArgs> for AudioTransformerRunConfig {
    fn from(a: AudioTransformerArgs) -> Self {
        AudioTransformerRunConfig {
            audio:          a.audio.apply(AudioTransformerRunConfig::default().audio),
            checkpoint_dir: a.checkpoint_dir,
            output:         a.output,
            bins:           a.bins,
            d_model:        a.d_model,
            d_ff:           a.d_ff,
            num_heads:      a.num_heads,
            train_ratio:    a.train_ratio,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            log_every:      a.log_every,
            generate:       a.generate,
            seed:           a.seed,
        }
    }
}

// ─── generate ────────────────────────────────────────────────────────────────
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateModel {
    Wavenet,
    Forecast,
    AudioTransformer,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long, value_enum)]
    pub model: GenerateModel,

    /// Directory the model was trained into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Samples to generate
    #[arg(long, default_value_t = 22050)]
    pub samples: usize,

    #[arg(long, default_value = "output/generated.wav")]
    pub output: String,
}
