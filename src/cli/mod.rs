// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and routes each subcommand
// to its Layer 2 use case. Nothing here touches tensors.
//
//   gen-shapes         draw the synthetic image dataset
//   shapes             train the shape classifier
//   wavenet            train WaveNet, then generate audio
//   forecast           train an LSTM forecaster (single/multi/delayed)
//   translate          train the sentence-pair transformer
//   audio-transformer  train the audio transformer, then generate
//   generate           sample audio from a saved checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenShapesArgs, GenerateArgs, GenerateModel};

use crate::application::{
    audio_transformer_use_case::AudioTransformerUseCase,
    forecast_use_case::{ForecastOutcome, ForecastUseCase},
    shapes_use_case::{generate_shapes, ShapesUseCase},
    translate_use_case::TranslateUseCase,
    wavenet_use_case::WaveNetUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "synthlab",
    version = "0.1.0",
    about = "Train shape classifiers, audio generators and sequence models, then sample from them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::GenShapes(args) => run_gen_shapes(args),
            Commands::Shapes(args) => {
                let report = ShapesUseCase::new(args.into()).execute()?;
                println!("Training complete. {}", report.summary());
                Ok(())
            }
            Commands::Wavenet(args) => {
                let output = args.output.clone();
                let audio  = WaveNetUseCase::new(args.into()).execute()?;
                print_written(audio.len(), &output);
                Ok(())
            }
            Commands::Forecast(args) => {
                let output  = args.output.clone();
                let outcome = ForecastUseCase::new(args.into()).execute()?;
                print_forecast(&outcome, &output);
                Ok(())
            }
            Commands::Translate(args) => {
                let translations = TranslateUseCase::new(args.into()).execute()?;
                println!("Training complete. Translated {} held-out sentences.", translations.len());
                Ok(())
            }
            Commands::AudioTransformer(args) => {
                let output = args.output.clone();
                let audio  = AudioTransformerUseCase::new(args.into()).execute()?;
                print_written(audio.len(), &output);
                Ok(())
            }
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_gen_shapes(args: GenShapesArgs) -> Result<()> {
    tracing::info!("Drawing {} shapes into {}", args.count, args.out_dir);
    let manifest = generate_shapes(Path::new(&args.out_dir), args.count, args.size, args.seed)?;
    println!("Wrote {} images. Manifest: {}", args.count, manifest.display());
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let dir = args.checkpoint_dir.as_str();
    match args.model {
        GenerateModel::Wavenet => {
            let audio = WaveNetUseCase::from_checkpoint(dir, args.samples, &args.output)?;
            print_written(audio.len(), &args.output);
        }
        GenerateModel::Forecast => {
            let outcome = ForecastUseCase::from_checkpoint(dir, args.samples, &args.output)?;
            print_written(outcome.audio.len(), &args.output);
        }
        GenerateModel::AudioTransformer => {
            let audio = AudioTransformerUseCase::from_checkpoint(dir, args.samples, &args.output)?;
            print_written(audio.len(), &args.output);
        }
    }
    Ok(())
}

fn print_written(samples: usize, output: &str) {
    println!("Generated {samples} samples → {output}");
}

fn print_forecast(outcome: &ForecastOutcome, output: &str) {
    match outcome.mae {
        Some(mae) => println!("Training complete. Held-out MAE: {mae:.6}"),
        None      => println!("Training complete. No held-out windows previewed."),
    }
    for (i, f) in outcome.forecasts.iter().enumerate() {
        let head: Vec<String> = f.iter().take(5).map(|v| format!("{v:.4}")).collect();
        println!("  window {i}: [{}{}]", head.join(", "), if f.len() > 5 { ", …" } else { "" });
    }
    if !outcome.audio.is_empty() {
        print_written(outcome.audio.len(), output);
    }
}
