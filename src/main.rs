//! Uroflow: uroflowmetry pattern classification.
//!
//! Command-line entry point.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uroflow::adapters::sanitize::SanitizingMakeWriter;
use uroflow::adapters::{CsvDatasetStore, FsArtifactStore};
use uroflow::application::{
    save_dataset, synthesize_dataset_seeded, DatasetService, ModelSlot, TrainingConfig,
};
use uroflow::config::{LogMode, UroflowConfig};
use uroflow::domain::round2;
use uroflow::{generate_curve, CaseInput, CurveKind, PatientRecord, PredictionResult};

#[derive(Debug, Parser)]
#[command(name = "uroflow", version, about = "Uroflowmetry pattern classification")]
struct Cli {
    /// Data directory (overrides UROFLOW_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Artifact directory (overrides UROFLOW_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Synthesize a labeled dataset and save it
    Generate {
        /// Number of synthetic patients
        #[arg(long)]
        samples: Option<usize>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Train the classifier on the dataset and persist the artifacts
    Train {
        /// Seed for the hold-out split and the forest
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a patient record
    Show {
        /// Patient identifier, e.g. PID0001
        patient_id: String,
    },
    /// Classify a stored patient or a manually entered case
    Predict {
        /// Use the measurements of a stored patient
        #[arg(long, conflicts_with_all = ["volume", "flow_time", "notes", "kind"])]
        patient: Option<String>,
        /// Voided volume in ml
        #[arg(long, required_unless_present = "patient")]
        volume: Option<f64>,
        /// Flow time in seconds
        #[arg(long, required_unless_present = "patient")]
        flow_time: Option<f64>,
        /// Clinical notes
        #[arg(long, default_value = "")]
        notes: String,
        /// Curve archetype to simulate for the case
        #[arg(long, default_value = "normal")]
        kind: String,
    },
}

fn init_logging(config: &UroflowConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Writing logs to an interactive terminal would interleave with command
    // output, so `auto` logs to a file there and to stdout otherwise.
    let use_file = match config.log_mode {
        LogMode::File => true,
        LogMode::Stdout => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("opening log file {}", config.log_file.display()))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}

fn print_record(record: &PatientRecord) {
    println!("{} - {}", record.id, record.full_name());
    println!("  {}", record.patient_info);
    println!(
        "  Qmax {:.2} ml/s | Qave {:.2} ml/s | Volume {} ml | Flow time {} s",
        record.qmax(),
        record.qave(),
        record.volume,
        record.flow_time
    );
    println!("  Notes: {}", record.clinical_notes);
    println!("  Diagnosis: {}", record.diagnosis);
}

fn print_prediction(result: &PredictionResult) {
    println!("Predicted diagnosis: {}", result.diagnosis);
    println!("  {}", result.diagnosis.description());
    for (diagnosis, probability) in result.formatted_probabilities() {
        println!("  {:<15} {probability}", diagnosis.as_str());
    }
    println!("Note analysis: {}", result.note_signal);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = UroflowConfig::from_env().context("reading configuration")?;
    if let Some(dir) = cli.data_dir {
        if std::env::var_os("UROFLOW_MODEL_DIR").is_none() && cli.model_dir.is_none() {
            config.model_dir = dir.join("models");
        }
        config.data_dir = dir;
    }
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }

    let _guard = init_logging(&config)?;
    tracing::info!("Starting uroflow...");

    let datasets = DatasetService::new(CsvDatasetStore::new(config.dataset_path()));

    match cli.command {
        Command::Generate { samples, seed } => {
            let samples = samples.unwrap_or(config.num_samples);
            let records = synthesize_dataset_seeded(samples, seed.unwrap_or(config.seed))?;
            save_dataset(&records, config.dataset_path())
                .with_context(|| format!("saving {}", config.dataset_path().display()))?;
            println!(
                "Wrote {} records to {}",
                records.len(),
                config.dataset_path().display()
            );
        }
        Command::Train { seed } => {
            let records = datasets.load_or_regenerate(config.num_samples, config.seed)?;
            let training = TrainingConfig::default().with_seed(seed.unwrap_or(config.seed));
            let mut slot = ModelSlot::new(FsArtifactStore::new(config.model_dir()));
            let report = slot.train(&records, &training).context("training")?;
            slot.persist()
                .with_context(|| format!("saving artifacts to {}", config.model_dir().display()))?;
            print!("{report}");
        }
        Command::Show { patient_id } => {
            let records = datasets.load_or_regenerate(config.num_samples, config.seed)?;
            let record = uroflow::find_patient(&records, &patient_id)?;
            print_record(record);
        }
        Command::Predict {
            patient,
            volume,
            flow_time,
            notes,
            kind,
        } => {
            let mut slot = ModelSlot::new(FsArtifactStore::new(config.model_dir()));
            let training = TrainingConfig::default().with_seed(config.seed);
            let trained = slot.load_or_train(
                || datasets.load_or_regenerate(config.num_samples, config.seed),
                &training,
            )?;
            if let Some(report) = trained {
                tracing::info!("Trained a new model: accuracy={:.4}", report.accuracy);
            }

            let case = match patient {
                Some(id) => {
                    let record = datasets.find(&id)?;
                    print_record(&record);
                    record.to_case()
                }
                None => {
                    let volume = volume.context("--volume is required")?;
                    let flow_time = flow_time.context("--flow-time is required")?;
                    let kind: CurveKind = kind.parse()?;
                    let curve = generate_curve(kind, volume, flow_time)?;
                    CaseInput {
                        qmax: round2(curve.max()),
                        qave: round2(curve.mean()),
                        volume,
                        flow_time,
                        clinical_notes: notes,
                        flow_curve: curve,
                    }
                }
            };

            let result = slot.predict(&case)?;
            print_prediction(&result);
        }
    }

    tracing::info!("uroflow finished.");
    Ok(())
}
