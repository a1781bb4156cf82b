use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use watson_sdk::config::{ServiceConfig, ServiceKind};
use watson_sdk::speech_to_text::{DEFAULT_MODEL, RecognizeParams, SpeechToTextService};
use watson_sdk::visual_recognition::{
    ClassifierExamples, ClassifierStatus, ClassifyParams, ImageFile, PollOptions,
    VisualRecognitionService,
};

/// Command line client for IBM Watson Visual Recognition and Speech-to-Text
#[derive(Parser, Debug)]
#[command(name = "watson")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an image by URL
    Classify {
        #[arg(long)]
        url: String,
        #[arg(long = "classifier-id")]
        classifier_ids: Vec<String>,
        #[arg(long = "owner")]
        owners: Vec<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Classify a local image or zip of images
    ClassifyFile {
        path: PathBuf,
        #[arg(long = "classifier-id")]
        classifier_ids: Vec<String>,
        #[arg(long = "owner")]
        owners: Vec<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Detect faces in an image
    DetectFaces {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Manage custom classifiers
    #[command(subcommand)]
    Classifiers(ClassifierCommands),

    /// Transcribe an audio file
    Recognize {
        path: PathBuf,
        /// Audio MIME type (e.g. audio/wav, audio/flac)
        #[arg(long = "content-type", default_value = "audio/wav")]
        content_type: String,
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[arg(long = "keywords-threshold", default_value_t = 0.5)]
        keywords_threshold: f64,
        #[arg(long = "word-alternatives-threshold")]
        word_alternatives_threshold: Option<f64>,
    },

    /// Inspect speech recognition models
    #[command(subcommand)]
    Models(ModelCommands),
}

#[derive(Subcommand, Debug)]
enum ClassifierCommands {
    /// List classifiers
    List {
        #[arg(long)]
        verbose: bool,
    },
    /// Show one classifier
    Get { id: String },
    /// Train a classifier from zip archives
    Create {
        #[arg(long)]
        name: String,
        /// Positive examples as CLASS=PATH.zip (repeatable)
        #[arg(long = "positive", value_parser = parse_class_archive, required = true)]
        positive: Vec<(String, PathBuf)>,
        #[arg(long)]
        negative: Option<PathBuf>,
    },
    /// Add examples to a classifier
    Update {
        id: String,
        #[arg(long = "positive", value_parser = parse_class_archive)]
        positive: Vec<(String, PathBuf)>,
        #[arg(long)]
        negative: Option<PathBuf>,
    },
    /// Delete a classifier
    Delete { id: String },
    /// Wait until a classifier is ready
    Wait {
        id: String,
        #[arg(long = "interval-secs", default_value_t = 5)]
        interval_secs: u64,
        #[arg(long = "max-attempts", default_value_t = 120)]
        max_attempts: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ModelCommands {
    List,
    Get { name: String },
}

fn parse_class_archive(value: &str) -> Result<(String, PathBuf), String> {
    let (class_name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CLASS=PATH, got '{value}'"))?;
    if class_name.is_empty() || path.is_empty() {
        return Err(format!("expected CLASS=PATH, got '{value}'"));
    }
    Ok((class_name.to_string(), PathBuf::from(path)))
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn image_file(path: &Path) -> anyhow::Result<ImageFile> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(ImageFile::from_bytes(read_file(path)?, file_name))
}

fn load_examples(
    positive: &[(String, PathBuf)],
    negative: Option<&Path>,
) -> anyhow::Result<ClassifierExamples> {
    let mut examples = ClassifierExamples::new();
    for (class_name, path) in positive {
        examples = examples.with_positive(class_name.clone(), read_file(path)?);
    }
    if let Some(path) = negative {
        examples = examples.with_negative(read_file(path)?);
    }
    Ok(examples)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn classify_params(classifier_ids: Vec<String>, owners: Vec<String>, threshold: Option<f64>) -> ClassifyParams {
    ClassifyParams {
        classifier_ids,
        owners,
        threshold,
    }
}

fn visual_recognition(config: Option<&Path>) -> anyhow::Result<VisualRecognitionService> {
    let config = ServiceConfig::load(ServiceKind::VisualRecognition, config)?;
    Ok(VisualRecognitionService::new(config)?)
}

fn speech_to_text(config: Option<&Path>) -> anyhow::Result<SpeechToTextService> {
    let config = ServiceConfig::load(ServiceKind::SpeechToText, config)?;
    Ok(SpeechToTextService::new(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Classify {
            url,
            classifier_ids,
            owners,
            threshold,
        } => {
            let params = classify_params(classifier_ids, owners, threshold);
            print_json(&visual_recognition(config)?.classify(&url, &params).await?)?;
        }
        Commands::ClassifyFile {
            path,
            classifier_ids,
            owners,
            threshold,
        } => {
            let params = classify_params(classifier_ids, owners, threshold);
            let image = image_file(&path)?;
            print_json(&visual_recognition(config)?.classify_image(image, &params).await?)?;
        }
        Commands::DetectFaces { url, file } => {
            let service = visual_recognition(config)?;
            let faces = match (url, file) {
                (Some(url), _) => service.detect_faces(&url).await?,
                (None, Some(path)) => service.detect_faces_image(image_file(&path)?).await?,
                (None, None) => anyhow::bail!("either --url or --file is required"),
            };
            print_json(&faces)?;
        }
        Commands::Classifiers(command) => {
            let service = visual_recognition(config)?;
            match command {
                ClassifierCommands::List { verbose } => {
                    let classifiers = if verbose {
                        service.get_classifiers_verbose().await?
                    } else {
                        service.get_classifiers_brief().await?
                    };
                    print_json(&classifiers)?;
                }
                ClassifierCommands::Get { id } => print_json(&service.get_classifier(&id).await?)?,
                ClassifierCommands::Create {
                    name,
                    positive,
                    negative,
                } => {
                    let examples = load_examples(&positive, negative.as_deref())?;
                    print_json(&service.create_classifier(&name, examples).await?)?;
                }
                ClassifierCommands::Update {
                    id,
                    positive,
                    negative,
                } => {
                    let examples = load_examples(&positive, negative.as_deref())?;
                    print_json(&service.update_classifier(&id, examples).await?)?;
                }
                ClassifierCommands::Delete { id } => {
                    service.delete_classifier(&id).await?;
                    info!("Deleted classifier {}", id);
                }
                ClassifierCommands::Wait {
                    id,
                    interval_secs,
                    max_attempts,
                } => {
                    let options = PollOptions::default()
                        .with_interval(Duration::from_secs(interval_secs))
                        .with_max_attempts(max_attempts);
                    let classifier = service
                        .wait_for_classifier_status(&id, ClassifierStatus::Ready, options)
                        .await?;
                    print_json(&classifier)?;
                }
            }
        }
        Commands::Recognize {
            path,
            content_type,
            model,
            keywords,
            keywords_threshold,
            word_alternatives_threshold,
        } => {
            let mut params = RecognizeParams::new(content_type).with_model(model);
            if !keywords.is_empty() {
                params = params.with_keywords(keywords, keywords_threshold);
            }
            params.word_alternatives_threshold = word_alternatives_threshold;

            let audio = read_file(&path)?;
            let results = speech_to_text(config)?.recognize(audio, &params).await?;
            print_json(&results)?;
        }
        Commands::Models(command) => {
            let service = speech_to_text(config)?;
            match command {
                ModelCommands::List => print_json(&service.list_models().await?)?,
                ModelCommands::Get { name } => print_json(&service.get_model(&name).await?)?,
            }
        }
    }

    Ok(())
}
