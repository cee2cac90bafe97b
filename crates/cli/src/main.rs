mod settings;

use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use landmark_capture_core::audio::infrastructure::whisper_recognizer::WhisperRecognizer;
use landmark_capture_core::capture::capture_logger::LogCaptureLogger;
use landmark_capture_core::capture::capture_session::CaptureSession;
use landmark_capture_core::capture::frame_sampler::{FrameSampler, SamplerOptions};
use landmark_capture_core::export::domain::tabular_exporter::{ExportLayout, TabularExporter};
use landmark_capture_core::export::infrastructure::json_exporter::{load_log, JsonExporter};
use landmark_capture_core::export::infrastructure::xlsx_exporter::XlsxExporter;
use landmark_capture_core::landmarks::domain::landmark_detector::LandmarkDetector;
use landmark_capture_core::landmarks::infrastructure::onnx_face_locator::OnnxFaceLocator;
use landmark_capture_core::landmarks::infrastructure::onnx_landmark_detector::OnnxLandmarkDetector;
use landmark_capture_core::shared::constants::{
    DEFAULT_EXPORT_FILENAME, DEFAULT_SURVEY_FILENAME, IMAGE_EXTENSIONS, LANDMARK_MODEL_NAME,
    QUESTION_COUNT, WHISPER_MODEL_FILENAME, WHISPER_MODEL_URL, FACE_MODEL_NAME,
};
use landmark_capture_core::shared::model_resolver;
use landmark_capture_core::survey::answer_question_use_case::AnswerQuestionUseCase;
use landmark_capture_core::survey::domain::questionnaire::Questionnaire;
use landmark_capture_core::video::domain::playback_source::PlaybackSource;
use landmark_capture_core::video::domain::video_reader::VideoReader;
use landmark_capture_core::video::infrastructure::clocked_playback::ClockedPlayback;
use landmark_capture_core::video::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use landmark_capture_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use landmark_capture_core::video::infrastructure::image_file_reader::ImageFileReader;

use settings::Settings;

/// Facial landmark capture and spreadsheet export.
#[derive(Parser)]
#[command(name = "landmark-capture", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample a video, image or webcam and export the detected landmarks.
    Capture(CaptureArgs),
    /// Re-export a JSON capture log in canonical coordinates.
    Normalize(NormalizeArgs),
    /// Score recorded spoken answers to the questionnaire.
    Survey(SurveyArgs),
    /// Show or change the remembered defaults.
    Settings(SettingsArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// Input video or image file.
    #[arg(required_unless_present = "webcam")]
    input: Option<PathBuf>,

    /// Capture from a webcam instead of a file.
    #[arg(long, conflicts_with = "input")]
    webcam: bool,

    /// Webcam index (defaults to the first camera).
    #[arg(long, requires = "webcam")]
    camera: Option<u32>,

    /// Spreadsheet to write.
    #[arg(long, default_value = DEFAULT_EXPORT_FILENAME)]
    output: PathBuf,

    /// Spreadsheet layout: per-observation or per-landmark.
    #[arg(long)]
    layout: Option<ExportLayout>,

    /// Keep pixel coordinates instead of normalizing each face.
    #[arg(long)]
    raw: bool,

    /// Also write the capture log as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Milliseconds between samples.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// YOLO-pose face detection model (ONNX).
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// 68-point landmark model (ONNX).
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    /// Stop capturing after this many seconds.
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Args)]
struct NormalizeArgs {
    /// JSON log written by `capture --json`.
    json_log: PathBuf,

    /// Spreadsheet to write.
    #[arg(long, default_value = DEFAULT_EXPORT_FILENAME)]
    output: PathBuf,

    /// Spreadsheet layout: per-observation or per-landmark.
    #[arg(long)]
    layout: Option<ExportLayout>,
}

#[derive(Args)]
struct SurveyArgs {
    /// Recorded answers, one audio file per question, in order.
    #[arg(required = true)]
    answers: Vec<PathBuf>,

    /// Whisper model file (downloaded on first use when omitted).
    #[arg(long)]
    whisper_model: Option<PathBuf>,

    /// Question the first answer belongs to (1-based).
    #[arg(long, default_value = "1")]
    start_question: usize,

    /// Spreadsheet to write.
    #[arg(long, default_value = DEFAULT_SURVEY_FILENAME)]
    output: PathBuf,
}

#[derive(Args)]
struct SettingsArgs {
    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long)]
    confidence: Option<f64>,

    #[arg(long)]
    layout: Option<ExportLayout>,

    /// Normalize captured faces by default (true or false).
    #[arg(long)]
    normalize: Option<bool>,

    #[arg(long)]
    face_model: Option<PathBuf>,

    #[arg(long)]
    landmark_model: Option<PathBuf>,

    #[arg(long)]
    whisper_model: Option<PathBuf>,

    /// Forget all saved values.
    #[arg(long)]
    reset: bool,
}

/// Capture parameters after flags have been layered over the saved settings.
#[derive(Debug, PartialEq)]
struct CaptureConfig {
    interval: Duration,
    confidence: f64,
    layout: ExportLayout,
    normalize: bool,
    face_model: Option<PathBuf>,
    landmark_model: Option<PathBuf>,
    max_duration: Option<Duration>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load();

    match cli.command {
        Command::Capture(args) => run_capture(&args, &settings),
        Command::Normalize(args) => run_normalize(&args, &settings),
        Command::Survey(args) => run_survey(&args, &settings),
        Command::Settings(args) => run_settings(&args, settings),
    }
}

fn run_capture(args: &CaptureArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    validate_capture(args)?;
    let config = capture_config(args, settings)?;

    let detector = build_detector(
        config.confidence,
        config.face_model.as_deref(),
        config.landmark_model.as_deref(),
    )?;
    let mut source = open_source(args)?;

    let options = SamplerOptions {
        normalize: config.normalize,
        max_duration: config.max_duration,
    };
    let session = CaptureSession::new(FrameSampler::new(config.interval)?, options);
    let mut logger = LogCaptureLogger::default();
    if std::io::stdin().is_terminal() {
        eprintln!("Press Enter to stop the capture and export what was recorded");
        cancel_on_enter(std::io::BufReader::new(std::io::stdin()), session.cancel_flag());
    }

    let report = session.start(source.as_mut(), detector, &mut logger)?;
    log::info!(
        "Capture stopped ({:?}): {} ticks, {} observations, {} failed ticks, {} dropped faces",
        report.stop_reason,
        report.ticks,
        report.observations,
        report.failed_ticks,
        report.dropped_faces
    );

    if let Some(json_path) = &args.json {
        session.export(&JsonExporter, json_path)?;
        log::info!("Capture log written to {}", json_path.display());
    }

    let rows = session.export(&XlsxExporter::new(config.layout), &args.output)?;
    log::info!("Exported {rows} observations to {}", args.output.display());
    Ok(())
}

/// Sets `flag` once a line (or end of input) is read from `input`.
fn cancel_on_enter<R>(mut input: R, flag: Arc<AtomicBool>) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        let mut line = String::new();
        if input.read_line(&mut line).is_ok() {
            log::info!("Stop requested");
            flag.store(true, Ordering::Relaxed);
        }
    })
}

fn run_normalize(args: &NormalizeArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if !args.json_log.exists() {
        return Err(format!("Capture log not found: {}", args.json_log.display()).into());
    }

    let log = load_log(&args.json_log)?.normalized();
    let exporter = XlsxExporter::new(args.layout.unwrap_or(settings.layout));
    exporter.export_to_file(&log, &args.output)?;
    log::info!(
        "Exported {} normalized observations to {}",
        log.len(),
        args.output.display()
    );
    Ok(())
}

fn run_survey(args: &SurveyArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    validate_survey(args)?;

    let explicit = args.whisper_model.as_deref().or(settings.whisper_model.as_deref());
    log::info!("Resolving model: {WHISPER_MODEL_FILENAME}");
    let model_path = model_resolver::resolve(
        WHISPER_MODEL_FILENAME,
        WHISPER_MODEL_URL,
        explicit,
        Some(Box::new(|d: u64, t: u64| download_progress("speech recognition", d, t))),
    )?;
    eprintln!();

    let use_case = AnswerQuestionUseCase::new(
        Box::new(FfmpegAudioReader),
        Box::new(WhisperRecognizer::new(&model_path)?),
    );
    let mut questionnaire = Questionnaire::new();

    for (offset, audio_path) in args.answers.iter().enumerate() {
        let question = args.start_question - 1 + offset;
        eprintln!("Question {}", question + 1);

        let answer = use_case.run(&mut questionnaire, question, audio_path)?;
        match answer.response {
            Some(response) => println!(
                "Question {}: heard \"{}\", scored {} ({}). Question total: {}. Total score: {}",
                question + 1,
                answer.transcript,
                response.score(),
                response,
                questionnaire.question_total(question)?,
                questionnaire.total()
            ),
            None => println!(
                "Question {}: heard \"{}\", not one of never, rarely, sometimes, often, always",
                question + 1,
                answer.transcript
            ),
        }
    }

    XlsxExporter::default().export_survey_to_file(&questionnaire, &args.output)?;
    log::info!(
        "Survey scores written to {} (total score {})",
        args.output.display(),
        questionnaire.total()
    );
    Ok(())
}

fn run_settings(args: &SettingsArgs, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let updated = apply_settings(args, settings);
    validate_confidence(updated.confidence)?;
    validate_interval(updated.interval_ms)?;

    let path = updated.save()?;
    println!("{}", serde_json::to_string_pretty(&updated)?);
    log::info!("Settings saved to {}", path.display());
    Ok(())
}

fn apply_settings(args: &SettingsArgs, settings: Settings) -> Settings {
    let mut updated = if args.reset {
        Settings::default()
    } else {
        settings
    };
    if let Some(interval_ms) = args.interval_ms {
        updated.interval_ms = interval_ms;
    }
    if let Some(confidence) = args.confidence {
        updated.confidence = confidence;
    }
    if let Some(layout) = args.layout {
        updated.layout = layout;
    }
    if let Some(normalize) = args.normalize {
        updated.normalize = normalize;
    }
    if let Some(path) = &args.face_model {
        updated.face_model = Some(path.clone());
    }
    if let Some(path) = &args.landmark_model {
        updated.landmark_model = Some(path.clone());
    }
    if let Some(path) = &args.whisper_model {
        updated.whisper_model = Some(path.clone());
    }
    updated
}

/// Layers flags over `settings`. Values read from the settings file are
/// checked the same way as flags.
fn capture_config(
    args: &CaptureArgs,
    settings: &Settings,
) -> Result<CaptureConfig, Box<dyn std::error::Error>> {
    let interval_ms = args.interval_ms.unwrap_or(settings.interval_ms);
    validate_interval(interval_ms)?;
    let confidence = args.confidence.unwrap_or(settings.confidence);
    validate_confidence(confidence)?;

    Ok(CaptureConfig {
        interval: Duration::from_millis(interval_ms),
        confidence,
        layout: args.layout.unwrap_or(settings.layout),
        normalize: settings.normalize && !args.raw,
        face_model: args.face_model.clone().or_else(|| settings.face_model.clone()),
        landmark_model: args
            .landmark_model
            .clone()
            .or_else(|| settings.landmark_model.clone()),
        max_duration: args.duration.map(parse_duration).transpose()?,
    })
}

/// Both models come from the given paths or the model cache; neither is
/// downloaded.
fn build_detector(
    confidence: f64,
    face_model: Option<&Path>,
    landmark_model: Option<&Path>,
) -> Result<Box<dyn LandmarkDetector>, Box<dyn std::error::Error>> {
    let face_model = model_resolver::resolve_local(FACE_MODEL_NAME, face_model)?;
    let landmark_model = model_resolver::resolve_local(LANDMARK_MODEL_NAME, landmark_model)?;
    log::info!(
        "Using face model {} and landmark model {}",
        face_model.display(),
        landmark_model.display()
    );
    let locator = OnnxFaceLocator::new(&face_model, confidence)?;
    Ok(Box::new(OnnxLandmarkDetector::new(locator, &landmark_model)?))
}

fn open_source(args: &CaptureArgs) -> Result<Box<dyn PlaybackSource>, Box<dyn std::error::Error>> {
    if args.webcam {
        return open_webcam(args.camera);
    }
    let input = args
        .input
        .as_deref()
        .ok_or("An input file or --webcam is required")?;
    Ok(Box::new(ClockedPlayback::open(open_reader(input), input)?))
}

#[cfg(feature = "webcam")]
fn open_webcam(index: Option<u32>) -> Result<Box<dyn PlaybackSource>, Box<dyn std::error::Error>> {
    use landmark_capture_core::video::infrastructure::webcam_source::WebcamSource;
    Ok(Box::new(WebcamSource::open(index)?))
}

#[cfg(not(feature = "webcam"))]
fn open_webcam(_index: Option<u32>) -> Result<Box<dyn PlaybackSource>, Box<dyn std::error::Error>> {
    Err("This build has no webcam support (rebuild with --features webcam)".into())
}

fn validate_capture(args: &CaptureArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &args.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if args.webcam && args.duration.is_none() {
        return Err("--webcam needs --duration so the capture can finish and export".into());
    }
    if let Some(confidence) = args.confidence {
        validate_confidence(confidence)?;
    }
    if let Some(interval_ms) = args.interval_ms {
        validate_interval(interval_ms)?;
    }
    if let Some(duration) = args.duration {
        parse_duration(duration)?;
    }
    Ok(())
}

/// Rejects NaN, infinities, negatives, zero and values past `Duration::MAX`.
fn parse_duration(seconds: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(format!("Duration must be a positive number of seconds, got {seconds}").into()),
    }
}

fn validate_interval(interval_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    if interval_ms == 0 {
        return Err("Interval must be at least 1 ms".into());
    }
    Ok(())
}

fn validate_survey(args: &SurveyArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.start_question == 0 || args.start_question > QUESTION_COUNT {
        return Err(format!(
            "Start question must be between 1 and {QUESTION_COUNT}, got {}",
            args.start_question
        )
        .into());
    }
    let last = args.start_question - 1 + args.answers.len();
    if last > QUESTION_COUNT {
        return Err(format!(
            "{} answers starting at question {} run past question {QUESTION_COUNT}",
            args.answers.len(),
            args.start_question
        )
        .into());
    }
    if let Some(missing) = args.answers.iter().find(|p| !p.exists()) {
        return Err(format!("Answer recording not found: {}", missing.display()).into());
    }
    Ok(())
}

fn validate_confidence(confidence: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn download_progress(label: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {label} model... {pct}%");
    } else {
        eprint!("\rDownloading {label} model... {downloaded} bytes");
    }
}
