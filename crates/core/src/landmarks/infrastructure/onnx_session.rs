use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::Session;

/// Loads an ONNX model with the platform's accelerated execution provider
/// registered ahead of the CPU fallback.
pub fn load_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let session = Session::builder()?
        .with_execution_providers(accelerated_providers())?
        .commit_from_file(model_path)?;
    log::debug!(
        "Loaded {} ({} inputs, {} outputs)",
        model_path.display(),
        session.inputs().len(),
        session.outputs().len()
    );
    Ok(session)
}

/// CoreML on macOS, DirectML on Windows, none elsewhere. ONNX Runtime drops
/// to the CPU provider when the preferred one fails to register.
fn accelerated_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}
