use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found at {0}")]
    Missing(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file, preferring an explicit path over the download cache.
///
/// An explicit path must exist; it is never replaced by a download.
pub fn resolve(
    name: &str,
    url: &str,
    explicit: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::Missing(path.to_path_buf()))
        };
    }
    resolve_in(&model_cache_dir()?, name, url, progress)
}

/// Resolve a model that has no download source: the explicit path or the
/// cached copy must already exist.
pub fn resolve_local(name: &str, explicit: Option<&Path>) -> Result<PathBuf, ModelResolveError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => model_cache_dir()?.join(name),
    };
    if path.exists() {
        Ok(path)
    } else {
        Err(ModelResolveError::Missing(path))
    }
}

/// Returns `cache_dir/name`, downloading it from `url` first when absent.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Landmark Capture/models/`
/// - Linux: `$XDG_CACHE_HOME/Landmark Capture/models/` or `~/.cache/Landmark Capture/models/`
/// - Windows: `%LOCALAPPDATA%/Landmark Capture/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Landmark Capture").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Landmark Capture").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_error = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_error)?;
    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(download_error)?;

    // Written to a sibling file first so an interrupted download never
    // leaves a truncated model at the cached path.
    let temp_path = dest.with_extension("part");
    let write_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ModelResolveError::Write { path, source }
    };
    let mut file = fs::File::create(&temp_path).map_err(write_error(&temp_path))?;

    let mut downloaded: u64 = 0;
    let chunk_size = 1024 * 1024;
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk).map_err(write_error(&temp_path))?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_error(&temp_path))?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(write_error(dest))?;
    Ok(())
}
