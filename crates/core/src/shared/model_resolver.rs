use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
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

/// Where a model comes from when it is not already on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSource {
    pub name: String,
    pub url: String,
}

impl ModelSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled path (for development / pre-packaged installs)
/// 3. Download from URL to cache
///
/// `auth_token` is sent as a bearer credential, but only to Hugging Face hosts.
pub fn resolve(
    source: &ModelSource,
    bundled_dir: Option<&Path>,
    auth_token: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, source, bundled_dir, auth_token, progress)
}

pub fn resolve_in(
    cache_dir: &Path,
    source: &ModelSource,
    bundled_dir: Option<&Path>,
    auth_token: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(&source.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(&source.name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading model {} from {}", source.name, source.url);
    download(&source.url, &cached_path, auth_token, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Transcriber/models/`
/// - Linux: `$XDG_CACHE_HOME/Transcriber/models/` or `~/.cache/Transcriber/models/`
/// - Windows: `%LOCALAPPDATA%/Transcriber/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Transcriber").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Transcriber").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn sends_credentials(url: &str) -> bool {
    url.starts_with("https://huggingface.co/")
}

fn download(
    url: &str,
    dest: &Path,
    auth_token: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let mut request = client.get(url);
    if let Some(token) = auth_token.filter(|_| sends_credentials(url)) {
        request = request.bearer_auth(token);
    }
    let response = request
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    // Write to a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let bytes = match response.bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(&temp_path);
            return Err(download_err(e));
        }
    };

    let chunk_size = 1024 * 1024;
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source() -> ModelSource {
        ModelSource::new("test_model.bin", "http://invalid.nonexistent.example.com/model")
    }

    #[test]
    fn test_resolve_finds_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("test_model.bin");
        fs::write(&cached, b"fake model data").unwrap();

        let resolved = resolve_in(tmp.path(), &source(), None, None, None).unwrap();
        assert_eq!(resolved, cached);
    }

    #[test]
    fn test_resolve_finds_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&bundled_dir).unwrap();
        let bundled_path = bundled_dir.join("test_model.bin");
        fs::write(&bundled_path, b"bundled model").unwrap();

        let resolved = resolve_in(&cache_dir, &source(), Some(&bundled_dir), None, None).unwrap();
        assert_eq!(resolved, bundled_path);
    }

    #[test]
    fn test_cache_takes_precedence_over_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&cache_dir).unwrap();
        fs::create_dir_all(&bundled_dir).unwrap();
        fs::write(cache_dir.join("test_model.bin"), b"cached").unwrap();
        fs::write(bundled_dir.join("test_model.bin"), b"bundled").unwrap();

        let resolved = resolve_in(&cache_dir, &source(), Some(&bundled_dir), None, None).unwrap();
        assert_eq!(resolved, cache_dir.join("test_model.bin"));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("Transcriber"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_credentials_only_sent_to_hugging_face() {
        assert!(sends_credentials(
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin"
        ));
        assert!(!sends_credentials(
            "https://github.com/thewh1teagle/pyannote-rs/releases/download/v0.1.0/x.onnx"
        ));
        assert!(!sends_credentials("https://huggingface.co.evil.example/model"));
    }

    #[test]
    fn test_download_invalid_url_returns_error() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.bin");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.bin");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None, None);
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
