//! Response helpers that read from the filesystem.
//!
//! A path is resolved against several roots in order: as given, the working
//! directory, the `WICKET_RESOURCES` directory when set, and the directory of
//! the running executable. The first existing candidate wins. A path that
//! resolves nowhere yields a 404 JSON response rather than an error, so the
//! helpers can sit directly inside route callbacks.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::http::mime::content_type_for;
use crate::http::{text, Response, TemplateError};

/// Resources root override, e.g. `WICKET_RESOURCES=/srv/app/assets`.
pub const RESOURCES_ENV: &str = "WICKET_RESOURCES";

fn candidate_paths(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(path));
    }
    if let Ok(root) = std::env::var(RESOURCES_ENV) {
        candidates.push(PathBuf::from(root).join(path));
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(path));
        }
    }
    candidates
}

async fn resolve(path: &Path) -> Option<PathBuf> {
    for candidate in candidate_paths(path) {
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

fn not_found(path: &Path) -> Response {
    let message = format!("{} was not found", path.display());
    log::warn!("{message}");
    crate::http::json(&serde_json::json!({ "message": message }))
        .unwrap_or_else(|_| text(message))
        .status(404)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
}

/// Serve a text file with a Content-Type inferred from its extension.
pub async fn file(path: impl AsRef<Path>) -> Response {
    let path = path.as_ref();
    let Some(full_path) = resolve(path).await else {
        return not_found(path);
    };
    match tokio::fs::read_to_string(&full_path).await {
        Ok(content) => text(content).header(
            "Content-Type",
            content_type_for(extension_of(&full_path).as_deref()),
        ),
        Err(err) => {
            log::error!("failed to read {}: {err}", full_path.display());
            not_found(path)
        }
    }
}

/// Serve a file as raw bytes, for images and other non-text content.
pub async fn binary(path: impl AsRef<Path>) -> Response {
    let path = path.as_ref();
    let Some(full_path) = resolve(path).await else {
        return not_found(path);
    };
    match tokio::fs::read(&full_path).await {
        Ok(content) => Response::new(content).header(
            "Content-Type",
            content_type_for(extension_of(&full_path).as_deref()),
        ),
        Err(err) => {
            log::error!("failed to read {}: {err}", full_path.display());
            not_found(path)
        }
    }
}

/// Serve a text file rendered against `scope`: `{{key}}` substitution plus
/// `${expr}` interpolation. The 404 fallback is rendered too, matching
/// [`file`] composed with [`Response::render`].
pub async fn template(path: impl AsRef<Path>, scope: &Value) -> Result<Response, TemplateError> {
    file(path).await.render(scope)
}
