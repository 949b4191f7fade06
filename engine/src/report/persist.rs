//! Report artifacts on disk
//!
//! A save writes `<slug>.md`, `<slug>.html` and `<slug>.json` into the
//! reports directory. All three are staged as temp files in the same
//! directory first and only renamed into place once every write has
//! synced, so readers never observe a partial file. A save never replaces
//! an existing artifact; if a rename fails, the files this save created are
//! removed again.

use chrono::{DateTime, Utc};
use shared_types::Report;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::markdown;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to create reports directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("report artifact {path} already exists")]
    AlreadyExists { path: String },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("report writer task failed: {0}")]
    Join(String),
}

/// Final paths of one saved report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub markdown: PathBuf,
    pub html: PathBuf,
    pub json: PathBuf,
}

/// Keep alphanumerics, space, `-` and `_`; spaces become `_`.
pub fn safe_topic(topic: &str) -> String {
    topic
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

pub fn default_slug(topic: &str, at: DateTime<Utc>) -> String {
    format!("research_{}_{}", safe_topic(topic), at.format("%Y%m%d_%H%M%S"))
}

/// Resolve the caller's location into a file slug. `None` or `"auto"` picks
/// the timestamped default. Blank names and anything that could escape the
/// reports directory are rejected.
pub fn resolve_slug(
    location: Option<&str>,
    topic: &str,
    at: DateTime<Utc>,
) -> Result<String, String> {
    let requested = location.map(str::trim).unwrap_or("auto");
    if requested.is_empty() {
        return Err("location must not be empty".to_string());
    }
    if requested.eq_ignore_ascii_case("auto") {
        return Ok(default_slug(topic, at));
    }
    if requested.contains('/') || requested.contains('\\') || requested.contains("..") {
        return Err(format!("location '{requested}' must be a bare file name"));
    }
    Ok(requested.to_string())
}

/// Write all three artifacts for `report` under `dir`.
pub async fn save_report(
    dir: &Path,
    slug: &str,
    report: &Report,
) -> Result<ArtifactPaths, PersistError> {
    let json = serde_json::to_string_pretty(report)?;
    let document = markdown::wrap_html_document(&report.title, &report.html);
    let artifacts = vec![
        ("md", report.markdown.clone().into_bytes()),
        ("html", document.into_bytes()),
        ("json", json.into_bytes()),
    ];
    let dir = dir.to_path_buf();
    let slug = slug.to_string();

    tokio::task::spawn_blocking(move || write_artifacts(&dir, &slug, artifacts))
        .await
        .map_err(|e| PersistError::Join(e.to_string()))?
}

fn write_artifacts(
    dir: &Path,
    slug: &str,
    artifacts: Vec<(&'static str, Vec<u8>)>,
) -> Result<ArtifactPaths, PersistError> {
    std::fs::create_dir_all(dir).map_err(|source| PersistError::CreateDir {
        path: dir.display().to_string(),
        source,
    })?;

    let mut staged = Vec::with_capacity(artifacts.len());
    for (extension, bytes) in artifacts {
        let target = dir.join(format!("{slug}.{extension}"));
        let temp = stage(dir, &target, &bytes)?;
        staged.push((temp, target));
    }

    if let Some((_, taken)) = staged.iter().find(|(_, target)| target.exists()) {
        return Err(PersistError::AlreadyExists {
            path: taken.display().to_string(),
        });
    }

    let mut renamed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (temp, target) in staged {
        if let Err(e) = temp.persist_noclobber(&target) {
            // Everything in `renamed` was created by this save.
            for path in &renamed {
                if let Err(remove_err) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %remove_err, "Failed to roll back report artifact");
                }
            }
            return Err(if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                PersistError::AlreadyExists {
                    path: target.display().to_string(),
                }
            } else {
                PersistError::Write {
                    path: target.display().to_string(),
                    source: e.error,
                }
            });
        }
        renamed.push(target);
    }

    Ok(ArtifactPaths {
        markdown: dir.join(format!("{slug}.md")),
        html: dir.join(format!("{slug}.html")),
        json: dir.join(format!("{slug}.json")),
    })
}

/// Write and sync `bytes` to a temp file next to `target`. The temp file is
/// deleted on drop unless persisted.
fn stage(dir: &Path, target: &Path, bytes: &[u8]) -> Result<tempfile::NamedTempFile, PersistError> {
    let write_err = |source: std::io::Error| PersistError::Write {
        path: target.display().to_string(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(bytes).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    Ok(temp)
}
