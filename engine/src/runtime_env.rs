//! Process environment helpers used at startup.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static TLS_CERT_PATH: OnceLock<Option<String>> = OnceLock::new();

const CA_BUNDLE_CANDIDATES: [&str; 4] = [
    "/etc/ssl/cert.pem",                  // macOS
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/Fedora
    "/etc/ssl/certs/ca-bundle.crt",       // Alpine/openSUSE
];

/// Point `SSL_CERT_FILE` at a CA bundle so the search backends' HTTPS
/// client finds roots. Runs once per process.
pub fn ensure_tls_cert_env() -> Option<String> {
    TLS_CERT_PATH
        .get_or_init(|| {
            let found = detect_ca_bundle(
                |key| std::env::var(key).ok(),
                |path| Path::new(path).exists(),
            )?;
            if std::env::var("SSL_CERT_FILE").ok().as_deref() != Some(found.as_str()) {
                std::env::set_var("SSL_CERT_FILE", &found);
            }
            Some(found)
        })
        .clone()
}

/// `SSL_CERT_FILE` wins, then `NIX_SSL_CERT_FILE`, then well-known paths.
fn detect_ca_bundle<V, E>(var: V, exists: E) -> Option<String>
where
    V: Fn(&str) -> Option<String>,
    E: Fn(&str) -> bool,
{
    if let Some(existing) = var("SSL_CERT_FILE").filter(|v| !v.trim().is_empty()) {
        return Some(existing);
    }
    if let Some(nix) = var("NIX_SSL_CERT_FILE").filter(|v| !v.trim().is_empty() && exists(v)) {
        return Some(nix);
    }
    CA_BUNDLE_CANDIDATES
        .iter()
        .find(|candidate| exists(candidate))
        .map(|candidate| candidate.to_string())
}

/// Load the first `.env` found in the current directory or its ancestors.
pub fn load_env_file() -> Option<PathBuf> {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return None;
        }
    };

    for dir in cwd.ancestors() {
        let candidate = dir.join(".env");
        if !candidate.exists() {
            continue;
        }
        return match dotenvy::from_path(&candidate) {
            Ok(()) => {
                tracing::info!(path = %candidate.display(), "Loaded environment from .env");
                Some(candidate)
            }
            Err(e) => {
                tracing::warn!(path = %candidate.display(), error = %e, "Failed to load .env file");
                None
            }
        };
    }

    tracing::info!(
        cwd = %cwd.display(),
        "No .env file found in current directory or ancestors; using process environment only"
    );
    None
}
