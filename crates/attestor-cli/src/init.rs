use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use attestor_core::AttestorConfig;
use tracing::{info, instrument};

/// Commented default configuration written by `attest init`.
const DEFAULT_CONFIG: &str = r#"# Attestor configuration.

[registry]
# Extra attempts after a transient registry failure (timeouts, 429, 5xx).
retries = 3
# Linear backoff between attempts: backoff_ms * attempt.
backoff_ms = 500
timeout_secs = 30

[engine]
# Container engine CLI queried for local image ids (docker, podman, nerdctl).
binary = "docker"

[tree]
# Per-directory file of glob patterns excluded from directory fingerprints.
ignore_file = ".attestor_ignore"
# Hash file contents on all cores; the fingerprint is identical either way.
parallel = true
"#;

/// Runs the `init` command, writing a default config to `path`.
#[instrument]
pub fn run(path: &str, force: bool) -> Result<()> {
    write_if_absent(path, DEFAULT_CONFIG, force)
        .with_context(|| format!("failed to write '{}'", path))?;

    // Reject a template the loader would not accept.
    AttestorConfig::load_from_file(Path::new(path))
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("'{}' is not a valid config", path))?;

    info!("init complete: config={}", path);
    println!("wrote {path}");
    println!("next: run 'attest fingerprint --artifact-type <file|dir|docker|oci> <NAME>'");
    Ok(())
}

fn write_if_absent(path: &str, content: &str, force: bool) -> Result<()> {
    let output = Path::new(path);

    if output.exists() && !force {
        return Err(anyhow!(
            "'{}' already exists. Re-run with --force to overwrite",
            path
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }

    fs::write(output, content)
        .with_context(|| format!("failed to write file '{}'", output.display()))
}
