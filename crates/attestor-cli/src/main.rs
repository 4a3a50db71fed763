use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use attestor_core::constants::{CONFIG_FILE, ENV_REGISTRY_PASSWORD, ENV_REGISTRY_USERNAME};
use attestor_core::{
    validate_fingerprint, ArtifactType, AttestorConfig, Fingerprint, FingerprintError,
    FingerprintRequest, Fingerprinter,
};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod init;
mod styles;

use styles as s;

/// The command-line interface for Attestor.
#[derive(Debug, Parser)]
#[command(name = "attest")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(
    help_template = "{bin} {version}\n\n{about-with-newline}{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
#[command(about = "Content fingerprints for build and deployment artifacts")]
#[command(
    long_about = "Attestor computes the SHA-256 fingerprint that identifies an artifact
everywhere it travels: a single file, a directory tree, a locally built
container image, or an image held in a remote registry. The same artifact
always yields the same fingerprint, on a CI runner or a production host.

Common Commands:
  fingerprint       Print the fingerprint of an artifact
  assert            Fail unless an artifact has the expected fingerprint
  init              Write a default attestor.toml in the current directory
"
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mattest fingerprint -t file dist/app.tgz\x1b[0m                   \x1b[2m# Hash a single file\x1b[0m\n  \x1b[36mattest fingerprint -t dir site -x '**/node_modules'\x1b[0m       \x1b[2m# Hash a tree, skipping node_modules\x1b[0m\n  \x1b[36mattest fingerprint -t docker app:1.4\x1b[0m                      \x1b[2m# Ask the local engine for the image id\x1b[0m\n  \x1b[36mattest fingerprint -t oci ghcr.io/acme/app:1.4\x1b[0m            \x1b[2m# Read the manifest digest from the registry\x1b[0m\n  \x1b[36mattest assert -t file app.tgz --expected <sha256>\x1b[0m         \x1b[2m# Verify a known fingerprint\x1b[0m"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Path to attestor config file (defaults to ./attestor.toml when present).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Print debug logs to stderr.
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the fingerprint of an artifact.
    Fingerprint {
        #[command(flatten)]
        artifact: ArtifactArgs,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Compute an artifact's fingerprint and fail unless it equals --expected.
    Assert {
        #[command(flatten)]
        artifact: ArtifactArgs,
        /// The fingerprint the artifact must have.
        #[arg(long)]
        expected: String,
    },
    /// Write a default attestor.toml.
    Init {
        /// Overwrite the config file if it already exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Args)]
struct ArtifactArgs {
    /// File path, directory path or image name (`name:tag`).
    name: String,
    /// Kind of artifact: file, dir, docker or oci.
    #[arg(short = 't', long, value_parser = parse_artifact_type)]
    artifact_type: Option<ArtifactType>,
    /// Use this fingerprint instead of computing one.
    #[arg(long)]
    sha256: Option<String>,
    /// Registry holding a docker image: dockerhub, github, or a registry hostname.
    #[arg(long)]
    registry_provider: Option<String>,
    /// Registry username (falls back to $ATTESTOR_REGISTRY_USERNAME for registry lookups).
    #[arg(long)]
    registry_username: Option<String>,
    /// Registry password (falls back to $ATTESTOR_REGISTRY_PASSWORD for registry lookups).
    #[arg(long)]
    registry_password: Option<String>,
    /// Glob patterns excluded from a directory fingerprint, comma separated.
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Vec<String>,
}

impl std::fmt::Debug for ArtifactArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactArgs")
            .field("name", &self.name)
            .field("artifact_type", &self.artifact_type)
            .field("sha256", &self.sha256)
            .field("registry_provider", &self.registry_provider)
            .field("registry_username", &self.registry_username)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

impl ArtifactArgs {
    /// Builds the engine request. Environment credentials apply only to
    /// registry lookups so they never conflict with file or dir artifacts.
    fn to_request(&self, env: impl Fn(&str) -> Option<String>) -> FingerprintRequest {
        let registry_lookup = self.sha256.is_none()
            && match self.artifact_type {
                Some(ArtifactType::Oci) => true,
                Some(ArtifactType::Docker) => self.registry_provider.is_some(),
                _ => false,
            };

        let from_env = |flag: &Option<String>, var: &str| match flag {
            Some(value) => Some(value.clone()),
            None if registry_lookup => env(var),
            None => None,
        };

        FingerprintRequest {
            artifact_type: self.artifact_type,
            name: self.name.clone(),
            sha256: self.sha256.clone(),
            registry_provider: self.registry_provider.clone(),
            registry_username: from_env(&self.registry_username, ENV_REGISTRY_USERNAME),
            registry_password: from_env(&self.registry_password, ENV_REGISTRY_PASSWORD),
            excludes: self.exclude.clone(),
        }
    }

    fn label(&self) -> String {
        match self.artifact_type {
            Some(kind) => format!("{kind} artifact '{}'", self.name),
            None => format!("artifact '{}'", self.name),
        }
    }
}

fn parse_artifact_type(value: &str) -> Result<ArtifactType, String> {
    value.parse().map_err(|e: FingerprintError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into())),
        )
        .init();

    debug!("parsed cli arguments: {:?}", cli);

    let command = match &cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!(); // Add a newline after help
            return Ok(());
        }
    };

    execute(&cli, command)
}

/// Executes a parsed Attestor command.
fn execute(cli: &Cli, command: &Commands) -> Result<()> {
    match command {
        Commands::Init { force } => {
            init::run(cli.config.as_deref().unwrap_or(CONFIG_FILE), *force)
        }
        Commands::Fingerprint { artifact, output } => {
            let cfg = load_config(cli)?;
            let fingerprint = compute(&cfg, artifact)?;
            println!("{}", render(artifact, &fingerprint, *output)?);
            Ok(())
        }
        Commands::Assert { artifact, expected } => {
            let expected = validate_fingerprint(expected.trim())
                .map_err(|e| anyhow!(e))
                .context("invalid --expected value")?;
            let cfg = load_config(cli)?;
            let actual = compute(&cfg, artifact)?;
            check_expected(artifact, &expected, &actual)?;
            println!("fingerprint matches: {actual}");
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<AttestorConfig> {
    let cfg = match &cli.config {
        Some(path) => AttestorConfig::load_from_file(Path::new(path)),
        None => AttestorConfig::load_or_default(Path::new(CONFIG_FILE)),
    };
    cfg.map_err(|e| anyhow!(e)).context("unable to load configuration")
}

fn compute(cfg: &AttestorConfig, artifact: &ArtifactArgs) -> Result<Fingerprint> {
    let request = artifact.to_request(|var| std::env::var(var).ok());
    Fingerprinter::new(cfg).resolve(&request).map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!(
            "failed to fingerprint {} [{kind}]",
            artifact.label()
        ))
    })
}

fn check_expected(artifact: &ArtifactArgs, expected: &Fingerprint, actual: &Fingerprint) -> Result<()> {
    if expected != actual {
        bail!(
            "fingerprint mismatch for {}: expected {expected}, got {actual}",
            artifact.label()
        );
    }
    Ok(())
}

fn render(artifact: &ArtifactArgs, fingerprint: &Fingerprint, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Text => Ok(fingerprint.to_string()),
        OutputFormat::Json => {
            let body = json!({
                "artifact": artifact.name,
                "artifact_type": artifact.artifact_type.map(|t| t.as_str()),
                "fingerprint": fingerprint,
            });
            serde_json::to_string_pretty(&body).context("failed to render JSON output")
        }
    }
}
