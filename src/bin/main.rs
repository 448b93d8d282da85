//! Remote CMS signer CLI
//!
//! Two-phase detached signing: `prepare` reserves the placeholder and prints
//! the `DigestInfo` for the signing authority, `finalize` weaves the returned
//! signature into the document. `sign` runs both phases against the configured
//! gateway in one go.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use remote_cms_signer::{
    adapters::{
        container::{ByteRangeContainer, PlaceholderHandle},
        crl_http_client::CrlHttpClient,
        ocsp_http_client::OcspHttpClient,
        remote::HttpSigningGateway,
        timestamp_http_client::TimestampHttpClient,
    },
    domain::asn1::Tlv,
    domain::crypto::{CertificateChain, RawSignature, Sha256Digest},
    infra::config::{ConfigManager, ExportFormat, SignerConfiguration},
    services::SignedDataInspector,
    PendingDocument, RevocationResponder, SigningCoordinator, TimestampAuthorityClient,
};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "remote-cms-signer")]
#[command(about = "Two-phase detached CMS signing with a remote signing authority")]
#[command(long_about = "
Remote CMS Signer - detached CMS signatures from a remote key holder

EXAMPLES:
    # Reserve a placeholder at byte 1024 and print the DigestInfo to sign
    remote-cms-signer prepare contract.pdf --offset 1024 --state contract.json

    # Finish once the authority returned the raw signature
    remote-cms-signer finalize --state contract.json --signature <BASE64>

    # Both phases against the configured gateway
    remote-cms-signer sign contract.pdf --offset 1024 -o signed.pdf

    # Inspect a produced signature
    remote-cms-signer inspect signature.der --document contract.pdf

ENVIRONMENT VARIABLES:
    REMOTE_SIGNER_CONFIG   Configuration file path
    RUST_LOG               Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "REMOTE_SIGNER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reserve the placeholder and compute the DigestInfo to be signed
    Prepare {
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Byte offset where the placeholder is inserted
        #[arg(long)]
        offset: usize,

        /// PEM certificate chain, signer first (fetched from the gateway if omitted)
        #[arg(long, value_name = "PEM_FILE")]
        chain: Option<PathBuf>,

        /// Where the prepared document is written
        #[arg(long, value_name = "FILE")]
        prepared: Option<PathBuf>,

        /// Final output path used by `finalize` (defaults to <name>.signed.<ext>)
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Session state file
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },

    /// Place a raw signature into a prepared document
    Finalize {
        /// Session state file written by `prepare`
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Base64 raw signature returned by the authority
        #[arg(long, conflicts_with = "signature_file")]
        signature: Option<String>,

        /// File holding the raw signature bytes
        #[arg(long, value_name = "FILE")]
        signature_file: Option<PathBuf>,
    },

    /// Prepare, request the signature from the gateway and finalize
    Sign {
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        #[arg(long)]
        offset: usize,

        #[arg(long, value_name = "PEM_FILE")]
        chain: Option<PathBuf>,

        /// Output file path (defaults to <name>.signed.<ext> next to the input)
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Document name shown to the signer
        #[arg(long)]
        document_name: Option<String>,

        /// Skip the timestamp even if one is configured
        #[arg(long)]
        no_timestamp: bool,
    },

    /// Print the placeholder size a chain would need
    Estimate {
        #[arg(long, value_name = "PEM_FILE")]
        chain: PathBuf,

        /// Skip CRL and OCSP lookups and size without revocation data
        #[arg(long)]
        offline: bool,
    },

    /// Show the parts of a produced signature
    Inspect {
        /// DER or hex encoded signature
        #[arg(value_name = "SIGNATURE_FILE")]
        file: PathBuf,

        /// Unsigned document bytes to check the message digest against
        #[arg(long, value_name = "FILE")]
        document: Option<PathBuf>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. gateway.base_url)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Export configuration
    Export {
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the configuration file path
    Path,
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
        }
    }
}

/// What `prepare` leaves behind for `finalize`.
#[derive(Serialize, Deserialize)]
struct StateFile {
    prepared_document: PathBuf,
    output: PathBuf,
    pending: PendingDocument<PlaceholderHandle>,
}

/// Concrete collaborators built from the configuration.
struct Collaborators {
    config: SignerConfiguration,
    gateway: HttpSigningGateway,
    timestamp: Option<TimestampHttpClient>,
    crl: Option<CrlHttpClient>,
    ocsp: Option<OcspHttpClient>,
}

impl Collaborators {
    fn build(config: SignerConfiguration, with_timestamp: bool) -> Result<Self> {
        let gateway = HttpSigningGateway::new(config.gateway_config()).into_diagnostic()?;
        let timestamp = match config.timestamp_config() {
            Some(cfg) if with_timestamp => Some(TimestampHttpClient::new(cfg).into_diagnostic()?),
            _ => None,
        };
        let crl = config
            .crl_config()
            .map(CrlHttpClient::new)
            .transpose()
            .into_diagnostic()?;
        let ocsp = config
            .ocsp_config()
            .map(OcspHttpClient::new)
            .transpose()
            .into_diagnostic()?;
        Ok(Self {
            config,
            gateway,
            timestamp,
            crl,
            ocsp,
        })
    }

    fn coordinator(&self) -> Result<SigningCoordinator<'_>> {
        let policy = self.config.signature_policy().into_diagnostic()?;
        let mut coordinator = SigningCoordinator::new(&self.gateway)
            .with_timestamp_client(
                self.timestamp
                    .as_ref()
                    .map(|t| t as &dyn TimestampAuthorityClient),
            )
            .with_ocsp_responder(self.ocsp.as_ref().map(|o| o as &dyn RevocationResponder))
            .with_policy(policy)
            .with_placeholder_margin(self.config.placeholder_margin);
        if let Some(crl) = &self.crl {
            coordinator = coordinator.with_crl_responder(crl as &dyn RevocationResponder);
        }
        Ok(coordinator)
    }

    async fn chain(&self, pem: Option<&Path>) -> Result<CertificateChain> {
        match pem {
            Some(path) => load_chain(path),
            None => {
                log::info!("Fetching certificate chain from the signing authority");
                self.gateway
                    .get_certificate_chain()
                    .await
                    .into_diagnostic()
                    .context("Failed to fetch the certificate chain")
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().into_diagnostic()?,
    };

    match cli.command {
        Commands::Prepare {
            input_file,
            offset,
            chain,
            prepared,
            output,
            state,
        } => {
            let prepared = prepared.unwrap_or_else(|| input_file.with_extension("prepared"));
            let output = output
                .unwrap_or_else(|| ByteRangeContainer::default_output_path(&input_file));
            handle_prepare_command(&manager, &input_file, offset, chain, prepared, output, &state)
                .await?;
        }

        Commands::Finalize {
            state,
            signature,
            signature_file,
        } => {
            let raw = read_raw_signature(signature, signature_file)?;
            handle_finalize_command(&manager, &state, &raw).await?;
        }

        Commands::Sign {
            input_file,
            offset,
            chain,
            output,
            document_name,
            no_timestamp,
        } => {
            let output = output
                .unwrap_or_else(|| ByteRangeContainer::default_output_path(&input_file));
            handle_sign_command(
                &manager,
                &input_file,
                offset,
                chain,
                &output,
                document_name,
                !no_timestamp,
            )
            .await?;
        }

        Commands::Estimate { chain, offline } => {
            handle_estimate_command(&manager, &chain, offline).await?;
        }

        Commands::Inspect { file, document } => {
            handle_inspect_command(&file, document.as_deref())?;
        }

        Commands::Config(config_cmd) => {
            handle_config_command(&manager, config_cmd)?;
        }
    }

    Ok(())
}

async fn handle_prepare_command(
    manager: &ConfigManager,
    input_file: &Path,
    offset: usize,
    chain: Option<PathBuf>,
    prepared: PathBuf,
    output: PathBuf,
    state: &Path,
) -> Result<()> {
    let config = manager.load_or_create_default().into_diagnostic()?;
    let collaborators = Collaborators::build(config, true)?;
    let chain = collaborators.chain(chain.as_deref()).await?;

    let mut container = ByteRangeContainer::open(input_file, offset, &output).into_diagnostic()?;
    let (pending, digest_info) = collaborators
        .coordinator()?
        .prepare_pending(chain, &mut container)
        .await
        .into_diagnostic()
        .context("Prepare phase failed")?;
    container.write_prepared(&prepared).into_diagnostic()?;

    let state_file = StateFile {
        prepared_document: prepared,
        output,
        pending,
    };
    let json = serde_json::to_string_pretty(&state_file).into_diagnostic()?;
    fs::write(state, json)
        .into_diagnostic()
        .with_context(|| format!("Failed to write {}", state.display()))?;

    println!("Prepared document: {}", state_file.prepared_document.display());
    println!("Placeholder: {} bytes", state_file.pending.handle.size);
    println!(
        "DigestInfo (base64): {}",
        base64::engine::general_purpose::STANDARD.encode(digest_info.as_bytes())
    );
    Ok(())
}

async fn handle_finalize_command(
    manager: &ConfigManager,
    state: &Path,
    raw: &RawSignature,
) -> Result<()> {
    let content = fs::read_to_string(state)
        .into_diagnostic()
        .with_context(|| format!("Failed to read {}", state.display()))?;
    let state_file: StateFile = serde_json::from_str(&content).into_diagnostic()?;

    let config = manager.load_or_create_default().into_diagnostic()?;
    let collaborators = Collaborators::build(config, true)?;
    let mut container = ByteRangeContainer::resume(
        &state_file.prepared_document,
        state_file.pending.handle,
        &state_file.output,
    )
    .into_diagnostic()?;

    let signature = collaborators
        .coordinator()?
        .finalize_pending(state_file.pending, raw, &mut container)
        .await
        .into_diagnostic()
        .context("Finalize phase failed")?;

    println!(
        "Signed document written to {} ({} byte signature)",
        state_file.output.display(),
        signature.len()
    );
    Ok(())
}

async fn handle_sign_command(
    manager: &ConfigManager,
    input_file: &Path,
    offset: usize,
    chain: Option<PathBuf>,
    output: &Path,
    document_name: Option<String>,
    with_timestamp: bool,
) -> Result<()> {
    let config = manager.load_or_create_default().into_diagnostic()?;
    let mut collaborators = Collaborators::build(config, with_timestamp)?;
    let name = document_name.unwrap_or_else(|| {
        input_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    });
    collaborators.gateway = collaborators.gateway.with_document_name(name);
    let chain = collaborators.chain(chain.as_deref()).await?;

    let mut container = ByteRangeContainer::open(input_file, offset, output).into_diagnostic()?;
    let signature = collaborators
        .coordinator()?
        .sign_document(chain, &mut container)
        .await
        .into_diagnostic()
        .context("Signing failed")?;

    println!(
        "Signed document written to {} ({} byte signature)",
        output.display(),
        signature.len()
    );
    Ok(())
}

async fn handle_estimate_command(manager: &ConfigManager, chain: &Path, offline: bool) -> Result<()> {
    let mut config = manager.load_or_create_default().into_diagnostic()?;
    if offline {
        config.revocation.crl_enabled = false;
        config.revocation.ocsp_enabled = false;
    }
    let collaborators = Collaborators::build(config, true)?;
    let coordinator = collaborators.coordinator()?;
    let session = coordinator.open_session(load_chain(chain)?).await;

    let estimate = session.estimate_placeholder(coordinator.has_timestamp());
    println!("Estimated signature size: {estimate} bytes");
    println!(
        "With configured margin: {} bytes",
        estimate + collaborators.config.placeholder_margin
    );
    Ok(())
}

fn handle_inspect_command(file: &Path, document: Option<&Path>) -> Result<()> {
    let bytes = fs::read(file)
        .into_diagnostic()
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let der = decode_signature_file(&bytes)?;
    let summary = SignedDataInspector::inspect(&der).into_diagnostic()?;

    println!("Signature size: {} bytes", der.len());
    println!("Message digest: {}", summary.message_digest.to_hex());
    println!("Signed attributes:");
    for oid in &summary.attribute_oids {
        println!("  {oid}");
    }
    println!("Certificates: {}", summary.certificate_count());
    println!("Signature algorithm: {}", summary.signature_algorithm);
    println!("Raw signature: {} bytes", summary.signature.len());
    match &summary.timestamp {
        Some(token) => println!("Timestamp: {} (policy {})", token.gen_time(), token.policy()),
        None => println!("Timestamp: none"),
    }

    if let Some(document) = document {
        let mut reader = fs::File::open(document)
            .into_diagnostic()
            .with_context(|| format!("Failed to open {}", document.display()))?;
        let (digest, _) = Sha256Digest::compute_reader(&mut reader).into_diagnostic()?;
        summary.verify_document_digest(&digest).into_diagnostic()?;
        println!("Document digest matches");
    }
    Ok(())
}

fn handle_config_command(manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => {
            let config = manager.load_or_create_default().into_diagnostic()?;
            let mut shown = config.clone();
            if !shown.gateway.password.is_empty() {
                shown.gateway.password = "********".to_string();
            }
            println!("{}", toml::to_string_pretty(&shown).into_diagnostic()?);
        }
        ConfigCommands::Init => {
            manager.load_or_create_default().into_diagnostic()?;
            println!("Configuration at {}", manager.config_path().display());
        }
        ConfigCommands::Set { key, value } => {
            manager.update_value(&key, &value).into_diagnostic()?;
            println!("Updated {key}");
        }
        ConfigCommands::Export { format, output } => {
            let exported = manager.export_config(format.into()).into_diagnostic()?;
            match output {
                Some(path) => fs::write(&path, exported)
                    .into_diagnostic()
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{exported}"),
            }
        }
        ConfigCommands::Path => println!("{}", manager.config_path().display()),
    }
    Ok(())
}

fn load_chain(path: &Path) -> Result<CertificateChain> {
    let pem = fs::read(path)
        .into_diagnostic()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    CertificateChain::from_pem(&pem).into_diagnostic()
}

fn read_raw_signature(b64: Option<String>, file: Option<PathBuf>) -> Result<RawSignature> {
    let bytes = match (b64, file) {
        (Some(text), _) => base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .into_diagnostic()
            .context("Signature is not valid base64")?,
        (None, Some(path)) => fs::read(&path)
            .into_diagnostic()
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => miette::bail!("either --signature or --signature-file is required"),
    };
    RawSignature::new(bytes).into_diagnostic()
}

/// Signatures are accepted as raw DER or as the hex text found in a placeholder.
fn decode_signature_file(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.first() == Some(&0x30) {
        return Ok(bytes.to_vec());
    }
    let text = String::from_utf8_lossy(bytes);
    let hex_text = text.trim().trim_start_matches('<').trim_end_matches('>');
    let mut der = hex::decode(hex_text)
        .into_diagnostic()
        .context("Signature file is neither DER nor hex")?;
    // Placeholder padding decodes to trailing zero bytes.
    if let Ok(len) = Tlv::parse_first(&der).map(|t| t.raw().len()) {
        der.truncate(len);
    }
    Ok(der)
}
