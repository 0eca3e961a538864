//! Audit an Instagram bio and generate legal-marketing content from the
//! terminal.
//!
//! Reads the API key from the `GEMINI_API_KEY` environment variable and
//! prints results as pretty JSON. Log verbosity is controlled with
//! `JURISGRAM_LOG` (tracing env-filter syntax).
//!
//! # Examples
//!
//! ```sh
//! # Audit a profile by handle, saving the result for later runs
//! jurisgram audit --handle dra.silva.adv --niche "Family Law" \
//!   --save-audit audit.json
//!
//! # Audit from a profile screenshot, in English
//! jurisgram --lang en audit --image bio.jpg
//!
//! # Generate hooks consistent with a saved audit
//! jurisgram hooks --niche "Family Law" --audit audit.json
//!
//! # Short-video scripts and authority posts
//! jurisgram scripts --niche "Family Law"
//! jurisgram posts --niche "Family Law" --audit audit.json
//! ```

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use jurisgram::content::AuditResult;
use jurisgram::gateway::{AuditRequest, ContentGateway, GatewayConfig};
use jurisgram::prompt::Language;
use jurisgram::{GatewayError, GeminiClient, ImageData};

/// Instagram bio audits and content generation for legal profiles.
#[derive(Parser)]
#[command(name = "jurisgram")]
struct Cli {
    /// Output language: pt or en
    #[arg(long, global = true, default_value = "pt")]
    lang: Language,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Audit an Instagram bio (needs --handle or --image)
    Audit {
        /// Specialization niche, e.g. "Family Law". Inferred when omitted.
        #[arg(long)]
        niche: Option<String>,

        /// Instagram handle, without the leading @
        #[arg(long)]
        handle: Option<String>,

        /// Path to a profile screenshot (jpg, png, or webp)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Write the audit JSON here for reuse by the generation commands
        #[arg(long)]
        save_audit: Option<PathBuf>,
    },

    /// Generate 30 content hooks
    Hooks {
        /// Specialization niche
        #[arg(long)]
        niche: String,

        /// Audit JSON from a previous `audit --save-audit` run
        #[arg(long)]
        audit: Option<PathBuf>,
    },

    /// Generate 10 short-video scripts
    Scripts {
        /// Specialization niche
        #[arg(long)]
        niche: String,

        /// Audit JSON from a previous `audit --save-audit` run
        #[arg(long)]
        audit: Option<PathBuf>,
    },

    /// Generate 10 authority posts
    Posts {
        /// Specialization niche
        #[arg(long)]
        niche: String,

        /// Audit JSON from a previous `audit --save-audit` run
        #[arg(long)]
        audit: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_env("JURISGRAM_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Error: GEMINI_API_KEY environment variable is not set");
            process::exit(1);
        }
    };

    let client = match GeminiClient::new(api_key) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to create API client: {e}");
            process::exit(1);
        }
    };

    let gateway = ContentGateway::with_config(client, GatewayConfig::default());

    if let Err(e) = run(&gateway, cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(gateway: &ContentGateway<GeminiClient>, cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Audit {
            niche,
            handle,
            image,
            save_audit,
        } => {
            // The gateway does not re-validate: the profile source check
            // belongs to the caller.
            if handle.is_none() && image.is_none() {
                return Err("audit needs --handle or --image".into());
            }

            let image = match image {
                Some(path) => Some(load_image(&path)?),
                None => None,
            };

            let audit = gateway
                .audit_bio(&AuditRequest {
                    niche,
                    handle,
                    image,
                    language: cli.lang,
                })
                .await
                .map_err(render_gateway_error)?;

            if let Some(path) = save_audit {
                let json = serde_json::to_string_pretty(&audit).map_err(|e| e.to_string())?;
                std::fs::write(&path, json)
                    .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            }

            print_json(&audit)
        }
        Command::Hooks { niche, audit } => {
            let prior = load_audit(audit.as_deref())?;
            let hooks = gateway
                .generate_hooks(&niche, prior.as_ref(), cli.lang)
                .await
                .map_err(render_gateway_error)?;
            print_json(&hooks)
        }
        Command::Scripts { niche, audit } => {
            let prior = load_audit(audit.as_deref())?;
            let scripts = gateway
                .generate_scripts(&niche, prior.as_ref(), cli.lang)
                .await
                .map_err(render_gateway_error)?;
            print_json(&scripts)
        }
        Command::Posts { niche, audit } => {
            let prior = load_audit(audit.as_deref())?;
            let posts = gateway
                .generate_authority_posts(&niche, prior.as_ref(), cli.lang)
                .await
                .map_err(render_gateway_error)?;
            print_json(&posts)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn render_gateway_error(e: GatewayError) -> String {
    if e.is_quota() {
        format!("{e}\nAPI usage limit reached. Wait a minute and try again.")
    } else {
        e.to_string()
    }
}

/// Load a saved audit for use as generation context.
fn load_audit(path: Option<&Path>) -> Result<Option<AuditResult>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let audit = serde_json::from_str(&json)
        .map_err(|e| format!("{} is not a saved audit: {e}", path.display()))?;
    Ok(Some(audit))
}

/// Load an image file, picking the MIME type from the extension.
fn load_image(path: &Path) -> Result<ImageData, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let mime_type = mime_for_extension(ext)
        .ok_or_else(|| format!("unsupported image extension: {ext:?} (jpg, png, webp)"))?;
    let bytes = std::fs::read(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(ImageData {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// Map a file extension to the MIME type the API accepts.
///
/// Returns `None` for formats the audit does not support.
fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
