use base64::Engine;
use clap::{Parser, Subcommand};
use ocsp_client::{
    decode_der_or_pem, host_from_domain, CertStatus, Certificate, ConfigError, OcspClient,
    OcspConfig, OcspError, Verdict,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_GOOD: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_REVOKED: i32 = 2;
const EXIT_UNKNOWN: i32 = 3;

/// ocsp-check - certificate revocation checks over OCSP (RFC 6960)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "ocsp-check")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file; command-line options override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Issuer certificate (PEM or DER); downloaded when omitted
    #[arg(long, global = true, value_name = "FILE")]
    ca: Option<PathBuf>,

    /// OCSP responder URL, overriding the certificate's
    #[arg(long, global = true, value_name = "URL")]
    ocsp_url: Option<String>,

    /// Certificate expected to sign the OCSP response
    #[arg(long, global = true, value_name = "FILE")]
    ocsp_cert: Option<PathBuf>,

    /// Skip response signature and nonce verification (debugging only)
    #[arg(long, global = true)]
    no_verify_signature: bool,

    /// Timeout for each network step in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Do not send a nonce
    #[arg(long, global = true)]
    no_nonce: bool,

    /// Include the raw response in the result
    #[arg(long, global = true)]
    raw: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a certificate file (PEM or DER)
    Cert {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Check the certificate a host presents on port 443
    Domain {
        #[arg(value_name = "DOMAIN|URL")]
        domain: String,
    },
    /// Print the OCSP and CA Issuers URLs of a certificate
    Urls {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Fetch the undecoded OCSP response for a certificate
    Raw {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Write the DER response to FILE instead of printing base64
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Download a certificate's issuer and print it as PEM
    Issuer {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Download a host's leaf certificate and print it as PEM
    Leaf {
        #[arg(value_name = "HOST")]
        host: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Ocsp(#[from] OcspError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl CliError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Ocsp(e) => e.kind(),
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io { .. } => "io",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            if cli.json {
                println!(
                    "{}",
                    json!({ "error": e.kind(), "message": e.to_string() })
                );
            } else {
                eprintln!("Error: {}", e);
            }
            EXIT_ERROR
        }
    };
    process::exit(code);
}

async fn run(cli: &Cli) -> Result<i32, CliError> {
    let config = build_config(cli)?;
    let client = OcspClient::new();
    debug!(ocsp_url = ?config.ocsp_url, timeout_ms = config.timeout_ms, "Configuration loaded");

    match &cli.command {
        Command::Cert { path } => {
            let cert = load_certificate(path)?;
            let verdict = client.check_by_certificate(&cert, &config).await?;
            print_verdict(&verdict, cli.json)
        }
        Command::Domain { domain } => {
            let verdict = client.check_by_domain(domain, &config).await?;
            print_verdict(&verdict, cli.json)
        }
        Command::Urls { path } => {
            let cert = load_certificate(path)?;
            let info = client.get_cert_urls(&cert)?;
            if cli.json {
                println!("{}", to_json(&info)?);
            } else {
                println!("OCSP:       {}", info.ocsp_url);
                println!("CA Issuers: {}", info.issuer_url);
            }
            Ok(EXIT_GOOD)
        }
        Command::Raw { path, out } => {
            let cert = load_certificate(path)?;
            let raw = client.get_raw_response(&cert, &config).await?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&raw.raw_response);
            let nonce = raw.nonce.as_deref().map(hex::encode);

            if let Some(out) = out {
                fs::write(out, &raw.raw_response).map_err(|source| CliError::Io {
                    path: out.display().to_string(),
                    source,
                })?;
            }

            if cli.json {
                println!(
                    "{}",
                    json!({
                        "rawResponse": encoded,
                        "nonce": nonce,
                        "issuerCert": raw.issuer_pem,
                    })
                );
            } else {
                match out {
                    Some(out) => println!(
                        "Response:   {} bytes written to {}",
                        raw.raw_response.len(),
                        out.display()
                    ),
                    None => println!("Response:   {}", encoded),
                }
                println!("Nonce:      {}", nonce.as_deref().unwrap_or("(none)"));
                print!("{}", raw.issuer_pem);
            }
            Ok(EXIT_GOOD)
        }
        Command::Issuer { path } => {
            let cert = load_certificate(path)?;
            let issuer = client
                .download_issuer_certificate(&cert, config.timeout_ms)
                .await?;
            print_pem(&issuer, cli.json);
            Ok(EXIT_GOOD)
        }
        Command::Leaf { host } => {
            let host = host_from_domain(host)?;
            let leaf = client
                .download_leaf_certificate(&host, config.timeout_ms)
                .await?;
            print_pem(&leaf, cli.json);
            Ok(EXIT_GOOD)
        }
    }
}

/// Configuration file, if any, with command-line overrides applied
fn build_config(cli: &Cli) -> Result<OcspConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => OcspConfig::from_file(path)?,
        None => OcspConfig::default(),
    };

    if let Some(path) = &cli.ca {
        config.ca = Some(load_certificate(path)?);
    }
    if let Some(url) = &cli.ocsp_url {
        config.ocsp_url = Some(url.clone());
    }
    if let Some(path) = &cli.ocsp_cert {
        config.ocsp_certificate = Some(load_certificate(path)?);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if cli.no_verify_signature {
        config.validate_signature = false;
    }
    if cli.no_nonce {
        config.enable_nonce = false;
    }
    if cli.raw {
        config.raw_response = true;
    }

    config.validate()?;
    Ok(config)
}

fn load_certificate(path: &Path) -> Result<Certificate, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(decode_der_or_pem(&bytes)?)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn print_verdict(verdict: &Verdict, as_json: bool) -> Result<i32, CliError> {
    if as_json {
        println!("{}", to_json(verdict)?);
    } else {
        println!("Status:          {}", verdict.status);
        println!("OCSP URL:        {}", verdict.ocsp_url);
        if let Some(time) = verdict.revocation_time {
            println!("Revoked at:      {}", time.to_rfc3339());
        }
        if let Some(reason) = verdict.revocation_reason {
            println!("Reason:          {} ({})", reason, reason.code());
        }
        if let Some(time) = verdict.produced_at {
            println!("Produced at:     {}", time.to_rfc3339());
        }
        if let Some(time) = verdict.this_update {
            println!("This update:     {}", time.to_rfc3339());
        }
        if let Some(time) = verdict.next_update {
            println!("Next update:     {}", time.to_rfc3339());
        }
        if let Some(raw) = &verdict.raw_response {
            println!(
                "Raw response:    {}",
                base64::engine::general_purpose::STANDARD.encode(raw)
            );
        }
    }

    Ok(match verdict.status {
        CertStatus::Good => EXIT_GOOD,
        CertStatus::Revoked => EXIT_REVOKED,
        CertStatus::Unknown => EXIT_UNKNOWN,
    })
}

fn print_pem(cert: &Certificate, as_json: bool) {
    if as_json {
        println!(
            "{}",
            json!({ "subject": cert.subject_name(), "pem": cert.to_pem() })
        );
    } else {
        print!("{}", cert.to_pem());
    }
}
