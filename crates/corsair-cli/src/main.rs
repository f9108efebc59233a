// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
mod commands;
mod format;

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use corsair_core::{CredentialSubject, Receipt, Step};
use corsair_credential::{Header, Payload};
use corsair_keys::KeyManager;
use corsair_receipt::{ReceiptBuilder, ReceiptChain};
use corsair_transparency::{RegistrationMode, TransparencyClient, TrustTxt};
use corsair_verify::VerifyOptions;

use format::{Formatter, OutputFormat};

/// Accepted CPOE: every required predicate passed.
const EXIT_OK: i32 = 0;
/// Verification rejected the CPOE, or a diff surfaced a regression.
const EXIT_REJECTED: i32 = 1;
/// The input itself was malformed (bad JWT, invalid evidence, bad policy file).
const EXIT_INVALID: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "corsair", version, about = "Compliance Proof of Operational Effectiveness toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Output format: json | json-pretty | text | compact.
    #[arg(long, global = true, default_value = "text")]
    format: String,

    /// Shorthand for --format json.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign evidence into a CPOE.
    Sign {
        /// Evidence file (JSON). Reads stdin when omitted.
        #[arg(long)]
        evidence: Option<PathBuf>,

        /// A mapping rule file or a directory of mapping packs, applied to
        /// extract the ingested document from raw evidence.
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Issuer domain, used to build the `did:web` issuer identity.
        #[arg(long)]
        issuer: String,

        /// Human-readable issuer name.
        #[arg(long)]
        issuer_name: String,

        /// Key directory (defaults to `~/.corsair/keys`).
        #[arg(long)]
        key_dir: Option<PathBuf>,

        /// Credential lifetime in days.
        #[arg(long, default_value_t = 90)]
        expiry_days: u32,

        /// Code version recorded on reproducible receipts.
        #[arg(long, default_value = "corsair-cli@0.1.0")]
        code_version: String,

        /// Dotted paths within `credentialSubject` to redact as SD-JWT
        /// disclosures (e.g. `dimensions.capability`).
        #[arg(long = "sd-field")]
        sd_fields: Vec<String>,

        /// Where to write the signed CPOE. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify a CPOE against a policy.
    Verify {
        /// CPOE file (compact JWT). Reads stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Predicate string (`name=value` or bare `name`). Repeatable.
        #[arg(long = "policy")]
        policy: Vec<String>,

        /// `require-issuer=DID` convenience flag.
        #[arg(long)]
        require_issuer: Option<String>,

        /// `require-framework=CSV` convenience flag.
        #[arg(long)]
        require_framework: Option<String>,

        /// `max-age=DAYS` convenience flag.
        #[arg(long)]
        max_age: Option<u32>,

        /// `min-score=N` convenience flag.
        #[arg(long)]
        min_score: Option<u32>,

        /// `require-source=TYPE` convenience flag.
        #[arg(long)]
        require_source: Option<String>,

        /// `require-scitt` convenience flag.
        #[arg(long)]
        require_scitt: bool,

        /// `dependencies` convenience flag.
        #[arg(long)]
        dependencies: bool,

        /// `dependency-depth=N` convenience flag.
        #[arg(long)]
        dependency_depth: Option<u32>,

        /// Explicit Ed25519 public key file, bypassing DID resolution.
        #[arg(long)]
        pubkey: Option<PathBuf>,

        /// Issuer domain treated as pre-trusted (core-verified tier).
        #[arg(long)]
        did: Option<String>,
    },

    /// Diff two CPOEs' credential subjects.
    Diff {
        /// Current CPOE file (compact JWT).
        current: PathBuf,

        /// Previous CPOE file (compact JWT).
        previous: PathBuf,
    },

    /// Transparency-log operations.
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },

    /// `trust.txt` operations.
    TrustTxt {
        #[command(subcommand)]
        command: TrustTxtCommands,
    },

    /// Mapping-registry operations.
    Mappings {
        #[command(subcommand)]
        command: MappingsCommands,
    },

    /// Generate an Ed25519 signing key.
    Keygen {
        /// Directory to write `ed25519.pem`/`ed25519.pub` into.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Receipt-chain operations.
    Receipts {
        #[command(subcommand)]
        command: ReceiptsCommands,
    },

    /// Policy-file operations.
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommands {
    /// Register a CPOE with a transparency log.
    Register {
        /// CPOE file (compact JWT). Reads stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Transparency log base URL.
        #[arg(long)]
        log_url: String,

        /// Register only a commitment, not the full statement.
        #[arg(long)]
        proof_only: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TrustTxtCommands {
    /// Render a `trust.txt` document from flags.
    Generate {
        /// `=cpoe=` endpoint.
        #[arg(long)]
        cpoe: Option<String>,

        /// `=scitt=` endpoint.
        #[arg(long)]
        scitt: Option<String>,

        /// `=policy=` endpoint.
        #[arg(long)]
        policy: Option<String>,

        /// `=frameworks=` CSV list.
        #[arg(long)]
        frameworks: Vec<String>,
    },

    /// Discover and print a domain's `trust.txt`.
    Discover {
        /// The domain to query.
        domain: String,
    },
}

#[derive(Subcommand, Debug)]
enum MappingsCommands {
    /// List rules in a mapping directory.
    List {
        /// Directory of mapping-rule JSON files.
        dir: PathBuf,
    },

    /// Validate a single mapping rule file.
    Validate {
        /// Mapping rule JSON file.
        file: PathBuf,
    },

    /// Sign a mapping pack with an Ed25519 key.
    Sign {
        /// Unsigned mapping pack JSON file (`pack`, `mappings`, empty `signature`).
        file: PathBuf,

        /// Key directory holding the signing key.
        #[arg(long)]
        key_dir: Option<PathBuf>,

        /// Where to write the signed pack. Overwrites `file` when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ReceiptsCommands {
    /// Generate a single receipt for one pipeline step.
    Generate {
        /// Pipeline step: ingest | classify | chart | marque.
        #[arg(long)]
        step: String,

        /// Input evidence file, hashed to form `input_digest`.
        #[arg(long)]
        evidence: PathBuf,

        /// Code version, if the step is deterministic/reproducible.
        #[arg(long)]
        code_version: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PolicyCommands {
    /// Validate a policy artefact file (a JSON array of predicate strings).
    Validate {
        /// Policy file.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("corsair=debug")
    } else {
        EnvFilter::new("corsair=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        cli.format.parse().unwrap_or(OutputFormat::Text)
    };
    let formatter = Formatter::new(output_format);

    let result = match cli.command {
        Commands::Sign {
            evidence,
            mapping,
            issuer,
            issuer_name,
            key_dir,
            expiry_days,
            code_version,
            sd_fields,
            output,
        } => {
            cmd_sign(
                evidence.as_deref(),
                mapping.as_deref(),
                &issuer,
                &issuer_name,
                key_dir,
                expiry_days,
                &code_version,
                &sd_fields,
                output.as_deref(),
            )
            .await
        }
        Commands::Verify {
            file,
            policy,
            require_issuer,
            require_framework,
            max_age,
            min_score,
            require_source,
            require_scitt,
            dependencies,
            dependency_depth,
            pubkey,
            did,
        } => {
            cmd_verify(
                file.as_deref(),
                &policy,
                require_issuer.as_deref(),
                require_framework.as_deref(),
                max_age,
                min_score,
                require_source.as_deref(),
                require_scitt,
                dependencies,
                dependency_depth,
                pubkey.as_deref(),
                did.as_deref(),
                &formatter,
            )
            .await
        }
        Commands::Diff { current, previous } => cmd_diff(&current, &previous, &formatter),
        Commands::Log {
            command: LogCommands::Register { file, log_url, proof_only },
        } => cmd_log_register(file.as_deref(), &log_url, proof_only, &formatter).await,
        Commands::TrustTxt { command } => match command {
            TrustTxtCommands::Generate { cpoe, scitt, policy, frameworks } => {
                cmd_trust_txt_generate(cpoe, scitt, policy, frameworks, &formatter)
            }
            TrustTxtCommands::Discover { domain } => cmd_trust_txt_discover(&domain, &formatter).await,
        },
        Commands::Mappings { command } => match command {
            MappingsCommands::List { dir } => cmd_mappings_list(&dir),
            MappingsCommands::Validate { file } => cmd_mappings_validate(&file),
            MappingsCommands::Sign { file, key_dir, output } => {
                cmd_mappings_sign(&file, key_dir.as_deref(), output.as_deref())
            }
        },
        Commands::Keygen { output } => cmd_keygen(output),
        Commands::Receipts {
            command: ReceiptsCommands::Generate { step, evidence, code_version },
        } => cmd_receipts_generate(&step, &evidence, code_version.as_deref()),
        Commands::Policy {
            command: PolicyCommands::Validate { file },
        } => cmd_policy_validate(&file),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", formatter.format_error(&format!("{e:#}")));
            std::process::exit(EXIT_INVALID);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_sign(
    evidence: Option<&std::path::Path>,
    mapping: Option<&std::path::Path>,
    issuer: &str,
    issuer_name: &str,
    key_dir: Option<PathBuf>,
    expiry_days: u32,
    code_version: &str,
    sd_fields: &[String],
    output: Option<&std::path::Path>,
) -> Result<i32> {
    let content = commands::read_input(evidence)?;
    let (document, mapping_used) = commands::ingest_evidence(&content, mapping)?;

    let today = Utc::now().date_naive();
    let provenance = commands::derive_provenance(&document, mapping_used);
    let observation_period = commands::observation_period_for(&document, today);

    let marque_input = corsair_ingest::map_to_marque_input(&document);
    let calculator_input = corsair_assurance::CalculatorInput {
        document: &document,
        provenance: provenance.clone(),
        observation_sufficient: observation_period.sufficient,
        today,
        excluded_control_ids: Default::default(),
    };
    let calculator_output = corsair_assurance::calculate(&calculator_input);

    let generator_input = corsair_credential::GeneratorInput {
        marque_input: &marque_input,
        calculator_output: &calculator_output,
        provenance,
        observation_period,
        assessment_depth: commands::assessment_depth_label(&document, mapping_used),
        resolved_frameworks: Default::default(),
    };
    let subject = corsair_credential::generate_subject(generator_input);

    let key_dir = key_dir.unwrap_or_else(commands::default_key_dir);
    let key_manager = KeyManager::load_or_generate(&key_dir).context("load or generate signing key")?;

    let mut chain = ReceiptChain::new();
    let ingest_receipt = ReceiptBuilder::new(Step::Ingest)
        .input_digest(corsair_core::sha256_hex(content.as_bytes()))
        .reproducible(code_version)
        .with_digest()?;
    chain.push(ingest_receipt.clone())?;

    let classify_receipt = ReceiptBuilder::new(Step::Classify)
        .previous(&ingest_receipt)
        .reproducible(code_version)
        .with_digest()?;
    chain.push(classify_receipt.clone())?;

    let chart_receipt = ReceiptBuilder::new(Step::Chart)
        .previous(&classify_receipt)
        .reproducible(code_version)
        .with_digest()?;
    chain.push(chart_receipt)?;

    let marque_id = Uuid::new_v4();
    let receipts: Vec<Receipt> = corsair_credential::seal_with_marque(&mut chain, code_version)?;
    let iat = Utc::now().timestamp();

    let compact = if sd_fields.is_empty() {
        corsair_credential::sign_cpoe(&key_manager, issuer, issuer_name, &subject, iat, expiry_days, marque_id, receipts)?
            .compact
    } else {
        sign_cpoe_with_disclosures(
            &key_manager,
            issuer,
            issuer_name,
            &subject,
            iat,
            expiry_days,
            marque_id,
            receipts,
            sd_fields,
        )?
    };

    write_output(output, &compact)?;
    Ok(EXIT_OK)
}

/// Composes [`corsair_credential::sign_cpoe`]'s own steps manually, because
/// that function signs an un-redacted `CredentialSubject` and has no hook
/// to splice in disclosures before the signature is computed.
#[allow(clippy::too_many_arguments)]
fn sign_cpoe_with_disclosures(
    key_manager: &KeyManager,
    issuer: &str,
    issuer_name: &str,
    subject: &CredentialSubject,
    iat: i64,
    expiry_days: u32,
    marque_id: Uuid,
    receipts: Vec<Receipt>,
    sd_fields: &[String],
) -> Result<String> {
    let issuer_did = format!("did:web:{issuer}");
    let kid = format!("{issuer_did}#key-1");
    let header = Header::new(kid);
    let mut payload = Payload::new(&issuer_did, issuer_name, subject, iat, expiry_days, marque_id, receipts);

    let salts = commands::random_salts(sd_fields.len());
    let (redacted, disclosures) = corsair_credential::redact(payload.vc.credential_subject.clone(), sd_fields, &salts);
    payload.vc.credential_subject = redacted;

    let header_json = serde_json::to_string(&header).context("serialize JWT header")?;
    let payload_json = serde_json::to_string(&payload).context("serialize JWT payload")?;
    let header_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(header_json);
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload_json);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let signature = key_manager.sign(signing_input.as_bytes());
    let sig_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(signature.to_bytes());
    let compact = format!("{signing_input}.{sig_b64}");

    let mut with_disclosures = compact;
    for d in &disclosures {
        with_disclosures.push('~');
        with_disclosures.push_str(&d.encode());
    }
    with_disclosures.push('~');
    Ok(with_disclosures)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_verify(
    file: Option<&std::path::Path>,
    policy_flags: &[String],
    require_issuer: Option<&str>,
    require_framework: Option<&str>,
    max_age: Option<u32>,
    min_score: Option<u32>,
    require_source: Option<&str>,
    require_scitt: bool,
    dependencies: bool,
    dependency_depth: Option<u32>,
    pubkey: Option<&std::path::Path>,
    core_domain: Option<&str>,
    formatter: &Formatter,
) -> Result<i32> {
    let compact = commands::read_input(file)?;
    let compact = compact.trim().to_string();

    let predicates = commands::build_policy_predicates(
        policy_flags,
        require_issuer,
        require_framework,
        max_age,
        min_score,
        require_source,
        require_scitt,
        dependencies,
        dependency_depth,
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    let engine = corsair_policy::PolicyEngine::with_predicates(predicates);

    let explicit_key = pubkey.map(commands::load_explicit_pubkey).transpose()?;

    let client = reqwest::Client::new();
    let options = VerifyOptions {
        explicit_public_key: explicit_key.as_ref(),
        policy: &engine,
        today: Utc::now().date_naive(),
        now: Utc::now().timestamp(),
        core_domain,
    };

    let outcome = corsair_verify::verify_cpoe(&compact, &client, &options).await?;
    println!("{}", formatter.format_verification(&outcome));
    Ok(if outcome.accepted() { EXIT_OK } else { EXIT_REJECTED })
}

fn cmd_diff(current: &std::path::Path, previous: &std::path::Path, formatter: &Formatter) -> Result<i32> {
    let current_subject = subject_from_jwt_file(current)?;
    let previous_subject = subject_from_jwt_file(previous)?;
    let diff = corsair_diff::diff(&current_subject, &previous_subject);
    println!("{}", formatter.format_diff(&diff));
    Ok(if diff.has_regression { EXIT_REJECTED } else { EXIT_OK })
}

fn subject_from_jwt_file(path: &std::path::Path) -> Result<CredentialSubject> {
    let compact = std::fs::read_to_string(path)
        .with_context(|| format!("read '{}'", path.display()))?
        .trim()
        .to_string();
    let payload = corsair_credential::decode_jwt_payload(&compact)?;
    serde_json::from_value(payload.vc.credential_subject)
        .context("credentialSubject does not match the expected shape")
}

async fn cmd_log_register(
    file: Option<&std::path::Path>,
    log_url: &str,
    proof_only: bool,
    formatter: &Formatter,
) -> Result<i32> {
    let compact = commands::read_input(file)?;
    let compact = compact.trim();
    let client = TransparencyClient::new(log_url);
    let mode = if proof_only { RegistrationMode::ProofOnly } else { RegistrationMode::FullStatement };
    let entry = client.register(compact, mode).await?;
    println!("{}", formatter.format_log_entry(&entry));
    Ok(EXIT_OK)
}

fn cmd_trust_txt_generate(
    cpoe: Option<String>,
    scitt: Option<String>,
    policy: Option<String>,
    frameworks: Vec<String>,
    formatter: &Formatter,
) -> Result<i32> {
    let trust = TrustTxt { cpoe, scitt, policy, frameworks };
    println!("{}", formatter.format_trust_txt(&trust));
    Ok(EXIT_OK)
}

async fn cmd_trust_txt_discover(domain: &str, formatter: &Formatter) -> Result<i32> {
    let client = reqwest::Client::new();
    let trust = corsair_transparency::discover_trust_txt(&client, domain).await?;
    println!("{}", formatter.format_trust_txt(&trust));
    Ok(EXIT_OK)
}

fn cmd_mappings_list(dir: &std::path::Path) -> Result<i32> {
    let mut registry = corsair_mapping::MappingRegistry::new();
    let errors = registry.load_dir(dir).with_context(|| format!("load mapping directory '{}'", dir.display()))?;
    for e in &errors {
        eprintln!("warning: {e}");
    }
    println!("{} rule(s) loaded", registry.len());
    Ok(EXIT_OK)
}

fn cmd_mappings_validate(file: &std::path::Path) -> Result<i32> {
    let content = std::fs::read_to_string(file).with_context(|| format!("read '{}'", file.display()))?;
    let rule: corsair_mapping::MappingRule =
        serde_json::from_str(&content).context("parse mapping rule JSON")?;
    match rule.validate() {
        Ok(()) => {
            println!("valid: {}", rule.id);
            Ok(EXIT_OK)
        }
        Err(e) => {
            eprintln!("invalid: {e}");
            Ok(EXIT_INVALID)
        }
    }
}

fn cmd_mappings_sign(file: &std::path::Path, key_dir: Option<&std::path::Path>, output: Option<&std::path::Path>) -> Result<i32> {
    let content = std::fs::read_to_string(file).with_context(|| format!("read '{}'", file.display()))?;
    let mut pack: corsair_mapping::SignedPack = serde_json::from_str(&content).context("parse mapping pack JSON")?;

    let key_dir = key_dir.map(PathBuf::from).unwrap_or_else(commands::default_key_dir);
    let key_manager = KeyManager::load_or_generate(&key_dir).context("load or generate signing key")?;

    let payload = pack.signing_payload()?;
    let signature = key_manager.sign(payload.as_bytes());
    pack.signature = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

    let rendered = serde_json::to_string_pretty(&pack).context("serialize signed pack")?;
    write_output(output.or(Some(file)), &rendered)?;
    Ok(EXIT_OK)
}

fn cmd_keygen(output: Option<PathBuf>) -> Result<i32> {
    let key_dir = output.unwrap_or_else(commands::default_key_dir);
    let key_manager = KeyManager::load_or_generate(&key_dir).context("generate signing key")?;
    println!("key directory: {}", key_manager.key_dir().display());
    Ok(EXIT_OK)
}

fn cmd_receipts_generate(step: &str, evidence: &std::path::Path, code_version: Option<&str>) -> Result<i32> {
    let step = match step {
        "ingest" => Step::Ingest,
        "classify" => Step::Classify,
        "chart" => Step::Chart,
        "marque" => Step::Marque,
        other => anyhow::bail!("unknown step '{other}': expected ingest, classify, chart, or marque"),
    };
    let content = std::fs::read_to_string(evidence).with_context(|| format!("read '{}'", evidence.display()))?;

    let mut builder = ReceiptBuilder::new(step).input_digest(corsair_core::sha256_hex(content.as_bytes()));
    builder = match code_version {
        Some(v) => builder.reproducible(v),
        None => builder,
    };
    let receipt = builder.with_digest()?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(EXIT_OK)
}

fn cmd_policy_validate(file: &std::path::Path) -> Result<i32> {
    let content = std::fs::read_to_string(file).with_context(|| format!("read '{}'", file.display()))?;
    match commands::parse_policy_file(&content) {
        Ok(predicates) => {
            println!("{} predicate(s) valid", predicates.len());
            Ok(EXIT_OK)
        }
        Err(e) => {
            eprintln!("invalid: {e:#}");
            Ok(EXIT_INVALID)
        }
    }
}

fn write_output(output: Option<&std::path::Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content).with_context(|| format!("write '{}'", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
