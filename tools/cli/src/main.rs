//! fieldseal CLI - Command line interface for encrypted field operations.
//!
//! This tool seals values for a set of recipients, opens them as one
//! recipient, manages the recipient list of a sealed field stored as JSON,
//! and hashes or verifies login passwords.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use fieldseal_common::RecipientId;
use fieldseal_crypto::{
    CredentialHasher, CredentialRecord, CryptoConfig, KdfParams, OsRandom, RecipientKeyPair,
    RecipientPublicKey, RecipientSecretKey,
};
use fieldseal_envelope::{EncryptedField, FieldSealer, Recipient};

#[derive(Parser)]
#[command(name = "fieldseal")]
#[command(about = "fieldseal - Multi-recipient field encryption")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration file (cipher and KDF parameters).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a recipient key pair.
    Keygen,

    /// Encrypt a value for one or more recipients.
    Seal {
        /// Recipient as ID=PUBLIC_KEY (repeatable).
        #[arg(short, long = "recipient", required = true)]
        recipients: Vec<String>,

        /// Plaintext; read from stdin when omitted.
        #[arg(short, long)]
        text: Option<String>,

        /// Write the sealed field here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decrypt a sealed field as one recipient.
    Open {
        /// Sealed field JSON file.
        #[arg(short, long)]
        field: PathBuf,

        /// Recipient id to decrypt as.
        #[arg(short, long)]
        id: String,

        /// Recipient secret key; prompted for when omitted.
        #[arg(short, long)]
        secret_key: Option<String>,
    },

    /// Give another recipient access to a sealed field.
    Grant {
        /// Sealed field JSON file (updated in place).
        #[arg(short, long)]
        field: PathBuf,

        /// New recipient id.
        #[arg(short, long)]
        id: String,

        /// New recipient public key.
        #[arg(short, long)]
        public_key: String,

        /// Id of an existing recipient vouching for the grant.
        #[arg(long)]
        via: String,

        /// Secret key of the vouching recipient; prompted for when omitted.
        #[arg(long)]
        via_secret_key: Option<String>,
    },

    /// Replace a recipient's wrapped key after they rotated key pairs.
    Rewrap {
        /// Sealed field JSON file (updated in place).
        #[arg(short, long)]
        field: PathBuf,

        /// Recipient id whose key is replaced.
        #[arg(short, long)]
        id: String,

        /// The recipient's new public key.
        #[arg(short, long)]
        public_key: String,

        /// Id of an existing recipient vouching for the change.
        #[arg(long)]
        via: String,

        /// Secret key of the vouching recipient; prompted for when omitted.
        #[arg(long)]
        via_secret_key: Option<String>,
    },

    /// Remove a recipient from a sealed field (the content key is kept).
    Revoke {
        /// Sealed field JSON file (updated in place).
        #[arg(short, long)]
        field: PathBuf,

        /// Recipient id to remove.
        #[arg(short, long)]
        id: String,
    },

    /// Re-encrypt a field under a fresh content key for a new recipient set.
    Reseal {
        /// Sealed field JSON file.
        #[arg(short, long)]
        field: PathBuf,

        /// Id of a current recipient able to read the field.
        #[arg(long)]
        via: String,

        /// Secret key of that recipient; prompted for when omitted.
        #[arg(long)]
        via_secret_key: Option<String>,

        /// New recipient as ID=PUBLIC_KEY (repeatable).
        #[arg(short, long = "recipient", required = true)]
        recipients: Vec<String>,

        /// Write the result here instead of replacing the input.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Hash a password into a credential record.
    HashPassword {
        /// KDF strength: "interactive", "moderate", or "sensitive".
        /// Overrides the configuration file.
        #[arg(short, long)]
        strength: Option<String>,
    },

    /// Check a password against a credential record.
    VerifyPassword {
        /// Credential record produced by hash-password.
        #[arg(short, long)]
        record: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Keygen => cmd_keygen(),

        Commands::Seal {
            recipients,
            text,
            out,
        } => cmd_seal(&config, &recipients, text, out.as_deref()),

        Commands::Open {
            field,
            id,
            secret_key,
        } => cmd_open(&config, &field, &id, secret_key),

        Commands::Grant {
            field,
            id,
            public_key,
            via,
            via_secret_key,
        } => cmd_grant(&config, &field, &id, &public_key, &via, via_secret_key),

        Commands::Rewrap {
            field,
            id,
            public_key,
            via,
            via_secret_key,
        } => cmd_rewrap(&config, &field, &id, &public_key, &via, via_secret_key),

        Commands::Revoke { field, id } => cmd_revoke(&field, &id),

        Commands::Reseal {
            field,
            via,
            via_secret_key,
            recipients,
            out,
        } => cmd_reseal(&config, &field, &via, via_secret_key, &recipients, out.as_deref()),

        Commands::HashPassword { strength } => cmd_hash_password(&config, strength.as_deref()),

        Commands::VerifyPassword { record } => cmd_verify_password(&config, &record),
    }
}

/// Load configuration from `path`, or defaults.
fn load_config(path: Option<&Path>) -> Result<CryptoConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            CryptoConfig::from_json(&json).context("Invalid configuration")
        }
        None => Ok(CryptoConfig::default()),
    }
}

fn sealer(config: &CryptoConfig) -> Result<FieldSealer> {
    FieldSealer::new(config, OsRandom::shared()).context("Failed to initialise sealer")
}

/// Parse `ID=PUBLIC_KEY`.
fn parse_recipient(spec: &str) -> Result<Recipient> {
    let (id, key) = spec
        .split_once('=')
        .with_context(|| format!("Recipient {:?} must look like ID=PUBLIC_KEY", spec))?;

    let id = parse_id(id)?;
    let public_key = RecipientPublicKey::from_base64(key)
        .with_context(|| format!("Invalid public key for recipient {}", id))?;
    Ok(Recipient::new(id, public_key))
}

fn parse_id(id: &str) -> Result<RecipientId> {
    id.parse::<RecipientId>()
        .with_context(|| format!("Invalid recipient id {:?}", id))
}

/// Use the given secret key or prompt for it securely.
fn secret_key(given: Option<String>, prompt: &str) -> Result<RecipientSecretKey> {
    let encoded = match given {
        Some(key) => Zeroizing::new(key),
        None => Zeroizing::new(
            rpassword::prompt_password(prompt).context("Failed to read secret key")?,
        ),
    };
    RecipientSecretKey::from_base64(&encoded).context("Invalid secret key")
}

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(password))
}

fn load_field(path: &Path) -> Result<EncryptedField> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read field {}", path.display()))?;
    EncryptedField::from_json(&json).with_context(|| format!("Malformed field {}", path.display()))
}

fn save_field(field: &EncryptedField, path: &Path) -> Result<()> {
    let json = field.to_json()?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn emit_field(field: &EncryptedField, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => save_field(field, path),
        None => {
            println!("{}", field.to_json()?);
            Ok(())
        }
    }
}

/// Generate a key pair.
fn cmd_keygen() -> Result<()> {
    let pair = RecipientKeyPair::generate(&OsRandom).context("Failed to generate key pair")?;
    let secret = Zeroizing::new(pair.secret.to_base64());

    let output = serde_json::json!({
        "publicKey": pair.public.to_base64(),
        "secretKey": secret.as_str(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Seal a value.
fn cmd_seal(
    config: &CryptoConfig,
    recipients: &[String],
    text: Option<String>,
    out: Option<&Path>,
) -> Result<()> {
    let recipients = recipients
        .iter()
        .map(|spec| parse_recipient(spec))
        .collect::<Result<Vec<_>>>()?;

    let plaintext = match text {
        Some(text) => Zeroizing::new(text.into_bytes()),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read plaintext from stdin")?;
            Zeroizing::new(buffer)
        }
    };

    info!("Sealing value for {} recipient(s)", recipients.len());

    let field = sealer(config)?
        .encrypt_for_recipients(&plaintext, &recipients)
        .context("Failed to seal value")?;

    emit_field(&field, out)
}

/// Open a sealed field.
fn cmd_open(
    config: &CryptoConfig,
    path: &Path,
    id: &str,
    given_key: Option<String>,
) -> Result<()> {
    let field = load_field(path)?;
    let id = parse_id(id)?;
    let secret = secret_key(given_key, "Secret key: ")?;

    let plaintext = sealer(config)?
        .decrypt_text(&field, &id, &secret)
        .context("Failed to open field")?;

    println!("{}", plaintext);

    Ok(())
}

/// Grant access to a new recipient.
fn cmd_grant(
    config: &CryptoConfig,
    path: &Path,
    id: &str,
    public_key: &str,
    via: &str,
    via_key: Option<String>,
) -> Result<()> {
    let mut field = load_field(path)?;
    let recipient = parse_recipient(&format!("{}={}", id, public_key))?;
    let via = parse_id(via)?;
    let via_secret = secret_key(via_key, "Secret key of granting recipient: ")?;

    sealer(config)?
        .add_recipient(
            &mut field,
            recipient.id,
            &recipient.public_key,
            &via,
            &via_secret,
        )
        .context("Failed to grant access")?;

    save_field(&field, path)?;
    println!("Recipient {} added ({} total)", recipient.id, field.len());

    Ok(())
}

/// Replace a recipient's wrapped key.
fn cmd_rewrap(
    config: &CryptoConfig,
    path: &Path,
    id: &str,
    public_key: &str,
    via: &str,
    via_key: Option<String>,
) -> Result<()> {
    let mut field = load_field(path)?;
    let recipient = parse_recipient(&format!("{}={}", id, public_key))?;
    let via = parse_id(via)?;
    let via_secret = secret_key(via_key, "Secret key of vouching recipient: ")?;

    sealer(config)?
        .rewrap_recipient(
            &mut field,
            &recipient.id,
            &recipient.public_key,
            &via,
            &via_secret,
        )
        .context("Failed to replace recipient key")?;

    save_field(&field, path)?;
    println!("Key for recipient {} replaced", recipient.id);

    Ok(())
}

/// Remove a recipient.
fn cmd_revoke(path: &Path, id: &str) -> Result<()> {
    let mut field = load_field(path)?;
    let id = parse_id(id)?;

    field
        .remove_recipient(&id)
        .context("Failed to revoke access")?;

    save_field(&field, path)?;
    println!("Recipient {} removed ({} remaining)", id, field.len());
    println!("Note: the content key was not rotated; use `reseal` to lock out retained copies.");

    Ok(())
}

/// Re-encrypt under a fresh content key.
fn cmd_reseal(
    config: &CryptoConfig,
    path: &Path,
    via: &str,
    via_key: Option<String>,
    recipients: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let field = load_field(path)?;
    let via = parse_id(via)?;
    let via_secret = secret_key(via_key, "Secret key of current recipient: ")?;
    let recipients = recipients
        .iter()
        .map(|spec| parse_recipient(spec))
        .collect::<Result<Vec<_>>>()?;

    let resealed = sealer(config)?
        .reencrypt(&field, &via, &via_secret, &recipients)
        .context("Failed to re-encrypt field")?;

    save_field(&resealed, out.unwrap_or(path))?;
    println!("Field re-encrypted for {} recipient(s)", resealed.len());

    Ok(())
}

/// Hash a password.
fn cmd_hash_password(config: &CryptoConfig, strength: Option<&str>) -> Result<()> {
    let params = match strength {
        Some(name) => KdfParams::preset(name)?,
        None => config.kdf,
    };

    let password = prompt_password("Enter password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if *password != *confirm {
        anyhow::bail!("Passwords do not match");
    }

    let hasher = CredentialHasher::new(params, OsRandom::shared())?;
    let record = hasher.hash(&password).context("Failed to hash password")?;

    println!("{}", record);

    Ok(())
}

/// Verify a password.
fn cmd_verify_password(config: &CryptoConfig, record: &str) -> Result<()> {
    let hasher = CredentialHasher::new(config.kdf, OsRandom::shared())?;
    let record = CredentialRecord::new(record);
    let password = prompt_password("Enter password: ")?;

    if !hasher
        .verify(&password, &record)
        .context("Invalid credential record")?
    {
        anyhow::bail!("Password does not match");
    }

    println!("Password matches");
    if hasher.needs_rehash(&record)? {
        println!("Note: record uses outdated KDF parameters; re-hash on next change.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient() {
        let pair = RecipientKeyPair::generate(&OsRandom).unwrap();
        let recipient = parse_recipient(&format!("7={}", pair.public.to_base64())).unwrap();

        assert_eq!(recipient.id, RecipientId::Int(7));
        assert_eq!(recipient.public_key, pair.public);
    }

    #[test]
    fn test_parse_recipient_rejects_missing_key() {
        assert!(parse_recipient("7").is_err());
        assert!(parse_recipient("7=abc").is_err());
    }

    #[test]
    fn test_field_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.json");
        let pair = RecipientKeyPair::generate(&OsRandom).unwrap();
        let sealer = FieldSealer::with_defaults();

        let field = sealer
            .encrypt_text("notes", &[Recipient::new(1, pair.public.clone())])
            .unwrap();
        save_field(&field, &path).unwrap();

        let loaded = load_field(&path).unwrap();
        assert_eq!(
            sealer
                .decrypt_text(&loaded, &RecipientId::Int(1), &pair.secret)
                .unwrap(),
            "notes"
        );
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cipher": "chacha20-poly1305"}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.cipher.nonce_size(), 12);
        assert_eq!(load_config(None).unwrap(), CryptoConfig::default());
    }

    #[test]
    fn test_load_config_rejects_bad_kdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"kdf": {"memory_cost": 1, "time_cost": 1, "parallelism": 1}}"#,
        )
        .unwrap();

        assert!(load_config(Some(&path)).is_err());
    }
}
