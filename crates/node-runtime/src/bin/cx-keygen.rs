//! Generate a P-256 key pair for a node identity.
//!
//! Prints the PKCS#8 private key (for `identity.keys[].private_key_pem` or a
//! key file) and the SPKI public key (for the identity document). With
//! `--out <dir>`, writes `private.pem` and `public.pem` instead.

use anyhow::{Context, Result};
use clap::Parser;
use shared_crypto::{DigitalSignature, EcdsaP256, P256KeyPair};
use std::path::PathBuf;

/// cx-keygen: P-256 key pair generator for Consent-Exchange identities
#[derive(Parser, Debug)]
#[command(name = "cx-keygen", version)]
#[command(about = "Generate a P-256 key pair for a node identity")]
struct Args {
    /// Write private.pem and public.pem into this directory instead of stdout
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let pair = P256KeyPair::generate();
    let private_pem = pair.to_pem().context("failed to encode private key")?;
    let public_pem = EcdsaP256
        .public_key_pem(&pair.public_key())
        .context("failed to encode public key")?;

    match args.out {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let private_path = dir.join("private.pem");
            std::fs::write(&private_path, private_pem.as_bytes())
                .with_context(|| format!("failed to write {}", private_path.display()))?;
            let public_path = dir.join("public.pem");
            std::fs::write(&public_path, public_pem.as_bytes())
                .with_context(|| format!("failed to write {}", public_path.display()))?;
            println!("wrote {} and {}", private_path.display(), public_path.display());
        }
        None => {
            print!("{}", private_pem.as_str());
            print!("{public_pem}");
        }
    }
    Ok(())
}
