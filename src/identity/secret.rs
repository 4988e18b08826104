//! Persistent JWT signing secret.
//!
//! Loaded once at startup; never regenerated on restart — the original
//! system's intermittent regeneration was a defect (spec.md §9) that would
//! invalidate every outstanding token on every restart.

use std::path::{Path, PathBuf};

use base64::Engine;
use rand::RngCore;

use super::IdentityError;

const SECRET_LEN: usize = 32;

pub struct Secret {
    bytes: [u8; SECRET_LEN],
}

impl Secret {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Loads the secret from `ALIBI_JWT_SECRET` if set (base64), otherwise
    /// from `<data_dir>/.jwt_secret`, generating and persisting a fresh one
    /// if neither exists.
    pub fn load_or_generate(data_dir: &Path) -> Result<Self, IdentityError> {
        if let Ok(encoded) = std::env::var("ALIBI_JWT_SECRET") {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| IdentityError::Secret(format!("invalid ALIBI_JWT_SECRET: {e}")))?;
            return Self::from_bytes(&decoded);
        }

        let path = secret_path(data_dir);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| IdentityError::Secret(format!("{}: {e}", path.display())))?;
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(contents.trim())
                .map_err(|e| IdentityError::Secret(format!("{}: {e}", path.display())))?;
            return Self::from_bytes(&decoded);
        }

        let mut bytes = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        std::fs::write(&path, &encoded)
            .map_err(|e| IdentityError::Secret(format!("{}: {e}", path.display())))?;
        restrict_permissions(&path)?;
        tracing::info!(path = %path.display(), "generated new JWT signing secret");
        Ok(Self { bytes })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.len() != SECRET_LEN {
            return Err(IdentityError::Secret(format!(
                "expected {SECRET_LEN}-byte secret, got {}",
                bytes.len()
            )));
        }
        let mut array = [0u8; SECRET_LEN];
        array.copy_from_slice(bytes);
        Ok(Self { bytes: array })
    }
}

fn secret_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".jwt_secret")
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), IdentityError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| IdentityError::Secret(format!("{}: {e}", path.display())))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), IdentityError> {
    Ok(())
}
