use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, io};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const SECRET_KEY_FILE: &str = ".markpilot_secret";

/// Returns the signing key from the key file next to the manifest, minting
/// and persisting a fresh one when no usable key exists yet. Persistence
/// failures degrade to an in-memory key so startup never blocks on the
/// filesystem.
pub(super) fn load_or_create_secret_key() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(SECRET_KEY_FILE);

    if let Some(existing) = read_key(&path) {
        return existing;
    }

    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    let key = URL_SAFE_NO_PAD.encode(bytes);

    match persist_key(&path, &key) {
        Ok(()) => key,
        // Lost the race to another process; its key is the one to use.
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            read_key(&path).unwrap_or(key)
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %path.display(),
                "secret key not persisted, sessions will not survive restarts"
            );
            key
        }
    }
}

fn read_key(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn persist_key(path: &Path, key: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_key_reads_back_and_blocks_overwrite() {
        let path =
            std::env::temp_dir().join(format!("markpilot-secret-test-{}", std::process::id()));
        let _ = fs::remove_file(&path);

        persist_key(&path, "k3y-material").expect("write key");
        assert_eq!(read_key(&path).as_deref(), Some("k3y-material"));

        let err = persist_key(&path, "other").expect_err("second write must fail");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn blank_key_file_is_treated_as_missing() {
        let path =
            std::env::temp_dir().join(format!("markpilot-blank-test-{}", std::process::id()));
        fs::write(&path, "  \n").expect("write blank file");
        assert_eq!(read_key(&path), None);
        let _ = fs::remove_file(&path);
    }
}
