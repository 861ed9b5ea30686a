use std::path::{Path, PathBuf};

/// Reads a single named secret from a conventional secrets directory.
///
/// Mirrors the Kubernetes/Docker-secrets convention of one file per secret
/// name under a mounted directory (e.g. `/var/run/secrets/bridge/hsm-key-id`).
/// Trailing newlines are stripped since most secret-mounting tools append one.
pub fn read_secret_file(dir: &Path, name: &str) -> Result<String, std::io::Error> {
    let path: PathBuf = dir.join(name);
    let raw = std::fs::read_to_string(&path)?;
    Ok(raw.trim_end_matches(['\n', '\r']).to_string())
}

/// Resolves a setting by first checking the environment variable `env_name`,
/// then falling back to a file named `secret_name` under `secrets_dir` (if
/// one was configured), returning `None` if neither source has a value.
pub fn resolve(
    env_name: &str,
    secrets_dir: Option<&Path>,
    secret_name: &str,
) -> Option<String> {
    if let Ok(value) = std::env::var(env_name) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    secrets_dir.and_then(|dir| read_secret_file(dir, secret_name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_trims_secret_file() {
        let dir = std::env::temp_dir().join(format!(
            "bridge-secrets-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("hsm-key-id"), "abc123\n").unwrap();
        let value = read_secret_file(&dir, "hsm-key-id").unwrap();
        assert_eq!(value, "abc123");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn resolve_prefers_env_over_file() {
        let dir = std::env::temp_dir().join(format!(
            "bridge-secrets-test-env-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("token"), "from-file").unwrap();
        unsafe {
            std::env::set_var("BRIDGE_TEST_RESOLVE_TOKEN", "from-env");
        }
        let value = resolve("BRIDGE_TEST_RESOLVE_TOKEN", Some(&dir), "token");
        assert_eq!(value.as_deref(), Some("from-env"));
        unsafe {
            std::env::remove_var("BRIDGE_TEST_RESOLVE_TOKEN");
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
