//! Self-signed certificate for the HTTPS server.
//!
//! Generated once with `openssl` into `<docs>/.ssl/` and reused afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use platform::config::{APP_NAME, CERT_COMMAND_TIMEOUT};
use platform::CommandRunner;

use super::ServerError;

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";
const VALID_DAYS: &str = "3650";

/// PEM certificate and key paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPaths {
    /// Certificate.
    pub cert: PathBuf,
    /// Private key.
    pub key: PathBuf,
}

impl CertPaths {
    /// Paths inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cert: dir.join(CERT_FILE),
            key: dir.join(KEY_FILE),
        }
    }

    /// Both files present.
    pub fn exist(&self) -> bool {
        self.cert.is_file() && self.key.is_file()
    }

    /// Read both files.
    pub fn load(&self) -> Result<(Vec<u8>, Vec<u8>), ServerError> {
        let read = |path: &Path| {
            fs::read(path).map_err(|source| ServerError::Read {
                path: path.to_path_buf(),
                source,
            })
        };
        Ok((read(&self.cert)?, read(&self.key)?))
    }
}

/// Make sure a certificate exists in `dir`, generating one if needed.
pub fn ensure_certificate<R: CommandRunner>(runner: &mut R, dir: &Path) -> Result<CertPaths, ServerError> {
    let paths = CertPaths::in_dir(dir);
    if paths.exist() {
        return Ok(paths);
    }
    fs::create_dir_all(dir).map_err(|source| ServerError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let key = paths.key.to_string_lossy();
    let cert = paths.cert.to_string_lossy();
    let subject = format!("/CN={APP_NAME}/O={APP_NAME}");
    let args = [
        "req",
        "-x509",
        "-newkey",
        "rsa:2048",
        "-keyout",
        &*key,
        "-out",
        &*cert,
        "-days",
        VALID_DAYS,
        "-nodes",
        "-subj",
        subject.as_str(),
    ];
    runner.run_checked("openssl", &args, CERT_COMMAND_TIMEOUT)?;
    tracing::info!(dir = %dir.display(), "generated self-signed certificate");
    Ok(paths)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::MockRunner;
    use tempfile::TempDir;

    #[test]
    fn test_generates_when_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".ssl");
        let mut runner = MockRunner::new();
        let paths = ensure_certificate(&mut runner, &dir).unwrap();
        assert!(dir.is_dir());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("openssl req -x509 -newkey rsa:2048 -keyout"));
        assert!(calls[0].ends_with("-days 3650 -nodes -subj /CN=etyper/O=etyper"));
        assert_eq!(paths.cert, dir.join("cert.pem"));
    }

    #[test]
    fn test_reuses_existing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("cert.pem"), "c").unwrap();
        fs::write(tmp.path().join("key.pem"), "k").unwrap();
        let mut runner = MockRunner::new();
        let paths = ensure_certificate(&mut runner, tmp.path()).unwrap();
        assert!(runner.calls().is_empty());
        assert_eq!(paths.load().unwrap(), (b"c".to_vec(), b"k".to_vec()));
    }

    #[test]
    fn test_openssl_failure_reported() {
        let tmp = TempDir::new().unwrap();
        let mut runner = MockRunner::new();
        runner.fail("openssl");
        assert!(matches!(
            ensure_certificate(&mut runner, tmp.path()),
            Err(ServerError::Command(_))
        ));
    }
}
