use std::{
    io::Write,
    path::{Path, PathBuf},
};

use base64::Engine;
use error_stack::ResultExt;

use crate::{constants, log, AtomicFixedString};

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

/// Where a PEM blob comes from: inline text, or a file holding it.
///
/// Any string containing a `-----BEGIN` marker is taken as inline PEM,
/// everything else as a path.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PemSource {
    Inline(AtomicFixedString),
    File(PathBuf),
}
impl PemSource {
    pub fn is_blank(&self) -> bool {
        match self {
            PemSource::Inline(text) => text.is_blank(),
            PemSource::File(path) => path.as_os_str().is_empty(),
        }
    }

    /// Resolve the PEM text. Relative paths are taken from `base_dir`.
    pub fn read(&self, base_dir: &Path) -> std::io::Result<AtomicFixedString> {
        match self {
            PemSource::Inline(text) => Ok(text.clone()),
            PemSource::File(path) => {
                let path = if path.is_relative() {
                    base_dir.join(path)
                } else {
                    path.clone()
                };
                log::debug!("[tls] reading pem file: {}", path.display());
                Ok(std::fs::read_to_string(path)?.into())
            }
        }
    }
}
impl From<String> for PemSource {
    fn from(value: String) -> Self {
        if value.contains(BEGIN.trim_end()) {
            PemSource::Inline(value.into())
        } else {
            PemSource::File(PathBuf::from(value.trim()))
        }
    }
}
impl From<&str> for PemSource {
    fn from(value: &str) -> Self {
        PemSource::from(value.to_string())
    }
}
impl From<PemSource> for String {
    fn from(value: PemSource) -> Self {
        match value {
            PemSource::Inline(text) => text.to_string(),
            PemSource::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}
impl std::fmt::Debug for PemSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PemSource::Inline(text) => write!(f, "Inline(<{} bytes>)", text.len()),
            PemSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PemError {
    #[error("no '-----BEGIN <label>-----' line")]
    MissingBegin,
    #[error("no '-----END {0}-----' line")]
    MissingEnd(AtomicFixedString),
    #[error("BEGIN label '{begin}' does not match END label '{end}'")]
    LabelMismatch {
        begin: AtomicFixedString,
        end: AtomicFixedString,
    },
    #[error("empty body")]
    EmptyBody,
    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("body is not DER encoded")]
    NotDer,
    #[error("expected {expected}, found '{found}'")]
    UnexpectedLabel {
        found: AtomicFixedString,
        expected: AtomicFixedString,
    },
}

/// The first PEM block of a text blob, decoded.
#[derive(Clone, PartialEq, Eq)]
pub struct PemBlock {
    label: AtomicFixedString,
    der: Vec<u8>,
    pem: AtomicFixedString,
}
impl PemBlock {
    pub fn parse(text: &str) -> std::result::Result<Self, PemError> {
        let start = text.find(BEGIN).ok_or(PemError::MissingBegin)?;
        let after_begin = &text[start + BEGIN.len()..];

        let label_len = after_begin.find(DASHES).ok_or(PemError::MissingBegin)?;
        let label = &after_begin[..label_len];
        if label.contains('\n') {
            return Err(PemError::MissingBegin);
        }

        let body_start = start + BEGIN.len() + label_len + DASHES.len();
        let rest = &text[body_start..];
        let end = rest
            .find(END)
            .ok_or_else(|| PemError::MissingEnd(label.into()))?;
        let body = &rest[..end];

        let after_end = &rest[end + END.len()..];
        let end_label_len = after_end
            .find(DASHES)
            .ok_or_else(|| PemError::MissingEnd(label.into()))?;
        let end_label = &after_end[..end_label_len];
        if end_label != label {
            return Err(PemError::LabelMismatch {
                begin: label.into(),
                end: end_label.into(),
            });
        }
        let block_end = body_start + end + END.len() + end_label_len + DASHES.len();

        let encoded = body
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();
        if encoded.is_empty() {
            return Err(PemError::EmptyBody);
        }

        let der = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        // every certificate and key encoding we accept is an ASN.1 SEQUENCE
        if der.first() != Some(&0x30) {
            return Err(PemError::NotDer);
        }

        Ok(Self {
            label: label.into(),
            der,
            pem: format!("{}\n", &text[start..block_end]).into(),
        })
    }

    pub fn expect_label(&self, allowed: &[&str]) -> std::result::Result<(), PemError> {
        if allowed.contains(&self.label.as_ref()) {
            Ok(())
        } else {
            Err(PemError::UnexpectedLabel {
                found: self.label.clone(),
                expected: allowed.join(" or ").into(),
            })
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }
}
impl std::fmt::Debug for PemBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PemBlock")
            .field("label", &self.label)
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Parsed mutual TLS material of a device.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    pub ca: PemBlock,
    pub certificate: PemBlock,
    pub private_key: PemBlock,
}

/// Files written by [`TlsMaterial::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub ca: PathBuf,
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

impl TlsMaterial {
    /// Write the material into `dir` so it can be handed to the MQTT client,
    /// which only accepts file paths.
    pub fn install(&self, dir: &Path) -> Result<TlsPaths> {
        std::fs::create_dir_all(dir).change_context(Error::Install).attach_printable_lazy(|| {
            format!("creating directory '{}'", dir.display())
        })?;

        let paths = TlsPaths {
            ca: dir.join(constants::tls::CA_FILENAME),
            certificate: dir.join(constants::tls::CERT_FILENAME),
            private_key: dir.join(constants::tls::KEY_FILENAME),
        };

        write_file(&paths.ca, self.ca.pem(), false)?;
        write_file(&paths.certificate, self.certificate.pem(), false)?;
        write_file(&paths.private_key, self.private_key.pem(), true)?;

        log::info!("[tls] installed tls material into '{}'", dir.display());

        Ok(paths)
    }
}

fn write_file(path: &Path, contents: &str, private: bool) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(if private { 0o600 } else { 0o644 });
    }
    options
        .open(path)
        .and_then(|mut file| {
            // mode() only applies on create, an existing key keeps its old permissions
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if private {
                    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
                }
            }
            #[cfg(not(unix))]
            let _ = private;

            file.write_all(contents.as_bytes())
        })
        .change_context(Error::Install)
        .attach_printable_lazy(|| format!("writing '{}'", path.display()))
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error installing tls material")]
    Install,
}

type Result<T> = error_stack::Result<T, Error>;
