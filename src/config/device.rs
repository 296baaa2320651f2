use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use super::{ConfigFile, Error, Result};
use crate::{
    constants::{self, env, limits, placeholder},
    helper, log, mqtt,
    tls::{PemBlock, PemError, PemSource, TlsMaterial},
    AtomicFixedString, Secret,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WifiConfig {
    pub ssid: AtomicFixedString,
    pub password: Secret,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TopicConfig {
    /// Published to by the device.
    pub status: AtomicFixedString,
    /// Subscribed to by the device.
    pub control: AtomicFixedString,
}

#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrokerConfig {
    pub endpoint: AtomicFixedString,

    #[serde(default = "BrokerConfig::default_port")]
    pub port: u16,

    #[serde(alias = "keep_alive_interval_ms")]
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    pub keep_alive_interval: Option<Duration>,

    #[serde(alias = "connect_timeout_ms")]
    #[serde_as(as = "Option<serde_with::DurationMilliSeconds<u64>>")]
    pub connect_timeout: Option<Duration>,

    pub clean_session: Option<bool>,

    #[serde(default)]
    pub control_qos: mqtt::Qos,
}
impl BrokerConfig {
    fn default_port() -> u16 {
        constants::broker::DEFAULT_PORT
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TlsConfig {
    pub ca: PemSource,
    pub certificate: PemSource,
    pub private_key: PemSource,
}

/// Connection credentials of the device as loaded, before validation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceConfig {
    pub wifi: WifiConfig,
    pub client_id: AtomicFixedString,
    pub topics: TopicConfig,
    pub broker: BrokerConfig,
    pub tls: TlsConfig,

    /// Directory relative PEM paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}
impl Default for DeviceConfig {
    fn default() -> Self {
        fn skeleton(label: &str) -> PemSource {
            format!("\n-----BEGIN {label}-----\n\n-----END {label}-----\n").into()
        }

        Self {
            wifi: WifiConfig {
                ssid: placeholder::WIFI_SSID.into(),
                password: placeholder::WIFI_PASSWORD.into(),
            },
            client_id: placeholder::CLIENT_ID.into(),
            topics: TopicConfig {
                status: placeholder::STATUS_TOPIC.into(),
                control: placeholder::CONTROL_TOPIC.into(),
            },
            broker: BrokerConfig {
                endpoint: placeholder::AWS_ENDPOINT.into(),
                port: constants::broker::DEFAULT_PORT,
                keep_alive_interval: None,
                connect_timeout: None,
                clean_session: None,
                control_qos: mqtt::Qos::default(),
            },
            tls: TlsConfig {
                ca: skeleton(constants::tls::CERTIFICATE_LABEL),
                certificate: skeleton(constants::tls::CERTIFICATE_LABEL),
                private_key: skeleton(constants::tls::PRIVATE_KEY_LABELS[0]),
            },
            base_dir: PathBuf::new(),
        }
    }
}
impl ConfigFile for DeviceConfig {
    const FILENAME: &'static str = "device";
    type Config = DeviceConfig;
}

impl DeviceConfig {
    /// Load the config file at `path` and apply overrides from the process
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, helper::env_lookup)
    }

    /// Load the config file at `path`, taking overrides from `lookup`.
    pub fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut out = Self::load_config(path)?;
        out.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        out.apply_overrides(lookup)?;
        Ok(out)
    }

    /// Replace fields with the values `lookup` returns for their names.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn apply<T: From<String>>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
            field: &mut T,
        ) {
            if let Some(value) = lookup(name) {
                log::debug!("[config] {name} overridden from environment");
                *field = value.into();
            }
        }

        apply(&lookup, env::WIFI_SSID, &mut self.wifi.ssid);
        apply(&lookup, env::WIFI_PASSWORD, &mut self.wifi.password);
        apply(&lookup, env::CLIENT_ID, &mut self.client_id);
        apply(&lookup, env::STATUS_TOPIC, &mut self.topics.status);
        apply(&lookup, env::CONTROL_TOPIC, &mut self.topics.control);
        apply(&lookup, env::AWS_ENDPOINT, &mut self.broker.endpoint);
        apply(&lookup, env::AWS_CERT_CA, &mut self.tls.ca);
        apply(&lookup, env::AWS_CERT_CRT, &mut self.tls.certificate);
        apply(&lookup, env::AWS_CERT_PRIVATE, &mut self.tls.private_key);

        if let Some(port) = lookup(env::AWS_PORT) {
            self.broker.port = match port.trim().parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => {
                    return Err(error_stack::report!(Error::Override)
                        .attach_printable(format!("{}: '{port}' is not a TCP port", env::AWS_PORT)))
                }
            };
            log::debug!("[config] {} overridden from environment", env::AWS_PORT);
        }

        Ok(())
    }

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> std::result::Result<Credentials, ValidationErrors> {
        let mut errors = Vec::new();

        let wifi_ssid = self.wifi.ssid.clone();
        if required(&mut errors, env::WIFI_SSID, &wifi_ssid, &[placeholder::WIFI_SSID])
            && wifi_ssid.len() > limits::SSID_MAX_BYTES
        {
            errors.push(ValidationError::SsidTooLong(wifi_ssid.len()));
        }

        let password = self.wifi.password.expose();
        if required(
            &mut errors,
            env::WIFI_PASSWORD,
            password,
            &[placeholder::WIFI_PASSWORD],
        ) && !is_valid_passphrase(password)
        {
            errors.push(ValidationError::Passphrase);
        }

        let client_id = self.client_id.clone();
        if required(&mut errors, env::CLIENT_ID, &client_id, &[]) {
            if client_id.len() > limits::CLIENT_ID_MAX_BYTES {
                errors.push(ValidationError::ClientIdTooLong(client_id.len()));
            }
            if client_id.chars().any(char::is_whitespace) {
                errors.push(ValidationError::ClientIdWhitespace);
            }
            if client_id.as_ref() == placeholder::CLIENT_ID {
                log::warn!(
                    "[config] {} still has the template value '{client_id}', make sure it is unique on the broker",
                    env::CLIENT_ID
                );
            }
        }

        let status_topic = self.topics.status.clone();
        if required(
            &mut errors,
            env::STATUS_TOPIC,
            &status_topic,
            &[placeholder::STATUS_TOPIC],
        ) {
            if let Err(reason) = check_topic_name(&status_topic) {
                errors.push(ValidationError::Topic {
                    field: env::STATUS_TOPIC,
                    reason,
                });
            }
        }

        let control_topic = self.topics.control.clone();
        if required(
            &mut errors,
            env::CONTROL_TOPIC,
            &control_topic,
            &[placeholder::CONTROL_TOPIC],
        ) {
            if let Err(reason) = check_topic_filter(&control_topic) {
                errors.push(ValidationError::Topic {
                    field: env::CONTROL_TOPIC,
                    reason,
                });
            }
        }

        let endpoint = self.broker.endpoint.clone();
        if required(&mut errors, env::AWS_ENDPOINT, &endpoint, &[]) {
            if endpoint.contains(placeholder::ENDPOINT_MARKER) {
                errors.push(ValidationError::Placeholder(env::AWS_ENDPOINT));
            } else if let Err(reason) = check_hostname(&endpoint) {
                errors.push(ValidationError::Hostname(reason));
            }
        }

        if self.broker.port == 0 {
            errors.push(ValidationError::InvalidPort(self.broker.port));
        }

        let ca = self.read_pem(
            &mut errors,
            env::AWS_CERT_CA,
            &self.tls.ca,
            &[constants::tls::CERTIFICATE_LABEL],
        );
        let certificate = self.read_pem(
            &mut errors,
            env::AWS_CERT_CRT,
            &self.tls.certificate,
            &[constants::tls::CERTIFICATE_LABEL],
        );
        let private_key = self.read_pem(
            &mut errors,
            env::AWS_CERT_PRIVATE,
            &self.tls.private_key,
            &constants::tls::PRIVATE_KEY_LABELS,
        );

        match (ca, certificate, private_key) {
            (Some(ca), Some(certificate), Some(private_key)) if errors.is_empty() => {
                Ok(Credentials {
                    wifi_ssid,
                    wifi_password: self.wifi.password.clone(),
                    client_id,
                    status_topic,
                    control_topic,
                    endpoint,
                    port: self.broker.port,
                    session: SessionOptions {
                        keep_alive_interval: self.broker.keep_alive_interval.unwrap_or(
                            Duration::from_secs(constants::broker::DEFAULT_KEEP_ALIVE_SECS),
                        ),
                        connect_timeout: self.broker.connect_timeout.unwrap_or(
                            Duration::from_secs(constants::broker::DEFAULT_CONNECT_TIMEOUT_SECS),
                        ),
                        clean_session: self.broker.clean_session.unwrap_or(true),
                        control_qos: self.broker.control_qos,
                    },
                    tls: TlsMaterial {
                        ca,
                        certificate,
                        private_key,
                    },
                })
            }
            _ => Err(ValidationErrors(errors)),
        }
    }

    fn read_pem(
        &self,
        errors: &mut Vec<ValidationError>,
        field: &'static str,
        source: &PemSource,
        labels: &[&str],
    ) -> Option<PemBlock> {
        if source.is_blank() {
            errors.push(ValidationError::Empty(field));
            return None;
        }

        let text = match source.read(&self.base_dir) {
            Ok(text) => text,
            Err(e) => {
                errors.push(ValidationError::PemUnreadable {
                    field,
                    reason: e.to_string().into(),
                });
                return None;
            }
        };

        match PemBlock::parse(&text).and_then(|block| block.expect_label(labels).map(|_| block)) {
            Ok(block) => Some(block),
            Err(reason) => {
                errors.push(ValidationError::Pem { field, reason });
                None
            }
        }
    }
}

/// Push `Empty`/`Placeholder` errors for `value`. Returns whether the value is
/// worth checking further.
fn required(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
    placeholders: &[&str],
) -> bool {
    if value.trim().is_empty() {
        errors.push(ValidationError::Empty(field));
        false
    } else if placeholders.contains(&value.trim()) {
        errors.push(ValidationError::Placeholder(field));
        false
    } else {
        true
    }
}

/// WPA2 accepts an 8 to 63 character printable ASCII passphrase, or the raw
/// 256-bit PSK as 64 hex digits.
fn is_valid_passphrase(password: &str) -> bool {
    let printable = |c: char| c.is_ascii() && !c.is_ascii_control();
    let len = password.chars().count();

    let passphrase = (limits::PASSPHRASE_MIN_CHARS..=limits::PASSPHRASE_MAX_CHARS).contains(&len)
        && password.chars().all(printable);
    let psk = len == limits::PSK_HEX_CHARS && password.chars().all(|c| c.is_ascii_hexdigit());

    passphrase || psk
}

fn check_topic_common(topic: &str) -> std::result::Result<(), TopicError> {
    if topic.len() > limits::TOPIC_MAX_BYTES {
        return Err(TopicError::TooLong(topic.len()));
    }
    if topic.contains('\0') {
        return Err(TopicError::Nul);
    }
    Ok(())
}

/// A topic the device publishes to: no wildcards, not a `$` system topic.
pub fn check_topic_name(topic: &str) -> std::result::Result<(), TopicError> {
    check_topic_common(topic)?;
    if topic.contains(['+', '#']) {
        return Err(TopicError::Wildcard);
    }
    if topic.starts_with('$') {
        return Err(TopicError::Reserved);
    }
    Ok(())
}

/// A topic filter the device subscribes to. `+` must fill a whole level and
/// `#` must be the whole last level.
pub fn check_topic_filter(topic: &str) -> std::result::Result<(), TopicError> {
    check_topic_common(topic)?;

    let levels = topic.split('/').collect::<Vec<_>>();
    for (i, level) in levels.iter().enumerate() {
        let is_last = i + 1 == levels.len();
        match *level {
            "+" => {}
            "#" if is_last => {}
            _ if level.contains(['+', '#']) => return Err(TopicError::MisplacedWildcard),
            _ => {}
        }
    }
    Ok(())
}

pub fn check_hostname(host: &str) -> std::result::Result<(), HostnameError> {
    let host = host.strip_suffix('.').unwrap_or(host);

    if host.len() > limits::HOSTNAME_MAX_BYTES {
        return Err(HostnameError::TooLong(host.len()));
    }

    for label in host.split('.') {
        if label.is_empty() {
            return Err(HostnameError::EmptyLabel);
        }
        if label.len() > limits::HOSTNAME_LABEL_MAX_BYTES {
            return Err(HostnameError::LabelTooLong(label.into()));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(HostnameError::InvalidChar(c));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::Hyphen(label.into()));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("longer than {} bytes ({0})", limits::TOPIC_MAX_BYTES)]
    TooLong(usize),
    #[error("contains a NUL character")]
    Nul,
    #[error("wildcards are not allowed in a publish topic")]
    Wildcard,
    #[error("topics starting with '$' are reserved for the broker")]
    Reserved,
    #[error("'+' and '#' must occupy a whole level, '#' only the last one")]
    MisplacedWildcard,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostnameError {
    #[error("longer than {} bytes ({0})", limits::HOSTNAME_MAX_BYTES)]
    TooLong(usize),
    #[error("empty label")]
    EmptyLabel,
    #[error("label '{0}' is longer than {} bytes", limits::HOSTNAME_LABEL_MAX_BYTES)]
    LabelTooLong(AtomicFixedString),
    #[error("invalid character {0:?}")]
    InvalidChar(char),
    #[error("label '{0}' starts or ends with '-'")]
    Hyphen(AtomicFixedString),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    Empty(&'static str),
    #[error("{0} still holds the template placeholder")]
    Placeholder(&'static str),
    #[error("{} is longer than {} bytes ({0})", env::WIFI_SSID, limits::SSID_MAX_BYTES)]
    SsidTooLong(usize),
    #[error(
        "{} must be {}..={} printable ASCII characters or {} hex digits",
        env::WIFI_PASSWORD,
        limits::PASSPHRASE_MIN_CHARS,
        limits::PASSPHRASE_MAX_CHARS,
        limits::PSK_HEX_CHARS
    )]
    Passphrase,
    #[error("{} is longer than {} bytes ({0})", env::CLIENT_ID, limits::CLIENT_ID_MAX_BYTES)]
    ClientIdTooLong(usize),
    #[error("{} contains whitespace", env::CLIENT_ID)]
    ClientIdWhitespace,
    #[error("{field}: {reason}")]
    Topic {
        field: &'static str,
        reason: TopicError,
    },
    #[error("{}: {0}", env::AWS_ENDPOINT)]
    Hostname(HostnameError),
    #[error("{}: {0} is not a TCP port", env::AWS_PORT)]
    InvalidPort(u16),
    #[error("{field}: cannot read pem file: {reason}")]
    PemUnreadable {
        field: &'static str,
        reason: AtomicFixedString,
    },
    #[error("{field}: invalid pem: {reason}")]
    Pem {
        field: &'static str,
        reason: PemError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} configuration error(s):\n{}", .0.len(), format_list(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);
impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

fn format_list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub keep_alive_interval: Duration,
    pub connect_timeout: Duration,
    pub clean_session: bool,
    pub control_qos: mqtt::Qos,
}

/// Connection credentials that passed validation. Only obtainable through
/// [`DeviceConfig::validate`].
#[derive(Debug, Clone)]
pub struct Credentials {
    wifi_ssid: AtomicFixedString,
    wifi_password: Secret,
    client_id: AtomicFixedString,
    status_topic: AtomicFixedString,
    control_topic: AtomicFixedString,
    endpoint: AtomicFixedString,
    port: u16,
    session: SessionOptions,
    tls: TlsMaterial,
}
impl Credentials {
    pub fn wifi_ssid(&self) -> &str {
        &self.wifi_ssid
    }

    pub fn wifi_password(&self) -> &Secret {
        &self.wifi_password
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn status_topic(&self) -> &str {
        &self.status_topic
    }

    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn session(&self) -> &SessionOptions {
        &self.session
    }

    pub fn tls(&self) -> &TlsMaterial {
        &self.tls
    }

    /// JSON view of the credentials with secrets and key material left out.
    pub fn summary(&self) -> serde_json::Value {
        let pem = |block: &PemBlock| {
            serde_json::json!({
                "label": block.label(),
                "der_bytes": block.der().len(),
            })
        };

        serde_json::json!({
            "wifi": {
                "ssid": self.wifi_ssid.as_ref(),
                "password": Secret::REDACTED,
            },
            "client_id": self.client_id.as_ref(),
            "topics": {
                "status": self.status_topic.as_ref(),
                "control": self.control_topic.as_ref(),
            },
            "broker": {
                "endpoint": self.endpoint.as_ref(),
                "port": self.port,
                "keep_alive_interval_ms": self.session.keep_alive_interval.as_millis() as u64,
                "connect_timeout_ms": self.session.connect_timeout.as_millis() as u64,
                "clean_session": self.session.clean_session,
                "control_qos": u8::from(self.session.control_qos),
            },
            "tls": {
                "ca": pem(&self.tls.ca),
                "certificate": pem(&self.tls.certificate),
                "private_key": { "label": self.tls.private_key.label() },
            },
        })
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::tls;

    fn errors(config: &DeviceConfig) -> Vec<ValidationError> {
        config.validate().unwrap_err().0
    }

    #[test]
    fn complete_config_validates() {
        let credentials = fixture::device_config().validate().unwrap();

        assert_eq!(credentials.wifi_ssid(), "greenhouse");
        assert_eq!(credentials.client_id(), "basil-01");
        assert_eq!(credentials.port(), 8883);
        assert_eq!(credentials.tls().private_key.label(), "RSA PRIVATE KEY");
        assert_eq!(
            credentials.session().keep_alive_interval,
            Duration::from_secs(constants::broker::DEFAULT_KEEP_ALIVE_SECS)
        );
        assert!(credentials.session().clean_session);
    }

    #[test]
    fn template_reports_every_unfilled_field() {
        let errors = errors(&DeviceConfig::default());

        assert_eq!(
            errors,
            vec![
                ValidationError::Placeholder(env::WIFI_SSID),
                ValidationError::Placeholder(env::WIFI_PASSWORD),
                ValidationError::Placeholder(env::STATUS_TOPIC),
                ValidationError::Placeholder(env::CONTROL_TOPIC),
                ValidationError::Placeholder(env::AWS_ENDPOINT),
                ValidationError::Pem {
                    field: env::AWS_CERT_CA,
                    reason: PemError::EmptyBody
                },
                ValidationError::Pem {
                    field: env::AWS_CERT_CRT,
                    reason: PemError::EmptyBody
                },
                ValidationError::Pem {
                    field: env::AWS_CERT_PRIVATE,
                    reason: PemError::EmptyBody
                },
            ]
        );
    }

    #[test]
    fn empty_fields_are_rejected() {
        let mut config = fixture::device_config();
        config.wifi.ssid = "".into();
        config.wifi.password = "".into();
        config.client_id = "  ".into();
        config.topics.status = "".into();
        config.topics.control = "".into();
        config.broker.endpoint = "".into();
        config.tls.ca = "".into();
        config.tls.certificate = "".into();
        config.tls.private_key = "".into();

        let errors = errors(&config);

        assert_eq!(errors.len(), 9);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::Empty(_))));
    }

    #[test]
    fn port_zero_is_rejected() {
        let mut config = fixture::device_config();
        config.broker.port = 0;

        assert_eq!(errors(&config), vec![ValidationError::InvalidPort(0)]);
    }

    #[test]
    fn wifi_limits() {
        let mut config = fixture::device_config();
        config.wifi.ssid = "x".repeat(33).into();
        config.wifi.password = "short".into();

        assert_eq!(
            errors(&config),
            vec![
                ValidationError::SsidTooLong(33),
                ValidationError::Passphrase
            ]
        );

        assert!(is_valid_passphrase(&"a".repeat(63)));
        assert!(!is_valid_passphrase(&"g".repeat(64)));
        assert!(is_valid_passphrase(&"0123456789abcdef".repeat(4)));
        assert!(!is_valid_passphrase("tab\tinside"));
    }

    #[test]
    fn client_id_rules() {
        let mut config = fixture::device_config();
        config.client_id = "basil 01".into();
        assert_eq!(errors(&config), vec![ValidationError::ClientIdWhitespace]);

        config.client_id = "b".repeat(129).into();
        assert_eq!(errors(&config), vec![ValidationError::ClientIdTooLong(129)]);

        // the template client id is usable, it only warns
        config.client_id = placeholder::CLIENT_ID.into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn topic_rules() {
        assert!(check_topic_name("plant/basil/status").is_ok());
        assert_eq!(check_topic_name("plant/+/status"), Err(TopicError::Wildcard));
        assert_eq!(check_topic_name("$aws/things/x"), Err(TopicError::Reserved));
        assert_eq!(check_topic_name("a\0b"), Err(TopicError::Nul));
        assert_eq!(
            check_topic_name(&"t".repeat(257)),
            Err(TopicError::TooLong(257))
        );

        assert!(check_topic_filter("plant/+/control").is_ok());
        assert!(check_topic_filter("plant/basil/#").is_ok());
        assert!(check_topic_filter("#").is_ok());
        assert_eq!(
            check_topic_filter("plant/#/control"),
            Err(TopicError::MisplacedWildcard)
        );
        assert_eq!(
            check_topic_filter("plant/basil+"),
            Err(TopicError::MisplacedWildcard)
        );

        let mut config = fixture::device_config();
        config.topics.status = "plant/#".into();
        assert_eq!(
            errors(&config),
            vec![ValidationError::Topic {
                field: env::STATUS_TOPIC,
                reason: TopicError::Wildcard
            }]
        );
    }

    #[test]
    fn hostname_rules() {
        assert!(check_hostname("a1b2-ats.iot.us-east-1.amazonaws.com").is_ok());
        assert!(check_hostname("broker.local.").is_ok());
        assert_eq!(
            check_hostname("ssl://broker"),
            Err(HostnameError::InvalidChar(':'))
        );
        assert_eq!(check_hostname("a..b"), Err(HostnameError::EmptyLabel));
        assert_eq!(
            check_hostname("-a.b"),
            Err(HostnameError::Hyphen("-a".into()))
        );
        assert_eq!(
            check_hostname(&format!("{}.com", "a".repeat(64))),
            Err(HostnameError::LabelTooLong("a".repeat(64).into()))
        );
    }

    #[test]
    fn pem_labels_are_checked() {
        let mut config = fixture::device_config();
        config.tls.ca = tls::fixture::private_key().into();
        config.tls.private_key = tls::fixture::certificate().into();

        let errors = errors(&config);

        assert_eq!(errors.len(), 2);
        assert!(matches!(
            &errors[0],
            ValidationError::Pem {
                field: env::AWS_CERT_CA,
                reason: PemError::UnexpectedLabel { .. }
            }
        ));
        assert!(matches!(
            &errors[1],
            ValidationError::Pem {
                field: env::AWS_CERT_PRIVATE,
                reason: PemError::UnexpectedLabel { .. }
            }
        ));
    }

    #[test]
    fn pem_files_resolve_against_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ca.pem"), tls::fixture::certificate()).unwrap();

        let mut config = fixture::device_config();
        config.base_dir = dir.path().to_path_buf();
        config.tls.ca = "ca.pem".into();
        config.tls.certificate = "missing.pem".into();

        let errors = errors(&config);

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::PemUnreadable {
                field: env::AWS_CERT_CRT,
                ..
            }
        ));
    }

    #[test]
    fn overrides_take_precedence() {
        let vars = HashMap::from([
            (env::WIFI_SSID, "attic".to_string()),
            (env::AWS_PORT, "443".to_string()),
            (env::AWS_CERT_CA, "/etc/certs/root-ca.pem".to_string()),
        ]);

        let mut config = fixture::device_config();
        config
            .apply_overrides(|name| vars.get(name).cloned())
            .unwrap();

        assert_eq!(config.wifi.ssid.as_ref(), "attic");
        assert_eq!(config.broker.port, 443);
        assert_eq!(
            config.tls.ca,
            PemSource::File(PathBuf::from("/etc/certs/root-ca.pem"))
        );
        assert_eq!(config.client_id.as_ref(), "basil-01");
    }

    #[test]
    fn padded_placeholders_are_rejected() {
        let mut config = fixture::device_config();
        config.wifi.ssid = format!("{} ", placeholder::WIFI_SSID).into();
        config.wifi.password = format!(" {}", placeholder::WIFI_PASSWORD).into();

        assert_eq!(
            errors(&config),
            vec![
                ValidationError::Placeholder(env::WIFI_SSID),
                ValidationError::Placeholder(env::WIFI_PASSWORD),
            ]
        );
    }

    #[test]
    fn load_resolves_pem_paths_and_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(config_dir.join("certs")).unwrap();
        std::fs::write(
            config_dir.join("certs/root-ca.pem"),
            tls::fixture::certificate(),
        )
        .unwrap();

        let mut on_disk = fixture::device_config();
        on_disk.tls.ca = "certs/root-ca.pem".into();
        let path = config_dir.join("device.json");
        std::fs::write(&path, serde_json::to_string_pretty(&on_disk).unwrap()).unwrap();

        let vars = HashMap::from([
            (env::CLIENT_ID, "basil-02".to_string()),
            (env::AWS_PORT, "443".to_string()),
        ]);
        let config = DeviceConfig::load_with(&path, |name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.base_dir, config_dir);
        assert_eq!(config.client_id.as_ref(), "basil-02");
        assert_eq!(config.broker.port, 443);

        let credentials = config.validate().unwrap();
        assert_eq!(credentials.client_id(), "basil-02");
        assert_eq!(credentials.tls().ca.label(), "CERTIFICATE");
    }

    #[test]
    fn invalid_port_override_fails_loading() {
        for port in ["0", "65536", "eighty"] {
            let mut config = fixture::device_config();
            let err = config
                .apply_overrides(|name| (name == env::AWS_PORT).then(|| port.to_string()))
                .unwrap_err();
            assert!(matches!(err.current_context(), Error::Override));
        }
    }

    #[test]
    fn file_round_trip_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "wifi": { "ssid": "greenhouse", "password": "correct horse battery" },
                "client_id": "basil-01",
                "topics": { "status": "plant/basil/status", "control": "plant/basil/control" },
                "broker": {
                    "endpoint": "broker.example.com",
                    "keep_alive_interval_ms": 30000
                },
                "tls": {
                    "ca": "ca.pem",
                    "certificate": tls::fixture::certificate(),
                    "private_key": tls::fixture::private_key()
                }
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("ca.pem"), tls::fixture::certificate()).unwrap();

        let mut config = DeviceConfig::load_config(&path).unwrap();
        config.base_dir = dir.path().to_path_buf();

        assert_eq!(config.broker.port, constants::broker::DEFAULT_PORT);
        assert_eq!(
            config.broker.keep_alive_interval,
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.broker.connect_timeout, None);

        let credentials = config.validate().unwrap();
        assert_eq!(credentials.endpoint(), "broker.example.com");
    }

    #[test]
    fn missing_field_fails_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, r#"{ "wifi": { "ssid": "greenhouse" } }"#).unwrap();

        let err = DeviceConfig::load_config(&path).unwrap_err();
        assert!(matches!(err.current_context(), Error::Parse));
    }

    #[test]
    fn secrets_stay_out_of_debug_and_summary() {
        let config = fixture::device_config();
        let credentials = config.validate().unwrap();

        let debug = format!("{config:?} {credentials:?}");
        let summary = credentials.summary().to_string();

        for output in [debug, summary] {
            assert!(!output.contains("correct horse battery"));
            assert!(!output.contains("MII"));
        }
    }

    #[test]
    fn validation_errors_display_as_list() {
        let err = DeviceConfig::default().validate().unwrap_err();
        let text = err.to_string();

        assert!(text.starts_with("8 configuration error(s):"));
        assert!(text.contains("  - WIFI_SSID still holds the template placeholder"));
        assert!(text.contains("  - AWS_CERT_PRIVATE: invalid pem: empty body"));
    }
}
