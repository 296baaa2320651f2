use std::time::Duration;

use crate::{config::Credentials, constants, tls::TlsPaths, AtomicFixedString};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCreateOptions {
    pub server_uri: AtomicFixedString,
    pub client_id: AtomicFixedString,
}
impl ClientCreateOptions {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            server_uri: format!("ssl://{}:{}", credentials.endpoint(), credentials.port()).into(),
            client_id: credentials.client_id().into(),
        }
    }
}
impl From<&ClientCreateOptions> for paho_mqtt::CreateOptions {
    fn from(value: &ClientCreateOptions) -> Self {
        let ClientCreateOptions {
            server_uri,
            client_id,
        } = value;

        paho_mqtt::CreateOptionsBuilder::new()
            .server_uri(server_uri.to_string())
            .client_id(client_id.to_string())
            .persistence(paho_mqtt::PersistenceType::None)
            .finalize()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConnectOptions {
    pub clean_session: bool,
    pub connect_timeout: Duration,
    pub keep_alive_interval: Duration,
    pub tls: TlsPaths,
    pub alpn_protocols: Vec<&'static str>,
}
impl ClientConnectOptions {
    pub fn new(credentials: &Credentials, tls: TlsPaths) -> Self {
        let session = credentials.session();

        let alpn_protocols = if credentials.port() == constants::broker::ALPN_PORT {
            vec![constants::broker::ALPN_PROTOCOL]
        } else {
            Vec::new()
        };

        Self {
            clean_session: session.clean_session,
            connect_timeout: session.connect_timeout,
            keep_alive_interval: session.keep_alive_interval,
            tls,
            alpn_protocols,
        }
    }
}
impl TryFrom<&ClientConnectOptions> for paho_mqtt::ConnectOptions {
    type Error = paho_mqtt::Error;

    fn try_from(value: &ClientConnectOptions) -> Result<Self, Self::Error> {
        let ClientConnectOptions {
            clean_session,
            connect_timeout,
            keep_alive_interval,
            tls,
            alpn_protocols,
        } = value;

        let mut ssl = paho_mqtt::SslOptionsBuilder::new();
        ssl.trust_store(&tls.ca)?
            .key_store(&tls.certificate)?
            .private_key(&tls.private_key)?
            .enable_server_cert_auth(true);

        if !alpn_protocols.is_empty() {
            ssl.alpn_protos(alpn_protocols);
        }

        let mut builder = paho_mqtt::ConnectOptionsBuilder::new();
        builder
            .clean_session(*clean_session)
            .connect_timeout(*connect_timeout)
            .keep_alive_interval(*keep_alive_interval)
            .ssl_options(ssl.finalize());

        Ok(builder.finalize())
    }
}
