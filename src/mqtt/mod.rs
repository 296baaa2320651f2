mod options;
pub use options::*;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use error_stack::ResultExt;
use futures::StreamExt;

use crate::{config::Credentials, log};

const STREAM_BUFFER_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(i32)]
pub enum Qos {
    _0 = paho_mqtt::QOS_0,
    #[default]
    _1 = paho_mqtt::QOS_1,
    _2 = paho_mqtt::QOS_2,
}
impl TryFrom<u8> for Qos {
    type Error = InvalidQos;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Qos::_0),
            1 => Ok(Qos::_1),
            2 => Ok(Qos::_2),
            n => Err(InvalidQos(n)),
        }
    }
}
impl From<Qos> for u8 {
    fn from(value: Qos) -> Self {
        value as i32 as u8
    }
}

#[derive(Debug, thiserror::Error)]
#[error("qos must be 0, 1 or 2, got {0}")]
pub struct InvalidQos(u8);

/// Directory the TLS material of `client_id` is installed into.
pub fn tls_directory(client_id: &str) -> PathBuf {
    let mut name = client_id
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect::<String>();
    // "." and ".." would escape the certs directory
    if name.starts_with('.') {
        name.replace_range(..1, "_");
    }

    let mut dir = crate::data_directory().to_path_buf();
    dir.push("certs");
    dir.push(name);
    dir
}

/// Connect to the broker with the device's credentials, subscribe to its
/// control topic and, for `wait`, log whatever arrives there.
pub async fn probe(credentials: &Credentials, tls_dir: &Path, wait: Duration) -> Result<()> {
    let tls = credentials
        .tls()
        .install(tls_dir)
        .change_context(Error::Setup)?;

    let create_opts = ClientCreateOptions::new(credentials);
    let connect_opts = ClientConnectOptions::new(credentials, tls);

    let mut client = paho_mqtt::AsyncClient::new(paho_mqtt::CreateOptions::from(&create_opts))
        .map_err(|e| error_stack::report!(Error::Setup).attach_printable(format!("reason: '{e}'")))?;

    client.set_connected_callback(|_| log::trace!("[mqtt] client connected (callback)"));
    client.set_connection_lost_callback(|_| log::warn!("[mqtt] connection lost (callback)"));

    let mut strm = client.get_stream(STREAM_BUFFER_SIZE);

    let conn_opts = paho_mqtt::ConnectOptions::try_from(&connect_opts)
        .map_err(|e| error_stack::report!(Error::Setup).attach_printable(format!("reason: '{e}'")))?;

    log::info!(
        "[mqtt] connecting to {} as '{}'",
        create_opts.server_uri,
        create_opts.client_id
    );
    client.connect(conn_opts).await.map_err(|e| {
        error_stack::report!(Error::Connect)
            .attach_printable(format!("server: '{}'", create_opts.server_uri))
            .attach_printable(format!("reason: '{e}'"))
    })?;
    log::info!("[mqtt] connected");

    let qos = credentials.session().control_qos;
    client
        .subscribe(credentials.control_topic(), qos as i32)
        .await
        .map_err(|e| {
            error_stack::report!(Error::Subscribe)
                .attach_printable(format!("topic: '{}'", credentials.control_topic()))
                .attach_printable(format!("reason: '{e}'"))
        })?;
    log::info!(
        "[mqtt] subscribed to '{}' (qos {})",
        credentials.control_topic(),
        u8::from(qos)
    );

    if !wait.is_zero() {
        log::info!("[mqtt] listening for {}s", wait.as_secs_f32());

        let deadline = tokio::time::sleep(wait);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("[mqtt] interrupted");
                    break;
                }
                msg = strm.next() => match msg {
                    Some(Some(msg)) => log::info!(
                        "[mqtt] received msg -> {}: {}",
                        msg.topic(),
                        msg.payload_str()
                    ),
                    Some(None) => {
                        log::warn!("[mqtt] client disconnected");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    client.disconnect(None).await.map_err(|e| {
        error_stack::report!(Error::Connect).attach_printable(format!("reason: '{e}'"))
    })?;
    log::info!("[mqtt] disconnected");

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error setting up mqtt client")]
    Setup,
    #[error("error connecting to mqtt broker")]
    Connect,
    #[error("error subscribing to control topic")]
    Subscribe,
}

pub type Result<T> = error_stack::Result<T, Error>;
