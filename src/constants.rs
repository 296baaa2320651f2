pub mod project {
    pub const NAME: &str = "plant-monitor";
    pub const DATA_DIR_ENV: &str = "PLANT_MONITOR_DATA_DIR";
}

/// Environment variables overriding the fields of the device config file.
pub mod env {
    pub const WIFI_SSID: &str = "WIFI_SSID";
    pub const WIFI_PASSWORD: &str = "WIFI_PASSWORD";
    pub const AWS_PORT: &str = "AWS_PORT";
    pub const CLIENT_ID: &str = "CLIENT_ID";
    pub const STATUS_TOPIC: &str = "STATUS_TOPIC";
    pub const CONTROL_TOPIC: &str = "CONTROL_TOPIC";
    pub const AWS_ENDPOINT: &str = "AWS_ENDPOINT";
    pub const AWS_CERT_CA: &str = "AWS_CERT_CA";
    pub const AWS_CERT_CRT: &str = "AWS_CERT_CRT";
    pub const AWS_CERT_PRIVATE: &str = "AWS_CERT_PRIVATE";
}

/// Values shipped in the config template. A config still holding one of these
/// has not been filled in.
pub mod placeholder {
    pub const WIFI_SSID: &str = "YOUR_WIFI_SSID";
    pub const WIFI_PASSWORD: &str = "YOUR_WIFI_PASSWORD";
    pub const CLIENT_ID: &str = "ESP8266_Plant_Monitor";
    pub const STATUS_TOPIC: &str = "plant/plant_name/status";
    pub const CONTROL_TOPIC: &str = "plant/plant_name/control";
    pub const AWS_ENDPOINT: &str = "xxxxxxx-ats.iot.us-east-1.amazonaws.com";
    pub const ENDPOINT_MARKER: &str = "xxxxxxx";
}

pub mod broker {
    pub const DEFAULT_PORT: u16 = 8883;
    /// AWS IoT accepts MQTT over mutual TLS on 443 only with this ALPN protocol.
    pub const ALPN_PORT: u16 = 443;
    pub const ALPN_PROTOCOL: &str = "x-amzn-mqtt-ca";
    pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
}

pub mod limits {
    pub const SSID_MAX_BYTES: usize = 32;
    pub const PASSPHRASE_MIN_CHARS: usize = 8;
    pub const PASSPHRASE_MAX_CHARS: usize = 63;
    pub const PSK_HEX_CHARS: usize = 64;
    pub const CLIENT_ID_MAX_BYTES: usize = 128;
    pub const TOPIC_MAX_BYTES: usize = 256;
    pub const HOSTNAME_MAX_BYTES: usize = 253;
    pub const HOSTNAME_LABEL_MAX_BYTES: usize = 63;
}

pub mod tls {
    pub const CA_FILENAME: &str = "root-ca.pem";
    pub const CERT_FILENAME: &str = "device.pem.crt";
    pub const KEY_FILENAME: &str = "device.pem.key";
    pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
    pub const PRIVATE_KEY_LABELS: [&str; 3] = ["RSA PRIVATE KEY", "PRIVATE KEY", "EC PRIVATE KEY"];
}
