mod config;
mod constants;
mod helper;
mod mqtt;
mod tls;

mod newtype;
use newtype::*;

mod globals;
use globals::*;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use config::{ConfigFile, DeviceConfig};
use helper::ErrorLogFormat;
use tracing as log;

#[derive(clap::Parser)]
#[command(name = constants::project::NAME, version, about, long_about = None)]
pub struct Args {
    /// log to the terminal instead of the log file (release builds)
    #[arg(long)]
    pub stdout: bool,

    /// device config file [default: <data dir>/config/device.json]
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// validate the device config
    Check,
    /// print the validated config with secrets redacted
    Show,
    /// connect to the broker with the device credentials and subscribe to the control topic
    Probe {
        /// seconds to keep listening on the control topic
        #[arg(long, default_value_t = 0)]
        wait_secs: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    local::init_logging(args.stdout)?;

    let path = args
        .config
        .clone()
        .unwrap_or_else(DeviceConfig::config_filepath);

    let config = DeviceConfig::load(&path).map_err(|e| {
        log::error!("{}", e.fmt_error());
        anyhow::anyhow!("failed to load config: '{}'", path.display())
    })?;

    let credentials = match config.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            errors.iter().for_each(|e| log::error!("{e}"));
            anyhow::bail!(
                "{} configuration error(s) in '{}'",
                errors.0.len(),
                path.display()
            );
        }
    };
    log::info!("config ok: '{}'", path.display());
    log::info!(
        "device '{}' on wifi '{}' (password {}), status -> '{}', control <- '{}'",
        credentials.client_id(),
        credentials.wifi_ssid(),
        credentials.wifi_password(),
        credentials.status_topic(),
        credentials.control_topic()
    );

    match args.command {
        Command::Check => {}
        Command::Show => {
            println!("{}", serde_json::to_string_pretty(&credentials.summary())?);
        }
        Command::Probe { wait_secs } => {
            let tls_dir = mqtt::tls_directory(credentials.client_id());

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            rt.block_on(mqtt::probe(
                &credentials,
                &tls_dir,
                Duration::from_secs(wait_secs),
            ))
            .map_err(|e| {
                log::error!("{}", e.fmt_error());
                anyhow::anyhow!("probe failed")
            })?;
        }
    }

    log::info!("bye!");

    Ok(())
}

mod local {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

    pub fn init_logging(to_stdout: bool) -> anyhow::Result<()> {
        let subscriber = Registry::default()
            .with(EnvFilter::try_from_env("LOGGING").unwrap_or(EnvFilter::new("info")));

        // must be read before any other thread is spawned
        let offset = *crate::timezone_offset();

        #[cfg(debug_assertions)]
        {
            let _ = to_stdout;
            let layer = fmt::Layer::default()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_file(true)
                .with_target(false)
                .with_line_number(true)
                .with_timer(fmt::time::OffsetTime::new(
                    offset,
                    crate::helper::time_log_fmt(),
                ));

            tracing::subscriber::set_global_default(subscriber.with(layer))?;
        }

        #[cfg(not(debug_assertions))]
        {
            use std::io::Write;

            let layer = fmt::Layer::default()
                .with_file(true)
                .with_target(false)
                .with_line_number(true)
                .with_timer(fmt::time::OffsetTime::new(
                    offset,
                    time::macros::format_description!(
                        "[year]-[month padding:zero]-[day padding:zero] [hour]:[minute]:[second]"
                    ),
                ));

            if !to_stdout {
                let data_dir = crate::data_directory();
                std::fs::create_dir_all(data_dir)?;
                let log_path = data_dir.join("app.log");

                let mut file = std::fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(log_path)?;

                file.write_all(b"\n=================================================\n\n")?;
                let layer = layer
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false);

                tracing::subscriber::set_global_default(subscriber.with(layer))?;
            } else {
                let layer = layer.with_writer(std::io::stderr);
                tracing::subscriber::set_global_default(subscriber.with(layer))?;
            }
        }

        Ok(())
    }
}
