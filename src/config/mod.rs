mod device;
pub use device::*;

use std::{
    fs::OpenOptions,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use error_stack::ResultExt;

use crate::log;

pub trait ConfigFile {
    const FILENAME: &'static str;
    type Config: serde::Serialize + serde::de::DeserializeOwned + Default + std::fmt::Debug;

    fn config_filepath() -> PathBuf {
        local::filepath(Self::FILENAME)
    }

    /// Read the config at `filepath`, writing out the default config first if
    /// there is none yet.
    fn load_config(filepath: &Path) -> Result<Self::Config> {
        if !filepath.exists() {
            if let Some(dir) = filepath.parent() {
                std::fs::create_dir_all(dir)
                    .change_context(Error::Write)
                    .attach_printable_lazy(|| format!("creating directory '{}'", dir.display()))?;
            }

            let out = Self::Config::default();
            let contents = serde_json::to_string_pretty(&out).change_context(Error::Write)?;

            OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(filepath)
                .and_then(|mut file| file.write_all(format!("{contents}\n").as_bytes()))
                .change_context(Error::Write)
                .attach_printable_lazy(|| format!("path: '{}'", filepath.display()))?;

            log::info!("new config file: \"{}\"", filepath.display());

            Ok(out)
        } else {
            let file = OpenOptions::new()
                .read(true)
                .open(filepath)
                .change_context(Error::Read)
                .attach_printable_lazy(|| format!("path: '{}'", filepath.display()))?;
            let reader = BufReader::new(file);

            let out = serde_json::from_reader(reader)
                .change_context(Error::Parse)
                .attach_printable_lazy(|| format!("path: '{}'", filepath.display()))?;

            log::info!("existing config file: \"{}\"", filepath.display());
            log::debug!("{out:#?}");

            Ok(out)
        }
    }
}

mod local {
    use std::path::PathBuf;

    pub fn filepath(name: &str) -> PathBuf {
        let mut dir = crate::data_directory().to_path_buf();
        dir.push("config");
        dir.push(format!("{}.json", name));
        dir
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error reading config file")]
    Read,
    #[error("error writing config template")]
    Write,
    #[error("invalid config file")]
    Parse,
    #[error("invalid environment override")]
    Override,
}

pub type Result<T> = error_stack::Result<T, Error>;
