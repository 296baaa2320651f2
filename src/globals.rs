use std::sync::LazyLock;

use crate::constants;

pub fn data_directory() -> &'static std::path::Path {
    static DATA_DIRECTORY: LazyLock<std::path::PathBuf> = LazyLock::new(|| {
        match std::env::var_os(constants::project::DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => std::path::PathBuf::from(dir),
            _ => {
                let mut cwd = std::env::current_dir().unwrap_or_default();
                cwd.push("data");
                cwd
            }
        }
    });
    DATA_DIRECTORY.as_path()
}

pub fn timezone_offset() -> &'static time::UtcOffset {
    static TIMEZONE_OFFSET: LazyLock<time::UtcOffset> =
        LazyLock::new(|| time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC));
    &TIMEZONE_OFFSET
}
