//! Utility functions for directory management
//!
//! Follows the XDG Base Directory specification on Linux and the platform
//! conventions elsewhere (via `directories`).
//!
//! # Directory Structure
//!
//! - Config: `~/.config/pfkit/` - `config.json`
//! - Data: `~/.local/share/pfkit/` - anchor profiles
//! - State: `~/.local/state/pfkit/` - audit log
//!
//! On platforms without a state directory the data directory is used.

use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "pfkit", "pfkit")
}

pub fn get_config_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| pd.config_dir().to_path_buf())
}

pub fn get_data_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| pd.data_dir().to_path_buf())
}

pub fn get_state_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| {
        pd.state_dir()
            .map_or_else(|| pd.data_dir().to_path_buf(), std::path::Path::to_path_buf)
    })
}

/// Creates the config, data and state directories with mode 0700.
///
/// # Errors
///
/// Returns `Err` if a directory cannot be created.
pub fn ensure_dirs() -> std::io::Result<()> {
    use std::fs::DirBuilder;
    use std::os::unix::fs::DirBuilderExt;

    let mut builder = DirBuilder::new();
    builder.mode(0o700); // User read/write/execute only
    builder.recursive(true);

    for dir in [get_config_dir(), get_data_dir(), get_state_dir()]
        .into_iter()
        .flatten()
    {
        builder.create(dir)?;
    }

    Ok(())
}
