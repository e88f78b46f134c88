//! Host platform (linux for example) utility functions

use std::path::PathBuf;

use uname;

/// Name of the environment variable giving the root of the software
/// installation.
pub const SW_ROOT_ENV_VAR: &str = "URSA_SW_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the root directory of the software installation.
///
/// The root is read from the `URSA_SW_ROOT` environment variable, and is the
/// directory containing `params/` and `sessions/`.
pub fn get_ursa_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
