//! Platform adapters

pub mod hipchat;
pub mod shell;

use std::sync::Arc;

use crate::application::errors::ConfigError;
use crate::domain::traits::Adapter;

pub use hipchat::HipchatAdapter;
pub use shell::ShellAdapter;

/// Names accepted by [`build`]
pub const ADAPTERS: &[&str] = &["hipchat", "shell"];

/// Construct the adapter registered under `name`
pub fn build(name: &str) -> Result<Arc<dyn Adapter>, ConfigError> {
    match name {
        "hipchat" => Ok(Arc::new(HipchatAdapter::from_env()?)),
        "shell" => Ok(Arc::new(ShellAdapter::new())),
        other => Err(ConfigError::InvalidValue(format!(
            "unknown adapter {:?}, expected one of {}",
            other,
            ADAPTERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_shell_adapter() {
        assert_eq!(build("shell").unwrap().name(), "shell");
    }

    #[test]
    fn unknown_adapter_is_rejected() {
        assert!(matches!(build("irc"), Err(ConfigError::InvalidValue(_))));
    }
}
