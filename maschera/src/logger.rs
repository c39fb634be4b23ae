//! Logger setup for the maschera binary.
//!
//! License: MIT OR Apache-2.0

use env_logger::{Builder, Env};
use log::LevelFilter;
use maschera_core::AppEnv;

/// The default level for each deployment environment.
pub fn level_for(app_env: AppEnv) -> LevelFilter {
    match app_env {
        AppEnv::Development => LevelFilter::Debug,
        AppEnv::Production => LevelFilter::Info,
        AppEnv::Test => LevelFilter::Off,
    }
}

/// Installs the global logger. `RUST_LOG` refines the environment's default
/// level. Calling this more than once keeps the first logger.
pub fn init_logger(app_env: AppEnv) {
    let env = Env::default().default_filter_or(level_for(app_env).as_str());
    let mut builder = Builder::from_env(env);
    builder.format_timestamp_millis();

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized; keeping the existing one.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_follow_app_env() {
        assert_eq!(level_for(AppEnv::Development), LevelFilter::Debug);
        assert_eq!(level_for(AppEnv::Production), LevelFilter::Info);
        assert_eq!(level_for(AppEnv::Test), LevelFilter::Off);
    }

    #[test]
    fn test_init_logger_is_idempotent() {
        init_logger(AppEnv::Test);
        init_logger(AppEnv::Development);
    }
}
