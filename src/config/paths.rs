//! Where `settings.toml` lives.
//!
//! `MATCH_COMMENTATOR_CONFIG` names a settings file explicitly.  Otherwise
//! the platform config dir from `dirs` is used:
//!
//!   Windows: %APPDATA%\match-commentator\settings.toml
//!   macOS:   ~/Library/Application Support/match-commentator/settings.toml
//!   Linux:   ~/.config/match-commentator/settings.toml

use std::path::PathBuf;

/// Environment variable that overrides the settings file location.
pub const CONFIG_ENV: &str = "MATCH_COMMENTATOR_CONFIG";

const APP_DIR: &str = "match-commentator";
const SETTINGS_FILE: &str = "settings.toml";

/// Resolved location of the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Directory that holds (or will hold) the settings file.
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Honour [`CONFIG_ENV`], falling back to the platform config dir.
    pub fn resolve() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::with_override(explicit, dirs::config_dir())
    }

    fn with_override(explicit: Option<PathBuf>, platform_dir: Option<PathBuf>) -> Self {
        match explicit {
            Some(settings_file) => {
                let config_dir = settings_file
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                Self {
                    config_dir,
                    settings_file,
                }
            }
            None => {
                let config_dir = platform_dir
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR);
                Self {
                    settings_file: config_dir.join(SETTINGS_FILE),
                    config_dir,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_dir_gets_app_folder() {
        let paths = AppPaths::with_override(None, Some(PathBuf::from("/home/fan/.config")));
        assert_eq!(paths.config_dir, PathBuf::from("/home/fan/.config/match-commentator"));
        assert_eq!(
            paths.settings_file,
            PathBuf::from("/home/fan/.config/match-commentator/settings.toml")
        );
    }

    #[test]
    fn explicit_file_wins() {
        let paths = AppPaths::with_override(
            Some(PathBuf::from("/srv/kiosk/commentator.toml")),
            Some(PathBuf::from("/home/fan/.config")),
        );
        assert_eq!(paths.settings_file, PathBuf::from("/srv/kiosk/commentator.toml"));
        assert_eq!(paths.config_dir, PathBuf::from("/srv/kiosk"));
    }

    #[test]
    fn missing_platform_dir_falls_back_to_cwd() {
        let paths = AppPaths::with_override(None, None);
        assert!(paths.settings_file.starts_with("."));
        assert!(paths.settings_file.ends_with("match-commentator/settings.toml"));
    }
}
