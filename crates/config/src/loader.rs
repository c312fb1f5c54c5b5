use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ShareConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "sharebridge.toml",
    "sharebridge.yaml",
    "sharebridge.yml",
    "sharebridge.json",
];

const ENV_HOST_APP_ID: &str = "SHAREBRIDGE_HOST_APP_ID";
const ENV_HOST_URL_SCHEME: &str = "SHAREBRIDGE_HOST_URL_SCHEME";
const ENV_CONTAINERS_DIR: &str = "SHAREBRIDGE_CONTAINERS_DIR";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "sharebridge")
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ShareConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./sharebridge.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/sharebridge/sharebridge.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ShareConfig::default()` if no config file is found or the file
/// fails to parse.
pub fn discover_and_load() -> ShareConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ShareConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dirs = project_dirs()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dirs.config_dir().join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/sharebridge/`).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Returns the user-global data directory, the default parent of group
/// containers.
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.data_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sharebridge.toml")
}

/// Apply `SHAREBRIDGE_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: ShareConfig) -> ShareConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides from a custom lookup. Empty values are ignored.
pub fn apply_env_overrides_with(
    mut config: ShareConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ShareConfig {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(app_id) = non_empty(ENV_HOST_APP_ID) {
        debug!(var = ENV_HOST_APP_ID, "overriding host app id from env");
        config.host.app_id = Some(app_id);
    }
    if let Some(scheme) = non_empty(ENV_HOST_URL_SCHEME) {
        debug!(var = ENV_HOST_URL_SCHEME, "overriding host url scheme from env");
        config.host.url_scheme = Some(scheme);
    }
    if let Some(dir) = non_empty(ENV_CONTAINERS_DIR) {
        config.storage.containers_dir = Some(PathBuf::from(dir));
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> Result<ShareConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_owned(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharebridge.toml");
        std::fs::write(
            &path,
            "[host]\napp_id = \"com.example.notes\"\nurl_scheme = \"notes://\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.host.app_id.as_deref(), Some("com.example.notes"));
        assert_eq!(cfg.host.url_scheme.as_deref(), Some("notes://"));
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("sharebridge.yaml");
        std::fs::write(&yaml, "host:\n  app_id: com.example.yaml\n").unwrap();
        let json = dir.path().join("sharebridge.json");
        std::fs::write(&json, r#"{"handoff":{"wake":false}}"#).unwrap();

        assert_eq!(
            load_config(&yaml).unwrap().host.app_id.as_deref(),
            Some("com.example.yaml")
        );
        assert!(!load_config(&json).unwrap().handoff.wake);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sharebridge.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_replace_host_values() {
        let lookup = |name: &str| match name {
            "SHAREBRIDGE_HOST_APP_ID" => Some("com.example.env".to_string()),
            "SHAREBRIDGE_HOST_URL_SCHEME" => Some("   ".to_string()),
            "SHAREBRIDGE_CONTAINERS_DIR" => Some("/tmp/containers".to_string()),
            _ => None,
        };
        let mut base = ShareConfig::default();
        base.host.url_scheme = Some("notes://".into());

        let cfg = apply_env_overrides_with(base, lookup);
        assert_eq!(cfg.host.app_id.as_deref(), Some("com.example.env"));
        assert_eq!(cfg.host.url_scheme.as_deref(), Some("notes://"));
        assert_eq!(
            cfg.storage.containers_dir.as_deref(),
            Some(Path::new("/tmp/containers"))
        );
    }
}
