//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::collections::HashSet;
use std::path::Path;

/// Name of the configuration file at a project root.
pub const CONFIG_FILE: &str = "knit.toml";

/// Loads and validates a `knit.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `knit.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates required fields and the module ordering contract.
///
/// The link layer never reorders modules, so the entry module has to be the
/// last one listed.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name"));
    }
    if config.project.main.is_empty() {
        return Err(ConfigError::MissingField("project.main"));
    }
    let Some(last) = config.modules.last() else {
        return Err(ConfigError::ModuleList(
            "at least one [[modules]] entry is required".to_string(),
        ));
    };

    let mut seen = HashSet::new();
    for module in &config.modules {
        if module.name.is_empty() {
            return Err(ConfigError::MissingField("modules.name"));
        }
        if !seen.insert(module.name.as_str()) {
            return Err(ConfigError::ModuleList(format!(
                "module '{}' is declared more than once",
                module.name
            )));
        }
        if module.sources.is_empty() {
            return Err(ConfigError::ModuleList(format!(
                "module '{}' has no sources",
                module.name
            )));
        }
    }

    if config.main_module().is_none() {
        return Err(ConfigError::UnknownModule(config.project.main.clone()));
    }
    if last.name != config.project.main {
        return Err(ConfigError::ModuleList(format!(
            "main module '{}' must be the last [[modules]] entry (found '{}')",
            config.project.main, last.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildMode, ModuleKind, UnresolvedPolicy};
    use std::path::PathBuf;

    const MINIMAL: &str = r#"
[project]
name = "demo"
main = "app"

[[modules]]
name = "lib"
sources = ["lib/core.json"]

[[modules]]
name = "app"
sources = ["app/main.json"]
"#;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.version, "0.1.0");
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.main_module().unwrap().name, "app");
    }

    #[test]
    fn default_values() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.build.mode, BuildMode::Multi);
        assert_eq!(config.build.module_kind, ModuleKind::CommonJs);
        assert!(config.build.relative_require_path);
        assert!(!config.build.source_maps);
        assert_eq!(config.build.output_dir, PathBuf::from("build"));
        assert_eq!(config.build.cache_dir, PathBuf::from(".knit-cache"));
        assert_eq!(config.link.unresolved_imports, UnresolvedPolicy::Warn);
        assert_eq!(config.modules[0].external_name(), "lib");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "demo"
version = "1.2.3"
main = "app"

[build]
mode = "single"
module_kind = "es"
relative_require_path = false
source_maps = true
output_dir = "dist"
cache_dir = "target/knit"

[link]
unresolved_imports = "deny"

[[modules]]
name = "lib"
external_name = "@demo/lib"
sources = ["lib/a.json", "lib/b.json"]

[[modules]]
name = "app"
sources = ["app/main.json"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.version, "1.2.3");
        assert_eq!(config.build.mode, BuildMode::Single);
        assert_eq!(config.build.module_kind, ModuleKind::Es);
        assert!(!config.build.relative_require_path);
        assert!(config.build.source_maps);
        assert_eq!(config.build.output_dir, PathBuf::from("dist"));
        assert_eq!(config.link.unresolved_imports, UnresolvedPolicy::Deny);
        assert_eq!(config.module("lib").unwrap().external_name(), "@demo/lib");
        assert_eq!(config.module("lib").unwrap().sources.len(), 2);
    }

    #[test]
    fn main_not_last_errors() {
        let toml = r#"
[project]
name = "demo"
main = "lib"

[[modules]]
name = "lib"
sources = ["lib.json"]

[[modules]]
name = "app"
sources = ["app.json"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ModuleList(ref m) if m.contains("last")));
    }

    #[test]
    fn unknown_main_errors() {
        let toml = r#"
[project]
name = "demo"
main = "missing"

[[modules]]
name = "app"
sources = ["app.json"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModule(ref m) if m == "missing"));
    }

    #[test]
    fn no_modules_errors() {
        let toml = r#"
[project]
name = "demo"
main = "app"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ModuleList(_)));
    }

    #[test]
    fn duplicate_module_errors() {
        let toml = r#"
[project]
name = "demo"
main = "app"

[[modules]]
name = "app"
sources = ["a.json"]

[[modules]]
name = "app"
sources = ["b.json"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ModuleList(ref m) if m.contains("more than once")));
    }

    #[test]
    fn module_without_sources_errors() {
        let toml = r#"
[project]
name = "demo"
main = "app"

[[modules]]
name = "app"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ModuleList(ref m) if m.contains("no sources")));
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
main = "app"

[[modules]]
name = "app"
sources = ["a.json"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_mode_errors() {
        let toml = MINIMAL.replace("[project]", "[build]\nmode = \"fast\"\n\n[project]");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), MINIMAL).unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.main, "app");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
