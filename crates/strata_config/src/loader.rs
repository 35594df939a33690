//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "strata.toml";

/// Loads and validates a `strata.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strata.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and unit naming is unambiguous.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }

    let compile = &config.compile;
    for (field, ext) in [
        ("compile.source_ext", &compile.source_ext),
        ("compile.artifact_ext", &compile.artifact_ext),
    ] {
        if ext.is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
        if ext.contains('.') || ext.contains('/') || ext.contains('\\') {
            return Err(ConfigError::ValidationError(format!(
                "{field} must be a bare extension, got '{ext}'"
            )));
        }
    }
    if compile.source_ext.eq_ignore_ascii_case(&compile.artifact_ext) {
        return Err(ConfigError::ValidationError(
            "compile.source_ext and compile.artifact_ext must differ".to_string(),
        ));
    }

    if let Some(compiler) = &config.compiler {
        if compiler.command.trim().is_empty() {
            return Err(ConfigError::MissingField("compiler.command".to_string()));
        }
    }

    if config.sources.roots.iter().any(|r| r.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "sources.roots must not contain empty paths".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str("[project]\nname = \"shop\"\nversion = \"1.2.0\"\n").unwrap();
        assert_eq!(config.project.name, "shop");
        assert_eq!(config.project.version, "1.2.0");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"

[sources]
primary = "src"
generated = "src_generated"
staging = "src/app"
roots = ["src", "shared"]

[cache]
dir = "build/bytecode"

[compile]
source_ext = "php"
artifact_ext = "phb"
metadata_prefix = "JPHP-INF/"
entry_points = ["app\\Main"]

[compiler]
command = "jphp-compile"
args = ["--optimize"]

[[archives]]
path = "lib/gui.jar"

[[bundles]]
name = "ui"
vendor = "vendor/ui"
envs = ["prod", "test"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.sources.staging.as_deref(), Some("src/app"));
        assert_eq!(config.sources.roots.len(), 2);
        assert_eq!(config.cache.dir.as_deref(), Some("build/bytecode"));
        assert_eq!(config.compile.entry_points, vec!["app\\Main"]);
        let compiler = config.compiler.unwrap();
        assert_eq!(compiler.command, "jphp-compile");
        assert_eq!(compiler.args, vec!["--optimize"]);
        assert_eq!(config.archives.len(), 1);
        assert_eq!(config.bundles[0].envs.len(), 2);
    }

    #[test]
    fn missing_name_errors() {
        let err = load_config_from_str("[project]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn same_extensions_rejected() {
        let toml = "[project]\nname = \"x\"\n[compile]\nsource_ext = \"php\"\nartifact_ext = \"PHP\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn dotted_extension_rejected() {
        let toml = "[project]\nname = \"x\"\n[compile]\nartifact_ext = \".phb\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_compiler_command_errors() {
        let toml = "[project]\nname = \"x\"\n[compiler]\ncommand = \"  \"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn empty_root_rejected() {
        let toml = "[project]\nname = \"x\"\n[sources]\nroots = [\"src\", \"\"]\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"disk\"\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "disk");
    }
}
