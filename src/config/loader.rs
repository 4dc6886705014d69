use crate::config::schema::{CompileFailure, Metadata, PatchConfig, ValidationError};
use crate::rewrite::Change;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    Compile {
        path: Option<PathBuf>,
        source: CompileFailure,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            ConfigError::Compile { path: None, source } => ConfigError::Compile {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read rule file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule file TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule file TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule file ({}): {}", path.display(), source),
                None => write!(f, "invalid rule file: {}", source),
            },
            ConfigError::Compile { path, source } => match path {
                Some(path) => {
                    write!(f, "rule file {} does not compile: {}", path.display(), source)
                }
                None => write!(f, "rule file does not compile: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Compile { source, .. } => Some(source),
        }
    }
}

/// A loaded, validated and compiled rule file.
#[derive(Debug, Clone)]
pub struct RuleFile {
    pub path: Option<PathBuf>,
    pub meta: Metadata,
    pub changes: Vec<Change>,
}

pub fn load_from_str(input: &str) -> Result<PatchConfig, ConfigError> {
    let config: PatchConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Compile every pattern in `config`. Malformed regexes surface here,
/// before any target file is read.
pub fn compile(config: &PatchConfig) -> Result<RuleFile, ConfigError> {
    let changes = config
        .changes
        .iter()
        .map(|change| change.compile())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::Compile { path: None, source })?;

    Ok(RuleFile {
        path: None,
        meta: config.meta.clone(),
        changes,
    })
}

pub fn rule_file_from_str(input: &str) -> Result<RuleFile, ConfigError> {
    compile(&load_from_str(input)?)
}

pub fn load_rule_file(path: impl AsRef<Path>) -> Result<RuleFile, ConfigError> {
    let path = path.as_ref();
    let config = load_from_path(path)?;
    let mut rule_file = compile(&config).map_err(|error| error.with_path(path))?;
    rule_file.path = Some(path.to_path_buf());
    Ok(rule_file)
}
