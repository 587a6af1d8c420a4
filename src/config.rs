use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_RC_FILE: &str = ".sh360rc";
pub const DEFAULT_CONFIG_FILE: &str = "sh360.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} must start with a prompt line")]
    MissingPrompt { path: PathBuf },
    #[error("Prompt too long, must be less than {max} characters")]
    PromptTooLong { max: usize },
    #[error("search directory {dir} must be shorter than {max} characters")]
    DirectoryTooLong { dir: String, max: usize },
    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// How the orchestrator waits on the stages of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicy {
    /// Wait for every stage before forking the next one. A producer that
    /// fills the pipe buffer before its consumer exists will block forever.
    #[default]
    Sequential,
    /// Fork every stage first, then reap them in order.
    Concurrent,
}

/// Every bound the shell enforces on its input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_line: usize,
    pub max_tokens: usize,
    pub max_args: usize,
    pub max_stages: usize,
    pub max_prompt: usize,
    pub max_dirs: usize,
    pub max_dir_len: usize,
    pub history_capacity: usize,
    pub wait_policy: WaitPolicy,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line: 80,
            max_tokens: 25,
            max_args: 7,
            max_stages: 3,
            max_prompt: 10,
            max_dirs: 10,
            max_dir_len: 20,
            history_capacity: 10,
            wait_policy: WaitPolicy::Sequential,
        }
    }
}

impl Limits {
    /// Loads limits from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(?path, "no config file, using default limits");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_owned(),
            source,
        })
    }
}

/// The parsed startup file: a prompt followed by search directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcFile {
    pub prompt: String,
    pub dirs: Vec<PathBuf>,
}

impl RcFile {
    pub fn load(path: &Path, limits: &Limits) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(&contents, limits).map_err(|err| match err {
            ConfigError::MissingPrompt { .. } => ConfigError::MissingPrompt {
                path: path.to_owned(),
            },
            err => err,
        })
    }

    pub fn parse(contents: &str, limits: &Limits) -> Result<Self, ConfigError> {
        // `lines` strips both "\n" and "\r\n"
        let mut lines = contents.lines();

        // the prompt is the first word; anything after it on the line is dropped
        let prompt = match lines.next().and_then(|line| line.split_whitespace().next()) {
            Some(prompt) => prompt.to_owned(),
            None => {
                return Err(ConfigError::MissingPrompt {
                    path: PathBuf::from(DEFAULT_RC_FILE),
                })
            }
        };

        if prompt.len() > limits.max_prompt {
            return Err(ConfigError::PromptTooLong {
                max: limits.max_prompt,
            });
        }

        let mut dirs = Vec::new();

        for line in lines.map(str::trim_end).filter(|line| !line.is_empty()) {
            if dirs.len() == limits.max_dirs {
                warn!(
                    max = limits.max_dirs,
                    ignored = line,
                    "too many search directories"
                );
                continue;
            }

            if line.len() >= limits.max_dir_len {
                return Err(ConfigError::DirectoryTooLong {
                    dir: line.to_owned(),
                    max: limits.max_dir_len,
                });
            }

            dirs.push(PathBuf::from(line));
        }

        trace!(?prompt, ?dirs, "parsed rc file");

        Ok(Self { prompt, dirs })
    }
}

pub fn rc_path() -> PathBuf {
    std::env::var_os("SH360_RC")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RC_FILE))
}

pub fn config_path() -> PathBuf {
    std::env::var_os("SH360_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
