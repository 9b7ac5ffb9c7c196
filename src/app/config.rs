//! Configuration loading: config file defaults merged under CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use grabfile_core::HttpClientConfig;

use crate::cli::Args;

/// Config-file defaults for grabfile. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    /// Default directory downloads are saved into.
    pub(crate) output_dir: Option<PathBuf>,
    /// Connect timeout in seconds.
    pub(crate) connect_timeout_secs: Option<u64>,
    /// Per-read timeout in seconds.
    pub(crate) read_timeout_secs: Option<u64>,
    /// Redirect hops to follow (0 disables following).
    pub(crate) max_redirects: Option<u64>,
}

impl FileConfig {
    /// Validates config values against the same ranges the CLI accepts.
    pub(crate) fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(max_redirects) = self.max_redirects
            && max_redirects > 50
        {
            bail!("Invalid config value for `max_redirects`: {max_redirects}. Expected range: 0..=50");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Settings a run actually uses, after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedSettings {
    pub(crate) output_dir: PathBuf,
    pub(crate) http: HttpClientConfig,
}

/// Merges CLI flags over file config over built-in defaults.
pub(crate) fn resolve_settings(args: &Args, file: Option<&FileConfig>) -> ResolvedSettings {
    let file = file.cloned().unwrap_or_default();
    let defaults = HttpClientConfig::default();

    let output_dir = args
        .output_dir
        .clone()
        .or(file.output_dir)
        .unwrap_or_else(resolve_default_output_dir);

    let max_redirects = args
        .max_redirects
        .map(u64::from)
        .or(file.max_redirects)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(defaults.max_redirects);

    ResolvedSettings {
        output_dir,
        http: HttpClientConfig {
            connect_timeout_secs: args
                .connect_timeout
                .or(file.connect_timeout_secs)
                .unwrap_or(defaults.connect_timeout_secs),
            read_timeout_secs: args
                .read_timeout
                .or(file.read_timeout_secs)
                .unwrap_or(defaults.read_timeout_secs),
            max_redirects,
        },
    }
}

/// Resolves the default downloads directory.
///
/// Priority:
/// 1. `$XDG_DOWNLOAD_DIR`
/// 2. `$HOME/Downloads`
/// 3. current directory
pub(crate) fn resolve_default_output_dir() -> PathBuf {
    if let Some(dir) = env_var_non_empty_os("XDG_DOWNLOAD_DIR") {
        return PathBuf::from(dir);
    }
    env_var_non_empty_os("HOME").map_or_else(
        || PathBuf::from("."),
        |home| PathBuf::from(home).join("Downloads"),
    )
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/grabfile/config.toml`
/// 2. `$HOME/.config/grabfile/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("grabfile")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("grabfile")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if a file exists there.
pub(crate) fn load_default_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `read_timeout_secs` value on line {line_no}")
                })?);
            }
            "max_redirects" => {
                cfg.max_redirects = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `max_redirects` value on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
