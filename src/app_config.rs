//! Config file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use adscout_core::ScanConfig;
use anyhow::{Context, Result, bail};

/// File-backed defaults; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Worker pool size.
    pub concurrency: Option<u8>,
    /// Extra whole-pipeline attempts per target.
    pub retry_attempts: Option<u8>,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Minimum non-blank lines before columns are extracted.
    pub min_lines: Option<u64>,
    /// Directory for cached disclosure files.
    pub cache_dir: Option<PathBuf>,
    /// Disclosure fetch connect timeout in seconds.
    pub disclosure_connect_timeout_secs: Option<u64>,
    /// Disclosure fetch read timeout in seconds.
    pub disclosure_read_timeout_secs: Option<u64>,
    /// Store fetch connect timeout in seconds.
    pub store_connect_timeout_secs: Option<u64>,
    /// Store fetch read timeout in seconds.
    pub store_read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }
        if let Some(retry_attempts) = self.retry_attempts
            && retry_attempts > 10
        {
            bail!("Invalid config value for `retry_attempts`: {retry_attempts}. Expected range: 0..=10");
        }
        if let Some(retry_delay_ms) = self.retry_delay_ms
            && retry_delay_ms > 60_000
        {
            bail!("Invalid config value for `retry_delay_ms`: {retry_delay_ms}. Expected range: 0..=60000");
        }
        validate_timeout_secs(
            "disclosure_connect_timeout_secs",
            self.disclosure_connect_timeout_secs,
        )?;
        validate_timeout_secs(
            "disclosure_read_timeout_secs",
            self.disclosure_read_timeout_secs,
        )?;
        validate_timeout_secs("store_connect_timeout_secs", self.store_connect_timeout_secs)?;
        validate_timeout_secs("store_read_timeout_secs", self.store_read_timeout_secs)?;
        Ok(())
    }

    /// Overlays the values present in the file onto `config`.
    pub fn apply(&self, config: &mut ScanConfig) -> Result<()> {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = usize::from(concurrency);
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.retry_attempts = u32::from(retry_attempts);
        }
        if let Some(retry_delay_ms) = self.retry_delay_ms {
            config.retry_delay = Duration::from_millis(retry_delay_ms);
        }
        if let Some(min_lines) = self.min_lines {
            config.min_lines = usize::try_from(min_lines)
                .map_err(|_| anyhow::anyhow!("min_lines out of range for usize"))?;
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = Some(cache_dir.clone());
        }
        if let Some(secs) = self.disclosure_connect_timeout_secs {
            config.disclosure_connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.disclosure_read_timeout_secs {
            config.disclosure_read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.store_connect_timeout_secs {
            config.store_connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.store_read_timeout_secs {
            config.store_read_timeout = Duration::from_secs(secs);
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

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/adscout/config.toml`
/// 2. `$HOME/.config/adscout/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("adscout")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("adscout")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    read_file_config(&path).map(Some)
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "concurrency" => {
                cfg.concurrency = Some(parse_integer_u8(value).with_context(invalid)?);
            }
            "retry_attempts" => {
                cfg.retry_attempts = Some(parse_integer_u8(value).with_context(invalid)?);
            }
            "retry_delay_ms" => {
                cfg.retry_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "min_lines" => {
                cfg.min_lines = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "cache_dir" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.cache_dir = Some(PathBuf::from(parsed));
            }
            "disclosure_connect_timeout_secs" => {
                cfg.disclosure_connect_timeout_secs =
                    Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "disclosure_read_timeout_secs" => {
                cfg.disclosure_read_timeout_secs =
                    Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "store_connect_timeout_secs" => {
                cfg.store_connect_timeout_secs =
                    Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "store_read_timeout_secs" => {
                cfg.store_read_timeout_secs =
                    Some(parse_integer_u64(value).with_context(invalid)?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
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

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str("concurrency = 12\n# comment\ncache_dir = \"/tmp/x\" # trailing\n")
            .unwrap();
        assert_eq!(cfg.concurrency, Some(12));
        assert_eq!(cfg.cache_dir, Some(PathBuf::from("/tmp/x")));
        assert!(cfg.retry_attempts.is_none());
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("colour = 1").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("concurrency 3").unwrap_err();
        assert!(err.to_string().contains("expected key = value"));
    }

    #[test]
    fn test_parse_config_rejects_out_of_range() {
        assert!(parse_config_str("concurrency = 0").is_err());
        assert!(parse_config_str("retry_attempts = 11").is_err());
        assert!(parse_config_str("store_read_timeout_secs = 0").is_err());
        assert!(parse_config_str("min_lines = -1").is_err());
    }

    #[test]
    fn test_apply_overlays_present_values_only() {
        let cfg = parse_config_str(
            "retry_attempts = 3\nretry_delay_ms = 250\nstore_read_timeout_secs = 9\nmin_lines = 2",
        )
        .unwrap();
        let mut config = ScanConfig::default();
        cfg.apply(&mut config).unwrap();
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.store_read_timeout, Duration::from_secs(9));
        assert_eq!(config.min_lines, 2);
        assert_eq!(config.concurrency, ScanConfig::default().concurrency);
        assert!(config.cache_dir.is_none());

        let cfg = parse_config_str("cache_dir = \"/var/cache/adscout\"").unwrap();
        cfg.apply(&mut config).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/adscout")));
    }

    #[test]
    fn test_load_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_file_config(Some(&missing)).is_err());

        let present = dir.path().join("config.toml");
        fs::write(&present, "concurrency = 2\n").unwrap();
        let cfg = load_file_config(Some(&present)).unwrap().unwrap();
        assert_eq!(cfg.concurrency, Some(2));
    }
}
