#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ValveError;
use crate::sheet::writer::ExportFormat;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub import: ImportConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the job blob. Tilde and `$VAR` are expanded.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.config/valvetrack/valve_jobs.json".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub out_dir: String,
    pub format: ExportFormat,
    pub include_stats: bool,
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: ".".to_owned(),
            format: ExportFormat::Xlsx,
            include_stats: true,
            file_prefix: "valve_repair_report".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Prefix for synthetic valve IDs given to rows without one.
    pub valve_id_prefix: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            valve_id_prefix: "VLV".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    let unix = home_config_path_unix();
    if !cfg!(windows) {
        return Ok(ConfigPaths { config_file: unix });
    }

    // Windows: an existing Unix-style file wins.
    if unix.exists() {
        return Ok(ConfigPaths { config_file: unix });
    }

    let proj = ProjectDirs::from("com", "valvetrack", "valvetrack")
        .context("failed to determine platform config directory")?;
    Ok(ConfigPaths {
        config_file: proj.config_dir().join("config.toml"),
    })
}

fn home_config_path_unix() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("valvetrack").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    let drive = std::env::var_os("HOMEDRIVE");
    let path = std::env::var_os("HOMEPATH");
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(d).join(PathBuf::from(p))),
        _ => None,
    }
}

#[must_use]
pub fn expand_tilde(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest).to_string_lossy().to_string();
    }
    input.to_owned()
}

/// Shortens a path under the home directory to `~/...` for display.
#[must_use]
pub fn tilde_path(input: &str) -> String {
    let Some(home) = home_dir() else {
        return input.to_owned();
    };
    let home_str = home.to_string_lossy();
    if let Some(rest) = input.strip_prefix(home_str.as_ref()) {
        if rest.is_empty() {
            return "~".to_owned();
        }
        if rest.starts_with(std::path::MAIN_SEPARATOR) {
            return format!("~{rest}");
        }
    }
    input.to_owned()
}

pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_env_vars(&expand_tilde(input));
    let p = PathBuf::from(expanded);
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(p))
}

fn expand_env_vars(input: &str) -> String {
    // $VAR and ${VAR}; unknown vars stay as written.
    let Ok(re) = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") else {
        return input.to_owned();
    };
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| caps[0].to_owned())
    })
    .to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ValveError> {
        if self.store.path.trim().is_empty() {
            return Err(ValveError::Config("store.path must not be empty".to_owned()));
        }
        if self.export.out_dir.trim().is_empty() {
            return Err(ValveError::Config(
                "export.out_dir must not be empty".to_owned(),
            ));
        }
        let prefix = self.export.file_prefix.trim();
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ValveError::Config(
                "export.file_prefix must be a non-empty file name".to_owned(),
            ));
        }
        if self.import.valve_id_prefix.trim().is_empty() {
            return Err(ValveError::Config(
                "import.valve_id_prefix must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        expand_path(&self.store.path)
            .with_context(|| format!("failed to resolve store.path '{}'", self.store.path))
    }

    pub fn export_dir(&self) -> anyhow::Result<PathBuf> {
        expand_path(&self.export.out_dir)
            .with_context(|| format!("failed to resolve export.out_dir '{}'", self.export.out_dir))
    }
}

pub fn load() -> anyhow::Result<(Config, ConfigPaths)> {
    let paths = default_paths()?;
    let (_doc, cfg) = load_from_file(&paths.config_file)?;
    cfg.validate()?;
    Ok((cfg, paths))
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let (cfg, _paths) = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<Option<String>> {
    let paths = default_paths()?;
    get_value_string_at_path(&paths.config_file, key)
}

pub fn set_value_string(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = default_paths()?;
    set_value_string_at_path(&paths.config_file, key, value)
}

fn load_from_file(path: &Path) -> anyhow::Result<(toml_edit::DocumentMut, Config)> {
    if !path.exists() {
        return Ok((toml_edit::DocumentMut::new(), Config::default()));
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let doc = raw
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse TOML in {}", path.display()))?;

    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok((doc, cfg))
}

pub fn load_at_path(path: &Path) -> anyhow::Result<Config> {
    let (_doc, cfg) = load_from_file(path)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn get_value_string_at_path(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    let cfg = load_at_path(path)?;
    let norm = normalize_key(key);
    let value = lookup_value(&cfg, &norm);
    Ok(value.map(format_value_for_stdout))
}

pub fn set_value_string_at_path(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let (mut doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let (norm_key, value_item) = normalize_key_and_parse_value(key, value)?;
    apply_set(&mut doc, &norm_key, value_item)?;

    // The edited document must still deserialize and validate.
    let new_raw = doc.to_string();
    let new_cfg: Config = toml::from_str(&new_raw)
        .with_context(|| format!("config update produced invalid TOML for {}", path.display()))?;
    new_cfg.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, new_raw.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    Bool,
    String,
    Enum(&'static [&'static str]),
}

fn normalize_key(key: &str) -> String {
    match key {
        "store.file" | "storage.path" => "store.path",
        "export.dir" | "export.out" => "export.out_dir",
        "export.prefix" => "export.file_prefix",
        "export.stats" => "export.include_stats",
        "import.prefix" => "import.valve_id_prefix",
        "log_level" | "logging.level" => "log.level",
        _ => key,
    }
    .to_owned()
}

fn normalize_key_and_parse_value(
    key: &str,
    value: &str,
) -> anyhow::Result<(String, toml_edit::Item)> {
    let norm = normalize_key(key);
    let key_type = key_type(&norm).ok_or_else(|| ValveError::InvalidConfigKey(key.to_owned()))?;
    let item = match key_type {
        KeyType::Bool => toml_edit::value(parse_bool(value).map_err(|msg| {
            ValveError::InvalidConfigValue {
                key: key.to_owned(),
                msg,
            }
        })?),
        KeyType::String => {
            if value.trim().is_empty() {
                return Err(ValveError::InvalidConfigValue {
                    key: key.to_owned(),
                    msg: "must not be empty".to_owned(),
                }
                .into());
            }
            toml_edit::value(value)
        }
        KeyType::Enum(allowed) => {
            let v = value.trim().to_lowercase();
            if !allowed.contains(&v.as_str()) {
                return Err(ValveError::InvalidConfigValue {
                    key: key.to_owned(),
                    msg: format!("must be one of: {}", allowed.join(", ")),
                }
                .into());
            }
            toml_edit::value(v)
        }
    };

    Ok((norm, item))
}

fn key_type(key: &str) -> Option<KeyType> {
    Some(match key {
        "store.path" | "export.out_dir" | "export.file_prefix" | "import.valve_id_prefix" => {
            KeyType::String
        }

        "export.include_stats" | "ui.color" => KeyType::Bool,

        "export.format" => KeyType::Enum(&["xlsx", "csv"]),
        "log.level" => KeyType::Enum(&["error", "warn", "info", "debug", "trace"]),

        _ => return None,
    })
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true|false, got '{other}'")),
    }
}

fn apply_set(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: toml_edit::Item,
) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        return Err(ValveError::InvalidConfigKey(key.to_owned()).into());
    };

    let mut cur = doc.as_table_mut();
    for &seg in sections {
        if !cur.contains_key(seg) {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            cur.insert(seg, toml_edit::Item::Table(t));
        }
        cur = cur[seg].as_table_mut().ok_or_else(|| {
            ValveError::Config(format!("cannot set {key}: '{seg}' is not a table"))
        })?;
    }

    cur.insert(*leaf, value);
    Ok(())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn config_validation_catches_invalid_values() {
        let mut cfg = Config::default();
        cfg.export.file_prefix = "a/b".to_owned();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.store.path = "  ".to_owned();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_at_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.export.format, ExportFormat::Xlsx);
        assert_eq!(cfg.log.level, LogLevel::Warn);
    }

    #[test]
    fn config_set_and_get_dot_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        set_value_string_at_path(&path, "ui.color", "false").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "ui.color")
                .unwrap()
                .as_deref(),
            Some("false")
        );

        set_value_string_at_path(&path, "export.format", "CSV").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "export.format")
                .unwrap()
                .as_deref(),
            Some("csv")
        );

        set_value_string_at_path(&path, "export.prefix", "shop").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "export.file_prefix")
                .unwrap()
                .as_deref(),
            Some("shop")
        );

        set_value_string_at_path(&path, "log.level", "debug").unwrap();

        let cfg = load_at_path(&path).unwrap();
        assert!(!cfg.ui.color);
        assert_eq!(cfg.export.format, ExportFormat::Csv);
        assert_eq!(cfg.export.file_prefix, "shop");
        assert_eq!(cfg.log.level, LogLevel::Debug);
        assert!(cfg.export.include_stats);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let err = set_value_string_at_path(&path, "export.colour", "x").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValveError>(),
            Some(ValveError::InvalidConfigKey(_))
        ));
        assert!(set_value_string_at_path(&path, "ui.color", "yes").is_err());
        assert!(set_value_string_at_path(&path, "export.format", "pdf").is_err());
        assert!(set_value_string_at_path(&path, "export.file_prefix", "a/b").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn set_preserves_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# shop settings\n[export]\nout_dir = \"/srv/reports\"\n").unwrap();

        set_value_string_at_path(&path, "export.include_stats", "false").unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("# shop settings"));
        let cfg = load_at_path(&path).unwrap();
        assert_eq!(cfg.export.out_dir, "/srv/reports");
        assert!(!cfg.export.include_stats);
    }

    #[test]
    fn expands_env_vars_in_paths() {
        let p = expand_path("/data/$VALVETRACK_SURELY_UNSET/jobs.json").unwrap();
        assert_eq!(p, PathBuf::from("/data/$VALVETRACK_SURELY_UNSET/jobs.json"));
    }
}
