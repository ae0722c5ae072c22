use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Формат вывода в консоль.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Настройки логирования.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень по умолчанию: `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
    /// Дополнительные директивы `EnvFilter`, например `regionbus::executor=debug`.
    pub directives: Vec<String>,
    pub log_dir: PathBuf,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_names: bool,
    pub with_line_numbers: bool,
}

/// Файловый вывод с ежедневной ротацией.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// Префикс имени файла; к нему дописывается дата.
    pub filename: String,
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

impl LoggingConfig {
    /// `REGIONBUS_LOG_LEVEL` и `REGIONBUS_LOG_FORMAT` перекрывают файл
    /// конфигурации.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("REGIONBUS_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = std::env::var("REGIONBUS_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "compact" => self.console.format = LogFormat::Compact,
                "pretty" => self.console.format = LogFormat::Pretty,
                "json" => self.console.format = LogFormat::Json,
                _ => {}
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid_parameter(
                "logging.level",
                &self.level,
                format!("expected one of {}", LEVELS.join(", ")),
            ));
        }
        if self.file.enabled && self.file.filename.trim().is_empty() {
            return Err(ConfigError::invalid_parameter(
                "logging.file.filename",
                &self.file.filename,
                "must not be empty when file logging is enabled",
            ));
        }
        Ok(())
    }

    pub fn ensure_log_dir(&self) -> std::io::Result<()> {
        if self.file.enabled {
            fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Директива для `EnvFilter`: уровень по умолчанию и дополнительные
    /// директивы через запятую.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.to_lowercase())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            log_dir: PathBuf::from("logs"),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_names: true,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: "regionbus.log".to_string(),
        }
    }
}
