//! Layered runtime settings
//!
//! Precedence, lowest to highest: built-in defaults, TOML file, environment
//! variables, then whatever the caller (usually the CLI) overrides afterwards.
//!
//! ```toml
//! backend = "gemini"
//! render_mode = "structured"
//! stream = false
//! system_prompt_file = "system_prompt.txt"
//! request_timeout_secs = 120
//! max_upload_mb = 32
//! allowed_origins = ["http://localhost:3000"]
//!
//! [gemini]
//! model = "gemini-2.5-flash"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::gemini::{DEFAULT_GEMINI_API_VERSION, DEFAULT_GEMINI_HOST, DEFAULT_GEMINI_MODEL};
use crate::error::{Error, Result};
use crate::prompts::{SystemPromptSource, DEFAULT_SYSTEM_PROMPT};
use crate::render::RenderMode;

/// Default request deadline in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default upload limit in MiB
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 32;

/// Which AI backend to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Gemini,
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Gemini => "gemini",
            BackendKind::Mock => "mock",
        }
    }
}

/// Gemini endpoint settings (the API key always comes from the environment)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub host: String,
    pub api_version: String,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_GEMINI_HOST.to_string(),
            api_version: DEFAULT_GEMINI_API_VERSION.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// Resolved application settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub backend: BackendKind,
    pub render_mode: RenderMode,
    /// Forward partial output as it arrives (plain mode only)
    pub stream: bool,
    /// Instruction file, read fresh on every request
    pub system_prompt_file: Option<PathBuf>,
    /// Inline instruction text (ignored when a file is configured)
    pub system_prompt: Option<String>,
    pub request_timeout_secs: u64,
    pub max_upload_mb: u64,
    /// Extra CORS origins (same-origin only when empty)
    pub allowed_origins: Vec<String>,
    pub gemini: GeminiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            render_mode: RenderMode::default(),
            stream: false,
            system_prompt_file: None,
            system_prompt: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            allowed_origins: Vec::new(),
            gemini: GeminiSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and the environment
    ///
    /// An explicit `path` must exist. Without one, the platform config file
    /// (`<config_dir>/clausewise/config.toml`) is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Overlay environment variables, looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(backend) = get("AI_BACKEND") {
            match backend.to_lowercase().as_str() {
                "gemini" => self.backend = BackendKind::Gemini,
                "mock" => self.backend = BackendKind::Mock,
                _ => {
                    warn!(backend = %backend, "Unknown AI_BACKEND, falling back to gemini");
                    self.backend = BackendKind::Gemini;
                }
            }
        }
        if let Some(mode) = get("CLAUSEWISE_RENDER_MODE") {
            self.render_mode = mode.parse()?;
        }
        if let Some(stream) = get("CLAUSEWISE_STREAM") {
            self.stream = parse_bool("CLAUSEWISE_STREAM", &stream)?;
        }
        if let Some(path) = get("CLAUSEWISE_SYSTEM_PROMPT_FILE") {
            self.system_prompt_file = Some(PathBuf::from(path));
        }
        if let Some(secs) = get("CLAUSEWISE_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("CLAUSEWISE_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(mb) = get("CLAUSEWISE_MAX_UPLOAD_MB") {
            self.max_upload_mb = parse_number("CLAUSEWISE_MAX_UPLOAD_MB", &mb)?;
        }
        if let Some(origins) = get("CLAUSEWISE_ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(host) = get("GEMINI_HOST") {
            self.gemini.host = host;
        }
        if let Some(version) = get("GEMINI_API_VERSION") {
            self.gemini.api_version = version;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        Ok(())
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive");
        }
        if self.max_upload_mb == 0 {
            errors.push("max_upload_mb must be positive");
        }
        if self.gemini.model.trim().is_empty() {
            errors.push("gemini.model must not be empty");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }

    /// Where the system prompt comes from
    pub fn prompt_source(&self) -> SystemPromptSource {
        match (&self.system_prompt_file, &self.system_prompt) {
            (Some(path), _) => SystemPromptSource::File(path.clone()),
            (None, Some(text)) => SystemPromptSource::Inline(text.clone()),
            (None, None) => SystemPromptSource::Inline(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Whether answers are forwarded as they arrive
    ///
    /// Structured rendering needs the whole answer, so it never streams.
    pub fn streams(&self) -> bool {
        self.stream && self.render_mode == RenderMode::Plain
    }

    /// Upload limit in bytes
    pub fn max_upload_size(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `<config_dir>/clausewise/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clausewise").join("config.toml"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, value))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backend, BackendKind::Gemini);
        assert_eq!(settings.render_mode, RenderMode::Plain);
        assert_eq!(settings.max_upload_size(), 32 * 1024 * 1024);
        assert_eq!(settings.request_timeout(), Duration::from_secs(120));
        assert_eq!(settings.gemini.model, "gemini-2.5-flash");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_file() {
        let settings = Settings::from_toml(
            r#"
            render_mode = "structured"
            max_upload_mb = 8

            [gemini]
            model = "gemini-2.5-pro"
            "#,
        )
        .unwrap();
        assert_eq!(settings.render_mode, RenderMode::Structured);
        assert_eq!(settings.max_upload_mb, 8);
        assert_eq!(settings.gemini.model, "gemini-2.5-pro");
        assert_eq!(settings.gemini.api_version, "v1");
        assert_eq!(settings.request_timeout_secs, 120);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        assert!(matches!(
            Settings::from_toml("render_mod = \"plain\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut settings = Settings::from_toml("render_mode = \"plain\"\nstream = false").unwrap();
        settings
            .apply_env(env(&[
                ("AI_BACKEND", "MOCK"),
                ("CLAUSEWISE_RENDER_MODE", "structured"),
                ("CLAUSEWISE_STREAM", "yes"),
                ("CLAUSEWISE_ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
                ("GEMINI_MODEL", "gemini-test"),
            ]))
            .unwrap();

        assert_eq!(settings.backend, BackendKind::Mock);
        assert_eq!(settings.render_mode, RenderMode::Structured);
        assert!(settings.stream);
        assert!(!settings.streams());
        assert_eq!(settings.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(settings.gemini.model, "gemini-test");
    }

    #[test]
    fn test_env_invalid_values() {
        let mut settings = Settings::default();
        assert!(settings.apply_env(env(&[("CLAUSEWISE_STREAM", "maybe")])).is_err());
        assert!(settings
            .apply_env(env(&[("CLAUSEWISE_MAX_UPLOAD_MB", "-3")]))
            .is_err());
        assert!(settings
            .apply_env(env(&[("CLAUSEWISE_RENDER_MODE", "fancy")]))
            .is_err());
    }

    #[test]
    fn test_unknown_backend_falls_back_to_gemini() {
        let mut settings = Settings {
            backend: BackendKind::Mock,
            ..Settings::default()
        };
        settings.apply_env(env(&[("AI_BACKEND", "openai")])).unwrap();
        assert_eq!(settings.backend, BackendKind::Gemini);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let settings = Settings {
            request_timeout_secs: 0,
            max_upload_mb: 0,
            ..Settings::default()
        };
        match settings.validate() {
            Err(Error::Config(msg)) => {
                assert!(msg.contains("request_timeout_secs"));
                assert!(msg.contains("max_upload_mb"));
            }
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_prompt_source_precedence() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.prompt_source(),
            SystemPromptSource::Inline(DEFAULT_SYSTEM_PROMPT.to_string())
        );

        settings.system_prompt = Some("inline".into());
        assert_eq!(settings.prompt_source(), SystemPromptSource::Inline("inline".into()));

        settings.system_prompt_file = Some(PathBuf::from("/etc/prompt.txt"));
        assert_eq!(
            settings.prompt_source(),
            SystemPromptSource::File(PathBuf::from("/etc/prompt.txt"))
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stream = true\nrequest_timeout_secs = 30").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert!(settings.streams());
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));

        let missing = Settings::from_file(Path::new("/nonexistent/clausewise.toml"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
