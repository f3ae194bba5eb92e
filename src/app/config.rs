//! Command-line arguments for the terminal client.

use arrrg_derive::CommandLine;

use crate::config::Config;
use crate::error::Result;

/// Command-line arguments for the easydiet tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (default: http://localhost:8000)", "URL")]
    pub api_base: Option<String>,

    /// Authentication service URL.
    #[arrrg(optional, "Authentication service URL", "URL")]
    pub auth_url: Option<String>,

    /// Authentication service public key.
    #[arrrg(optional, "Authentication service anon key", "KEY")]
    pub auth_key: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Ignore the remembered conversation.
    #[arrrg(flag, "Start without reopening the last conversation")]
    pub fresh: bool,
}

impl ChatArgs {
    /// Applies the YAML file and flags on top of `base`.
    pub fn resolve(&self, base: Config) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => base.with_file(path)?,
            None => base,
        };
        if let Some(api_base) = &self.api_base {
            config = config.with_api_base(api_base.as_str());
        }
        if let Some(url) = &self.auth_url {
            config.auth_url = Some(url.clone());
        }
        if let Some(key) = &self.auth_key {
            config.auth_anon_key = Some(key.clone());
        }
        Ok(config)
    }

    /// Whether output may use ANSI styling.
    pub fn use_color(&self) -> bool {
        !self.no_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_alone() {
        let args = ChatArgs::default();
        let config = args.resolve(Config::new()).unwrap();
        assert_eq!(config, Config::new());
        assert!(args.use_color());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("easydiet.yaml");
        std::fs::write(
            &path,
            "api_base: http://file.example.com\nauth_url: http://auth.file\nauth_anon_key: file-key\n",
        )
        .unwrap();
        let args = ChatArgs {
            api_base: Some("http://flag.example.com/".to_string()),
            auth_url: None,
            auth_key: Some("flag-key".to_string()),
            config: Some(path.to_string_lossy().to_string()),
            no_color: true,
            fresh: false,
        };
        let config = args.resolve(Config::new()).unwrap();
        assert_eq!(config.api_base, "http://flag.example.com");
        assert_eq!(config.auth(), Some(("http://auth.file", "flag-key")));
        assert!(!args.use_color());
    }

    #[test]
    fn missing_file_is_an_error() {
        let args = ChatArgs {
            config: Some("/definitely/not/here.yaml".to_string()),
            ..ChatArgs::default()
        };
        assert!(args.resolve(Config::new()).is_err());
    }
}
