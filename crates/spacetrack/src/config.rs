//! Options controlling how a [`crate::SessionClient`] talks to space-track.org.

use std::{collections::BTreeMap, env, fs, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Context};
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_URL: &str = "https://www.space-track.org/";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const FILENAME: &str = "config-v0.json";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
    /// Where session cookies are kept between calls.
    ///
    /// A unique file in the temp directory is picked on first login when this is unset.
    pub cookie_file: Option<PathBuf>,
    /// Seconds allowed for each individual HTTP call, `0` for no limit.
    pub timeout: u64,
    /// Emit verbose transport diagnostics.
    pub debug: bool,
    /// Options that have no meaning to the client but were set anyway.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).expect("Literal is valid URL"),
            username: String::new(),
            password: String::new(),
            cookie_file: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            debug: false,
            extra: BTreeMap::new(),
        }
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("Expected a boolean but got {other:?}"),
    }
}

impl ClientConfig {
    /// Create a config by applying each option, in order, with [`Self::set_option`].
    pub fn with_options<I, K, V>(options: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (name, value) in options {
            config.set_option(name.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    /// Set an option by name.
    ///
    /// Known options are validated; any other name is stored as-is and can be read back with
    /// [`Self::get_option`].
    pub fn set_option(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        match name {
            "url" => {
                self.url = Url::parse(value).with_context(|| format!("Invalid url {value:?}"))?;
            }
            "username" => self.username = value.to_string(),
            "password" => self.password = value.to_string(),
            "cookieFile" | "cookie_file" => {
                self.cookie_file = match value {
                    "" => None,
                    v => Some(PathBuf::from(v)),
                }
            }
            "timeout" => {
                self.timeout = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid timeout {value:?}, expected seconds"))?;
            }
            "debug" => self.debug = parse_bool(value).context("Invalid debug flag")?,
            _ => {
                debug!("Storing unrecognized option {name:?}");
                self.extra.insert(name.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    pub fn get_option(&self, name: &str) -> Option<String> {
        match name {
            "url" => Some(self.url.to_string()),
            "username" => Some(self.username.clone()),
            "password" => Some(self.password.clone()),
            "cookieFile" | "cookie_file" => self
                .cookie_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            "timeout" => Some(self.timeout.to_string()),
            "debug" => Some(self.debug.to_string()),
            _ => self.extra.get(name).cloned(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let Some(username) = env::var_os("SPACETRACK_USER") else {
            return Ok(None);
        };
        let mut config = Self::default();
        config.set_option("username", username.to_string_lossy().as_ref())?;
        for (name, var) in [
            ("password", "SPACETRACK_PASS"),
            ("url", "SPACETRACK_URL"),
            ("cookieFile", "SPACETRACK_COOKIE_FILE"),
            ("timeout", "SPACETRACK_TIMEOUT"),
            ("debug", "SPACETRACK_DEBUG"),
        ] {
            if let Ok(value) = env::var(var) {
                config
                    .set_option(name, &value)
                    .with_context(|| format!("Could not use {var}"))?;
            }
        }
        debug!("Built config using username {} from env", config.username);
        Ok(Some(config))
    }

    fn dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not infer a config directory")?
            .join("spacetrack"))
    }

    pub fn from_fs() -> anyhow::Result<Option<Self>> {
        let file = Self::dir()?.join(FILENAME);
        match fs::read_to_string(&file) {
            Ok(t) => serde_json::from_str(&t)
                .map(Some)
                .context("Failed to deserialize config")
                .with_context(|| format!("Consider removing {file:?}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!(e)),
        }
    }

    pub fn to_fs(&self) -> anyhow::Result<PathBuf> {
        let config = serde_json::to_string_pretty(&self).context("Failed to serialize config")?;
        let dir = Self::dir()?;
        fs::create_dir_all(&dir).context("Failed to create the config directory")?;
        let destination = dir.join(FILENAME);
        fs::write(&destination, config)
            .with_context(|| format!("Failed to write {destination:?}"))?;
        Ok(destination)
    }
}
