//! The authenticated session and the requests made through it.
//!
//! A [`SessionClient`] logs in lazily on the first request and keeps the session cookie in a file
//! that it owns. Any failure discards the cookie file so that the next call starts a fresh
//! session, and so does dropping the client.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, info, warn};
use reqwest::Method;
use url::Url;
use uuid::Uuid;

use crate::{
    config::ClientConfig,
    error::{ApiError, ErrorKind},
    query::{self, Query, DEFAULT_NORAD_ID},
    transport::{is_success, HttpTransport, Request, Transport, UnreadBody},
};

const LOGIN_PATH: &str = "/ajaxauth/login";

fn generated_cookie_file() -> PathBuf {
    env::temp_dir().join(format!("spacetrack-cookiefile-{}", Uuid::now_v7().simple()))
}

/// A client for one space-track.org account.
///
/// Methods that can change the session take `&mut self`, so one client serves one caller at a
/// time. Two clients must not share a cookie file.
pub struct SessionClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    authenticated: bool,
    transport: T,
}

impl SessionClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, HttpTransport)
    }
}

impl<T: Transport> SessionClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            authenticated: false,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        self.config.set_option(name, value)
    }

    pub fn get_option(&self, name: &str) -> Option<String> {
        self.config.get_option(name)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn cookie_file(&self) -> Option<&Path> {
        self.config.cookie_file.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Log in unless already logged in.
    pub fn authenticate(&mut self) -> Result<(), ApiError> {
        if self.authenticated {
            return Ok(());
        }

        let ClientConfig {
            username, password, ..
        } = &self.config;
        if username.is_empty() || password.is_empty() {
            self.clean_up();
            return Err(ApiError::missing_credentials());
        }
        debug!("Logging in as {username}");
        let form = vec![
            ("identity".to_string(), username.clone()),
            ("password".to_string(), password.clone()),
        ];

        match self.call(ErrorKind::Auth, Method::POST, LOGIN_PATH, Some(form)) {
            Ok(_) => {
                info!("Logged in as {}", self.config.username);
                self.authenticated = true;
                Ok(())
            }
            Err(e) => {
                self.clean_up();
                Err(e)
            }
        }
    }

    /// Fetch `path`, relative to the configured URL, logging in first if needed.
    ///
    /// The body is returned as is. A failed request ends the session.
    pub fn send_request(&mut self, path: &str) -> Result<String, ApiError> {
        if !self.authenticated {
            self.authenticate()?;
        }

        match self.call(ErrorKind::Request, Method::GET, path, None) {
            Ok(body) => Ok(body),
            Err(e) => {
                debug!("Request for {path} failed, discarding session");
                self.authenticated = false;
                self.clean_up();
                Err(e)
            }
        }
    }

    pub fn query(&mut self, query: &Query) -> Result<String, ApiError> {
        self.send_request(&query.path())
    }

    /// Fetch the newest TLE for `norad_id`, or for the ISS if `None`.
    pub fn get_latest_tle(&mut self, norad_id: Option<u32>) -> Result<String, ApiError> {
        self.query(&query::latest_tle(norad_id.unwrap_or(DEFAULT_NORAD_ID)))
    }

    /// Remove the cookie file, if there is one that can be removed.
    ///
    /// Never fails; removal is best effort.
    pub fn clean_up(&self) {
        let Some(path) = self.config.cookie_file.as_deref() else {
            return;
        };
        let writable = fs::metadata(path)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false);
        if !writable {
            return;
        }
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed cookie file {path:?}"),
            Err(e) => warn!("Could not remove cookie file {path:?}: {e}"),
        }
    }

    /// Clean up and release the client.
    pub fn close(self) {
        drop(self)
    }

    fn cookie_file_or_generate(&mut self) -> PathBuf {
        self.config
            .cookie_file
            .get_or_insert_with(|| {
                let path = generated_cookie_file();
                debug!("Using generated cookie file {path:?}");
                path
            })
            .clone()
    }

    fn url_for(&self, path: &str) -> anyhow::Result<Url> {
        let base = self.config.url.as_str().trim_end_matches('/');
        let path = path.strip_prefix('/').unwrap_or(path);
        Url::parse(&format!("{base}/{path}")).with_context(|| format!("Invalid path {path:?}"))
    }

    /// Make one HTTP call and return the body if the status was 2xx.
    fn call(
        &mut self,
        kind: ErrorKind,
        method: Method,
        path: &str,
        form: Option<Vec<(String, String)>>,
    ) -> Result<String, ApiError> {
        let url = self
            .url_for(path)
            .map_err(|e| ApiError::no_response(kind, &e))?;
        let request = Request {
            method,
            url,
            form,
            cookie_file: self.cookie_file_or_generate(),
            timeout: self.config.timeout(),
            verbose: self.config.debug,
        };
        let response = self
            .transport
            .send(&request)
            .map_err(|e| match e.downcast_ref::<UnreadBody>() {
                Some(unread) => ApiError::unread_body(kind, unread.status.as_u16(), &e),
                None => ApiError::no_response(kind, &e),
            })?;

        let code = response.status.as_u16();
        if is_success(code) {
            return Ok(response.body);
        }
        Err(match kind {
            ErrorKind::Auth => ApiError::auth_status(code, response.body),
            ErrorKind::Request => ApiError::request_status(code, response.body),
        })
    }
}

impl<T: Transport> Drop for SessionClient<T> {
    fn drop(&mut self) {
        self.clean_up();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl Transport for Unreachable {
        fn send(&mut self, _: &Request) -> anyhow::Result<crate::transport::Response> {
            anyhow::bail!("No network in unit tests")
        }
    }

    fn client(url: &str) -> SessionClient<Unreachable> {
        let config = ClientConfig::with_options([("url", url)]).unwrap();
        SessionClient::with_transport(config, Unreachable)
    }

    #[test]
    fn url_has_exactly_one_separator() {
        let client = client("https://www.space-track.org/");
        assert_eq!(
            client.url_for("/ajaxauth/login").unwrap().as_str(),
            "https://www.space-track.org/ajaxauth/login"
        );
        assert_eq!(
            client.url_for("x").unwrap().as_str(),
            "https://www.space-track.org/x"
        );
    }

    #[test]
    fn url_keeps_base_path() {
        let client = client("http://127.0.0.1:8080/proxy");
        assert_eq!(
            client.url_for("/ajaxauth/login").unwrap().as_str(),
            "http://127.0.0.1:8080/proxy/ajaxauth/login"
        );
    }

    #[test]
    fn generated_cookie_files_are_unique_and_temporary() {
        let a = generated_cookie_file();
        let b = generated_cookie_file();
        assert_ne!(a, b);
        assert!(a.starts_with(env::temp_dir()));
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("spacetrack-cookiefile-"));
    }

    #[test]
    fn starts_unauthenticated() {
        assert!(!client("https://www.space-track.org/").is_authenticated());
    }
}
