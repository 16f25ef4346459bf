//! The seam between the session logic and the network.

use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use log::{debug, info};
use reqwest::{header::SET_COOKIE, redirect::Policy, Method, StatusCode};
use url::Url;

use crate::cookie_file::FileCookieStore;

/// Everything needed to make one HTTP call.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Form encoded into the body, if any.
    pub form: Option<Vec<(String, String)>>,
    /// Cookies are both read from and written to this file.
    pub cookie_file: PathBuf,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub verbose: bool,
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

/// The status line arrived but the body could not be read.
#[derive(Clone, Debug)]
pub struct UnreadBody {
    pub status: StatusCode,
    pub reason: String,
}

impl Display for UnreadBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self { status, reason } = self;
        write!(f, "Could not fetch text, status was {status}: {reason}")
    }
}

impl std::error::Error for UnreadBody {}

/// Anything that can execute a [`Request`].
///
/// An error means that no response was received.
pub trait Transport {
    fn send(&mut self, request: &Request) -> anyhow::Result<Response>;
}

pub fn is_success(code: u16) -> bool {
    (200..=299).contains(&code)
}

/// Blocking HTTP transport keeping cookies in the request's cookie file.
///
/// Redirects are returned as is; a 3xx is how an expired session usually shows.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn send(&mut self, request: &Request) -> anyhow::Result<Response> {
        let Request {
            method,
            url,
            form,
            cookie_file,
            timeout,
            verbose,
        } = request;
        let client = reqwest::blocking::Client::builder()
            .cookie_provider(Arc::new(FileCookieStore::new(cookie_file)))
            .timeout(*timeout)
            .redirect(Policy::none())
            .connection_verbose(*verbose)
            .build()
            .context("Failed to create reqwest client")?;

        if *verbose {
            info!("Sending {method} {url} with cookies from {cookie_file:?}");
        }
        let mut builder = client.request(method.clone(), url.clone());
        if let Some(form) = form {
            builder = builder.form(form);
        }
        let response = builder
            .send()
            .with_context(|| format!("Failed to send {method} {url}"))?;

        let status = response.status();
        if *verbose {
            info!("Received {status} from {}", response.url());
            for (name, value) in response.headers() {
                if name == SET_COOKIE {
                    debug!("< {name}: [REDACTED]");
                } else {
                    debug!("< {name}: {value:?}");
                }
            }
        }
        let body = response.text().map_err(|e| UnreadBody {
            status,
            reason: e.to_string(),
        })?;
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_2xx_is_success() {
        assert!(is_success(200));
        assert!(is_success(204));
        assert!(is_success(299));
        assert!(!is_success(0));
        assert!(!is_success(199));
        assert!(!is_success(301));
        assert!(!is_success(401));
        assert!(!is_success(500));
    }
}
