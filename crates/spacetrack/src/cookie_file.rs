//! A cookie store persisted to a single file.
//!
//! The file uses the Netscape cookie file format, one cookie per line with 7 TAB-separated
//! fields: domain, include-subdomains, path, secure, expires, name and value.
//! This is the format written by curl, so a session can be inspected or reused with it.

use std::{
    fmt,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use log::{debug, trace, warn};
use reqwest::{cookie::CookieStore, header::HeaderValue};
use url::Url;

const HEADER: &str = "# Netscape HTTP Cookie File\n";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

#[derive(Clone, Eq, PartialEq)]
pub struct StoredCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix timestamp, `0` for session cookies.
    pub expires: u64,
    pub name: String,
    value: String,
}

// Cookie values are session secrets.
impl fmt::Debug for StoredCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCookie")
            .field("domain", &self.domain)
            .field("include_subdomains", &self.include_subdomains)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn parse_flag(field: &str) -> Option<bool> {
    match field {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

fn domain_matches(host: &str, domain: &str, include_subdomains: bool) -> bool {
    let domain = domain.trim_start_matches('.');
    host.eq_ignore_ascii_case(domain)
        || (include_subdomains
            && host.len() > domain.len()
            && host.to_ascii_lowercase().ends_with(&format!(".{}", domain.to_ascii_lowercase())))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path[cookie_path.len()..].starts_with('/')))
}

impl StoredCookie {
    pub fn value(&self) -> &str {
        &self.value
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.domain.trim_start_matches('.') == other.domain.trim_start_matches('.')
    }

    pub fn matches(&self, url: &Url, now: u64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        !self.is_expired(now)
            && (!self.secure || url.scheme() == "https")
            && domain_matches(host, &self.domain, self.include_subdomains)
            && path_matches(url.path(), &self.path)
    }

    /// Parse one line of a cookie file, `None` for blank lines and comments.
    fn from_line(line: &str) -> Option<anyhow::Result<Self>> {
        let line = line.trim_end_matches(['\r', '\n']);
        let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => rest,
            None if line.trim().is_empty() || line.starts_with('#') => return None,
            None => line,
        };
        Some(Self::from_fields(line))
    }

    fn from_fields(line: &str) -> anyhow::Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [domain, include_subdomains, path, secure, expires, name, value] = fields[..] else {
            anyhow::bail!("Expected 7 TAB-separated fields, found {}", fields.len());
        };
        Ok(Self {
            domain: domain.to_string(),
            include_subdomains: parse_flag(include_subdomains)
                .context("Include-subdomains flag is neither TRUE nor FALSE")?,
            path: path.to_string(),
            secure: parse_flag(secure).context("Secure flag is neither TRUE nor FALSE")?,
            expires: expires.parse().context("Expiry is not a unix timestamp")?,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    fn to_line(&self) -> String {
        let Self {
            domain,
            include_subdomains,
            path,
            secure,
            expires,
            name,
            value,
        } = self;
        format!(
            "{domain}\t{}\t{path}\t{}\t{expires}\t{name}\t{value}\n",
            flag(*include_subdomains),
            flag(*secure)
        )
    }

    /// Interpret a `Set-Cookie` header received from `url`.
    ///
    /// Returns `None` if the header is malformed or names a domain that `url` may not set.
    /// `Expires` is not interpreted; such cookies are kept for the session only.
    pub fn from_set_cookie(header: &str, url: &Url, now: u64) -> Option<Self> {
        let host = url.host_str()?;
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Self {
            domain: host.to_ascii_lowercase(),
            include_subdomains: false,
            path: default_path(url),
            secure: false,
            expires: 0,
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
        };
        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain_matches(host, &domain, true) {
                        debug!("Rejecting cookie {name} for foreign domain {domain}");
                        return None;
                    }
                    cookie.domain = format!(".{domain}");
                    cookie.include_subdomains = true;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "secure" => cookie.secure = true,
                "max-age" => {
                    if let Ok(seconds) = val.parse::<i64>() {
                        cookie.expires = match u64::try_from(seconds) {
                            Ok(s) if s > 0 => now.saturating_add(s),
                            // In the past, which removes any stored cookie in the same slot.
                            _ => 1,
                        };
                    }
                }
                _ => {}
            }
        }
        Some(cookie)
    }
}

pub fn parse_cookie_file(text: &str) -> Vec<StoredCookie> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| match StoredCookie::from_line(line)? {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                warn!("Skipping malformed cookie on line {}: {e}", i + 1);
                None
            }
        })
        .collect()
}

pub fn format_cookie_file(cookies: &[StoredCookie]) -> String {
    let mut text = HEADER.to_string();
    for cookie in cookies {
        text.push_str(&cookie.to_line());
    }
    text
}

/// Replace or add `incoming` cookies, dropping any that have expired.
fn merge(stored: &mut Vec<StoredCookie>, incoming: Vec<StoredCookie>, now: u64) {
    for cookie in incoming {
        stored.retain(|c| !c.same_slot(&cookie));
        stored.push(cookie);
    }
    stored.retain(|c| !c.is_expired(now));
}

/// A [`CookieStore`] that reads and writes a cookie file on every use.
pub struct FileCookieStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Vec<StoredCookie>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(parse_cookie_file(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        }
    }

    pub fn save(&self, cookies: &[StoredCookie]) -> anyhow::Result<()> {
        fs::write(&self.path, format_cookie_file(cookies))
            .with_context(|| format!("Failed to write {:?}", self.path))
    }

    fn store(
        &self,
        headers: &mut dyn Iterator<Item = &HeaderValue>,
        url: &Url,
    ) -> anyhow::Result<()> {
        let now = now();
        let incoming: Vec<_> = headers
            .filter_map(|h| h.to_str().ok())
            .filter_map(|h| StoredCookie::from_set_cookie(h, url, now))
            .collect();
        if incoming.is_empty() {
            return Ok(());
        }
        for cookie in &incoming {
            trace!("Storing cookie {} for {}", cookie.name, cookie.domain);
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stored = self.load()?;
        merge(&mut stored, incoming, now);
        self.save(&stored)
    }

    fn header(&self, url: &Url) -> anyhow::Result<Option<HeaderValue>> {
        let now = now();
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let pairs: Vec<String> = self
            .load()?
            .iter()
            .filter(|c| c.matches(url, now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if pairs.is_empty() {
            return Ok(None);
        }
        let header = HeaderValue::from_str(&pairs.join("; "))
            .context("Stored cookies do not form a valid header")?;
        Ok(Some(header))
    }
}

impl CookieStore for FileCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        if let Err(e) = self.store(cookie_headers, url) {
            warn!("Could not persist cookies: {e:#}");
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header(url)
            .inspect_err(|e| warn!("Could not load cookies: {e:#}"))
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn parses_curl_style_file() {
        let text = "# Netscape HTTP Cookie File\n\
                    # comment\n\
                    \n\
                    #HttpOnly_www.space-track.org\tFALSE\t/\tTRUE\t0\tchocolatechip\tabc\n\
                    .space-track.org\tTRUE\t/\tFALSE\t1900000000\tspacetrack_csrf_cookie\txyz\n\
                    broken line\n";
        let cookies = parse_cookie_file(text);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].domain, "www.space-track.org");
        assert!(cookies[0].secure);
        assert_eq!(cookies[0].value(), "abc");
        assert!(cookies[1].include_subdomains);
        assert_eq!(cookies[1].expires, 1_900_000_000);
    }

    #[test]
    fn written_file_can_be_read_back() {
        let cookie = StoredCookie::from_set_cookie(
            "chocolatechip=abc; path=/; secure",
            &url("https://www.space-track.org/ajaxauth/login"),
            NOW,
        )
        .unwrap();
        let text = format_cookie_file(std::slice::from_ref(&cookie));
        assert!(text.starts_with("# Netscape HTTP Cookie File"));
        assert_eq!(parse_cookie_file(&text), vec![cookie]);
    }

    #[test]
    fn set_cookie_defaults_to_host_and_directory() {
        let cookie =
            StoredCookie::from_set_cookie("a=b", &url("https://www.space-track.org/ajaxauth/login"), NOW)
                .unwrap();
        assert_eq!(cookie.domain, "www.space-track.org");
        assert!(!cookie.include_subdomains);
        assert_eq!(cookie.path, "/ajaxauth");
        assert_eq!(cookie.expires, 0);
    }

    #[test]
    fn set_cookie_honors_attributes() {
        let cookie = StoredCookie::from_set_cookie(
            "a=\"b\"; Domain=.space-track.org; Path=/; Max-Age=60; Secure; HttpOnly",
            &url("https://www.space-track.org/ajaxauth/login"),
            NOW,
        )
        .unwrap();
        assert_eq!(cookie.domain, ".space-track.org");
        assert!(cookie.include_subdomains);
        assert_eq!(cookie.path, "/");
        assert!(cookie.secure);
        assert_eq!(cookie.expires, NOW + 60);
        assert_eq!(cookie.value(), "b");
    }

    #[test]
    fn set_cookie_for_foreign_domain_is_rejected() {
        let cookie = StoredCookie::from_set_cookie(
            "a=b; Domain=example.com",
            &url("https://www.space-track.org/"),
            NOW,
        );
        assert!(cookie.is_none());
    }

    #[test]
    fn matching_respects_domain_path_scheme_and_expiry() {
        let mut cookie =
            StoredCookie::from_set_cookie("a=b; Path=/basicspacedata; Secure", &url("https://www.space-track.org/"), NOW)
                .unwrap();
        assert!(cookie.matches(&url("https://www.space-track.org/basicspacedata/query"), NOW));
        assert!(!cookie.matches(&url("https://www.space-track.org/basicspacedataX"), NOW));
        assert!(!cookie.matches(&url("http://www.space-track.org/basicspacedata"), NOW));
        assert!(!cookie.matches(&url("https://space-track.org/basicspacedata"), NOW));
        cookie.expires = NOW;
        assert!(!cookie.matches(&url("https://www.space-track.org/basicspacedata"), NOW));
    }

    #[test]
    fn zero_max_age_removes_stored_cookie() {
        let login = url("https://www.space-track.org/");
        let mut stored = vec![StoredCookie::from_set_cookie("a=b", &login, NOW).unwrap()];
        let removal = StoredCookie::from_set_cookie("a=gone; Max-Age=0", &login, NOW).unwrap();
        merge(&mut stored, vec![removal], NOW);
        assert!(stored.is_empty());
    }

    #[test]
    fn store_persists_and_replays_cookies() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileCookieStore::new(dir.path().join("cookies"));
        let login = url("https://www.space-track.org/ajaxauth/login");
        let query = url("https://www.space-track.org/basicspacedata/query");

        assert!(store.cookies(&query).is_none());

        let headers = [
            HeaderValue::from_static("chocolatechip=abc; Path=/"),
            HeaderValue::from_static("csrf=xyz; Path=/"),
        ];
        store.set_cookies(&mut headers.iter(), &login);

        assert!(store.path().exists());
        let header = store.cookies(&query).unwrap();
        assert_eq!(header.to_str().unwrap(), "chocolatechip=abc; csrf=xyz");

        let replacement = [HeaderValue::from_static("chocolatechip=def; Path=/")];
        store.set_cookies(&mut replacement.iter(), &login);
        let header = store.cookies(&query).unwrap();
        assert_eq!(header.to_str().unwrap(), "csrf=xyz; chocolatechip=def");
    }

    #[test]
    fn debug_output_redacts_values() {
        let cookie =
            StoredCookie::from_set_cookie("a=secret", &url("https://www.space-track.org/"), NOW).unwrap();
        assert!(!format!("{cookie:?}").contains("secret"));
    }
}
