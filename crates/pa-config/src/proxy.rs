//! Outbound proxy resolution.
//!
//! A proxy is described by a host (optionally carrying its own `scheme://`
//! prefix), a port and optional credentials. [`resolve_proxy`] turns those
//! parts into a [`ProxySelector`]; the legacy file and the environment are
//! just two places the parts can come from.

use crate::env::EnvSource;
use crate::legacy::{LegacyFile, MAIN_SECTION};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Port used when none is configured.
pub const DEFAULT_PROXY_PORT: u16 = 3128;

/// Characters escaped in the user-info part of the proxy URL.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

#[derive(Debug, Error)]
pub enum ProxyError {
    /// `url` has its password masked.
    #[error("invalid proxy URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Picks the proxy for an outbound request.
///
/// One proxy applies to every request, so the target is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySelector {
    url: Url,
}

impl ProxySelector {
    pub fn proxy_for(&self, _target: &Url) -> Option<&Url> {
        Some(&self.url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Decoded user name; empty when the proxy has no credentials.
    pub fn username(&self) -> String {
        percent_decode_str(self.url.username())
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Decoded password.
    pub fn password(&self) -> Option<String> {
        self.url
            .password()
            .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
    }

    /// The proxy URL with its password masked, for logs.
    pub fn display_url(&self) -> String {
        let mut url = self.url.clone();
        if url.password().is_some() {
            let _ = url.set_password(Some(pa_redact::MASK));
        }
        url.to_string()
    }
}

/// Build a proxy selector from its parts.
///
/// An empty `host` means no proxy. A `scheme://` prefix on `host` overrides
/// `scheme`, which itself defaults to `http`. `port` defaults to 3128.
pub fn resolve_proxy(
    host: &str,
    scheme: &str,
    port: Option<u16>,
    user: &str,
    password: &str,
) -> Result<Option<ProxySelector>, ProxyError> {
    let (scheme, host) = match host.find("://") {
        Some(i) => (&host[..i], &host[i + 3..]),
        None => (scheme, host),
    };
    if host.is_empty() {
        return Ok(None);
    }
    let scheme = if scheme.is_empty() { "http" } else { scheme };
    let port = port.unwrap_or(DEFAULT_PROXY_PORT);

    let userinfo = |password: &str| match (user.is_empty(), password.is_empty()) {
        (true, _) => String::new(),
        (false, true) => format!("{}@", utf8_percent_encode(user, USERINFO)),
        (false, false) => format!(
            "{}:{}@",
            utf8_percent_encode(user, USERINFO),
            utf8_percent_encode(password, USERINFO)
        ),
    };

    let raw = format!("{scheme}://{}{host}:{port}", userinfo(password));
    match Url::parse(&raw) {
        Ok(url) => Ok(Some(ProxySelector { url })),
        Err(source) => {
            let masked = if password.is_empty() { "" } else { pa_redact::MASK };
            Err(ProxyError::InvalidUrl {
                url: format!("{scheme}://{}{host}:{port}", userinfo(masked)),
                source,
            })
        }
    }
}

/// Proxy settings from the `[Main]` section of the legacy file.
pub fn proxy_from_legacy(file: &LegacyFile) -> Result<Option<ProxySelector>, ProxyError> {
    let host = file.get(MAIN_SECTION, "proxy_host").unwrap_or("");
    let port = file
        .get(MAIN_SECTION, "proxy_port")
        .and_then(|raw| parse_port("proxy_port", raw));
    resolve_proxy(
        host,
        "http",
        port,
        file.get(MAIN_SECTION, "proxy_user").unwrap_or(""),
        file.get(MAIN_SECTION, "proxy_password").unwrap_or(""),
    )
}

/// Proxy settings from `PROXY_HOST`, `PROXY_PORT`, `PROXY_USER` and
/// `PROXY_PASSWORD`. `Ok(None)` when `PROXY_HOST` is not set.
pub fn proxy_from_env(env: &dyn EnvSource) -> Result<Option<ProxySelector>, ProxyError> {
    let Some(host) = env.non_empty("PROXY_HOST") else {
        return Ok(None);
    };
    let port = env
        .non_empty("PROXY_PORT")
        .and_then(|raw| parse_port("PROXY_PORT", &raw));
    resolve_proxy(
        &host,
        "http",
        port,
        &env.non_empty("PROXY_USER").unwrap_or_default(),
        &env.non_empty("PROXY_PASSWORD").unwrap_or_default(),
    )
}

/// Zero, negative and unparseable ports mean "use the default".
fn parse_port(key: &str, raw: &str) -> Option<u16> {
    match raw.trim().parse::<i64>() {
        Ok(p) if p <= 0 => None,
        Ok(p) => match u16::try_from(p) {
            Ok(p) => Some(p),
            Err(_) => {
                warn!(key, value = raw, "proxy port out of range, using default");
                None
            }
        },
        Err(_) => {
            warn!(key, value = raw, "proxy port is not a number, using default");
            None
        }
    }
}
