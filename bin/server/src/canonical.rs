//! Reconstruction of the client-facing request URL behind a reverse proxy.
//!
//! The proxy in front of us terminates TLS and may rewrite the `Host`
//! header. It reports the original values in an RFC 7239 `Forwarded`
//! header; the first element describes the hop closest to the client.

use axum::http::{Uri, uri::Authority};
use std::fmt;

/// URL scheme of a canonical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Parses a `proto` value, case-insensitively.
    #[must_use]
    pub fn parse(proto: &str) -> Option<Self> {
        if proto.eq_ignore_ascii_case("http") {
            Some(Self::Http)
        } else if proto.eq_ignore_ascii_case("https") {
            Some(Self::Https)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request as the external client addressed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    pub scheme: Scheme,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
}

impl CanonicalRequest {
    /// Builds the canonical request from transport-level metadata.
    ///
    /// `forwarded` is the combined value of all `Forwarded` header lines, if
    /// any were sent. Only scheme and host are subject to override; path and
    /// query come from `uri` unchanged.
    pub fn from_parts(
        listener_scheme: Scheme,
        host_header: Option<&str>,
        forwarded: Option<&str>,
        uri: &Uri,
    ) -> Result<Self, CanonicalizeError> {
        let mut scheme = listener_scheme;
        let mut host = host_header
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()));

        if let Some(value) = forwarded {
            let elements = parse_forwarded(value)?;
            if let Some(first) = elements.first() {
                if let Some(proto) = first.get("proto") {
                    scheme = Scheme::parse(proto).ok_or_else(|| {
                        CanonicalizeError::UnsupportedProto {
                            proto: proto.to_string(),
                        }
                    })?;
                }
                if let Some(forwarded_host) = first.get("host") {
                    host = Some(forwarded_host.to_string());
                }
            }
        }

        let host = host
            .filter(|h| !h.is_empty())
            .ok_or(CanonicalizeError::MissingHost)?;
        if !is_authority(&host) {
            return Err(CanonicalizeError::InvalidHost { host });
        }

        Ok(Self {
            scheme,
            host,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        })
    }

    /// Returns `scheme://host/path`, the URL the provider redirects back to.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }
}

/// One comma-separated element of a `Forwarded` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedElement {
    pairs: Vec<(String, String)>,
}

impl ForwardedElement {
    /// Returns the value for a parameter name, case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a `Forwarded` header value into its elements.
///
/// Accepts `key=value` pairs separated by `;` and elements separated by
/// `,`, with optional whitespace around separators. Values are tokens or
/// quoted strings with backslash escapes. Unquoted values may contain `:`
/// and brackets, which proxies commonly send for `host` with a port.
pub fn parse_forwarded(value: &str) -> Result<Vec<ForwardedElement>, CanonicalizeError> {
    let malformed = |reason: &str| CanonicalizeError::MalformedForwarded {
        header: value.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = value.chars().peekable();
    let mut elements = Vec::new();
    let mut current = ForwardedElement::default();

    loop {
        skip_whitespace(&mut chars);

        // Empty list elements and empty pairs are allowed by the list syntax.
        match chars.peek() {
            None => {
                if !current.pairs.is_empty() {
                    elements.push(current);
                }
                break;
            }
            Some(',') => {
                chars.next();
                if !current.pairs.is_empty() {
                    elements.push(std::mem::take(&mut current));
                }
                continue;
            }
            Some(';') => {
                chars.next();
                continue;
            }
            Some(_) => {}
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if !is_tchar(c) {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.is_empty() {
            return Err(malformed("expected parameter name"));
        }
        if chars.next() != Some('=') {
            return Err(malformed("expected '=' after parameter name"));
        }

        let parameter = if chars.peek() == Some(&'"') {
            chars.next();
            let mut quoted = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => quoted.push(escaped),
                        None => return Err(malformed("unterminated escape")),
                    },
                    Some(c) => quoted.push(c),
                    None => return Err(malformed("unterminated quoted string")),
                }
            }
            quoted
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c == ';' || c == ',' || c.is_ascii_whitespace() {
                    break;
                }
                if c == '"' || c == '=' || c.is_ascii_control() {
                    return Err(malformed("unexpected character in value"));
                }
                token.push(c);
                chars.next();
            }
            if token.is_empty() {
                return Err(malformed("expected parameter value"));
            }
            token
        };

        if current.get(&key).is_some() {
            return Err(malformed("duplicate parameter"));
        }
        current.pairs.push((key.to_ascii_lowercase(), parameter));

        skip_whitespace(&mut chars);
        if !matches!(chars.peek(), None | Some(';') | Some(',')) {
            return Err(malformed("expected ';' or ','"));
        }
    }

    if elements.is_empty() {
        return Err(malformed("no forwarded elements"));
    }
    Ok(elements)
}

/// `host[:port]` with no user info, as allowed in a URL authority.
fn is_authority(host: &str) -> bool {
    !host.contains('@') && host.parse::<Authority>().is_ok()
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
}

/// RFC 7230 token character.
fn is_tchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Errors from canonicalizing a request. All of them are client errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizeError {
    /// The `Forwarded` header does not follow the grammar.
    MalformedForwarded { header: String, reason: String },
    /// The forwarded `proto` is neither http nor https.
    UnsupportedProto { proto: String },
    /// Neither `Host` nor `Forwarded` named a host.
    MissingHost,
    /// The host is not a valid URL authority.
    InvalidHost { host: String },
}

impl fmt::Display for CanonicalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedForwarded { header, reason } => {
                write!(f, "malformed Forwarded header '{header}': {reason}")
            }
            Self::UnsupportedProto { proto } => {
                write!(f, "unsupported forwarded proto '{proto}'")
            }
            Self::MissingHost => write!(f, "request does not name a host"),
            Self::InvalidHost { host } => write!(f, "invalid host '{host}'"),
        }
    }
}

impl std::error::Error for CanonicalizeError {}
