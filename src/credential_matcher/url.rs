//! Lenient URL parsing for matching.
//!
//! Entry URLs are typed by users and are often missing a scheme
//! (`github.com/login`) or otherwise sloppy. [`ParsedUrl::guess_from`] accepts
//! those by retrying with an `https://` prefix. Anything still unparseable is
//! `None`, which the scorer treats as "no match".

/// A URL split into the components the scorer needs.
///
/// Equality is structural over scheme, user info, host, port, path, query and
/// fragment. Scheme is compared case-insensitively (it is stored lowercased);
/// everything else exactly as written.
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    raw: String,
    scheme: String,
    user_info: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl PartialEq for ParsedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.user_info == other.user_info
            && self.host == other.host
            && self.port == other.port
            && self.path == other.path
            && self.query == other.query
            && self.fragment == other.fragment
    }
}

impl Eq for ParsedUrl {}

impl ParsedUrl {
    /// Parse a URL that carries an explicit scheme.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() || input.chars().any(char::is_whitespace) {
            return None;
        }

        let (scheme, rest) = input.split_once(':')?;
        if !is_valid_scheme(scheme) {
            return None;
        }

        let mut url = ParsedUrl {
            raw: input.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            user_info: None,
            host: None,
            port: None,
            path: String::new(),
            query: None,
            fragment: None,
        };

        let remainder = if let Some(after_slashes) = rest.strip_prefix("//") {
            let authority_end = after_slashes
                .find(['/', '?', '#'])
                .unwrap_or(after_slashes.len());
            url.parse_authority(&after_slashes[..authority_end])?;
            &after_slashes[authority_end..]
        } else {
            // "example.com:8080" is a host and port, not a scheme
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return None;
            }
            rest
        };

        let (before_fragment, fragment) = match remainder.split_once('#') {
            Some((head, fragment)) => (head, Some(fragment.to_string())),
            None => (remainder, None),
        };
        let (path, query) = match before_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (before_fragment, None),
        };
        url.path = path.to_string();
        url.query = query;
        url.fragment = fragment;
        Some(url)
    }

    /// Parse a possibly scheme-less URL, assuming `https://` when needed.
    pub fn guess_from(input: &str) -> Option<Self> {
        if let Some(url) = Self::parse(input) {
            return Some(url);
        }
        let with_scheme = format!("https://{}", input.trim());
        Self::parse(&with_scheme).filter(|url| url.host.is_some())
    }

    fn parse_authority(&mut self, authority: &str) -> Option<()> {
        let host_port = match authority.rsplit_once('@') {
            Some((user_info, host_port)) => {
                self.user_info = Some(user_info.to_string());
                host_port
            }
            None => authority,
        };

        let (host, port) = if host_port.starts_with('[') {
            let close = host_port.find(']')?;
            let host = &host_port[..=close];
            let port = host_port[close + 1..].strip_prefix(':');
            (host, port)
        } else {
            match host_port.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (host_port, None),
            }
        };

        self.port = match port {
            Some("") | None => None,
            Some(port) => Some(port.parse::<u16>().ok()?),
        };
        if !host.is_empty() {
            self.host = Some(host.to_string());
        }
        Some(())
    }

    /// The URL as written (after trimming).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl std::fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
