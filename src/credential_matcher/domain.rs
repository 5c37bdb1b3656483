//! Host parsing: registrable domain and service name extraction.
//!
//! The matcher only depends on the [`DomainParser`] trait; [`SuffixListParser`]
//! is the built-in implementation backed by a table of multi-label public
//! suffixes. Hosts whose last two labels are not in the table are treated as
//! having a one-label suffix (`example.com`, `example.nl`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Registrable domain and service name derived from a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedHost {
    /// Registrable domain, e.g. `example.co.uk` for `login.example.co.uk`
    pub domain: Option<String>,
    /// The label right before the public suffix, e.g. `example`
    pub service_name: Option<String>,
}

/// Splits hosts into registrable domain and service name.
pub trait DomainParser {
    fn parse(&self, host: &str) -> ParsedHost;

    fn main_domain(&self, host: &str) -> Option<String> {
        self.parse(host).domain
    }
}

impl<P: DomainParser + ?Sized> DomainParser for &P {
    fn parse(&self, host: &str) -> ParsedHost {
        (**self).parse(host)
    }
}

/// Public suffixes made of two labels.
static TWO_LEVEL_SUFFIXES: &[&str] = &[
    // Argentina, Australia, Austria
    "com.ar", "net.ar", "org.ar", "gov.ar", "edu.ar",
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "asn.au", "id.au",
    "co.at", "or.at", "ac.at", "gv.at",
    // Belgium, Brazil
    "ac.be",
    "com.br", "net.br", "org.br", "gov.br", "edu.br", "art.br", "blog.br", "eng.br", "med.br",
    // Canada, Chile, China, Colombia
    "qc.ca", "on.ca", "bc.ca", "ab.ca",
    "gob.cl",
    "com.cn", "net.cn", "org.cn", "gov.cn", "edu.cn", "ac.cn",
    "com.co", "net.co", "org.co", "gov.co", "edu.co",
    // Ecuador, Egypt
    "com.ec", "gob.ec", "edu.ec",
    "com.eg", "gov.eg", "edu.eg",
    // Hong Kong, Indonesia, Israel, India
    "com.hk", "org.hk", "gov.hk", "edu.hk",
    "co.id", "or.id", "ac.id", "go.id", "web.id",
    "co.il", "org.il", "ac.il", "gov.il", "muni.il",
    "co.in", "net.in", "org.in", "firm.in", "gen.in", "ind.in", "ac.in", "gov.in", "res.in",
    // Japan, Kenya, Korea
    "co.jp", "ne.jp", "or.jp", "ac.jp", "ad.jp", "ed.jp", "go.jp", "gr.jp", "lg.jp",
    "co.ke", "or.ke", "ac.ke", "go.ke",
    "co.kr", "ne.kr", "or.kr", "re.kr", "ac.kr", "go.kr", "pe.kr",
    // Morocco, Mexico, Malaysia
    "co.ma", "net.ma", "org.ma", "gov.ma", "ac.ma",
    "com.mx", "net.mx", "org.mx", "gob.mx", "edu.mx",
    "com.my", "net.my", "org.my", "gov.my", "edu.my",
    // Nigeria, Norway, New Zealand
    "com.ng", "org.ng", "gov.ng", "edu.ng",
    "priv.no",
    "co.nz", "net.nz", "org.nz", "govt.nz", "ac.nz", "school.nz", "geek.nz", "kiwi.nz",
    // Peru, Philippines, Pakistan, Poland
    "com.pe", "gob.pe", "edu.pe",
    "com.ph", "gov.ph", "edu.ph",
    "com.pk", "gov.pk", "edu.pk",
    "com.pl", "net.pl", "org.pl", "gov.pl", "edu.pl",
    // Russia, Saudi Arabia, Singapore
    "com.ru", "net.ru", "org.ru", "msk.ru", "spb.ru",
    "com.sa", "gov.sa", "edu.sa",
    "com.sg", "gov.sg", "edu.sg",
    // Thailand, Turkey, Taiwan, Tanzania
    "co.th", "in.th", "ac.th", "go.th",
    "com.tr", "gov.tr", "edu.tr",
    "com.tw", "org.tw", "gov.tw", "edu.tw",
    "co.tz", "or.tz", "go.tz", "ac.tz",
    // Uganda, Ukraine, United Kingdom
    "co.ug", "or.ug", "go.ug", "ac.ug",
    "com.ua", "kiev.ua", "gov.ua",
    "co.uk", "org.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "ac.uk", "gov.uk", "nhs.uk",
    // Venezuela, Vietnam, South Africa
    "com.ve", "gob.ve",
    "com.vn", "gov.vn", "edu.vn",
    "co.za", "org.za", "gov.za", "ac.za", "web.za",
];

fn two_level_suffixes() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| TWO_LEVEL_SUFFIXES.iter().copied().collect())
}

/// Built-in [`DomainParser`] backed by [`TWO_LEVEL_SUFFIXES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixListParser;

impl SuffixListParser {
    pub fn new() -> Self {
        Self
    }
}

impl DomainParser for SuffixListParser {
    fn parse(&self, host: &str) -> ParsedHost {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        if host.is_empty() || is_ip_literal(&host) {
            return ParsedHost::default();
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return ParsedHost::default();
        }

        let last_two = labels[labels.len() - 2..].join(".");
        let suffix_len = if two_level_suffixes().contains(last_two.as_str()) {
            2
        } else {
            1
        };

        // The host is the public suffix itself (e.g. "co.uk")
        if labels.len() <= suffix_len {
            return ParsedHost::default();
        }

        let service_index = labels.len() - suffix_len - 1;
        ParsedHost {
            domain: Some(labels[service_index..].join(".")),
            service_name: Some(labels[service_index].to_string()),
        }
    }
}

/// IPv4 dotted quads and bracketed or bare IPv6 addresses.
fn is_ip_literal(host: &str) -> bool {
    if host.starts_with('[') || host.contains(':') {
        return true;
    }
    host.split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}
