//! RFC 4226 HOTP / RFC 6238 TOTP code generation.
//!
//! Besides the generators this module reads OTP configuration stored in entry
//! fields. Four layouts are recognized, checked in this order:
//! - `otp` field holding an `otpauth://totp/...` URI
//! - `otp` field holding a KeeOTP query string (`key=...&step=30&size=6`)
//! - `TOTP Seed` with optional `TOTP Settings` (`"30;6"`, or `"30;S"` for Steam)
//! - KeePass `TimeOtp-Secret-Base32` with `TimeOtp-Length/Period/Algorithm`

use data_encoding::{BASE32HEX_NOPAD, BASE32_NOPAD, BASE64};
use digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::credential_matcher::ParsedUrl;
use crate::database::EntryField;
use crate::error::{FinderError, FinderResult};

pub const OTP_FIELD_NAME: &str = "otp";
pub const SEED_FIELD_NAME: &str = "TOTP Seed";
pub const SETTINGS_FIELD_NAME: &str = "TOTP Settings";
pub const TIME_OTP_SECRET_FIELD_NAME: &str = "TimeOtp-Secret-Base32";
pub const TIME_OTP_LENGTH_FIELD_NAME: &str = "TimeOtp-Length";
pub const TIME_OTP_PERIOD_FIELD_NAME: &str = "TimeOtp-Period";
pub const TIME_OTP_ALGORITHM_FIELD_NAME: &str = "TimeOtp-Algorithm";

const DEFAULT_TIME_STEP: u32 = 30;
const DEFAULT_LENGTH: u32 = 6;
const STEAM_TYPE_SYMBOL: &str = "S";
const STEAM_LENGTH: usize = 5;
const STEAM_CHARS: &[u8] = b"23456789BCDFGHJKMNPQRTVWXY";

/// HMAC hash function used to derive codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OtpAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl OtpAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpAlgorithm::Sha1 => "SHA1",
            OtpAlgorithm::Sha256 => "SHA256",
            OtpAlgorithm::Sha512 => "SHA512",
        }
    }

    /// Parse `SHA1`/`SHA256`/`SHA512`, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        [OtpAlgorithm::Sha1, OtpAlgorithm::Sha256, OtpAlgorithm::Sha512]
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Parse the KeePass `HMAC-SHA-*` names.
    pub fn from_keepass_name(name: &str) -> Option<Self> {
        match name.trim() {
            "HMAC-SHA-1" => Some(OtpAlgorithm::Sha1),
            "HMAC-SHA-256" => Some(OtpAlgorithm::Sha256),
            "HMAC-SHA-512" => Some(OtpAlgorithm::Sha512),
            _ => None,
        }
    }
}

fn hmac_digest(algorithm: OtpAlgorithm, key: &[u8], data: &[u8]) -> FinderResult<Vec<u8>> {
    fn run<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> FinderResult<Vec<u8>> {
        let mut mac = <M as KeyInit>::new_from_slice(key)
            .map_err(|e| FinderError::Otp(format!("Invalid HMAC key: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    match algorithm {
        OtpAlgorithm::Sha1 => run::<Hmac<Sha1>>(key, data),
        OtpAlgorithm::Sha256 => run::<Hmac<Sha256>>(key, data),
        OtpAlgorithm::Sha512 => run::<Hmac<Sha512>>(key, data),
    }
}

/// The 31-bit dynamically truncated HMAC of `counter` (RFC 4226 §5.3).
pub fn hotp_value(seed: &[u8], counter: u64, algorithm: OtpAlgorithm) -> FinderResult<u32> {
    let hash = hmac_digest(algorithm, seed, &counter.to_be_bytes())?;
    let offset = usize::from(hash[hash.len() - 1] & 0x0f);
    let bytes: [u8; 4] = hash[offset..offset + 4]
        .try_into()
        .map_err(|_| FinderError::Otp("HMAC output too short".to_string()))?;
    Ok(u32::from_be_bytes(bytes) & 0x7fff_ffff)
}

/// A zero-padded decimal HOTP code of `digits` length, `1..=10`.
///
/// The truncated value has 31 bits, so more than 10 digits would only add
/// leading zeros.
pub fn hotp(seed: &[u8], counter: u64, digits: u32, algorithm: OtpAlgorithm) -> FinderResult<String> {
    if !(1..=10).contains(&digits) {
        return Err(FinderError::Otp(format!("Unsupported HOTP digits: {}", digits)));
    }
    let value = hotp_value(seed, counter, algorithm)?;
    let code = u64::from(value) % 10u64.pow(digits);
    Ok(format!("{:0width$}", code, width = digits as usize))
}

/// A configured time-based code generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TotpGenerator {
    /// Standard RFC 6238 decimal codes
    Rfc6238 {
        seed: Vec<u8>,
        time_step: u32,
        length: u32,
        algorithm: OtpAlgorithm,
    },
    /// Steam Guard: five characters from the Steam alphabet, HMAC-SHA1
    Steam { seed: Vec<u8>, time_step: u32 },
}

impl TotpGenerator {
    pub fn rfc6238(
        seed: Vec<u8>,
        time_step: u32,
        length: u32,
        algorithm: OtpAlgorithm,
    ) -> FinderResult<Self> {
        if !(4..=8).contains(&length) {
            return Err(FinderError::Otp(format!("Unsupported code length: {}", length)));
        }
        if time_step == 0 {
            return Err(FinderError::Otp("Time step must be positive".to_string()));
        }
        if seed.is_empty() {
            return Err(FinderError::Otp("Empty seed".to_string()));
        }
        Ok(TotpGenerator::Rfc6238 {
            seed,
            time_step,
            length,
            algorithm,
        })
    }

    pub fn steam(seed: Vec<u8>, time_step: u32) -> FinderResult<Self> {
        if time_step == 0 {
            return Err(FinderError::Otp("Time step must be positive".to_string()));
        }
        if seed.is_empty() {
            return Err(FinderError::Otp("Empty seed".to_string()));
        }
        Ok(TotpGenerator::Steam { seed, time_step })
    }

    pub fn time_step(&self) -> u32 {
        match self {
            TotpGenerator::Rfc6238 { time_step, .. } | TotpGenerator::Steam { time_step, .. } => {
                *time_step
            }
        }
    }

    fn counter_at(&self, unix_secs: i64) -> u64 {
        let counter = unix_secs.div_euclid(i64::from(self.time_step()));
        u64::try_from(counter).unwrap_or(0)
    }

    /// The code valid at `unix_secs`.
    pub fn generate_at(&self, unix_secs: i64) -> FinderResult<String> {
        let counter = self.counter_at(unix_secs);
        match self {
            TotpGenerator::Rfc6238 {
                seed,
                length,
                algorithm,
                ..
            } => hotp(seed, counter, *length, *algorithm),
            TotpGenerator::Steam { seed, .. } => {
                let mut value = hotp_value(seed, counter, OtpAlgorithm::Sha1)? as usize;
                let mut code = String::with_capacity(STEAM_LENGTH);
                for _ in 0..STEAM_LENGTH {
                    code.push(char::from(STEAM_CHARS[value % STEAM_CHARS.len()]));
                    value /= STEAM_CHARS.len();
                }
                Ok(code)
            }
        }
    }

    /// The code valid now.
    pub fn generate(&self) -> FinderResult<String> {
        self.generate_at(chrono::Utc::now().timestamp())
    }

    /// How much of the current time step has passed, in `[0, 1)`.
    pub fn elapsed_time_fraction_at(&self, unix_secs: f64) -> f32 {
        let step = f64::from(self.time_step());
        let step_start = (unix_secs / step).floor() * step;
        ((unix_secs - step_start) / step) as f32
    }

    pub fn elapsed_time_fraction(&self) -> f32 {
        let now = chrono::Utc::now();
        let secs = now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0;
        self.elapsed_time_fraction_at(secs)
    }

    /// Compare `code` with the code valid at `unix_secs` in constant time.
    pub fn verify_at(&self, code: &str, unix_secs: i64) -> FinderResult<bool> {
        let expected = self.generate_at(unix_secs)?;
        Ok(expected.as_bytes().ct_eq(code.trim().as_bytes()).into())
    }

    /// Read the OTP configuration from entry fields.
    ///
    /// Returns `Ok(None)` when the fields carry no OTP configuration at all.
    pub fn from_fields(fields: &[EntryField]) -> FinderResult<Option<Self>> {
        let find = |name: &str| fields.iter().find(|f| f.name == name).map(|f| f.value.as_str());

        let result = if let Some(otp) = find(OTP_FIELD_NAME) {
            parse_single_field(otp)
        } else if let Some(seed) = find(SEED_FIELD_NAME) {
            parse_split_fields(seed, find(SETTINGS_FIELD_NAME))
        } else if let Some(secret) = find(TIME_OTP_SECRET_FIELD_NAME) {
            parse_keepass_fields(
                secret,
                find(TIME_OTP_LENGTH_FIELD_NAME),
                find(TIME_OTP_PERIOD_FIELD_NAME),
                find(TIME_OTP_ALGORITHM_FIELD_NAME),
            )
        } else {
            return Ok(None);
        };

        result.map(Some).inspect_err(|e| tracing::warn!("{}", e))
    }
}

/// Parse the value of an `otp` field: an `otpauth://` URI or a KeeOTP string.
pub fn parse_single_field(value: &str) -> FinderResult<TotpGenerator> {
    let value = value.trim();
    if value.to_ascii_lowercase().starts_with("otpauth:") {
        return parse_otpauth_uri(value);
    }
    if !value.contains("://") {
        return parse_keeotp(value);
    }
    Err(FinderError::Otp("Unrecognized OTP field format".to_string()))
}

fn parse_otpauth_uri(value: &str) -> FinderResult<TotpGenerator> {
    let uri = ParsedUrl::parse(value)
        .ok_or_else(|| FinderError::Otp("OTP URI has unexpected format".to_string()))?;
    if !uri.host().is_some_and(|host| host.eq_ignore_ascii_case("totp")) {
        return Err(FinderError::Otp("Only TOTP URIs are supported".to_string()));
    }
    let params = QueryParams::parse(uri.query().unwrap_or_default());

    let seed = params
        .get("secret")
        .and_then(decode_base32)
        .filter(|seed| !seed.is_empty())
        .ok_or_else(|| param_error("secret"))?;
    let time_step = params.parse_or("period", DEFAULT_TIME_STEP)?;

    let is_steam = percent_decode(uri.path()).starts_with("/Steam:")
        || params.get("issuer") == Some("Steam")
        || params.get("encoder") == Some("steam");
    if is_steam {
        return TotpGenerator::steam(seed, time_step);
    }

    let algorithm = match params.get("algorithm") {
        Some(name) => OtpAlgorithm::from_name(name)
            .ok_or_else(|| FinderError::Otp(format!("OTP algorithm is not supported: {}", name)))?,
        None => OtpAlgorithm::default(),
    };
    let length = params.parse_or("digits", DEFAULT_LENGTH)?;
    TotpGenerator::rfc6238(seed, time_step, length, algorithm)
}

fn parse_keeotp(value: &str) -> FinderResult<TotpGenerator> {
    let params = QueryParams::parse(value);
    let seed = params
        .get("key")
        .and_then(decode_base32)
        .filter(|seed| !seed.is_empty())
        .ok_or_else(|| param_error("key"))?;

    if let Some(otp_type) = params.get("type") {
        if !otp_type.eq_ignore_ascii_case("totp") {
            return Err(FinderError::Otp(format!("OTP type is not supported: {}", otp_type)));
        }
    }
    let algorithm = match params.get("otpHashMode") {
        Some(name) => OtpAlgorithm::from_name(name)
            .ok_or_else(|| FinderError::Otp(format!("OTP algorithm is not supported: {}", name)))?,
        None => OtpAlgorithm::default(),
    };
    let time_step = params.parse_or("step", DEFAULT_TIME_STEP)?;
    let length = params.parse_or("size", DEFAULT_LENGTH)?;
    TotpGenerator::rfc6238(seed, time_step, length, algorithm)
}

fn parse_split_fields(seed: &str, settings: Option<&str>) -> FinderResult<TotpGenerator> {
    let seed = decode_seed(seed)
        .ok_or_else(|| FinderError::Otp("Unrecognized TOTP seed format".to_string()))?;

    let settings = settings.unwrap_or("30;6");
    let parts: Vec<&str> = settings.split(';').map(str::trim).collect();
    if parts.len() < 2 {
        return Err(FinderError::Otp(format!(
            "Insufficient TOTP settings [expected: 2, got: {}]",
            parts.len()
        )));
    }
    if parts.len() > 2 {
        tracing::debug!(count = parts.len(), "Ignoring redundant TOTP settings");
    }

    let time_step: u32 = parts[0]
        .parse()
        .map_err(|_| FinderError::Otp(format!("Invalid TOTP time step: {}", parts[0])))?;
    if parts[1] == STEAM_TYPE_SYMBOL {
        return TotpGenerator::steam(seed, time_step);
    }
    let length: u32 = parts[1]
        .parse()
        .map_err(|_| FinderError::Otp(format!("Unexpected TOTP size or type: {}", parts[1])))?;
    TotpGenerator::rfc6238(seed, time_step, length, OtpAlgorithm::Sha1)
}

fn parse_keepass_fields(
    secret: &str,
    length: Option<&str>,
    period: Option<&str>,
    algorithm: Option<&str>,
) -> FinderResult<TotpGenerator> {
    let seed = decode_base32(secret.trim())
        .ok_or_else(|| FinderError::Otp("Invalid TimeOtp secret".to_string()))?;
    let length = length
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_LENGTH);
    let time_step = period
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_TIME_STEP);
    let algorithm = match algorithm {
        Some(name) => OtpAlgorithm::from_keepass_name(name).unwrap_or_else(|| {
            tracing::warn!(value = name, "Unknown TimeOtp-Algorithm, using SHA1");
            OtpAlgorithm::default()
        }),
        None => OtpAlgorithm::default(),
    };
    TotpGenerator::rfc6238(seed, time_step, length, algorithm)
}

/// Build an `otpauth://totp/` URI with default settings.
pub fn make_otpauth_uri(base32_seed: &str, issuer: Option<&str>, account_name: Option<&str>) -> String {
    let mut label = String::new();
    let mut issuer_param = String::new();
    if let Some(account) = account_name.filter(|a| !a.is_empty()) {
        let account = percent_encode(&account.replace(':', "_"));
        match issuer.filter(|i| !i.is_empty()) {
            Some(issuer) => {
                let issuer = percent_encode(&issuer.replace(':', "_"));
                label = format!("/{}:{}", issuer, account);
                issuer_param = format!("&issuer={}", issuer);
            }
            None => label = format!("/{}", account),
        }
    }
    format!(
        "otpauth://totp{}?secret={}&period={}&digits={}&algorithm={}{}",
        label,
        base32_seed,
        DEFAULT_TIME_STEP,
        DEFAULT_LENGTH,
        OtpAlgorithm::Sha1.as_str(),
        issuer_param
    )
}

/// Input for [`generate_totp_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpInput {
    /// Custom fields of the entry
    pub fields: Vec<EntryField>,
    /// Unix time to generate the code for; now when absent
    #[serde(default)]
    pub unix_time: Option<i64>,
}

/// Output of [`generate_totp_json`]; `code` is `None` when the entry has no OTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotpOutput {
    pub code: Option<String>,
    pub time_step: Option<u32>,
    pub elapsed_time_fraction: Option<f32>,
}

/// Read OTP configuration from JSON-encoded entry fields and generate a code.
pub fn generate_totp_json(input_json: &str) -> FinderResult<String> {
    let input: TotpInput = serde_json::from_str(input_json)?;
    let output = match TotpGenerator::from_fields(&input.fields)? {
        Some(generator) => {
            let unix_time = input
                .unix_time
                .unwrap_or_else(|| chrono::Utc::now().timestamp());
            TotpOutput {
                code: Some(generator.generate_at(unix_time)?),
                time_step: Some(generator.time_step()),
                elapsed_time_fraction: Some(generator.elapsed_time_fraction_at(unix_time as f64)),
            }
        }
        None => TotpOutput {
            code: None,
            time_step: None,
            elapsed_time_fraction: None,
        },
    };
    Ok(serde_json::to_string(&output)?)
}

fn param_error(name: &str) -> FinderError {
    FinderError::Otp(format!("OTP parameter cannot be parsed [parameter: {}]", name))
}

/// Decoded `name=value` pairs of a query string; later duplicates win.
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn parse(query: &str) -> Self {
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((name, value)) => (percent_decode(name), percent_decode(value)),
                None => (percent_decode(pair), String::new()),
            })
            .collect();
        Self(pairs)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn parse_or(&self, name: &str, default: u32) -> FinderResult<u32> {
        match self.get(name) {
            Some(value) => value.trim().parse().map_err(|_| param_error(name)),
            None => Ok(default),
        }
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn percent_encode(input: &str) -> String {
    input
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                char::from(b).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

fn decode_base32(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=' && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase();
    BASE32_NOPAD.decode(cleaned.as_bytes()).ok()
}

/// Seeds of the split-field format may be base32, base32hex or base64.
fn decode_seed(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| *c != ' ').collect();
    let unpadded = cleaned.trim_end_matches('=');
    decode_base32(unpadded)
        .or_else(|| BASE32HEX_NOPAD.decode(unpadded.to_ascii_uppercase().as_bytes()).ok())
        .or_else(|| BASE64.decode(cleaned.as_bytes()).ok())
        .filter(|seed| !seed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_SEED_SHA1: &[u8] = b"12345678901234567890";
    const RFC_SEED_SHA256: &[u8] = b"12345678901234567890123456789012";
    const RFC_SEED_SHA512: &[u8] =
        b"1234567890123456789012345678901234567890123456789012345678901234";

    /// Base32 of "Hello!\xDE\xAD\xBE\xEF"
    const BASE32_SEED: &str = "JBSWY3DPEHPK3PXP";

    #[test]
    fn test_hotp_rfc4226_vectors() {
        let expected = ["755224", "287082", "359152", "969429", "338314"];
        for (counter, code) in expected.iter().enumerate() {
            assert_eq!(
                hotp(RFC_SEED_SHA1, counter as u64, 6, OtpAlgorithm::Sha1).unwrap(),
                *code
            );
        }
    }

    #[test]
    fn test_hotp_rejects_out_of_range_digits() {
        for digits in [0, 11, 20, u32::MAX] {
            assert!(matches!(
                hotp(RFC_SEED_SHA1, 0, digits, OtpAlgorithm::Sha1),
                Err(FinderError::Otp(_))
            ));
        }
        assert_eq!(hotp(RFC_SEED_SHA1, 0, 10, OtpAlgorithm::Sha1).unwrap().len(), 10);
        assert_eq!(hotp(RFC_SEED_SHA1, 0, 1, OtpAlgorithm::Sha1).unwrap(), "4");
    }

    #[test]
    fn test_totp_rfc6238_vectors() {
        let cases = [
            (59, RFC_SEED_SHA1, OtpAlgorithm::Sha1, "94287082"),
            (59, RFC_SEED_SHA256, OtpAlgorithm::Sha256, "46119246"),
            (59, RFC_SEED_SHA512, OtpAlgorithm::Sha512, "90693936"),
            (1111111109, RFC_SEED_SHA1, OtpAlgorithm::Sha1, "07081804"),
            (1111111109, RFC_SEED_SHA256, OtpAlgorithm::Sha256, "68084774"),
            (1111111109, RFC_SEED_SHA512, OtpAlgorithm::Sha512, "25091201"),
            (2000000000, RFC_SEED_SHA1, OtpAlgorithm::Sha1, "69279037"),
        ];
        for (time, seed, algorithm, code) in cases {
            let generator = TotpGenerator::rfc6238(seed.to_vec(), 30, 8, algorithm).unwrap();
            assert_eq!(generator.generate_at(time).unwrap(), code, "t={} {:?}", time, algorithm);
        }
    }

    #[test]
    fn test_rfc6238_rejects_bad_parameters() {
        assert!(TotpGenerator::rfc6238(vec![1], 30, 3, OtpAlgorithm::Sha1).is_err());
        assert!(TotpGenerator::rfc6238(vec![1], 30, 9, OtpAlgorithm::Sha1).is_err());
        assert!(TotpGenerator::rfc6238(vec![1], 0, 6, OtpAlgorithm::Sha1).is_err());
        assert!(TotpGenerator::rfc6238(vec![], 30, 6, OtpAlgorithm::Sha1).is_err());
    }

    #[test]
    fn test_steam_code_alphabet() {
        let generator = TotpGenerator::steam(RFC_SEED_SHA1.to_vec(), 30).unwrap();
        let code = generator.generate_at(1_700_000_000).unwrap();
        assert_eq!(code.len(), 5);
        assert!(code.bytes().all(|c| STEAM_CHARS.contains(&c)));
        assert_eq!(code, generator.generate_at(1_700_000_001).unwrap());
    }

    #[test]
    fn test_verify_at() {
        let generator = TotpGenerator::rfc6238(RFC_SEED_SHA1.to_vec(), 30, 8, OtpAlgorithm::Sha1).unwrap();
        assert!(generator.verify_at("94287082", 59).unwrap());
        assert!(generator.verify_at(" 94287082 ", 59).unwrap());
        assert!(!generator.verify_at("94287083", 59).unwrap());
        assert!(!generator.verify_at("9428708", 59).unwrap());
    }

    #[test]
    fn test_elapsed_time_fraction() {
        let generator = TotpGenerator::rfc6238(RFC_SEED_SHA1.to_vec(), 30, 6, OtpAlgorithm::Sha1).unwrap();
        assert_eq!(generator.elapsed_time_fraction_at(60.0), 0.0);
        assert!((generator.elapsed_time_fraction_at(75.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_otpauth_uri() {
        let generator = parse_single_field(
            "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example&algorithm=sha256&digits=8&period=60",
        )
        .unwrap();
        assert_eq!(
            generator,
            TotpGenerator::Rfc6238 {
                seed: decode_base32(BASE32_SEED).unwrap(),
                time_step: 60,
                length: 8,
                algorithm: OtpAlgorithm::Sha256,
            }
        );
    }

    #[test]
    fn test_otpauth_uri_defaults_and_steam() {
        let generator = parse_single_field("otpauth://totp/x?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert!(matches!(
            generator,
            TotpGenerator::Rfc6238 { time_step: 30, length: 6, algorithm: OtpAlgorithm::Sha1, .. }
        ));

        let steam = parse_single_field("otpauth://totp/Steam:alice?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert!(matches!(steam, TotpGenerator::Steam { time_step: 30, .. }));

        let steam = parse_single_field("otpauth://totp/x?secret=JBSWY3DPEHPK3PXP&encoder=steam").unwrap();
        assert!(matches!(steam, TotpGenerator::Steam { .. }));
    }

    #[test]
    fn test_otpauth_uri_type_ignores_case() {
        let generator = parse_single_field("otpauth://TOTP/x?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert!(matches!(generator, TotpGenerator::Rfc6238 { time_step: 30, length: 6, .. }));
    }

    #[test]
    fn test_otpauth_uri_errors() {
        assert!(parse_single_field("otpauth://hotp/x?secret=JBSWY3DPEHPK3PXP").is_err());
        assert!(parse_single_field("otpauth://totp/x?period=30").is_err());
        assert!(parse_single_field("otpauth://totp/x?secret=JBSWY3DPEHPK3PXP&algorithm=MD5").is_err());
        assert!(parse_single_field("otpauth://totp/x?secret=JBSWY3DPEHPK3PXP&digits=ten").is_err());
        assert!(parse_single_field("https://example.com").is_err());
    }

    #[test]
    fn test_keeotp_format() {
        let generator = parse_single_field("key=JBSWY3DPEHPK3PXP&step=45&size=7&otpHashMode=Sha512").unwrap();
        assert!(matches!(
            generator,
            TotpGenerator::Rfc6238 { time_step: 45, length: 7, algorithm: OtpAlgorithm::Sha512, .. }
        ));
        assert!(parse_single_field("key=JBSWY3DPEHPK3PXP&type=hotp").is_err());
    }

    #[test]
    fn test_split_fields() {
        let fields = vec![
            EntryField::new(SEED_FIELD_NAME, "JBSW Y3DP EHPK 3PXP"),
            EntryField::new(SETTINGS_FIELD_NAME, "60;8"),
        ];
        let generator = TotpGenerator::from_fields(&fields).unwrap().unwrap();
        assert!(matches!(generator, TotpGenerator::Rfc6238 { time_step: 60, length: 8, .. }));

        let fields = vec![
            EntryField::new(SEED_FIELD_NAME, BASE32_SEED),
            EntryField::new(SETTINGS_FIELD_NAME, "30;S"),
        ];
        let generator = TotpGenerator::from_fields(&fields).unwrap().unwrap();
        assert!(matches!(generator, TotpGenerator::Steam { .. }));

        let fields = vec![
            EntryField::new(SEED_FIELD_NAME, BASE32_SEED),
            EntryField::new(SETTINGS_FIELD_NAME, "30"),
        ];
        assert!(TotpGenerator::from_fields(&fields).is_err());
    }

    #[test]
    fn test_keepass_fields() {
        let fields = vec![
            EntryField::new(TIME_OTP_SECRET_FIELD_NAME, BASE32_SEED),
            EntryField::new(TIME_OTP_LENGTH_FIELD_NAME, "8"),
            EntryField::new(TIME_OTP_PERIOD_FIELD_NAME, "60"),
            EntryField::new(TIME_OTP_ALGORITHM_FIELD_NAME, "HMAC-SHA-256"),
        ];
        let generator = TotpGenerator::from_fields(&fields).unwrap().unwrap();
        assert!(matches!(
            generator,
            TotpGenerator::Rfc6238 { time_step: 60, length: 8, algorithm: OtpAlgorithm::Sha256, .. }
        ));
    }

    #[test]
    fn test_no_otp_fields() {
        let fields = vec![EntryField::new("Recovery codes", "1234")];
        assert_eq!(TotpGenerator::from_fields(&fields).unwrap(), None);
    }

    #[test]
    fn test_generate_totp_json() {
        let input = serde_json::json!({
            "fields": [{"name": "otp", "value": "otpauth://totp/x?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&digits=8"}],
            "unix_time": 59
        });
        let output: TotpOutput =
            serde_json::from_str(&generate_totp_json(&input.to_string()).unwrap()).unwrap();
        assert_eq!(output.code.as_deref(), Some("94287082"));
        assert_eq!(output.time_step, Some(30));

        let input = serde_json::json!({ "fields": [] });
        let output: TotpOutput =
            serde_json::from_str(&generate_totp_json(&input.to_string()).unwrap()).unwrap();
        assert_eq!(output.code, None);

        let input = serde_json::json!({ "fields": [{"name": "otp", "value": "otpauth://totp/x"}] });
        assert!(matches!(generate_totp_json(&input.to_string()), Err(FinderError::Otp(_))));
    }

    #[test]
    fn test_generate_totp_json_without_time_uses_clock() {
        let input = serde_json::json!({
            "fields": [{"name": "TOTP Seed", "value": "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ"}]
        });
        let output: TotpOutput =
            serde_json::from_str(&generate_totp_json(&input.to_string()).unwrap()).unwrap();
        let code = output.code.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| b.is_ascii_digit()));
        let fraction = output.elapsed_time_fraction.unwrap();
        assert!((0.0..1.0).contains(&fraction));
    }

    #[test]
    fn test_make_otpauth_uri_round_trips() {
        let uri = make_otpauth_uri(BASE32_SEED, Some("Acme: Inc"), Some("alice"));
        assert!(uri.starts_with("otpauth://totp/Acme_%20Inc:alice?secret=JBSWY3DPEHPK3PXP"));
        let generator = parse_single_field(&uri).unwrap();
        assert!(matches!(generator, TotpGenerator::Rfc6238 { time_step: 30, length: 6, .. }));

        assert_eq!(
            make_otpauth_uri(BASE32_SEED, None, None),
            "otpauth://totp?secret=JBSWY3DPEHPK3PXP&period=30&digits=6&algorithm=SHA1"
        );
    }
}
