//! WhatsApp deep links
//!
//! Numbers are Indonesian by default. ``wa.me`` wants the country code
//! without a leading ``+``.
use lazy_static::lazy_static;
use regex::Regex;
use url::form_urlencoded::byte_serialize;

use crate::auth::signup::ValidationError;

pub const COUNTRY_CODE: &str = "62";
const WA_ME: &str = "https://wa.me/";

/// Shortest number (country code included) that is accepted as a target
pub const MIN_PHONE_LEN: usize = 10;

/// Strips everything but digits, turns a trunk ``0`` into ``62`` and adds ``62`` if missing
pub fn normalize_phone(input: &str) -> String {
    lazy_static! {
        static ref NON_DIGIT: Regex = Regex::new(r"\D").unwrap();
    }
    let cleaned = NON_DIGIT.replace_all(input, "");

    if let Some(rest) = cleaned.strip_prefix('0') {
        format!("{}{}", COUNTRY_CODE, rest)
    } else if cleaned.starts_with(COUNTRY_CODE) {
        cleaned.into_owned()
    } else {
        format!("{}{}", COUNTRY_CODE, cleaned)
    }
}

/// Normalizes and rejects numbers too short to be real
pub fn validate_phone(input: &str) -> Result<String, ValidationError> {
    let phone = normalize_phone(input);
    if phone.len() < MIN_PHONE_LEN {
        return Err(ValidationError::InvalidWhatsapp);
    }
    Ok(phone)
}

/// Characters ``encodeURIComponent`` keeps that form encoding escapes
const URI_UNRESERVED: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%7E", "~"),
];

/// Percent-encodes like javascript's ``encodeURIComponent`` (spaces become ``%20``)
pub fn encode_uri_component(value: &str) -> String {
    // byte_serialize turns a literal '+' into %2B, so every '+' left is a space
    let encoded = byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    URI_UNRESERVED
        .iter()
        .fold(encoded, |encoded, (escaped, kept)| encoded.replace(escaped, kept))
}

/// ``https://wa.me/<digits>`` with an optional pre-filled message
pub fn wa_link(phone: &str, message: Option<&str>) -> String {
    let phone = normalize_phone(phone);
    match message {
        Some(text) => format!("{}{}?text={}", WA_ME, phone, encode_uri_component(text)),
        None => format!("{}{}", WA_ME, phone),
    }
}
