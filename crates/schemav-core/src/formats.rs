//! String formats for the `format` keyword

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

/// Format names accepted by the `string` type
pub const KNOWN_FORMATS: &[&str] = &[
    "date",
    "date-time",
    "email",
    "hostname",
    "ipv4",
    "ipv6",
    "uri",
    "uriref",
    "url",
];

/// Whether `name` is a supported format
pub fn is_known(name: &str) -> bool {
    KNOWN_FORMATS.contains(&name)
}

/// Check `value` against a format; `None` for an unknown format
pub fn check(name: &str, value: &str) -> Option<bool> {
    let valid = match name {
        "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        "date-time" => DateTime::parse_from_rfc3339(value).is_ok(),
        "email" => matches(&EMAIL_RE, EMAIL, value),
        "hostname" => is_hostname(value),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        "uri" | "url" => matches(&URI_RE, URI, value),
        "uriref" => {
            matches(&URI_RE, URI, value) || matches(&URI_REFERENCE_RE, URI_REFERENCE, value)
        }
        _ => return None,
    };
    Some(valid)
}

const EMAIL: &str = concat!(
    r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@",
    r"[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?",
    r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
);
const HOSTNAME: &str = concat!(
    r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?",
    r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
);
const URI: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s]+$";
const URI_REFERENCE: &str = r"^(?:[/?#.]|[A-Za-z0-9_~%!$&'()*+,;=:@-])[^\s]*$";

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static HOSTNAME_RE: OnceLock<Option<Regex>> = OnceLock::new();
static URI_RE: OnceLock<Option<Regex>> = OnceLock::new();
static URI_REFERENCE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Match against a lazily compiled pattern
fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

fn is_hostname(value: &str) -> bool {
    value.len() <= 253 && matches(&HOSTNAME_RE, HOSTNAME, value)
}
