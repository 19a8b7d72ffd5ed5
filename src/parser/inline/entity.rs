//! HTML entity and numeric character reference decoding.

use once_cell::sync::Lazy;
use regex::Regex;

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:#[Xx][0-9A-Fa-f]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

/// Decode the entity reference at the start of `s`, returning the decoded
/// text and the number of input bytes consumed. Unknown named entities are
/// left to the caller as literal text.
pub(super) fn parse(s: &str) -> Option<(String, usize)> {
    let m = ENTITY.find(s)?;
    let body = &s[1..m.len() - 1];
    if let Some(num) = body.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        let c = match code {
            0 => '\u{FFFD}',
            n => char::from_u32(n).unwrap_or('\u{FFFD}'),
        };
        return Some((c.to_string(), m.len()));
    }
    named(body).map(|text| (text.to_string(), m.len()))
}

/// The named entities in common editorial use. Anything outside this table
/// stays literal.
fn named(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" | "AMP" => "&",
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "quot" | "QUOT" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "plusmn" => "\u{b1}",
        "micro" => "\u{b5}",
        "para" => "\u{b6}",
        "sect" => "\u{a7}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "permil" => "\u{2030}",
        "prime" => "\u{2032}",
        "Prime" => "\u{2033}",
        "larr" => "\u{2190}",
        "uarr" => "\u{2191}",
        "rarr" => "\u{2192}",
        "darr" => "\u{2193}",
        "harr" => "\u{2194}",
        "infin" => "\u{221e}",
        "ne" => "\u{2260}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "deg" => "\u{b0}",
        "frac12" => "\u{bd}",
        "frac14" => "\u{bc}",
        "frac34" => "\u{be}",
        "cent" => "\u{a2}",
        "pound" => "\u{a3}",
        "euro" => "\u{20ac}",
        "yen" => "\u{a5}",
        "szlig" => "\u{df}",
        "auml" => "\u{e4}",
        "ouml" => "\u{f6}",
        "uuml" => "\u{fc}",
        "eacute" => "\u{e9}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::parse;

    #[test]
    fn named_entities() {
        assert_eq!(parse("&amp;x"), Some(("&".to_string(), 5)));
        assert_eq!(parse("&copy;"), Some(("\u{a9}".to_string(), 6)));
        assert_eq!(parse("&rarr;"), Some(("\u{2192}".to_string(), 6)));
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(parse("&zzz;"), None);
        assert_eq!(parse("&amp x"), None);
    }

    #[test]
    fn decimal_reference() {
        assert_eq!(parse("&#35;"), Some(("#".to_string(), 5)));
    }

    #[test]
    fn hex_reference() {
        assert_eq!(parse("&#x22;"), Some(("\"".to_string(), 6)));
        assert_eq!(parse("&#X4E2D;"), Some(("\u{4e2d}".to_string(), 8)));
    }

    #[test]
    fn invalid_code_points_replaced() {
        assert_eq!(parse("&#0;"), Some(("\u{fffd}".to_string(), 4)));
        assert_eq!(parse("&#xD800;"), Some(("\u{fffd}".to_string(), 8)));
    }

    #[test]
    fn overlong_numeric_rejected() {
        assert_eq!(parse("&#12345678;"), None);
    }
}
