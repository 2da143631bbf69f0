//! Character reference decoding for clipboard markup.
//!
//! Decodes the named references clipboard producers actually emit plus
//! well-formed numeric references. Numeric references to NUL, surrogates
//! or past U+10FFFF decode to U+FFFD. Anything else passes through as text.

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("shy", '\u{ad}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("hellip", '\u{2026}'),
    ("copy", '\u{a9}'),
];

/// Longest name in `NAMED`, bounding the scan for `;`.
const MAX_NAME_LEN: usize = 6;
const MAX_DEC_DIGITS: usize = 7;
const MAX_HEX_DIGITS: usize = 6;

/// Decode character references in `input`.
pub(crate) fn decode_entities(input: &str) -> String {
    let Some(first) = memchr::memchr(b'&', input.as_bytes()) else {
        return input.to_string();
    };
    let mut out = String::with_capacity(input.len());
    out.push_str(&input[..first]);
    let mut rest = &input[first..];
    while let Some(after_amp) = rest.strip_prefix('&') {
        match decode_one(after_amp) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &after_amp[consumed..];
            }
            None => {
                out.push('&');
                rest = after_amp;
            }
        }
        let next = memchr::memchr(b'&', rest.as_bytes()).unwrap_or(rest.len());
        out.push_str(&rest[..next]);
        rest = &rest[next..];
    }
    out
}

/// Decode one reference following a `&`. Returns the char and the number
/// of bytes consumed including the `;`.
fn decode_one(input: &str) -> Option<(char, usize)> {
    let bytes = input.as_bytes();
    if let Some(numeric) = input.strip_prefix('#') {
        let (digits, radix, max, prefix) = match numeric.as_bytes().first() {
            Some(b'x' | b'X') => (&numeric[1..], 16, MAX_HEX_DIGITS, 2),
            _ => (numeric, 10, MAX_DEC_DIGITS, 1),
        };
        let end = digits
            .bytes()
            .take(max + 1)
            .position(|b| b == b';')?;
        if end == 0 {
            return None;
        }
        let digits = &digits[..end];
        if !digits.bytes().all(|b| (b as char).is_digit(radix)) {
            return None;
        }
        let value = u32::from_str_radix(digits, radix).ok()?;
        let ch = match value {
            0 => char::REPLACEMENT_CHARACTER,
            value => char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER),
        };
        return Some((ch, prefix + end + 1));
    }
    let end = bytes
        .iter()
        .take(MAX_NAME_LEN + 1)
        .position(|&b| b == b';')?;
    let name = &input[..end];
    NAMED
        .iter()
        .find(|(known, _)| *known == name)
        .map(|&(_, ch)| (ch, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_named_and_numeric() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;p&gt;"), "<p>");
        assert_eq!(decode_entities("x&nbsp;y"), "x\u{a0}y");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
    }

    #[test]
    fn test_leaves_malformed_references() {
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&#99999999;"), "&#99999999;");
        assert_eq!(decode_entities("trailing &"), "trailing &");
        assert_eq!(decode_entities("&#+65;&#x-41;"), "&#+65;&#x-41;");
    }

    #[test]
    fn test_invalid_code_points_become_replacement() {
        assert_eq!(decode_entities("&#0;"), "\u{fffd}");
        assert_eq!(decode_entities("&#xD800;"), "\u{fffd}");
        assert_eq!(decode_entities("&#x110000;"), "\u{fffd}");
        assert_eq!(decode_entities("&#1114112;"), "\u{fffd}");
    }
}
