//! Tolerant HTML tokenizer for clipboard markup.
//!
//! Never fails: anything that does not look like a tag is text, an
//! unterminated tag runs to the end of input, and an unterminated comment
//! swallows the rest. Tag and attribute names are ASCII `[A-Za-z0-9:_-]`
//! and lowercased. `script` and `style` bodies are raw text.

use std::borrow::Cow;

use memchr::memchr;
use smol_str::SmolStr;

use crate::content::is_void_name;
use crate::markup::entities::decode_entities;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Text(String),
    StartTag {
        name: SmolStr,
        attributes: Vec<(SmolStr, String)>,
        self_closing: bool,
    },
    EndTag(SmolStr),
    Comment(String),
    Doctype(String),
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

fn starts_with_ignore_case(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(needle))
}

/// Byte range of the `</name>` closing a raw text element, relative to
/// `input`.
fn find_raw_text_end(input: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        i += memchr(b'<', &bytes[i..])?;
        if bytes.get(i + 1) == Some(&b'/') && starts_with_ignore_case(bytes, i + 2, name.as_bytes()) {
            let mut k = i + 2 + name.len();
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn name(&mut self) -> SmolStr {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        SmolStr::new(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn attribute_value(&mut self) -> String {
        match self.bytes.get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                let len = memchr(quote, &self.bytes[start..]).unwrap_or(self.bytes.len() - start);
                self.pos = start + len;
                let raw = &self.input[start..self.pos];
                if self.pos < self.bytes.len() {
                    self.pos += 1;
                }
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while self.pos < self.bytes.len() {
                    let b = self.bytes[self.pos];
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    if b == b'/' && self.bytes.get(self.pos + 1) == Some(&b'>') {
                        break;
                    }
                    self.pos += 1;
                }
                decode_entities(&self.input[start..self.pos])
            }
        }
    }

    /// Attributes up to and including the closing `>`.
    fn attributes(&mut self) -> (Vec<(SmolStr, String)>, bool) {
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => return (attributes, false),
                Some(b'>') => {
                    self.pos += 1;
                    return (attributes, false);
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        return (attributes, true);
                    }
                }
                Some(_) => {
                    let name = self.name();
                    if name.is_empty() {
                        // Stray byte such as a lone quote.
                        self.pos += 1;
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.bytes.get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.attribute_value()
                    } else {
                        String::new()
                    };
                    if !attributes.iter().any(|(existing, _)| *existing == name) {
                        attributes.push((name, value));
                    }
                }
            }
        }
    }
}

/// Split markup into tokens. Raw NUL characters become U+FFFD.
pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let cleaned = match memchr(0, input.as_bytes()) {
        Some(_) => Cow::Owned(input.replace('\0', "\u{fffd}")),
        None => Cow::Borrowed(input),
    };
    let input: &str = &cleaned;
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut scanner = Scanner {
        input,
        bytes,
        pos: 0,
    };

    while scanner.pos < bytes.len() {
        let start = scanner.pos;
        if bytes[start] != b'<' {
            let end = memchr(b'<', &bytes[start..]).map_or(bytes.len(), |i| start + i);
            tokens.push(Token::Text(decode_entities(&input[start..end])));
            scanner.pos = end;
            continue;
        }

        if input[start..].starts_with("<!--") {
            let body = start + 4;
            match input[body..].find("-->") {
                Some(len) => {
                    tokens.push(Token::Comment(input[body..body + len].to_string()));
                    scanner.pos = body + len + 3;
                }
                None => {
                    tokens.push(Token::Comment(input[body..].to_string()));
                    scanner.pos = bytes.len();
                }
            }
            continue;
        }

        if bytes.get(start + 1) == Some(&b'!') || bytes.get(start + 1) == Some(&b'?') {
            let end = memchr(b'>', &bytes[start..]).map_or(bytes.len(), |i| start + i + 1);
            if starts_with_ignore_case(bytes, start, b"<!doctype") {
                let inner = input[start + 2..end].trim_end_matches('>').trim();
                tokens.push(Token::Doctype(inner.to_string()));
            }
            scanner.pos = end;
            continue;
        }

        if bytes.get(start + 1) == Some(&b'/') {
            scanner.pos = start + 2;
            let name = scanner.name();
            let end = memchr(b'>', &bytes[scanner.pos..]).map_or(bytes.len(), |i| scanner.pos + i + 1);
            scanner.pos = end;
            if !name.is_empty() {
                tokens.push(Token::EndTag(name));
            }
            continue;
        }

        if !bytes.get(start + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            // A `<` that does not open a tag is text.
            let end = memchr(b'<', &bytes[start + 1..]).map_or(bytes.len(), |i| start + 1 + i);
            tokens.push(Token::Text(decode_entities(&input[start..end])));
            scanner.pos = end;
            continue;
        }

        scanner.pos = start + 1;
        let name = scanner.name();
        let (attributes, explicit_self_closing) = scanner.attributes();
        let self_closing = explicit_self_closing || is_void_name(&name);
        let raw_text = !self_closing && matches!(name.as_str(), "script" | "style");
        tokens.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });

        if raw_text {
            let body = scanner.pos;
            match find_raw_text_end(&input[body..], &name) {
                Some((text_end, tag_end)) => {
                    if text_end > 0 {
                        tokens.push(Token::Text(input[body..body + text_end].to_string()));
                    }
                    scanner.pos = body + tag_end;
                }
                None => {
                    if body < bytes.len() {
                        tokens.push(Token::Text(input[body..].to_string()));
                    }
                    scanner.pos = bytes.len();
                }
            }
            tokens.push(Token::EndTag(name));
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attributes: &[(&str, &str)], self_closing: bool) -> Token {
        Token::StartTag {
            name: name.into(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (SmolStr::new(k), v.to_string()))
                .collect(),
            self_closing,
        }
    }

    #[test]
    fn test_tokenize_tags_and_text() {
        let tokens = tokenize("<P class=\"a\">Hi &amp; <B>bye</b></p>");
        assert_eq!(
            tokens,
            vec![
                start("p", &[("class", "a")], false),
                Token::Text("Hi & ".into()),
                start("b", &[], false),
                Token::Text("bye".into()),
                Token::EndTag("b".into()),
                Token::EndTag("p".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_void_and_unquoted_attributes() {
        let tokens = tokenize("<img src=a.png alt='x y'><br/>");
        assert_eq!(
            tokens,
            vec![
                start("img", &[("src", "a.png"), ("alt", "x y")], true),
                start("br", &[], true),
            ]
        );
    }

    #[test]
    fn test_tokenize_comments_and_doctype() {
        let tokens = tokenize("<!DOCTYPE html><!--StartFragment-->x<!-- open");
        assert_eq!(
            tokens,
            vec![
                Token::Doctype("DOCTYPE html".into()),
                Token::Comment("StartFragment".into()),
                Token::Text("x".into()),
                Token::Comment(" open".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_raw_text_elements() {
        let tokens = tokenize("<script>if (a < b) {}</SCRIPT >after");
        assert_eq!(
            tokens,
            vec![
                start("script", &[], false),
                Token::Text("if (a < b) {}".into()),
                Token::EndTag("script".into()),
                Token::Text("after".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_replaces_nul() {
        assert_eq!(
            tokenize("a\0<b title=\"x\0\">"),
            vec![
                Token::Text("a\u{fffd}".into()),
                start("b", &[("title", "x\u{fffd}")], false),
            ]
        );
    }

    #[test]
    fn test_tokenize_stray_angle_bracket_is_text() {
        let tokens = tokenize("1 < 2 <b>x");
        assert_eq!(
            tokens,
            vec![
                Token::Text("1 ".into()),
                Token::Text("< 2 ".into()),
                start("b", &[], false),
                Token::Text("x".into()),
            ]
        );
    }
}
