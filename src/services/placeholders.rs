use std::str::Chars;

use tracing::{error, info, warn};

use crate::error::PlaceholderError;
use crate::models::location::{PlaceholderMap, ResourceLocation};
use crate::resources::{self, ResourceError};

/// Loads a tenant's placeholder file. A missing file is never an error; other
/// read or parse failures degrade to an empty map unless `strict` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderLoader {
    strict: bool,
}

impl PlaceholderLoader {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub async fn load(
        &self,
        location: Option<&ResourceLocation>,
    ) -> Result<PlaceholderMap, PlaceholderError> {
        let Some(location) = location else {
            return Ok(PlaceholderMap::new());
        };

        if location.is_on_disk() {
            info!("Checking filesystem path {location} for placeholder properties");
        } else {
            info!("Checking bundled resources {location} for placeholder properties");
        }

        match read_placeholders(location).await {
            Ok(map) => {
                info!("Placeholder properties loaded: {} entries", map.len());
                Ok(map)
            }
            Err(PlaceholderError::NotFound(_)) => {
                warn!("No placeholder file found at {location}, continuing without placeholders");
                Ok(PlaceholderMap::new())
            }
            Err(e) if self.strict => {
                error!("Unable to load placeholder properties: {e}");
                Err(e)
            }
            Err(e) => {
                error!("Unable to load placeholder properties, continuing without placeholders: {e}");
                Ok(PlaceholderMap::new())
            }
        }
    }
}

async fn read_placeholders(location: &ResourceLocation) -> Result<PlaceholderMap, PlaceholderError> {
    let bytes = resources::read(location).await.map_err(|e| match e {
        ResourceError::NotFound => PlaceholderError::NotFound(location.to_string()),
        ResourceError::Io(source) => PlaceholderError::Io {
            location: location.to_string(),
            source,
        },
    })?;

    parse_properties(&decode(bytes, location)).map_err(|e| PlaceholderError::Parse {
        location: location.to_string(),
        line: e.line,
        message: e.message,
    })
}

/// UTF-8 first; anything else is read as ISO-8859-1, one char per byte, the
/// traditional `.properties` encoding.
fn decode(bytes: Vec<u8>, location: &ResourceLocation) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("Placeholder file {location} is not UTF-8, reading it as ISO-8859-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesError {
    pub line: usize,
    pub message: String,
}

/// Parses Java-style `.properties` text. Later duplicates replace earlier ones.
pub fn parse_properties(text: &str) -> Result<PlaceholderMap, PropertiesError> {
    let mut map = PlaceholderMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line = idx + 1;
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key).map_err(|message| PropertiesError { line, message })?;
        let value = unescape(value).map_err(|message| PropertiesError { line, message })?;
        map.insert(key, value);
    }

    Ok(map)
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let rest = line[key_end..].trim_start_matches(is_blank);
    let rest = rest.strip_prefix(|c: char| c == '=' || c == ':').unwrap_or(rest);
    (&line[..key_end], rest.trim_start_matches(is_blank))
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn hex4(chars: &mut Chars<'_>) -> Result<u16, String> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 {
        return Err(format!("malformed \\u escape: \\u{digits}"));
    }
    u16::from_str_radix(&digits, 16).map_err(|_| format!("malformed \\u escape: \\u{digits}"))
}

fn unicode_escape(chars: &mut Chars<'_>) -> Result<char, String> {
    let first = hex4(chars)?;
    let mut units = vec![first];
    if (0xD800..0xDC00).contains(&first) {
        // high surrogate, the low half must follow as another \u escape
        if chars.next() == Some('\\') && chars.next() == Some('u') {
            units.push(hex4(chars)?);
        }
    }

    let mut decoded = char::decode_utf16(units);
    match (decoded.next(), decoded.next()) {
        (Some(Ok(c)), None) => Ok(c),
        _ => Err(format!("invalid unicode escape \\u{first:04X}")),
    }
}
