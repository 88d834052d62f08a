//! `{placeholder}` templates and file name sanitizing.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Replaces each `{name}` with `lookup(name)`. Unknown names are left as-is.
pub fn render<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Makes `value` safe to use as a single path component.
pub fn sanitize(value: &str, replacement: &str) -> String {
    if cfg!(windows) {
        let replaced: String = value
            .chars()
            .map(|c| {
                if matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                    replacement.to_string()
                } else {
                    c.to_string()
                }
            })
            .collect();
        replaced.trim_end_matches(['.', ' ']).to_string()
    } else {
        value.replace('/', replacement)
    }
}

/// Capitalizes the first letter of every word and lowercases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_known_and_unknown() {
        let out = render("{a} and {b} {unknown}", |key| match key {
            "a" => Some("x".to_string()),
            "b" => Some("y".to_string()),
            _ => None,
        });
        assert_eq!(out, "x and y {unknown}");
    }

    #[test]
    fn test_sanitize_slash() {
        assert_eq!(sanitize("AC/DC", "-"), "AC-DC");
        assert_eq!(sanitize("plain", "_"), "plain");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("spotify"), "Spotify");
        assert_eq!(title_case("youtube_music"), "Youtube_Music");
        assert_eq!(title_case("ALBUM"), "Album");
    }
}
