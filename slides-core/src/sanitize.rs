//! File-name sanitizing and image-extension checks. Pure functions.

/// Extensions accepted as slide images (lowercase, with dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".avif", ".svg",
];

const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Which sanitizer turns client names into store names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// Keep case and punctuation, only strip path and shell metacharacters
    #[default]
    Relaxed,
    /// Lowercase `[a-z0-9._-]` only
    Strict,
}

impl NamingPolicy {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Relaxed
        }
    }

    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::Relaxed => sanitize_name(raw),
            Self::Strict => sanitize_strict(raw),
        }
    }
}

/// Replace every maximal run of characters matching `pred` with a single `-`.
fn replace_runs(input: &str, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if pred(c) {
            if !in_run {
                out.push('-');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Trim, replace reserved characters and whitespace with `-`, collapse dashes.
///
/// `" My Photo!! .PNG "` becomes `"My-Photo!!-.PNG"`.
pub fn sanitize_name(raw: &str) -> String {
    let name = replace_runs(raw.trim(), |c| RESERVED.contains(&c));
    let name = replace_runs(&name, char::is_whitespace);
    replace_runs(&name, |c| c == '-')
}

/// Lowercase and keep only `[a-z0-9._-]`, without leading or trailing dashes.
///
/// `" My Photo!! .PNG "` becomes `"my-photo-.png"`.
pub fn sanitize_strict(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let name = replace_runs(&lower, |c| {
        !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' || c == '-')
    });
    let name = replace_runs(&name, |c| c == '-');
    name.trim_matches('-').to_string()
}

/// Lowercased trailing `.` + ASCII alphanumerics, or `""` when there is none.
pub fn extension_of(name: &str) -> String {
    let lower = name.to_lowercase();
    let tail_len = lower
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric())
        .count();
    if tail_len == 0 {
        return String::new();
    }
    let split = lower.len() - tail_len;
    if lower[..split].ends_with('.') {
        lower[split - 1..].to_string()
    } else {
        String::new()
    }
}

pub fn is_allowed_image(name: &str) -> bool {
    let ext = extension_of(name);
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}
