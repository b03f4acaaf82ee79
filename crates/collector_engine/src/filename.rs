use sha2::{Digest, Sha256};

const MAX_STEM_LEN: usize = 80;

/// Checkpoint filename for a group key: `{key}.json`.
pub fn checkpoint_filename(group_key: &str) -> String {
    format!("{}.json", group_file_stem(group_key))
}

/// Per-group file stem shared by checkpoint and lookup files.
///
/// Keys that are not already safe filenames are sanitized and suffixed with a
/// short hash of the raw key, so two distinct keys never share a file.
pub fn group_file_stem(group_key: &str) -> String {
    let stem = safe_file_stem(group_key);
    if stem == group_key {
        stem
    } else {
        format!("{stem}--{}", short_hash(group_key))
    }
}

/// Filesystem-safe stem: forbidden characters become `_`, runs of `_` collapse,
/// Windows reserved names get a trailing `_`.
pub fn safe_file_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    let cleaned = if cleaned.is_empty() { "group" } else { cleaned };

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    if compacted.len() > MAX_STEM_LEN {
        let mut end = MAX_STEM_LEN;
        while !compacted.is_char_boundary(end) {
            end -= 1;
        }
        compacted.truncate(end);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
