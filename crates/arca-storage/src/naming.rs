//! File name handling shared by the backends.
//!
//! Name derivation is centralized here so all backends agree on what a safe
//! name, a stem, and a numbered rename look like.

use arca_core::models::MediaKind;

/// Replace every character outside `[A-Za-z0-9._-]` with `_`. Illegal names
/// are repaired, never rejected. An empty result becomes `file`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A name of only dots would resolve to "." / ".." on the filesystem.
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        cleaned
    }
}

/// File name without its extension.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Extension including the leading dot, empty when there is none.
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    }
}

/// Public id for the CDN host: file name minus extension, namespaced by
/// media kind.
pub fn public_id(kind: MediaKind, file_name: &str) -> String {
    format!("{}/{}", kind, file_stem(&sanitize_file_name(file_name)))
}

/// Name for the n-th item of a bulk rename (1-based), keeping the original
/// extension: `<base>_<index><ext>`.
pub fn numbered_name(base: &str, index: usize, original_name: &str) -> String {
    format!("{}_{}{}", base, index, extension(original_name))
}
