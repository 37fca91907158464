//! Shared helpers for report rendering.

use std::path::Path;

/// Upper bound for the client part of an artifact name, in bytes. Keeps
/// `report_{n}_{client}.pdf` well under the 255-byte filename limit.
pub const MAX_CLIENT_FRAGMENT_BYTES: usize = 100;

/// Escape special characters for Typst strings.
pub fn escape_typst_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\r', "")
        .replace('\n', r"\n")
}

/// Reduce a client name to a filename fragment. Alphanumerics (any script)
/// and `_` are kept, everything else becomes `_`. The result is cut on a
/// char boundary at `MAX_CLIENT_FRAGMENT_BYTES`.
pub fn sanitize_client_name(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    for ch in name.trim().chars() {
        let ch = if ch.is_alphanumeric() || ch == '_' { ch } else { '_' };
        if result.len() + ch.len_utf8() > MAX_CLIENT_FRAGMENT_BYTES {
            break;
        }
        result.push(ch);
    }

    if result.chars().all(|ch| ch == '_') {
        return fallback.to_string();
    }
    result
}

/// File name of the artifact for the `ordinal`-th record (1-based).
pub fn artifact_file_name(ordinal: usize, client: &str) -> String {
    format!(
        "report_{}_{}.pdf",
        ordinal,
        sanitize_client_name(client, &format!("record_{ordinal}"))
    )
}

/// Get the static assets directory path.
pub fn get_static_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}
