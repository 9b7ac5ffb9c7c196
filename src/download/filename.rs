//! Filename extraction, sanitization, and collision resolution for downloads.
//!
//! The save name comes from `Content-Disposition` when the server sends one,
//! otherwise from the last URL path segment. Existing files are never
//! overwritten: `report.zip` becomes `report(1).zip`, `report(2).zip`, ...

use std::collections::HashSet;
use std::hash::BuildHasher;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

/// Base name used when neither the headers nor the URL provide one.
const FALLBACK_STEM: &str = "download";

/// Guess file extension from Content-Type header.
pub(crate) fn extension_from_content_type(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "text/html" => ".html",
        "text/plain" => ".txt",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/pdf" => ".pdf",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/svg+xml" => ".svg",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "application/vnd.android.package-archive" => ".apk",
        "video/mp4" => ".mp4",
        "audio/mpeg" => ".mp3",
        _ => ".bin",
    }
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles:
/// - `attachment; filename="example.zip"`
/// - `attachment; filename=example.zip`
/// - `attachment; filename*=UTF-8''example.zip` (RFC 5987, preferred)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        // charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name)
                && !decoded.is_empty()
            {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = find_plain_filename_param(header)?;
    let value = header[pos + "filename=".len()..].trim();

    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"').unwrap_or(stripped.len());
        let filename = stripped[..end].trim();
        return (!filename.is_empty()).then(|| filename.to_string());
    }

    let end = value.find(';').unwrap_or(value.len());
    let filename = value[..end].trim().replace('"', "");
    (!filename.is_empty()).then_some(filename)
}

/// Finds `filename=` that is not the tail of `filename*=`.
fn find_plain_filename_param(header: &str) -> Option<usize> {
    header
        .match_indices("filename=")
        .map(|(pos, _)| pos)
        .find(|&pos| pos == 0 || !header[..pos].ends_with('*'))
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Last non-empty URL path segment, percent-decoded.
pub(crate) fn filename_from_url(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    let last = segments.next_back().filter(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(last).map_or_else(
        |e| {
            debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
            last.to_string()
        },
        std::borrow::Cow::into_owned,
    );
    Some(decoded)
}

/// Chooses the name a download should be saved under, before collision handling.
///
/// Priority: `Content-Disposition`, then the URL's last path segment, then
/// `download` with an extension guessed from `Content-Type`.
#[must_use]
pub fn proposed_filename(
    content_disposition: Option<&str>,
    content_type: Option<&str>,
    url: &Url,
) -> String {
    let candidate = content_disposition
        .and_then(parse_content_disposition)
        .or_else(|| filename_from_url(url))
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.trim_matches('_').is_empty());

    candidate.unwrap_or_else(|| {
        let extension = content_type.map_or(".bin", extension_from_content_type);
        format!("{FALLBACK_STEM}{extension}")
    })
}

/// Splits a filename at its last `.` into stem and extension (dot included).
///
/// A leading dot does not start an extension, so `.profile` has none.
#[must_use]
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// Returns `proposed` if free, else the first free `stem(n)ext` for n = 1, 2, ...
pub fn unique_name_with<F>(proposed: &str, mut is_taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    if !is_taken(proposed) {
        return proposed.to_string();
    }

    let (stem, ext) = split_extension(proposed);
    (1u64..)
        .map(|index| format!("{stem}({index}){ext}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| proposed.to_string())
}

/// Resolves a name collision against a known set of names in the directory.
#[must_use]
pub fn resolve_unique_name<S: BuildHasher>(
    proposed: &str,
    existing: &HashSet<String, S>,
) -> String {
    unique_name_with(proposed, |name| existing.contains(name))
}

/// Resolves a unique file path inside `dir`, checking the filesystem.
///
/// Any directory entry counts as taken, including dangling symlinks.
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let name = unique_name_with(filename, |candidate| {
        dir.join(candidate).symlink_metadata().is_ok()
    });
    dir.join(name)
}
