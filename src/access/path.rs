//! Request path canonicalisation.
//!
//! The gate must judge the same path the inner service will serve. Static
//! file serving percent-decodes the path and ignores empty segments, so
//! `//dashboard/doctor` and `/dashboard/%64octor` both reach the doctor
//! dashboard. Decisions are therefore made on the canonical form.

/// Percent-decode `raw` once, drop empty and `.` segments, resolve `..`
/// (never above the root), and strip any trailing slash.
///
/// Backslashes count as separators so that no spelling of a path
/// escapes the gate.
pub fn canonical_path(raw: &str) -> String {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}
