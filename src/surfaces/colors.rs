//! Surface display colors.
//!
//! New surfaces take the first palette color not already in use. Once the
//! palette is exhausted, colors are derived from a blake3 hash of the surface
//! name and retried until unused, so generated colors never collide.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{GeoError, GeoResult, ValidationError};

/// Default palette, in assignment order.
pub const DEFAULT_PALETTE: [&str; 12] = [
    "#015482", "#9f0052", "#ffbe00", "#728f02", "#443988", "#ff3f20",
    "#5da629", "#4878d0", "#ee854a", "#6acc64", "#d65f5f", "#956cb4",
];

const MAX_HASH_ATTEMPTS: u32 = 4096;

static HEX_COLOR: OnceLock<Option<Regex>> = OnceLock::new();

fn hex_color_regex() -> GeoResult<&'static Regex> {
    HEX_COLOR
        .get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").ok())
        .as_ref()
        .ok_or_else(|| GeoError::internal("hex color pattern failed to compile"))
}

/// Validates a `#rrggbb` color and returns it lowercased.
///
/// # Errors
/// Returns `InvalidColor` for anything else.
pub fn normalize_color(value: &str) -> GeoResult<String> {
    let trimmed = value.trim();
    if hex_color_regex()?.is_match(trimmed) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(ValidationError::InvalidColor {
            value: value.to_string(),
        }
        .into())
    }
}

/// Picks a color for `surface` that is not in `used`.
pub(crate) fn next_color(surface: &str, used: &HashSet<String>) -> String {
    if let Some(color) = DEFAULT_PALETTE.iter().find(|c| !used.contains(**c)) {
        return (*color).to_string();
    }
    for attempt in 0..MAX_HASH_ATTEMPTS {
        let color = hashed_color(surface, attempt);
        if !used.contains(&color) {
            return color;
        }
    }
    // Only reached once millions of colors are in use.
    hashed_color(surface, MAX_HASH_ATTEMPTS)
}

fn hashed_color(surface: &str, attempt: u32) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(surface.as_bytes());
    hasher.update(&attempt.to_le_bytes());
    let digest = hasher.finalize();
    format!("#{}", hex::encode(&digest.as_bytes()[..3]))
}
