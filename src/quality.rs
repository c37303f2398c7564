//! Quality label normalization.
//!
//! Balancers label quality as free text (`"1080p"`, `"4K UHD"`, `"HD 720"`,
//! ...). Everything downstream works on the numeric tier instead.

/// Known quality tiers, highest first. `0` means unknown.
pub const QUALITY_TIERS: [u32; 4] = [2160, 1080, 720, 480];

/// Map a free-text quality label onto `2160 / 1080 / 720 / 480`, or `0`.
///
/// Matching is case-insensitive and substring-based, checked from the
/// highest tier down, so `"4k (2160p)"` and `"UHD 2160"` are both `2160`.
pub fn normalize_quality(label: &str) -> u32 {
    let upper = label.to_uppercase();
    if upper.contains("4K") || upper.contains("2160") {
        2160
    } else if upper.contains("1080") {
        1080
    } else if upper.contains("720") {
        720
    } else if upper.contains("480") {
        480
    } else {
        0
    }
}

/// Same as [`normalize_quality`], treating a missing label as unknown.
pub fn normalize_quality_opt(label: Option<&str>) -> u32 {
    label.map_or(0, normalize_quality)
}

/// Difference of the normalized tiers; positive when `a` is better.
///
/// For ranking only. Filtering goes through [`normalize_quality`] directly.
pub fn compare_quality(a: Option<&str>, b: Option<&str>) -> i64 {
    i64::from(normalize_quality_opt(a)) - i64::from(normalize_quality_opt(b))
}
