//! Engine version comparison
//!
//! Server versions arrive as free-form strings (`5.7.31-log`, `8.0.21`,
//! `10.4.13-MariaDB`), so only the leading dotted numeric part is compared.

use std::cmp::Ordering;

/// Split the leading `major.minor.patch...` numbers out of a version string
fn numeric_parts(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map_while(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                None
            } else {
                digits.parse().ok()
            }
        })
        .collect()
}

/// Compare two version strings numerically; missing components count as zero
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left = numeric_parts(left);
    let right = numeric_parts(right);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Check whether `version` is at least `minimum`. An unknown version never is.
pub fn version_at_least(version: Option<&str>, minimum: &str) -> bool {
    match version {
        Some(v) if !numeric_parts(v).is_empty() => compare_versions(v, minimum) != Ordering::Less,
        _ => false,
    }
}
