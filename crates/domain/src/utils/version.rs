//! Dotted version parsing

/// Parse a dotted version string into its numeric components.
///
/// Components that are not plain integers (e.g. `"36-rc1"`) keep their
/// leading digits; a component with no leading digits counts as `0`.
pub fn version_tuple(version: &str) -> Vec<u32> {
    version
        .trim()
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().unwrap_or(0)
        })
        .collect()
}

/// Compare a dotted version against a `(major, minor)` floor.
pub fn at_least(version: &str, floor: (u32, u32)) -> bool {
    let parts = version_tuple(version);
    let major = parts.first().copied().unwrap_or(0);
    let minor = parts.get(1).copied().unwrap_or(0);
    (major, minor) >= floor
}
