/// Lowercase and strip separators so "Ultra", "ULTRA" and "ul-tra" compare equal.
pub fn normalize_key(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '.'))
        .collect()
}
