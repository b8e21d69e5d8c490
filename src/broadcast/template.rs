/// Placeholder the mobile app replaces with each recipient's name.
pub const USER_NAME_TOKEN: &str = "{UserName}";

/// Insert the user-name token over the selection `start..end` (char
/// offsets). Returns the new text and the cursor position just after the
/// token. Offsets past the end are clamped.
pub fn insert_user_name(text: &str, start: usize, end: usize) -> (String, usize) {
    let len = text.chars().count();
    let start = start.min(len);
    let end = end.clamp(start, len);

    let before: String = text.chars().take(start).collect();
    let after: String = text.chars().skip(end).collect();

    let cursor = start + USER_NAME_TOKEN.chars().count();
    (format!("{before}{USER_NAME_TOKEN}{after}"), cursor)
}
