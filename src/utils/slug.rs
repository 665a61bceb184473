pub const MAX_SLUG_CHARS: usize = 50;

/// URL-safe slug: trimmed, lowercased, characters outside `[a-z0-9_\s-]` dropped,
/// whitespace runs collapsed to a single `-`, truncated to 50 characters.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for c in text.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        }
    }

    slug.chars().take(MAX_SLUG_CHARS).collect()
}
