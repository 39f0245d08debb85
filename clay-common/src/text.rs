//! Text helpers shared by templates and synchronizers

/// Convert a title into a URL slug.
///
/// Keeps ASCII alphanumerics, underscores, whitespace and hyphens, trims,
/// lowercases, then collapses every run of whitespace/hyphens into one `-`.
///
/// ```
/// use clay_common::text::slugify;
///
/// assert_eq!(slugify("Brooklyn Bridge at Night!"), "brooklyn-bridge-at-night");
/// assert_eq!(slugify("  --a -- b--  "), "a-b");
/// ```
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut pending_dash = false;
    for c in kept.trim().to_lowercase().chars() {
        if c == '-' || c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push(c);
    }
    slug
}

/// Remove `<...>` markup from a string
pub fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for c in value.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Keep the first `num` words, appending `...` when anything was cut
pub fn truncate_words(value: &str, num: usize) -> String {
    let words: Vec<&str> = value.split_whitespace().collect();
    if words.len() <= num {
        return words.join(" ");
    }
    let mut kept = words[..num].to_vec();
    if !kept.last().map_or(false, |w| w.ends_with("...")) {
        kept.push("...");
    }
    kept.join(" ")
}

/// Escape text for inclusion in HTML bodies and attribute values
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
