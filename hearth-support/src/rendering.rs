//! Text rendering for human-friendly container diagnostics.
//!
//! The container's error types lean on these helpers so every message
//! reads the same way: short type names, arrows between chain links,
//! and a handful of close matches when a lookup misses.

/// Separator placed between links of a rendered dependency chain.
pub const CHAIN_ARROW: &str = " → ";

/// Renders a dependency chain, shortening every fully-qualified name.
///
/// # Examples
/// ```
/// use hearth_support::rendering::render_chain;
///
/// let chain = ["app::Handler", "app::Logger", "app::Handler"];
/// assert_eq!(render_chain(&chain), "Handler → Logger → Handler");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|link| shorten_type_name(link.as_ref()))
        .collect::<Vec<_>>()
        .join(CHAIN_ARROW)
}

/// Shortens a fully qualified type name for display.
///
/// Every path prefix is dropped while generic structure is kept.
///
/// ```
/// use hearth_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::http::RequestHandler"), "RequestHandler");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn app::log::Sink>"),
///     "Arc<dyn Sink>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push_str(&segment);
                out.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    out.push_str(&segment);
    out
}

/// Picks up to `limit` names from `available` that resemble `requested`.
///
/// Matching is case-insensitive on the shortened names: substring
/// containment ranks highest, then a shared prefix of three or more
/// characters. Results are ordered best match first.
pub fn suggest_similar<'a>(requested: &str, available: &[&'a str], limit: usize) -> Vec<&'a str> {
    let wanted = shorten_type_name(requested).to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&'a str, usize)> = available
        .iter()
        .filter_map(|&candidate| {
            let short = shorten_type_name(candidate).to_lowercase();
            if short == wanted {
                return Some((candidate, 200));
            }
            if short.contains(&wanted) || wanted.contains(&short) {
                return Some((candidate, 100));
            }

            let common = short
                .chars()
                .zip(wanted.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (common >= 3).then_some((candidate, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored.into_iter().take(limit).map(|(name, _)| name).collect()
}

/// Formats `count` with a noun, adding a plural `s` when needed.
///
/// ```
/// use hearth_support::rendering::count_noun;
///
/// assert_eq!(count_noun(1, "fault"), "1 fault");
/// assert_eq!(count_noun(3, "fault"), "3 faults");
/// ```
pub fn count_noun(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
