/// Writes `values` into `out`, placing `separator` between the items that actually wrote something.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Longest prefix of `text` not exceeding `max` bytes that ends on a char boundary.
pub fn truncated(text: &str, max: usize) -> (&str, bool) {
    if text.len() <= max {
        return (text, false);
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

#[macro_export]
macro_rules! truncate_long {
    ($text:expr) => {{
        let text = $text;
        let (head, cut) = $crate::truncated(&text, 497);
        format!("{}{}", head.trim_end(), if cut { "..." } else { "" })
    }};
}
