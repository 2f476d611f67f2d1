/// Collapses whitespace runs to a single space, trims, and drops the spaces
/// that touch an HTML tag boundary, so `<p>abc. </p> <p>x</p>` and
/// `<p>abc.</p><p>x</p>` compare equal.
pub fn normalize_text(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let after_tag = out.ends_with('>');
            let before_tag = chars.peek() == Some(&'<');
            if after_tag || before_tag {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Blank-insensitive, order-insensitive comparison of code lists such as
/// categories.
pub fn same_codes<'a>(
    left: impl IntoIterator<Item = &'a str>,
    right: impl IntoIterator<Item = &'a str>,
) -> bool {
    let mut left = left
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    let mut right = right
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}
