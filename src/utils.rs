use std::borrow::Cow;

pub fn truncate_str(s: &str, len: usize) -> Cow<'_, str> {
    if s.chars().count() > len {
        let owned = s
            .chars()
            .take(len.saturating_sub(3))
            .chain("...".chars())
            .collect();
        Cow::Owned(owned)
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_chars() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_str("a bit too long", 10), "a bit t...");
        // Multi-byte characters must not be split
        assert_eq!(truncate_str("ééééééé", 5), "éé...");
    }
}
