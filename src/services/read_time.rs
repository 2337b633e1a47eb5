//! Read time estimation

/// Average adult reading speed
pub const WORDS_PER_MINUTE: f64 = 265.0;

/// Count the words a reader goes through: title, body, description and tags
pub fn word_count<S: AsRef<str>>(title: &str, body: &str, description: &str, tags: &[S]) -> usize {
    [title, body, description]
        .into_iter()
        .chain(tags.iter().map(AsRef::as_ref))
        .map(|text| text.split_whitespace().count())
        .sum()
}

/// Human readable estimate such as "45 seconds" or "3 minutes".
///
/// Halves round to the even neighbour.
pub fn format_read_time(words: usize) -> String {
    let minutes = words as f64 / WORDS_PER_MINUTE;
    if minutes < 1.0 {
        format!("{} seconds", (minutes * 60.0).round_ties_even() as i64)
    } else {
        format!("{} minutes", minutes.round_ties_even() as i64)
    }
}

pub fn read_time<S: AsRef<str>>(title: &str, body: &str, description: &str, tags: &[S]) -> String {
    format_read_time(word_count(title, body, description, tags))
}
