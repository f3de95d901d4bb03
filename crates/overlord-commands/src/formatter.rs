//! Output formatting: splitting replies into chat-sized chunks.

/// Marker appended to a word cut to fit a chunk.
pub const TRUNCATION_MARKER: &str = "...";

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Words are packed greedily, separated by single spaces. A word longer than
/// the limit is cut to `max_chars - 3` characters followed by `...` and the
/// rest of it is dropped. Empty or whitespace-only input yields no chunks.
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let (word, word_len) = fit_word(word, max_chars);

        if current_len == 0 {
            current = word;
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(&word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::replace(&mut current, word));
            current_len = word_len;
        }
    }
    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

fn fit_word(word: &str, max_chars: usize) -> (String, usize) {
    let len = word.chars().count();
    if len <= max_chars {
        return (word.to_string(), len);
    }
    if max_chars <= TRUNCATION_MARKER.len() {
        return (word.chars().take(max_chars).collect(), max_chars);
    }
    let mut cut: String = word.chars().take(max_chars - TRUNCATION_MARKER.len()).collect();
    cut.push_str(TRUNCATION_MARKER);
    (cut, max_chars)
}
