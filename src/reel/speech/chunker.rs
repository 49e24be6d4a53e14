/// Split `text` into chunks of at most `max_chars` characters.
///
/// Words are packed greedily and never split: a chunk grows while
/// `len(current) + 1 + len(word) <= max_chars`. A single word longer than
/// the limit becomes a chunk on its own. Lengths are counted in characters.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Whether `text` fits into one provider call.
pub fn fits_single_call(text: &str, max_chars: usize) -> bool {
    text.chars().count() <= max_chars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn chunks_respect_limit_and_keep_words_whole() {
        let text = "so this happened last week when my roommate decided to adopt a goose";
        let chunks = split_into_chunks(text, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {chunk:?}");
        }
        let rejoined = chunks.join(" ");
        assert_eq!(words(&rejoined), words(text));
    }

    #[test]
    fn packs_greedily() {
        let chunks = split_into_chunks("aaa bbb ccc ddd", 7);
        assert_eq!(chunks, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn oversized_word_is_its_own_chunk() {
        let chunks = split_into_chunks("hi supercalifragilistic yo", 10);
        assert_eq!(chunks, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = split_into_chunks("élan éclair", 11);
        assert_eq!(chunks, vec!["élan éclair"]);
        assert!(fits_single_call("élan éclair", 11));
    }

    #[test]
    fn newlines_are_word_boundaries() {
        let chunks = split_into_chunks("Title here\n\nbody text", 100);
        assert_eq!(chunks, vec!["Title here body text"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_into_chunks("   \n ", 10).is_empty());
    }
}
