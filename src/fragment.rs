//! Reply fragmentation
//!
//! Splits a generated reply into chat-sized chunks the way a person would:
//! paragraphs first, then sentences, then words. Deterministic, and never
//! splits inside a word; a single word longer than the limit goes out
//! unsplit.

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` into ordered fragments of at most `max_chars` characters.
#[must_use]
pub fn fragment(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut fragments = Vec::new();
    for paragraph in split_paragraphs(text) {
        if char_len(&paragraph) <= max_chars {
            fragments.push(paragraph);
            continue;
        }
        pack_sentences(&paragraph, max_chars, &mut fragments);
    }
    fragments.retain(|f| !f.trim().is_empty());
    fragments
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sentence boundaries are `.`, `!`, `?` runs followed by whitespace;
/// punctuation stays with its sentence.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().is_some_and(|next| next.is_whitespace()) {
                while chars.peek().is_some_and(|next| next.is_whitespace()) {
                    chars.next();
                }
                let sentence = current.trim().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                current.clear();
            }
        }
    }
    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn pack_sentences(paragraph: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    for sentence in split_sentences(paragraph) {
        if char_len(&sentence) > max_chars {
            flush(&mut current, out);
            pack_words(&sentence, max_chars, out);
        } else if current.is_empty() {
            current = sentence;
        } else if char_len(&current) + 1 + char_len(&sentence) <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            flush(&mut current, out);
            current = sentence;
        }
    }
    flush(&mut current, out);
}

fn pack_words(sentence: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        if char_len(word) > max_chars {
            // A single oversized word is emitted whole, never split
            flush(&mut current, out);
            out.push(word.to_string());
        } else if current.is_empty() {
            current = word.to_string();
        } else if char_len(&current) + 1 + char_len(word) <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            flush(&mut current, out);
            current = word.to_string();
        }
    }
    flush(&mut current, out);
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    if !current.trim().is_empty() {
        out.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_of(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn short_text_passes_through_trimmed() {
        assert_eq!(fragment("  oi, tudo bem?  ", 300), vec!["oi, tudo bem?"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(fragment("", 300).is_empty());
        assert!(fragment("   \n\n  ", 300).is_empty());
    }

    #[test]
    fn paragraphs_within_limit_are_kept_whole() {
        let text = format!("{}\n\n{}", "a".repeat(100), "b".repeat(100));
        let fragments = fragment(&text, 150);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], "a".repeat(100));
        assert_eq!(fragments[1], "b".repeat(100));
    }

    #[test]
    fn sentences_are_packed_greedily_with_punctuation_kept() {
        let text = "Primeira frase aqui. Segunda frase aqui! Terceira frase bem \
                    mais longa que as outras duas juntas para forçar um corte?";
        let fragments = fragment(text, 45);
        assert!(fragments.len() >= 2);
        assert!(fragments[0].ends_with('.') || fragments[0].ends_with('!'));
        for f in &fragments {
            assert!(f.chars().count() <= 45 || !f.contains(' '));
        }
    }

    #[test]
    fn oversized_reply_splits_into_three_fragments() {
        // Six 136-char sentences, no paragraph breaks: two pack per fragment
        let sentence = format!("{}.", "palavra ".repeat(17).trim());
        let text = std::iter::repeat(sentence.clone())
            .take(6)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(text.chars().count() > 800);

        let fragments = fragment(&text, 300);
        assert_eq!(fragments.len(), 3);
        for f in &fragments {
            assert!(f.chars().count() <= 300);
        }
        // Completeness: same words in the same order
        let original: Vec<String> = words_of(&text);
        let rejoined: Vec<String> = words_of(&fragments.join(" "));
        assert_eq!(original, rejoined);
    }

    #[test]
    fn never_splits_a_word() {
        let long_word = "x".repeat(500);
        let text = format!("antes {long_word} depois");
        let fragments = fragment(&text, 300);
        assert!(fragments.iter().any(|f| f == &long_word));
    }

    #[test]
    fn no_fragment_is_empty() {
        let text = "um. dois. três.\n\n\n\nquatro.";
        for f in fragment(text, 5) {
            assert!(!f.trim().is_empty());
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let text = format!("{}. {}!", "alfa beta gama ".repeat(30), "delta ".repeat(40));
        assert_eq!(fragment(&text, 120), fragment(&text, 120));
    }
}
