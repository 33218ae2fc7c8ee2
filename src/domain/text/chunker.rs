use super::normalizer::normalize;

/// Default upper bound, in characters, for one section.
pub const DEFAULT_MAX_CHARS: usize = 3000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("max_chars must be at least 1")]
    InvalidMaxChars,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '.' | '\n' | '?' | '!')
}

/// Break normalized text into sentence-like tokens.
///
/// Each token ends with its delimiter run; whitespace right after the
/// delimiter is consumed and not part of any token.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        if !is_delimiter(c) {
            continue;
        }
        // keep "...", "?!" and friends together
        if let Some(&(_, next)) = iter.peek() {
            if is_delimiter(next) && next != '\n' {
                continue;
            }
        }
        let end = idx + c.len_utf8();
        tokens.push(&text[start..end]);

        start = end;
        while let Some(&(ws_idx, ws)) = iter.peek() {
            if !ws.is_whitespace() {
                break;
            }
            start = ws_idx + ws.len_utf8();
            iter.next();
        }
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}

/// Split `text` into ordered sections of at most `max_chars` characters.
///
/// The text is normalized first. Sections break only between tokens, so a
/// single token longer than `max_chars` becomes its own oversized section
/// rather than being cut mid-sentence.
pub fn split(text: &str, max_chars: usize) -> Result<Vec<String>, ChunkError> {
    if max_chars == 0 {
        return Err(ChunkError::InvalidMaxChars);
    }

    let normalized = normalize(text);
    let mut sections = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for token in tokenize(&normalized) {
        let token_chars = token.chars().count();
        // the separator consumed by the tokenizer comes back as one space
        let separator = usize::from(!buffer.is_empty());

        if buffer_chars + separator + token_chars > max_chars {
            flush(&mut sections, &buffer);
            buffer.clear();
            buffer_chars = 0;
        } else if separator == 1 {
            buffer.push(' ');
            buffer_chars += 1;
        }

        buffer.push_str(token);
        buffer_chars += token_chars;
    }

    flush(&mut sections, &buffer);
    Ok(sections)
}

fn flush(sections: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        sections.push(trimmed.to_string());
    }
}
