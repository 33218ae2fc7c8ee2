use once_cell::sync::Lazy;
use regex::Regex;

/// Glyphs that carry layout meaning in the source file but nothing when read aloud.
const DECORATIVE_GLYPHS: &[char] = &[
    '•', '◦', '▪', '▫', '■', '□', '●', '○', '◆', '◇', '★', '☆', '▶', '▷', '◀', '◁', '▲', '△',
    '▼', '▽', '→', '←', '↑', '↓', '↔', '⇒', '⇐', '※', '❖', '➤', '✓', '✔', '✗', '✘', '♪', '♬',
];

const DOUBLE_QUOTES: &[char] = &['“', '”', '„', '‟', '«', '»', '″'];
const SINGLE_QUOTES: &[char] = &['‘', '’', '‚', '‛', '′'];

static NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static EXCLAMATION_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"!{3,}").expect("valid regex"));
static QUESTION_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?{3,}").expect("valid regex"));
static PERIOD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").expect("valid regex"));

fn is_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Clean raw file text so that it reads well and splits on sentence boundaries.
///
/// The rules run in a fixed order; later rules assume control characters and
/// decorative glyphs are already gone. The function is total and idempotent.
pub fn normalize(text: &str) -> String {
    // 1 + 2: drop control characters, blank out decorative glyphs
    let stripped: String = text
        .chars()
        .filter(|c| !is_control(*c))
        .map(|c| if DECORATIVE_GLYPHS.contains(&c) { ' ' } else { c })
        .collect();

    // 3 + 4: one space after terminal punctuation and commas glued to the next word
    let spaced = space_after_punctuation(&stripped);

    // 5 + 6: collapse runs
    let collapsed = NEWLINE_RUN.replace_all(&spaced, "\n\n");
    let collapsed = EXCLAMATION_RUN.replace_all(&collapsed, "!!");
    let collapsed = QUESTION_RUN.replace_all(&collapsed, "??");
    let collapsed = PERIOD_RUN.replace_all(&collapsed, "...");

    // 7: straighten quotes
    let quoted: String = collapsed
        .chars()
        .map(|c| {
            if DOUBLE_QUOTES.contains(&c) {
                '"'
            } else if SINGLE_QUOTES.contains(&c) {
                '\''
            } else {
                c
            }
        })
        .collect();

    quoted.trim().to_string()
}

/// A run of terminal punctuation (`...`, `?!`) stays intact; the space goes after the run.
fn space_after_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        let Some(&next) = chars.peek() else {
            continue;
        };
        if next.is_whitespace() {
            continue;
        }
        let needs_space = (is_terminal(c) && !is_terminal(next)) || c == ',';
        if needs_space {
            out.push(' ');
        }
    }

    out
}
