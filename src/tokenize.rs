/// Characters that split tokens in addition to whitespace. Each delimiter is
/// kept as its own token.
const DELIMITERS: &[char] = &['?', ':', '(', ')', '+', '*', '-', '=', '<', '>'];

/// How a line's payload is broken into the atomic units the move detector
/// compares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tokenizer {
    /// One token per non-whitespace code point
    Chars,
    /// Whitespace-separated words
    Words,
    /// Whitespace-separated words, split further around operator characters
    WordOperators,
    /// Words split around the delimiter set, delimiters kept as tokens
    #[default]
    Delimiters,
}

impl Tokenizer {
    /// Tokenize `text`. Empty token runs are dropped, so the result never
    /// contains an empty string.
    pub fn tokenize(self, text: &str) -> Vec<String> {
        match self {
            Tokenizer::Chars => text
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect(),
            Tokenizer::Words => text.split_whitespace().map(String::from).collect(),
            Tokenizer::WordOperators => split_around(text, |c| !c.is_alphanumeric() && c != '_'),
            Tokenizer::Delimiters => split_around(text, |c| DELIMITERS.contains(&c)),
        }
    }
}

/// Split on whitespace and around every character matching `is_delimiter`,
/// keeping matched characters as separate single-character tokens.
fn split_around(text: &str, is_delimiter: impl Fn(char) -> bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else if is_delimiter(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn tokens(tokenizer: Tokenizer, text: &str) -> Vec<String> {
        tokenizer.tokenize(text)
    }

    #[test]
    fn delimiters_split_around_punctuation() {
        assert_eq!(
            tokens(Tokenizer::Delimiters, "foo(a, b)"),
            vec!["foo", "(", "a,", "b", ")"]
        );
    }

    #[test]
    fn delimiters_keep_operators_as_tokens() {
        assert_eq!(
            tokens(Tokenizer::Delimiters, "x = a + b"),
            vec!["x", "=", "a", "+", "b"]
        );
        assert_eq!(
            tokens(Tokenizer::Delimiters, "cond ? yes : no"),
            vec!["cond", "?", "yes", ":", "no"]
        );
    }

    #[test]
    fn delimiters_drop_empty_runs() {
        assert_eq!(tokens(Tokenizer::Delimiters, "  ()  "), vec!["(", ")"]);
        assert_eq!(tokens(Tokenizer::Delimiters, ""), Vec::<String>::new());
        assert_eq!(tokens(Tokenizer::Delimiters, "   "), Vec::<String>::new());
    }

    #[test]
    fn words_split_on_whitespace_only() {
        assert_eq!(
            tokens(Tokenizer::Words, "foo(a, b)\tdone"),
            vec!["foo(a,", "b)", "done"]
        );
    }

    #[test]
    fn chars_tokenize_each_code_point() {
        assert_eq!(tokens(Tokenizer::Chars, "ab c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn word_operators_split_on_non_identifier_chars() {
        assert_eq!(
            tokens(Tokenizer::WordOperators, "a.b(c_1)"),
            vec!["a", ".", "b", "(", "c_1", ")"]
        );
    }
}
