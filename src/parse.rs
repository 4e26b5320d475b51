//! Tokenizer for ad hoc "activity score" messages.
//!
//! Grammar, scanned left to right: a letter-run token, an optional `:` or
//! `=` separator, then a signed decimal number. Anything else between
//! pairs (commas, semicolons, stray words) is skipped. A word with no
//! following number produces nothing.

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
}

/// Extracts (activity, score) pairs from free text. Returns an empty list
/// when no pair is recognized; the caller decides whether that is an error.
pub fn extract_pairs(input: &str) -> Vec<(String, f64)> {
    let tokens = tokenize(input);
    let mut pairs = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let Token::Word(word) = token else {
            continue;
        };
        if let Some(Token::Number(value)) = iter.peek() {
            pairs.push((word, *value));
            iter.next();
        }
    }

    pairs
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if !c.is_alphabetic() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else if c.is_ascii_digit() || is_sign_start(c, &mut chars.clone()) {
            let mut literal = String::new();
            if c == '+' || c == '-' {
                literal.push(c);
                chars.next();
            }
            let mut seen_decimal = false;
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    literal.push(c);
                    chars.next();
                } else if (c == '.' || c == ',') && !seen_decimal {
                    // A decimal separator only counts when a digit follows;
                    // otherwise the comma is a pair delimiter.
                    let mut ahead = chars.clone();
                    ahead.next();
                    if ahead.peek().is_some_and(char::is_ascii_digit) {
                        literal.push('.');
                        chars.next();
                        seen_decimal = true;
                    } else {
                        break;
                    }
                } else {
                    break;
                }
            }
            if let Ok(value) = literal.parse::<f64>() {
                tokens.push(Token::Number(value));
            }
        } else {
            chars.next();
        }
    }

    tokens
}

fn is_sign_start(c: char, rest: &mut std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    if c != '+' && c != '-' {
        return false;
    }
    rest.next();
    rest.peek().is_some_and(char::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::extract_pairs;

    #[test]
    fn parses_mixed_separators() {
        let pairs = extract_pairs("чтение:7, спорт=4; музыка 0");
        assert_eq!(
            pairs,
            vec![
                ("чтение".to_string(), 7.0),
                ("спорт".to_string(), 4.0),
                ("музыка".to_string(), 0.0),
            ]
        );
    }

    #[test]
    fn word_without_numeral_yields_nothing() {
        assert!(extract_pairs("reading eight").is_empty());
        assert!(extract_pairs("").is_empty());
    }

    #[test]
    fn accepts_signed_and_decimal_values() {
        assert_eq!(
            extract_pairs("йога -1 бег +2.5"),
            vec![("йога".to_string(), -1.0), ("бег".to_string(), 2.5)]
        );
    }

    #[test]
    fn comma_decimal_requires_adjacent_digit() {
        assert_eq!(
            extract_pairs("чтение 7,5"),
            vec![("чтение".to_string(), 7.5)]
        );
        // Here the comma delimits the next pair instead.
        assert_eq!(
            extract_pairs("чтение 7,спорт 4"),
            vec![("чтение".to_string(), 7.0), ("спорт".to_string(), 4.0)]
        );
    }

    #[test]
    fn number_without_word_is_dropped() {
        assert!(extract_pairs("42").is_empty());
        assert_eq!(extract_pairs("5 спорт 3"), vec![("спорт".to_string(), 3.0)]);
    }
}
