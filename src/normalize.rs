/// Letter variants folded into their base form before comparison. The only
/// entry today is the Cyrillic ё, which users type interchangeably with е.
const LETTER_FOLDS: [(char, char); 1] = [('ё', 'е')];

/// Canonical lookup key for an activity label.
///
/// Two raw labels refer to the same activity (and the same sheet column)
/// exactly when their keys are equal. Total and deterministic; never fails.
pub fn activity_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            LETTER_FOLDS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::activity_key;

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(activity_key("  Чтение  "), "чтение");
        assert_eq!(activity_key("Reading"), "reading");
    }

    #[test]
    fn folds_letter_variants() {
        assert_eq!(activity_key("Ёлка"), "елка");
        assert_eq!(activity_key("ёлка"), activity_key("Елка"));
    }

    #[test]
    fn equal_keys_mean_same_activity() {
        assert_eq!(activity_key("СПОРТ"), activity_key("спорт "));
        assert_ne!(activity_key("спорт"), activity_key("спорты"));
    }
}
