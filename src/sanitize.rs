const UNSAFE_CHARACTERS: [char; 9] = ['\\', '/', ':', '*', '?', '\'', '<', '>', '"'];

/// Removes characters that can't be part of a file name and turns pipes into dashes.
pub fn sanitize_data(value: &str) -> String {
    value
        .chars()
        .filter(|character| !UNSAFE_CHARACTERS.contains(character))
        .map(|character| if character == '|' { '-' } else { character })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_data_removes_unsafe_characters() {
        assert_eq!(
            sanitize_data(r#"AC/DC: "Who's <Next>?" \*"#),
            "ACDC Whos Next "
        );
    }

    #[test]
    fn test_sanitize_data_replaces_pipes() {
        assert_eq!(sanitize_data("Live | Remastered"), "Live - Remastered");
    }

    #[test]
    fn test_sanitize_data_keeps_unicode() {
        assert_eq!(sanitize_data("Björk - Jóga"), "Björk - Jóga");
    }
}
