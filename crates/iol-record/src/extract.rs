/// Pulls the first numeric token out of a composite measurement string.
///
/// Export values often pack several readings into one field, e.g.
/// `"45.17 / 7.47 @ 178"`. The target form accepts a single number per
/// control, so the first whitespace- or slash-delimited token that parses
/// as a float wins and the rest is dropped. Empty input, the `"-"` no-data
/// marker, and strings without any numeric token all come back as an empty
/// string, which downstream means "leave the control alone".
pub fn first_numeric_token(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return String::new();
    }
    trimmed
        .split(|c: char| c.is_whitespace() || c == '/')
        .filter(|part| !part.is_empty())
        .find(|part| part.parse::<f64>().is_ok())
        .map(str::to_owned)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_float_from_composite() {
        assert_eq!(first_numeric_token("45.17 / 7.47 @ 178"), "45.17");
        assert_eq!(first_numeric_token("44.20 @ 10"), "44.20");
        assert_eq!(first_numeric_token("23.50"), "23.50");
    }

    #[test]
    fn slash_alone_delimits_tokens() {
        assert_eq!(first_numeric_token("7.20/7.35"), "7.20");
        assert_eq!(first_numeric_token("/6.1"), "6.1");
    }

    #[test]
    fn no_data_marker_reads_empty() {
        assert_eq!(first_numeric_token(""), "");
        assert_eq!(first_numeric_token("-"), "");
        assert_eq!(first_numeric_token("  -  "), "");
    }

    #[test]
    fn non_numeric_input_reads_empty() {
        assert_eq!(first_numeric_token("pending"), "");
        assert_eq!(first_numeric_token("@ / @"), "");
        assert_eq!(first_numeric_token("   "), "");
    }

    #[test]
    fn skips_leading_non_numeric_tokens() {
        assert_eq!(first_numeric_token("approx 12.5 mm"), "12.5");
    }

    #[test]
    fn keeps_original_token_text() {
        // The token is returned as written, not reformatted.
        assert_eq!(first_numeric_token("023.500 / 1"), "023.500");
    }
}
