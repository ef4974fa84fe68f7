//! OCR text cleanup applied before pattern matching
//!
//! Two passes:
//! - `clean_line` for every line: punctuation to spaces, accented `a`
//!   variants to `å`, square/curly brackets to parentheses
//! - `clean_hour_range` for day-rule text: `o`/`O` to `0` and a canonical
//!   `"NN - NN"` shape

/// Punctuation OCR picks up from sign borders and dirt
const NOISE_CHARS: [char; 9] = ['"', ',', '.', '|', '!', '$', '&', '/', '#'];

/// Dash glyphs OCR emits for the range separator
const DASHES: [char; 3] = ['-', '–', '—'];

/// Clean a single raw OCR line
pub fn clean_line(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            c if NOISE_CHARS.contains(&c) => ' ',
            'á' | 'à' | 'ȁ' | 'â' => 'å',
            '{' | '[' => '(',
            '}' | ']' => ')',
            c => c,
        })
        .collect()
}

/// Canonicalise an hour-range line to `"<left> - <right>"`.
///
/// Each side keeps only digits and parentheses, digits are zero-padded to two
/// places and an empty side becomes `"00"`. Text without exactly one dash
/// separator is returned with only the `o`/`O` substitution applied.
pub fn clean_hour_range(line: &str) -> String {
    let zeroed: String = line.chars().map(|c| if c == 'o' || c == 'O' { '0' } else { c }).collect();

    let parts: Vec<&str> = zeroed.split(|c| DASHES.contains(&c)).collect();
    if parts.len() != 2 {
        return zeroed;
    }

    format!("{} - {}", canonical_side(parts[0]), canonical_side(parts[1]))
}

fn canonical_side(side: &str) -> String {
    let kept: String = side.chars().filter(|c| c.is_ascii_digit() || *c == '(' || *c == ')').collect();

    let open = if kept.starts_with('(') { "(" } else { "" };
    let close = if kept.ends_with(')') { ")" } else { "" };
    let digits: String = kept.chars().filter(char::is_ascii_digit).collect();

    format!("{open}{digits:0>2}{close}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line_replaces_noise_with_spaces() {
        assert_eq!(clean_line("Avgift, 8.18|"), "Avgift  8 18 ");
        assert_eq!(clean_line("\"P\"#"), " P  ");
        assert_eq!(clean_line("a/b&c$d!"), "a b c d ");
    }

    #[test]
    fn test_clean_line_accent_variants() {
        assert_eq!(clean_line("Tillàten tid"), "Tillåten tid");
        assert_eq!(clean_line("áâȁ"), "ååå");
    }

    #[test]
    fn test_clean_line_brackets() {
        assert_eq!(clean_line("[8-13}"), "(8-13)");
        assert_eq!(clean_line("{11-15]"), "(11-15)");
    }

    #[test]
    fn test_clean_line_keeps_plain_text() {
        assert_eq!(clean_line("2 tim"), "2 tim");
        assert_eq!(clean_line(""), "");
    }

    #[test]
    fn test_clean_hour_range_shapes() {
        assert_eq!(clean_hour_range("07- 16"), "07 - 16");
        assert_eq!(clean_hour_range("8   -   18"), "08 - 18");
        assert_eq!(clean_hour_range("(7-6)"), "(07 - 06)");
        assert_eq!(clean_hour_range("( 12 – 18 )"), "(12 - 18)");
    }

    #[test]
    fn test_clean_hour_range_letter_o() {
        assert_eq!(clean_hour_range("O7 – 18"), "07 - 18");
        assert_eq!(clean_hour_range("o7-18"), "07 - 18");
        assert_eq!(clean_hour_range("O9-O17"), "09 - 017");
    }

    #[test]
    fn test_clean_hour_range_empty_side() {
        assert_eq!(clean_hour_range("8-"), "08 - 00");
        assert_eq!(clean_hour_range("-x"), "00 - 00");
    }

    #[test]
    fn test_clean_hour_range_without_single_dash() {
        assert_eq!(clean_hour_range("no range"), "n0 range");
        assert_eq!(clean_hour_range("1-2-3"), "1-2-3");
    }
}
