//! Tokenizer - Splits one delimited line into a fixed number of fields
//!
//! Empty fields (leading, trailing or between consecutive separators) are kept.
//! Quote characters carry no meaning: a separator inside a "quoted" value is a
//! field boundary like any other.

use std::fmt;

/// One data line split into its fields, without the line terminator
pub type Row = Vec<String>;

/// A line had fewer separators than the field arity requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooFewFields {
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for TooFewFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} fields, found {}", self.expected, self.found)
    }
}

impl std::error::Error for TooFewFields {}

/// Remove a trailing `\n` or `\r\n`, if any.
pub fn strip_line_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Number of fields a line holds: separator occurrences plus one.
pub fn count_fields(line: &str, separator: char) -> usize {
    strip_line_terminator(line).matches(separator).count() + 1
}

/// Split `line` into exactly `field_count` fields.
///
/// The first `field_count - 1` separators are field boundaries; whatever
/// follows the last of them, terminator excluded, is the final field.
pub fn tokenize(line: &str, separator: char, field_count: usize) -> Result<Row, TooFewFields> {
    let line = strip_line_terminator(line);
    let field_count = field_count.max(1);

    let fields: Row = line
        .splitn(field_count, separator)
        .map(str::to_string)
        .collect();

    if fields.len() < field_count {
        return Err(TooFewFields {
            expected: field_count,
            found: fields.len(),
        });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_plain_fields() {
        let row = tokenize("alpha,beta,gamma,delta,epsilon", ',', 5).unwrap();
        assert_eq!(row, owned(&["alpha", "beta", "gamma", "delta", "epsilon"]));
    }

    #[test]
    fn test_empty_fields_are_preserved() {
        assert_eq!(
            tokenize("alpha,beta,,delta,epsilon", ',', 5).unwrap(),
            owned(&["alpha", "beta", "", "delta", "epsilon"])
        );
        assert_eq!(
            tokenize(",beta,gamma,delta,epsilon", ',', 5).unwrap(),
            owned(&["", "beta", "gamma", "delta", "epsilon"])
        );
        assert_eq!(
            tokenize("alpha,beta,gamma,delta,", ',', 5).unwrap(),
            owned(&["alpha", "beta", "gamma", "delta", ""])
        );
        assert_eq!(
            tokenize("alpha,beta,,,epsilon", ',', 5).unwrap(),
            owned(&["alpha", "beta", "", "", "epsilon"])
        );
    }

    #[test]
    fn test_terminator_stripped_from_last_field() {
        assert_eq!(tokenize("Pan\t2\n", '\t', 2).unwrap(), owned(&["Pan", "2"]));
        assert_eq!(tokenize("Pan\t2\r\n", '\t', 2).unwrap(), owned(&["Pan", "2"]));
    }

    #[test]
    fn test_too_few_fields() {
        let err = tokenize("alpha,beta\n", ',', 3).unwrap_err();
        assert_eq!(err, TooFewFields { expected: 3, found: 2 });
    }

    #[test]
    fn test_extra_separators_stay_in_last_field() {
        let row = tokenize("a,b,c,d", ',', 2).unwrap();
        assert_eq!(row, owned(&["a", "b,c,d"]));
    }

    #[test]
    fn test_quotes_are_not_special() {
        let row = tokenize("\"Smith, John\",42", ',', 3).unwrap();
        assert_eq!(row, owned(&["\"Smith", " John\"", "42"]));
    }

    #[test]
    fn test_count_fields() {
        assert_eq!(count_fields("Genus\tnb_species\n", '\t'), 2);
        assert_eq!(count_fields("single\n", '\t'), 1);
        assert_eq!(count_fields(",,\n", ','), 3);
    }
}
