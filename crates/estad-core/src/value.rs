use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single observation as entered by a student: either a number or a
/// free-text category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric reading of the observation. Text counts as numeric when its
    /// trimmed form parses as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => parse_number(s),
        }
    }

    /// Grouping key: two observations are the same frequency-table entry
    /// exactly when their keys are equal.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses free-form input the way the data-entry screens do: tokens split on
/// commas and whitespace, numbers kept as numbers, everything else as text.
pub fn parse_values(input: &str) -> Vec<Value> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match parse_number(t) {
            Some(n) => Value::Number(n),
            None => Value::Text(t.to_string()),
        })
        .collect()
}

/// Every value parsed as a number, or `None` as soon as one does not parse.
pub fn all_numeric(values: &[Value]) -> Option<Vec<f64>> {
    values.iter().map(Value::as_number).collect()
}

/// The values that parse as numbers; the rest are dropped silently.
pub fn numeric_only(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(Value::as_number).collect()
}

/// Orders grouping keys numerically when every key is a number, otherwise
/// lexicographically.
pub(crate) fn sort_keys<T>(entries: &mut [(String, T)]) {
    let numeric = entries.iter().all(|(k, _)| parse_number(k).is_some());
    if numeric {
        entries.sort_by(|(a, _), (b, _)| compare_numeric_keys(a, b));
    } else {
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    }
}

fn compare_numeric_keys(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_key_drops_trailing_zero() {
        assert_eq!(Value::Number(3.0).key(), "3");
        assert_eq!(Value::Number(2.5).key(), "2.5");
    }

    #[test]
    fn test_text_parses_as_number() {
        assert_eq!(Value::from(" 4.5 ").as_number(), Some(4.5));
        assert_eq!(Value::from("Perro").as_number(), None);
        assert_eq!(Value::from("").as_number(), None);
        assert_eq!(Value::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn test_parse_values_mixed_separators() {
        let values = parse_values("3, 4 5\n gato,,6");
        assert_eq!(
            values,
            vec![
                Value::Number(3.0),
                Value::Number(4.0),
                Value::Number(5.0),
                Value::Text("gato".into()),
                Value::Number(6.0),
            ]
        );
    }

    #[test]
    fn test_all_numeric() {
        assert_eq!(
            all_numeric(&[Value::from(1), Value::from("2")]),
            Some(vec![1.0, 2.0])
        );
        assert_eq!(all_numeric(&[Value::from(1), Value::from("x")]), None);
        assert_eq!(numeric_only(&[Value::from(1), Value::from("x")]), vec![1.0]);
    }

    #[test]
    fn test_sort_keys_numeric_vs_lexicographic() {
        let mut numeric = vec![("10".to_string(), ()), ("9".to_string(), ()), ("2.5".to_string(), ())];
        sort_keys(&mut numeric);
        let keys: Vec<_> = numeric.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["2.5", "9", "10"]);

        let mut text = vec![("Perro".to_string(), ()), ("10".to_string(), ()), ("Gato".to_string(), ())];
        sort_keys(&mut text);
        let keys: Vec<_> = text.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["10", "Gato", "Perro"]);
    }
}
