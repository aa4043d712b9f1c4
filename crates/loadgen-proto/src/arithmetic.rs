use serde::{Deserialize, Serialize};

/// One of the four arithmetic operators the demo server understands.
pub const OPERATORS: [&str; 4] = ["+", "-", "*", "/"];

/// Request body for the demo arithmetic server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerRequest {
    pub id: i64,
    pub operands: Vec<i64>,
    pub operator: String,
}

/// Response body from the demo arithmetic server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerResponse {
    pub id: i64,
    pub formula: String,
    pub result: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Folds `operands` left-to-right with `operator`.
///
/// Mirrors `original_source/testHelper/server.go`'s `op`: the first
/// operand seeds the accumulator, subsequent operands apply `operator`.
/// Division by zero returns `None` instead of panicking.
pub fn evaluate(operands: &[i64], operator: &str) -> Option<i64> {
    let mut iter = operands.iter().copied();
    let mut acc = iter.next()?;
    for v in iter {
        acc = match operator {
            "+" => acc + v,
            "-" => acc - v,
            "*" => acc * v,
            "/" => acc.checked_div(v)?,
            _ => return None,
        };
    }
    Some(acc)
}

/// Renders `operands`/`operator`/`result` as `"a op b op c = result"` (or
/// `!=` when `equal` is false), matching `genFormula` in the original.
pub fn format_formula(operands: &[i64], operator: &str, result: i64, equal: bool) -> String {
    let joined = operands
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(&format!(" {operator} "));
    let sign = if equal { "=" } else { "!=" };
    format!("{joined} {sign} {result}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_folds_left_to_right() {
        assert_eq!(evaluate(&[10, 3, 2], "-"), Some(5));
        assert_eq!(evaluate(&[2, 3, 4], "*"), Some(24));
        assert_eq!(evaluate(&[1, 2, 3], "+"), Some(6));
    }

    #[test]
    fn evaluate_division_by_zero_is_none() {
        assert_eq!(evaluate(&[10, 0], "/"), None);
    }

    #[test]
    fn evaluate_empty_operands_is_none() {
        assert_eq!(evaluate(&[], "+"), None);
    }

    #[test]
    fn format_formula_marks_inequality() {
        assert_eq!(format_formula(&[2, 3], "+", 6, false), "2 + 3 != 6");
        assert_eq!(format_formula(&[2, 3], "+", 5, true), "2 + 3 = 5");
    }
}
