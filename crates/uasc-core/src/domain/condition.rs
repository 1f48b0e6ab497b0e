//! Condition expressions used by `condition` nodes.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! expr    := operand (cmp operand)?
//! operand := number | string | true | false | null | name
//! cmp     := == | != | >= | <= | > | <
//! ```
//!
//! A name is either a parameter (`inputs.zone` or `zone`) or a node result
//! path (`get_signals.signal_count`). Unknown names resolve to `null`.

use crate::error::ConditionError;
use crate::types::{is_truthy, ParamMap};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal value
    Literal(Value),
    /// Reference to a parameter or node result
    Name(String),
}

/// A parsed condition expression
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    left: Operand,
    comparison: Option<(Comparator, Operand)>,
}

/// Values visible to a condition: parameters and node results
pub struct ConditionScope<'a> {
    /// Resolved execution parameters
    pub parameters: &'a ParamMap,
    /// Results of the action nodes executed so far
    pub node_results: &'a BTreeMap<String, Value>,
}

impl ConditionScope<'_> {
    fn resolve(&self, name: &str) -> Value {
        if let Some(param) = name.strip_prefix("inputs.") {
            return self.parameters.get(param).cloned().unwrap_or(Value::Null);
        }

        match name.split_once('.') {
            None => self.parameters.get(name).cloned().unwrap_or(Value::Null),
            Some((node_id, key)) => match self.node_results.get(node_id) {
                Some(Value::Object(map)) => map.get(key).cloned().unwrap_or(Value::Null),
                Some(other) => other.clone(),
                None => Value::Null,
            },
        }
    }
}

impl Condition {
    /// Parse an expression
    pub fn parse(expression: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(expression)?;
        let mut iter = tokens.into_iter().peekable();

        let left = match iter.next() {
            Some((_, Token::Operand(operand))) => operand,
            Some((offset, Token::Comparator(_))) => {
                return Err(parse_error(offset, "expected operand before comparator"))
            }
            None => return Err(parse_error(0, "empty expression")),
        };

        let comparison = match iter.next() {
            None => None,
            Some((offset, Token::Operand(_))) => {
                return Err(parse_error(offset, "expected comparator"))
            }
            Some((offset, Token::Comparator(cmp))) => match iter.next() {
                Some((_, Token::Operand(right))) => Some((cmp, right)),
                _ => return Err(parse_error(offset, "comparator without right operand")),
            },
        };

        if let Some((offset, _)) = iter.next() {
            return Err(parse_error(offset, "unexpected trailing input"));
        }

        Ok(Self { left, comparison })
    }

    /// Evaluate against a scope
    pub fn evaluate(&self, scope: &ConditionScope<'_>) -> bool {
        let left = operand_value(&self.left, scope);
        match &self.comparison {
            None => is_truthy(&left),
            Some((cmp, right)) => compare(*cmp, &left, &operand_value(right, scope)),
        }
    }
}

/// Evaluates condition node expressions
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluate `expression` within the given scope
    fn evaluate(
        &self,
        expression: &str,
        scope: &ConditionScope<'_>,
    ) -> Result<bool, ConditionError>;
}

/// Default evaluator for the built-in expression grammar
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ConditionEvaluator for ExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        scope: &ConditionScope<'_>,
    ) -> Result<bool, ConditionError> {
        Ok(Condition::parse(expression)?.evaluate(scope))
    }
}

fn operand_value(operand: &Operand, scope: &ConditionScope<'_>) -> Value {
    match operand {
        Operand::Literal(value) => value.clone(),
        Operand::Name(name) => scope.resolve(name),
    }
}

fn compare(cmp: Comparator, left: &Value, right: &Value) -> bool {
    match cmp {
        Comparator::Eq => values_equal(left, right),
        Comparator::Ne => !values_equal(left, right),
        _ => match ordering(left, right) {
            Some(ordering) => match cmp {
                Comparator::Ge => ordering != Ordering::Less,
                Comparator::Le => ordering != Ordering::Greater,
                Comparator::Gt => ordering == Ordering::Greater,
                Comparator::Lt => ordering == Ordering::Less,
                Comparator::Eq | Comparator::Ne => false,
            },
            None => false,
        },
    }
}

// Numbers compare by value so that 3 == 3.0
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Operand(Operand),
    Comparator(Comparator),
}

fn parse_error(offset: usize, message: &str) -> ConditionError {
    ConditionError::Parse {
        offset,
        message: message.to_string(),
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ConditionError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Comparators
        let next = chars.get(i + 1).map(|(_, c)| *c);
        let two_char = match (c, next) {
            ('=', Some('=')) => Some(Comparator::Eq),
            ('!', Some('=')) => Some(Comparator::Ne),
            ('>', Some('=')) => Some(Comparator::Ge),
            ('<', Some('=')) => Some(Comparator::Le),
            _ => None,
        };
        if let Some(cmp) = two_char {
            tokens.push((offset, Token::Comparator(cmp)));
            i += 2;
            continue;
        }
        match c {
            '>' => {
                tokens.push((offset, Token::Comparator(Comparator::Gt)));
                i += 1;
                continue;
            }
            '<' => {
                tokens.push((offset, Token::Comparator(Comparator::Lt)));
                i += 1;
                continue;
            }
            _ => {}
        }

        // Strings
        if c == '\'' || c == '"' {
            let mut value = String::new();
            let mut j = i + 1;
            let mut closed = false;
            while j < chars.len() {
                let (_, ch) = chars[j];
                if ch == '\\' {
                    if let Some((_, escaped)) = chars.get(j + 1) {
                        value.push(*escaped);
                        j += 2;
                        continue;
                    }
                } else if ch == c {
                    closed = true;
                    break;
                }
                value.push(ch);
                j += 1;
            }
            if !closed {
                return Err(parse_error(offset, "unterminated string literal"));
            }
            tokens.push((offset, Token::Operand(Operand::Literal(Value::String(value)))));
            i = j + 1;
            continue;
        }

        // Numbers
        let starts_number =
            c.is_ascii_digit() || (c == '-' && next.map(|n| n.is_ascii_digit()).unwrap_or(false));
        if starts_number {
            let mut j = i + 1;
            while j < chars.len() && (chars[j].1.is_ascii_digit() || chars[j].1 == '.') {
                j += 1;
            }
            let end = chars.get(j).map(|(o, _)| *o).unwrap_or(input.len());
            let text = &input[offset..end];
            let value = if let Ok(int) = text.parse::<i64>() {
                Value::from(int)
            } else {
                text.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| parse_error(offset, &format!("invalid number '{}'", text)))?
            };
            tokens.push((offset, Token::Operand(Operand::Literal(value))));
            i = j;
            continue;
        }

        // Names and keywords
        if c.is_ascii_alphabetic() || c == '_' {
            let mut j = i + 1;
            while j < chars.len()
                && (chars[j].1.is_ascii_alphanumeric() || chars[j].1 == '_' || chars[j].1 == '.')
            {
                j += 1;
            }
            let end = chars.get(j).map(|(o, _)| *o).unwrap_or(input.len());
            let word = &input[offset..end];
            if word.ends_with('.') || word.contains("..") {
                return Err(parse_error(offset, &format!("invalid name '{}'", word)));
            }
            let operand = match word {
                "true" | "True" => Operand::Literal(Value::Bool(true)),
                "false" | "False" => Operand::Literal(Value::Bool(false)),
                "null" | "None" => Operand::Literal(Value::Null),
                _ => Operand::Name(word.to_string()),
            };
            tokens.push((offset, Token::Operand(operand)));
            i = j;
            continue;
        }

        return Err(parse_error(offset, &format!("unexpected character '{}'", c)));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expression: &str, parameters: &ParamMap, node_results: &BTreeMap<String, Value>) -> bool {
        let scope = ConditionScope {
            parameters,
            node_results,
        };
        ExpressionEvaluator.evaluate(expression, &scope).unwrap()
    }

    fn params() -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("priority".to_string(), json!(5));
        params.insert("zone".to_string(), json!(3));
        params.insert("mode".to_string(), json!("emergency"));
        params
    }

    #[test]
    fn test_numeric_comparisons() {
        let params = params();
        let results = BTreeMap::new();
        assert!(eval("priority >= 3", &params, &results));
        assert!(eval("inputs.priority > 4", &params, &results));
        assert!(!eval("priority < 5", &params, &results));
        assert!(eval("priority <= 5.0", &params, &results));
        assert!(eval("priority == 5.0", &params, &results));
        assert!(eval("zone != 4", &params, &results));
        assert!(eval("-1 < zone", &params, &results));
    }

    #[test]
    fn test_string_comparisons() {
        let params = params();
        let results = BTreeMap::new();
        assert!(eval("mode == 'emergency'", &params, &results));
        assert!(eval("mode != \"normal\"", &params, &results));
        assert!(eval("mode > 'alpha'", &params, &results));
    }

    #[test]
    fn test_node_result_references() {
        let params = params();
        let mut results = BTreeMap::new();
        results.insert("check_congestion".to_string(), json!({"level": 0.8}));
        results.insert("ping".to_string(), json!(true));

        assert!(eval("check_congestion.level > 0.7", &params, &results));
        assert!(!eval("check_congestion.missing > 0.7", &params, &results));
        assert!(eval("ping.anything == true", &params, &results));
    }

    #[test]
    fn test_unknown_names_are_null() {
        let params = params();
        let results = BTreeMap::new();
        assert!(eval("missing == null", &params, &results));
        assert!(!eval("missing", &params, &results));
        assert!(!eval("missing > 1", &params, &results));
        assert!(!eval("missing < 1", &params, &results));
    }

    #[test]
    fn test_mismatched_ordering_is_false() {
        let params = params();
        let results = BTreeMap::new();
        assert!(!eval("mode > 1", &params, &results));
        assert!(!eval("mode <= 1", &params, &results));
        assert!(!eval("true >= false", &params, &results));
    }

    #[test]
    fn test_bare_operands() {
        let params = params();
        let results = BTreeMap::new();
        assert!(eval("true", &params, &results));
        assert!(eval("True", &params, &results));
        assert!(!eval("false", &params, &results));
        assert!(eval("priority", &params, &results));
        assert!(!eval("0", &params, &results));
    }

    #[test]
    fn test_parse_errors() {
        for expression in [
            "",
            "   ",
            "priority >=",
            ">= 3",
            "priority 3",
            "priority >= 3 >= 2",
            "'unterminated",
            "__import__('os')",
            "priority && zone",
            "zone.",
            "1.2.3 > 0",
        ] {
            assert!(
                matches!(Condition::parse(expression), Err(ConditionError::Parse { .. })),
                "expected parse error for {:?}",
                expression
            );
        }
    }

    #[test]
    fn test_parse_error_offset() {
        match Condition::parse("priority ~ 3") {
            Err(ConditionError::Parse { offset, .. }) => assert_eq!(offset, 9),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
