//! Condition expression parser
//!
//! Grammar:
//!
//! ```text
//! expression := clause (' ' clause)*
//! clause     := LEFT '=' RIGHT | LEFT '!=' RIGHT
//! ```
//!
//! `LEFT` is a keyword or a plain number literal (`N`, `N-M`); `RIGHT` is a
//! keyword or any numeric-or-group literal (`N`, `N-M`, `@group`). Operands
//! never contain spaces.
//!
//! Parsing runs in two passes over the same borrowed spans: [`measure`]
//! validates and counts, [`build`] fills exactly-sized arrays.

use super::compiled::{Clause, CompiledCondition, Shape};
use super::group::GroupResolver;
use super::number::NumberUnion;
use super::selector::Selector;
use crate::error::{ConditionError, Result};
use tracing::debug;

/// One clause as borrowed slices of the expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseSpan<'a> {
    /// Whole clause text
    pub text: &'a str,
    pub left: &'a str,
    pub right: &'a str,
    pub equals: bool,
}

/// Split an expression into clause spans.
///
/// Clauses are separated by single spaces; one trailing space is tolerated.
/// The operator is the first `=` in the clause, read as `!=` when preceded
/// by `!`. `==` is rejected.
pub fn tokenize(expr: &str) -> Result<Vec<ClauseSpan<'_>>> {
    if expr.is_empty() {
        return Err(ConditionError::EmptyExpression);
    }

    let mut segments: Vec<&str> = expr.split(' ').collect();
    if segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }

    segments.into_iter().map(split_clause).collect()
}

fn split_clause(text: &str) -> Result<ClauseSpan<'_>> {
    let eq = match text.find('=') {
        Some(pos) if pos > 0 => pos,
        _ => return Err(ConditionError::missing_operator(text)),
    };

    let bytes = text.as_bytes();
    let right = &text[eq + 1..];
    if bytes[eq - 1] == b'!' {
        return Ok(ClauseSpan {
            text,
            left: &text[..eq - 1],
            right,
            equals: false,
        });
    }
    if right.starts_with('=') {
        return Err(ConditionError::DoubleEquals {
            clause: text.to_string(),
        });
    }

    Ok(ClauseSpan {
        text,
        left: &text[..eq],
        right,
        equals: true,
    })
}

/// A classified clause side
enum Operand {
    Keyword(Selector),
    Literal(NumberUnion),
}

impl Operand {
    fn selector(&self) -> Selector {
        match self {
            Operand::Keyword(selector) => *selector,
            Operand::Literal(_) => Selector::Number,
        }
    }
}

fn classify_left(word: &str, groups: &dyn GroupResolver) -> Result<Operand> {
    if let Some(selector) = Selector::from_keyword(word) {
        return Ok(Operand::Keyword(selector));
    }
    if word.starts_with('@') {
        return Err(ConditionError::GroupOnLeft {
            operand: word.to_string(),
        });
    }
    NumberUnion::parse(word, groups).map(Operand::Literal)
}

fn classify_right(word: &str, groups: &dyn GroupResolver) -> Result<Operand> {
    match Selector::from_keyword(word) {
        Some(selector) => Ok(Operand::Keyword(selector)),
        None => NumberUnion::parse(word, groups).map(Operand::Literal),
    }
}

/// Sizing pass: validate every clause and count clauses and literals
pub fn measure(expr: &str, groups: &dyn GroupResolver) -> Result<Shape> {
    let mut clause_count: usize = 0;
    let mut number_count: usize = 0;

    for span in tokenize(expr)? {
        let left = classify_left(span.left, groups)?;
        let right = classify_right(span.right, groups)?;
        debug!(
            "dry run: <{}>{}=<{}> left={} right={}",
            span.left,
            if span.equals { "" } else { "!" },
            span.right,
            left.selector(),
            right.selector()
        );

        clause_count += 1;
        number_count += matches!(left, Operand::Literal(_)) as usize;
        number_count += matches!(right, Operand::Literal(_)) as usize;
    }

    Ok(Shape {
        clause_count: u16::try_from(clause_count).map_err(|_| ConditionError::TooManyClauses)?,
        number_count: u16::try_from(number_count).map_err(|_| ConditionError::TooManyNumbers)?,
    })
}

/// Build pass: fill exactly `shape`-sized clause and operand arrays.
///
/// # Panics
///
/// Panics if `expr` yields a different shape than `shape`, which means
/// the caller did not pass the result of [`measure`] for the same input.
pub fn build(expr: &str, shape: Shape, groups: &dyn GroupResolver) -> Result<CompiledCondition> {
    let mut clauses = Vec::with_capacity(shape.clause_count as usize);
    let mut numbers = Vec::with_capacity(shape.number_count as usize);

    for span in tokenize(expr)? {
        let left = classify_left(span.left, groups)?;
        let right = classify_right(span.right, groups)?;
        let clause = Clause::new(left.selector(), right.selector(), span.equals);
        debug!(
            "left={} right={} match={}",
            clause.left, clause.right, clause.equals
        );

        for operand in [left, right] {
            if let Operand::Literal(number) = operand {
                numbers.push(number);
            }
        }
        clauses.push(clause);
    }

    debug!("cond={} numbers={}", clauses.len(), numbers.len());
    Ok(CompiledCondition::from_parts(shape, clauses, numbers))
}

/// Compile an expression without interning it
///
/// # Examples
///
/// ```
/// use tomoyo_cond::condition::{parse, GroupRegistry};
///
/// let groups = GroupRegistry::new();
/// let cond = parse("task.uid=0 path1.uid!=task.uid", &groups).unwrap();
/// assert_eq!(cond.clause_count(), 2);
/// assert_eq!(cond.number_count(), 1);
/// ```
pub fn parse(expr: &str, groups: &dyn GroupResolver) -> Result<CompiledCondition> {
    let shape = measure(expr, groups)?;
    build(expr, shape, groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::group::GroupRegistry;
    use crate::condition::selector::{ModeBit, PathField, PathRole, TaskField};

    #[test]
    fn test_tokenize_operators() {
        let spans = tokenize("task.uid=0 task.gid!=100").unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].left, spans[0].right, spans[0].equals), ("task.uid", "0", true));
        assert_eq!(
            (spans[1].left, spans[1].right, spans[1].equals),
            ("task.gid", "100", false)
        );
    }

    #[test]
    fn test_tokenize_splits_on_first_equals() {
        let spans = tokenize("a=b=c").unwrap();
        assert_eq!((spans[0].left, spans[0].right), ("a", "b=c"));
    }

    #[test]
    fn test_tokenize_rejects_bad_operators() {
        assert!(matches!(
            tokenize("task.uid==0"),
            Err(ConditionError::DoubleEquals { .. })
        ));
        assert!(matches!(
            tokenize("=0"),
            Err(ConditionError::MissingOperator { .. })
        ));
        assert!(matches!(
            tokenize("task.uid"),
            Err(ConditionError::MissingOperator { .. })
        ));
        assert!(matches!(tokenize(""), Err(ConditionError::EmptyExpression)));
    }

    #[test]
    fn test_tokenize_spacing() {
        assert_eq!(tokenize("task.uid=0 ").unwrap().len(), 1);
        assert!(tokenize("task.uid=0  ").is_err());
        assert!(tokenize("task.uid=0  task.gid=0").is_err());
        assert!(tokenize(" task.uid=0").is_err());
        assert!(tokenize(" ").is_err());
    }

    #[test]
    fn test_keyword_only_expression_has_no_numbers() {
        let groups = GroupRegistry::new();
        let shape = measure("task.uid=task.euid path1.uid!=task.uid", &groups).unwrap();
        assert_eq!(
            shape,
            Shape {
                clause_count: 2,
                number_count: 0
            }
        );
    }

    #[test]
    fn test_numbers_recorded_left_to_right() {
        let groups = GroupRegistry::new();
        let cond = parse("0-10=task.uid task.gid=20-30 5=7", &groups).unwrap();
        assert_eq!(cond.number_count(), 4);
        let values: Vec<(u64, u64)> = cond.numbers().iter().map(|n| (n.min(), n.max())).collect();
        assert_eq!(values, vec![(0, 10), (20, 30), (5, 5), (7, 7)]);
        assert_eq!(cond.clauses()[0].left, Selector::Number);
        assert_eq!(cond.clauses()[0].right, Selector::Task(TaskField::Uid));
    }

    #[test]
    fn test_build_clauses() {
        let groups = GroupRegistry::new();
        let cond = parse("owner_execute=path1.perm path2.parent.uid!=0", &groups).unwrap();
        assert_eq!(
            cond.clauses(),
            &[
                Clause::new(
                    Selector::Mode(ModeBit::OwnerExecute),
                    Selector::Path(PathRole::Path1, PathField::Perm),
                    true
                ),
                Clause::new(
                    Selector::Path(PathRole::Path2Parent, PathField::Uid),
                    Selector::Number,
                    false
                ),
            ]
        );
    }

    #[test]
    fn test_group_on_left_rejected() {
        let groups = GroupRegistry::new();
        groups.define("g", vec![NumberUnion::value(1)]).unwrap();

        assert!(parse("task.uid=@g", &groups).is_ok());
        assert!(matches!(
            parse("@g=task.uid", &groups),
            Err(ConditionError::GroupOnLeft { .. })
        ));
    }

    #[test]
    fn test_invalid_literals() {
        let groups = GroupRegistry::new();
        assert!(parse("task.uid=", &groups).is_err());
        assert!(parse("task.uid=root", &groups).is_err());
        assert!(parse("task.uid!==0", &groups).is_err());
        assert!(parse("!=0", &groups).is_err());
        assert!(parse("task.uid=@nope", &groups).is_err());
        assert!(parse("task.uid=9-1", &groups).is_err());
    }

    #[test]
    fn test_error_in_later_clause_fails_whole_expression() {
        let groups = GroupRegistry::new();
        assert!(parse("task.uid=0 task.gid=0 bogus", &groups).is_err());
    }

    fn repeat_clause(clause: &str, count: usize) -> String {
        vec![clause; count].join(" ")
    }

    #[test]
    fn test_clause_count_limit() {
        let groups = GroupRegistry::new();

        let at_limit = repeat_clause("task.uid=task.euid", u16::MAX as usize);
        let shape = measure(&at_limit, &groups).unwrap();
        assert_eq!(shape.clause_count, u16::MAX);
        assert_eq!(shape.number_count, 0);

        let over = repeat_clause("task.uid=task.euid", u16::MAX as usize + 1);
        assert!(matches!(
            parse(&over, &groups),
            Err(ConditionError::TooManyClauses)
        ));
    }

    #[test]
    fn test_number_count_limit() {
        let groups = GroupRegistry::new();

        // 32767 * 2 + 1 literals
        let at_limit = format!("{} 0=task.uid", repeat_clause("0=1", 32_767));
        let cond = parse(&at_limit, &groups).unwrap();
        assert_eq!(cond.number_count(), u16::MAX);
        assert_eq!(cond.clause_count(), 32_768);

        let over = repeat_clause("0=1", 32_768);
        let err = parse(&over, &groups).unwrap_err();
        assert!(matches!(err, ConditionError::TooManyNumbers));
        assert!(err.is_parse_error());
    }

    #[test]
    #[should_panic]
    fn test_build_with_wrong_shape_panics() {
        let groups = GroupRegistry::new();
        let _ = build("task.uid=0", Shape::default(), &groups);
    }

    #[test]
    fn test_display_normalises_expression() {
        let groups = GroupRegistry::new();
        groups.define("ids", vec![NumberUnion::value(3)]).unwrap();
        let text = "task.uid!=0x10-0x20 path1.type=directory 0755=path1.perm task.gid=@ids";
        let cond = parse(text, &groups).unwrap();
        assert_eq!(cond.to_string(), text);
    }
}
