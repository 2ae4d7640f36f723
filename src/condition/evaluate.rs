//! Condition evaluation
//!
//! Each side of a clause resolves to an interval `[min, max]`:
//! - keywords give a single point (credential, constant or path attribute)
//! - literals give their interval and are consumed in compile order
//!
//! A right-hand group literal delegates to the group's membership test.
//! Permission-bit constants are only comparable against a `perm` field,
//! where the test is `bits & perm != 0`. Everything else is interval
//! overlap. The first failing clause makes the whole condition fail.

use super::compiled::{Clause, CompiledCondition};
use super::number::NumberUnion;
use super::request::RequestInfo;
use super::selector::Selector;
use tracing::debug;

/// Check `condition` against `request`. An absent condition always matches.
pub fn matches(condition: Option<&CompiledCondition>, request: &mut RequestInfo) -> bool {
    let Some(condition) = condition else {
        return true;
    };

    let mut numbers = condition.numbers().iter();
    for (i, clause) in condition.clauses().iter().enumerate() {
        let pending = numbers.as_slice();
        if !clause_matches(clause, &mut numbers, request).unwrap_or(false) {
            let mut literals = pending.iter();
            debug!(
                "Clause {} ({}{}{}) failed",
                i,
                operand_text(clause.left, &mut literals),
                if clause.equals { "=" } else { "!=" },
                operand_text(clause.right, &mut literals)
            );
            return false;
        }
    }
    true
}

/// Keyword name, or the literal the clause consumed for a numeric side
fn operand_text<'a>(
    selector: Selector,
    literals: &mut impl Iterator<Item = &'a NumberUnion>,
) -> String {
    match selector {
        Selector::Number => literals
            .next()
            .map_or_else(|| selector.to_string(), |number| number.to_string()),
        keyword => keyword.to_string(),
    }
}

impl CompiledCondition {
    /// Check this condition against `request`
    pub fn matches(&self, request: &mut RequestInfo) -> bool {
        matches(Some(self), request)
    }
}

/// `None` when an operand cannot be resolved
fn clause_matches<'a>(
    clause: &Clause,
    numbers: &mut impl Iterator<Item = &'a NumberUnion>,
    request: &mut RequestInfo,
) -> Option<bool> {
    let mut min = [0u64; 2];
    let mut max = [0u64; 2];
    for (j, selector) in [clause.left, clause.right].into_iter().enumerate() {
        let value = resolve(selector, request)?;
        min[j] = value;
        max[j] = value;
    }

    if clause.left == Selector::Number {
        let number = numbers.next()?;
        min[0] = number.min();
        max[0] = number.max();
    }

    if clause.right == Selector::Number {
        let number = numbers.next()?;
        let hit = match number.as_group() {
            Some(group) => group.matches(min[0], max[0]),
            None => number.overlaps(min[0], max[0]),
        };
        return Some(hit == clause.equals);
    }

    let matched = match (clause.left.is_bit_operand(), clause.right.is_bit_operand()) {
        (true, true) => false,
        (true, false) => {
            clause.right.is_permission_field() && ((max[0] & max[1] != 0) == clause.equals)
        }
        (false, true) => {
            clause.left.is_permission_field() && ((max[0] & max[1] != 0) == clause.equals)
        }
        (false, false) => (min[0] <= max[1] && max[0] >= min[1]) == clause.equals,
    };
    Some(matched)
}

/// Scalar value of a keyword side. Literal sides resolve to a placeholder
/// and are filled in from the operand array.
fn resolve(selector: Selector, request: &mut RequestInfo) -> Option<u64> {
    match selector {
        Selector::Task(field) => Some(request.task.value(field)),
        Selector::FileType(file_type) => Some(file_type.value() as u64),
        Selector::Mode(bit) => Some(bit.value() as u64),
        Selector::Number => Some(0),
        Selector::Path(role, field) => {
            let obj = request.obj.as_mut()?;
            obj.stat(role).map(|stat| stat.field(field))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::attributes::{MiniStat, ObjectInfo, StaticPathNode};
    use crate::condition::group::GroupRegistry;
    use crate::condition::number::NumberUnion;
    use crate::condition::parser::parse;
    use crate::condition::request::TaskCredentials;
    use std::sync::Arc;

    fn request_with_uid(uid: u32) -> RequestInfo {
        RequestInfo::new(TaskCredentials::with_ids(uid, 100))
    }

    fn file_request(mode: u32) -> RequestInfo {
        let node = StaticPathNode::new(MiniStat {
            uid: 1000,
            gid: 100,
            ino: 42,
            mode,
            ..MiniStat::default()
        });
        request_with_uid(1000).with_object(ObjectInfo::new().with_path1(Arc::new(node)))
    }

    fn check(expr: &str, request: &mut RequestInfo) -> bool {
        let cond = parse(expr, &GroupRegistry::new()).unwrap();
        matches(Some(&cond), request)
    }

    #[test]
    fn test_operand_text_shows_consumed_literals() {
        let cond = parse("0x10=task.uid task.gid!=1-5", &GroupRegistry::new()).unwrap();
        let mut literals = cond.numbers().iter();

        let first = cond.clauses()[0];
        assert_eq!(operand_text(first.left, &mut literals), "0x10");
        assert_eq!(operand_text(first.right, &mut literals), "task.uid");

        let second = cond.clauses()[1];
        assert_eq!(operand_text(second.left, &mut literals), "task.gid");
        assert_eq!(operand_text(second.right, &mut literals), "1-5");
        assert!(literals.next().is_none());
    }

    #[test]
    fn test_absent_condition_matches() {
        assert!(matches(None, &mut RequestInfo::default()));
        assert!(matches(None, &mut file_request(0)));
    }

    #[test]
    fn test_uid_equality() {
        assert!(check("task.uid=1000", &mut request_with_uid(1000)));
        assert!(!check("task.uid=1000", &mut request_with_uid(1001)));
        assert!(check("task.uid!=1000", &mut request_with_uid(1001)));
        assert!(!check("task.uid!=1000", &mut request_with_uid(1000)));
    }

    #[test]
    fn test_range() {
        assert!(check("task.uid=10-20", &mut request_with_uid(15)));
        assert!(check("task.uid=10-20", &mut request_with_uid(10)));
        assert!(check("task.uid=10-20", &mut request_with_uid(20)));
        assert!(!check("task.uid=10-20", &mut request_with_uid(25)));
        assert!(!check("task.uid!=10-20", &mut request_with_uid(15)));
        assert!(check("task.uid!=10-20", &mut request_with_uid(25)));
    }

    #[test]
    fn test_literal_on_both_sides() {
        let mut request = RequestInfo::default();
        assert!(check("0-10=5-15", &mut request));
        assert!(!check("0-10=11-15", &mut request));
        assert!(check("0-10!=11-15", &mut request));
    }

    #[test]
    fn test_literal_on_left() {
        assert!(check("1000=task.uid", &mut request_with_uid(1000)));
        assert!(check("500-1500=task.uid", &mut request_with_uid(1000)));
        assert!(!check("0-999=task.uid", &mut request_with_uid(1000)));
    }

    #[test]
    fn test_keyword_comparison() {
        let mut request = RequestInfo::new(TaskCredentials {
            euid: 0,
            ..TaskCredentials::with_ids(1000, 100)
        });
        assert!(!check("task.uid=task.euid", &mut request));
        assert!(check("task.uid!=task.euid", &mut request));
        assert!(check("task.gid=task.egid", &mut request));
    }

    #[test]
    fn test_permission_bits() {
        assert!(check("owner_execute=path1.perm", &mut file_request(0o100755)));
        assert!(!check("owner_execute=path1.perm", &mut file_request(0o100644)));
        assert!(check("owner_execute!=path1.perm", &mut file_request(0o100644)));
        assert!(check("path1.perm=setuid", &mut file_request(0o104755)));
        assert!(!check("path1.perm=sticky", &mut file_request(0o104755)));
    }

    #[test]
    fn test_two_bit_operands_always_fail() {
        let mut request = file_request(0o100777);
        assert!(!check("owner_read=owner_read", &mut request));
        assert!(!check("owner_read!=owner_write", &mut request));
    }

    #[test]
    fn test_bit_operand_requires_perm_field() {
        let mut request = file_request(0o100755);
        assert!(!check("owner_read=path1.uid", &mut request));
        assert!(!check("task.uid=owner_read", &mut request));
        assert!(!check("owner_read!=path1.type", &mut request));
    }

    #[test]
    fn test_bit_operand_against_literal_is_range_check() {
        let mut request = RequestInfo::default();
        assert!(check("owner_read=0400", &mut request));
        assert!(check("owner_read!=0200", &mut request));
    }

    #[test]
    fn test_file_type() {
        assert!(check("path1.type=file", &mut file_request(0o100644)));
        assert!(!check("path1.type=directory", &mut file_request(0o100644)));
        assert!(check("path1.type=directory", &mut file_request(0o040755)));
        assert!(check("path1.type!=symlink", &mut file_request(0o040755)));
    }

    #[test]
    fn test_missing_path_fails_closed() {
        assert!(!check("path1.uid=1000", &mut request_with_uid(1000)));
        assert!(!check("path1.uid!=1000", &mut request_with_uid(1000)));
        assert!(!check("path2.uid=1000", &mut file_request(0o100644)));
        assert!(!check("path1.parent.uid=0", &mut file_request(0o100644)));
    }

    #[test]
    fn test_group_membership() {
        let groups = GroupRegistry::new();
        groups
            .define("staff", vec![NumberUnion::range(1000, 1999)])
            .unwrap();
        let cond = parse("task.uid=@staff", &groups).unwrap();
        let negated = parse("task.uid!=@staff", &groups).unwrap();

        assert!(cond.matches(&mut request_with_uid(1500)));
        assert!(!cond.matches(&mut request_with_uid(500)));
        assert!(!negated.matches(&mut request_with_uid(1500)));
        assert!(negated.matches(&mut request_with_uid(500)));

        // Members added later are visible through the shared group
        groups.define("staff", vec![NumberUnion::value(500)]).unwrap();
        assert!(cond.matches(&mut request_with_uid(500)));
    }

    #[test]
    fn test_literal_range_against_group() {
        let groups = GroupRegistry::new();
        groups.define("ports", vec![NumberUnion::value(80)]).unwrap();
        let cond = parse("0-100=@ports", &groups).unwrap();
        assert!(cond.matches(&mut RequestInfo::default()));
        let cond = parse("81-100=@ports", &groups).unwrap();
        assert!(!cond.matches(&mut RequestInfo::default()));
    }

    #[test]
    fn test_first_failure_stops_evaluation() {
        let mut request = request_with_uid(0).with_object(
            ObjectInfo::new().with_path1(Arc::new(StaticPathNode::new(MiniStat::default()))),
        );
        assert!(!check("task.uid=1 path1.uid=0", &mut request));
        assert!(!request.obj.as_ref().unwrap().is_resolved());
        assert!(check("task.uid=0 path1.uid=0", &mut request));
        assert!(request.obj.as_ref().unwrap().is_resolved());
    }

    #[test]
    fn test_numbers_consumed_in_order() {
        let mut request = request_with_uid(5);
        assert!(check("task.uid=5 1-2=2-3 task.gid=100", &mut request));
        assert!(check("task.uid=0-9 task.gid=100-100", &mut request));
        assert!(!check("task.uid=0-9 task.gid=101", &mut request));
    }
}
