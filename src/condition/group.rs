//! Number groups
//!
//! A number group is a named set of intervals. Conditions hold groups by
//! shared reference, so members added after a condition was compiled are
//! visible to that condition.

use super::number::NumberUnion;
use crate::error::{ConditionError, Result};
use crate::validation::validate_group_name;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Resolves `@name` references while parsing
pub trait GroupResolver: Send + Sync {
    fn number_group(&self, name: &str) -> Option<Arc<NumberGroup>>;
}

/// Named list of numeric intervals
#[derive(Debug)]
pub struct NumberGroup {
    name: String,
    members: RwLock<Vec<NumberUnion>>,
}

impl NumberGroup {
    pub fn new(name: impl Into<String>) -> Self {
        NumberGroup {
            name: name.into(),
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an interval member. Group references cannot be nested.
    pub fn add_member(&self, member: NumberUnion) -> Result<()> {
        if member.is_group() {
            return Err(ConditionError::Config(format!(
                "number group '{}' cannot contain another group",
                self.name
            )));
        }
        let mut members = self.members.write();
        if !members.contains(&member) {
            members.push(member);
        }
        Ok(())
    }

    /// Remove an interval member, returning whether it was present
    pub fn remove_member(&self, member: &NumberUnion) -> bool {
        let mut members = self.members.write();
        let before = members.len();
        members.retain(|m| m != member);
        members.len() != before
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// True if any member interval overlaps `[min, max]`
    pub fn matches(&self, min: u64, max: u64) -> bool {
        self.members.read().iter().any(|m| m.overlaps(min, max))
    }
}

/// Thread-safe registry of number groups keyed by name
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<AHashMap<String, Arc<NumberGroup>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a group and append `members` to it
    pub fn define(&self, name: &str, members: Vec<NumberUnion>) -> Result<Arc<NumberGroup>> {
        validate_group_name(name)?;
        let group = {
            let mut groups = self.groups.write();
            groups
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(NumberGroup::new(name)))
                .clone()
        };
        for member in members {
            group.add_member(member)?;
        }
        Ok(group)
    }

    /// Get or create a group and append members written as `N` / `N-M`
    pub fn define_literals<S: AsRef<str>>(
        &self,
        name: &str,
        literals: &[S],
    ) -> Result<Arc<NumberGroup>> {
        let members = literals
            .iter()
            .map(|literal| {
                let literal = literal.as_ref();
                if literal.starts_with('@') {
                    return Err(ConditionError::Config(format!(
                        "number group '{}' cannot contain group reference {}",
                        name, literal
                    )));
                }
                NumberUnion::parse(literal, self)
            })
            .collect::<Result<Vec<_>>>()?;
        self.define(name, members)
    }

    pub fn get(&self, name: &str) -> Option<Arc<NumberGroup>> {
        self.groups.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl GroupResolver for GroupRegistry {
    fn number_group(&self, name: &str) -> Option<Arc<NumberGroup>> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_membership() {
        let group = NumberGroup::new("staff");
        group.add_member(NumberUnion::range(100, 199)).unwrap();
        group.add_member(NumberUnion::value(1000)).unwrap();

        assert!(group.matches(150, 150));
        assert!(group.matches(1000, 1000));
        assert!(group.matches(190, 500));
        assert!(!group.matches(200, 999));
        assert!(!group.matches(1001, 1001));
    }

    #[test]
    fn test_empty_group_matches_nothing() {
        let group = NumberGroup::new("nobody");
        assert!(group.is_empty());
        assert!(!group.matches(0, u64::MAX));
    }

    #[test]
    fn test_define_appends_to_existing_group() {
        let registry = GroupRegistry::new();
        let first = registry.define("uids", vec![NumberUnion::value(1)]).unwrap();
        let second = registry.define("uids", vec![NumberUnion::value(2)]).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_members_collapse() {
        let registry = GroupRegistry::new();
        let group = registry
            .define_literals("ports", &["80", "80", "8000-8080"])
            .unwrap();
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_remove_member() {
        let group = NumberGroup::new("g");
        group.add_member(NumberUnion::value(7)).unwrap();
        assert!(group.remove_member(&NumberUnion::value(7)));
        assert!(!group.remove_member(&NumberUnion::value(7)));
        assert!(!group.matches(7, 7));
    }

    #[test]
    fn test_nested_groups_rejected() {
        let registry = GroupRegistry::new();
        registry.define("inner", vec![NumberUnion::value(1)]).unwrap();
        assert!(registry.define_literals("outer", &["@inner"]).is_err());

        let inner = registry.get("inner").unwrap();
        let outer = NumberGroup::new("outer");
        assert!(outer.add_member(NumberUnion::group(inner)).is_err());
    }

    #[test]
    fn test_invalid_group_name() {
        let registry = GroupRegistry::new();
        assert!(registry.define("has space", Vec::new()).is_err());
        assert!(registry.define("", Vec::new()).is_err());
    }
}
