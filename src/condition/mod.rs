//! Rule conditions for mandatory access control
//!
//! A condition is a space-separated list of comparisons attached to a
//! policy rule, e.g. `task.uid=0 path1.perm=owner_execute`. It is:
//! - Compiled once into an immutable [`CompiledCondition`]
//! - Interned in a [`ConditionStore`] so equal conditions share one entry
//! - Evaluated per access check against a [`RequestInfo`], fetching path
//!   attributes lazily through an [`ObjectInfo`]

mod attributes;
mod compiled;
mod evaluate;
mod group;
mod number;
mod parser;
mod quota;
mod request;
mod selector;
mod store;

pub use attributes::{DeviceNumber, MiniStat, ObjectInfo, PathNode, StaticPathNode};
pub use compiled::{Clause, CompiledCondition, Shape};
pub use evaluate::matches;
pub use group::{GroupRegistry, GroupResolver, NumberGroup};
pub use number::{NumberRadix, NumberUnion};
pub use parser::{build, measure, parse, tokenize, ClauseSpan};
pub use quota::{MemoryQuota, PolicyQuota};
pub use request::{RequestInfo, RequestSpec, TaskCredentials};
pub use selector::{FileType, ModeBit, PathField, PathRole, Selector, TaskField};
pub use store::{ConditionRef, ConditionStore, Interrupt, StoreStats, DEFAULT_LOCK_POLL_INTERVAL};
