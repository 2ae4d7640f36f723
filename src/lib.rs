//! # tomoyo-cond - Rule Conditions for Mandatory Access Control
//!
//! `tomoyo-cond` is the condition-matching core of a pathname-based MAC
//! policy: it compiles the textual condition attached to an access rule
//! into a compact immutable object, deduplicates equal conditions, and
//! answers "does this condition hold for this request" on every access
//! check.
//!
//! - **Parser**: two-pass compiler for `LEFT=RIGHT` / `LEFT!=RIGHT` clauses
//! - **Interning store**: equal conditions share one entry, readers never lock
//! - **Attribute cache**: path metadata fetched lazily, once per request
//! - **Evaluator**: ranges, number groups and permission-bit tests, fail-closed
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tomoyo_cond::condition::{MiniStat, ObjectInfo, RequestInfo, StaticPathNode, TaskCredentials};
//! use tomoyo_cond::{ConditionEngine, Result};
//!
//! # fn main() -> Result<()> {
//! let engine = ConditionEngine::new_default();
//! let cond = engine.compile("path1.uid=task.uid owner_execute=path1.perm")?;
//!
//! let script = StaticPathNode::new(MiniStat {
//!     uid: 1000,
//!     mode: 0o100755,
//!     ..MiniStat::default()
//! });
//! let mut request = RequestInfo::new(TaskCredentials::with_ids(1000, 1000))
//!     .with_object(ObjectInfo::new().with_path1(Arc::new(script)));
//!
//! assert!(engine.evaluate(Some(&cond), &mut request));
//! # Ok(())
//! # }
//! ```
//!
//! ## Keywords
//!
//! ```text
//! task.{uid,euid,suid,fsuid,gid,egid,sgid,fsgid,pid,ppid}
//! socket symlink file block directory char fifo
//! setuid setgid sticky {owner,group,others}_{read,write,execute}
//! {path1,path2,path1.parent,path2.parent}.{uid,gid,ino,major,minor,perm,type,dev_major,dev_minor}
//! ```
//!
//! Anything else is a numeric literal (`N`, `N-M`, with `0x`/`0` radix
//! prefixes) or, on the right-hand side only, a number group (`@name`).

pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod validation;

pub use condition::{CompiledCondition, ConditionRef, ConditionStore, RequestInfo};
pub use config::EngineConfig;
pub use engine::ConditionEngine;
pub use error::{ConditionError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
