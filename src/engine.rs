//! Condition engine
//!
//! Ties together the group registry, the quota and the interning store:
//! policy load compiles expressions through [`ConditionEngine::compile`],
//! access checks call [`ConditionEngine::evaluate`].

use crate::condition::{
    self, CompiledCondition, ConditionRef, ConditionStore, GroupRegistry, Interrupt, MemoryQuota,
    PolicyQuota, RequestInfo,
};
use crate::config::EngineConfig;
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Compiles, interns and evaluates rule conditions
pub struct ConditionEngine {
    groups: Arc<GroupRegistry>,
    quota: Arc<MemoryQuota>,
    store: ConditionStore,
}

impl ConditionEngine {
    /// Create an engine from configuration
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let groups = Arc::new(GroupRegistry::new());
        for group in &config.number_groups {
            groups.define_literals(&group.name, &group.members)?;
        }

        let quota = Arc::new(MemoryQuota::new(config.policy_memory_quota));
        let store = ConditionStore::with_quota(quota.clone() as Arc<dyn PolicyQuota>)
            .with_poll_interval(config.lock_poll_interval());

        info!(
            "Condition engine ready ({} number groups, quota {} bytes)",
            groups.len(),
            config.policy_memory_quota
        );
        Ok(ConditionEngine {
            groups,
            quota,
            store,
        })
    }

    /// Create an engine with default configuration
    pub fn new_default() -> Self {
        let quota = Arc::new(MemoryQuota::unlimited());
        ConditionEngine {
            groups: Arc::new(GroupRegistry::new()),
            store: ConditionStore::with_quota(quota.clone() as Arc<dyn PolicyQuota>),
            quota,
        }
    }

    /// Compile `expr` and intern the result
    ///
    /// # Examples
    ///
    /// ```
    /// use tomoyo_cond::ConditionEngine;
    /// use tomoyo_cond::condition::{RequestInfo, TaskCredentials};
    ///
    /// let engine = ConditionEngine::new_default();
    /// let cond = engine.compile("task.uid=0-99 task.euid!=0").unwrap();
    ///
    /// let mut request = RequestInfo::new(TaskCredentials {
    ///     uid: 42,
    ///     euid: 42,
    ///     ..TaskCredentials::default()
    /// });
    /// assert!(engine.evaluate(Some(&cond), &mut request));
    /// ```
    pub fn compile(&self, expr: &str) -> Result<ConditionRef> {
        let candidate = self.parse(expr)?;
        self.store.commit(candidate)
    }

    /// Like [`compile`](Self::compile), abandoning the commit if
    /// `interrupt` is raised while waiting for the policy lock
    pub fn compile_interruptible(&self, expr: &str, interrupt: &Interrupt) -> Result<ConditionRef> {
        let candidate = self.parse(expr)?;
        self.store.commit_interruptible(candidate, interrupt)
    }

    fn parse(&self, expr: &str) -> Result<CompiledCondition> {
        condition::parse(expr, self.groups.as_ref()).map_err(|e| {
            debug!("Rejected condition {:?}: {}", expr, e);
            e
        })
    }

    /// Check a rule's condition; rules without one always match
    pub fn evaluate(&self, condition: Option<&ConditionRef>, request: &mut RequestInfo) -> bool {
        condition::matches(condition.map(|c| c.condition()), request)
    }

    /// Reclaim conditions no rule refers to any more
    pub fn sweep(&self) -> usize {
        self.store.sweep()
    }

    pub fn groups(&self) -> &Arc<GroupRegistry> {
        &self.groups
    }

    pub fn store(&self) -> &ConditionStore {
        &self.store
    }

    /// Bytes charged against the policy quota
    pub fn memory_used(&self) -> usize {
        self.quota.used()
    }
}

impl Default for ConditionEngine {
    fn default() -> Self {
        Self::new_default()
    }
}
