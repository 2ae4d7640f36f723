//! Access request context seen by the evaluator

use super::attributes::{ObjectInfo, StaticPathNode};
use super::selector::TaskField;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Credentials of the task performing the access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCredentials {
    pub uid: u32,
    pub euid: u32,
    pub suid: u32,
    pub fsuid: u32,
    pub gid: u32,
    pub egid: u32,
    pub sgid: u32,
    pub fsgid: u32,
    pub pid: u32,
    pub ppid: u32,
}

impl TaskCredentials {
    /// All user ids set to `uid`, all group ids set to `gid`
    pub fn with_ids(uid: u32, gid: u32) -> Self {
        TaskCredentials {
            uid,
            euid: uid,
            suid: uid,
            fsuid: uid,
            gid,
            egid: gid,
            sgid: gid,
            fsgid: gid,
            ..Self::default()
        }
    }

    pub fn value(&self, field: TaskField) -> u64 {
        let value = match field {
            TaskField::Uid => self.uid,
            TaskField::Euid => self.euid,
            TaskField::Suid => self.suid,
            TaskField::Fsuid => self.fsuid,
            TaskField::Gid => self.gid,
            TaskField::Egid => self.egid,
            TaskField::Sgid => self.sgid,
            TaskField::Fsgid => self.fsgid,
            TaskField::Pid => self.pid,
            TaskField::Ppid => self.ppid,
        };
        value as u64
    }
}

/// One in-flight access check
#[derive(Debug, Default)]
pub struct RequestInfo {
    pub task: TaskCredentials,
    /// Paths involved in the request, if any
    pub obj: Option<ObjectInfo>,
}

impl RequestInfo {
    pub fn new(task: TaskCredentials) -> Self {
        RequestInfo { task, obj: None }
    }

    pub fn with_object(mut self, obj: ObjectInfo) -> Self {
        self.obj = Some(obj);
        self
    }
}

/// Serializable description of a request, used by `condcheck` and tests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSpec {
    pub task: TaskCredentials,
    pub path1: Option<StaticPathNode>,
    pub path2: Option<StaticPathNode>,
}

impl RequestSpec {
    pub fn into_request(self) -> RequestInfo {
        let mut request = RequestInfo::new(self.task);
        if self.path1.is_some() || self.path2.is_some() {
            let mut obj = ObjectInfo::new();
            if let Some(path1) = self.path1 {
                obj = obj.with_path1(Arc::new(path1));
            }
            if let Some(path2) = self.path2 {
                obj = obj.with_path2(Arc::new(path2));
            }
            request.obj = Some(obj);
        }
        request
    }
}
