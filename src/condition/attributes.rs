//! Per-request filesystem attribute cache
//!
//! Path attributes are fetched the first time a clause needs one and then
//! memoized for the rest of the request. Four slots exist, one per
//! [`PathRole`]; a slot stays invalid if its path is absent or has no
//! backing object.

use super::selector::{PathField, PathRole, S_IALLUGO, S_IFMT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const MINOR_BITS: u32 = 20;
const MINOR_MASK: u32 = (1 << MINOR_BITS) - 1;

/// Major/minor device number pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

impl DeviceNumber {
    pub fn new(major: u32, minor: u32) -> Self {
        DeviceNumber { major, minor }
    }

    /// Decode a kernel-internal `dev_t` (12-bit major, 20-bit minor)
    pub fn from_raw(raw: u32) -> Self {
        DeviceNumber {
            major: raw >> MINOR_BITS,
            minor: raw & MINOR_MASK,
        }
    }

    pub fn raw(self) -> u32 {
        (self.major << MINOR_BITS) | (self.minor & MINOR_MASK)
    }
}

/// Snapshot of a filesystem object's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MiniStat {
    pub uid: u32,
    pub gid: u32,
    pub ino: u64,
    pub mode: u32,
    /// Device containing the object
    #[serde(default)]
    pub dev: DeviceNumber,
    /// Device the object represents (device special files)
    #[serde(default)]
    pub rdev: DeviceNumber,
}

impl MiniStat {
    /// Scalar value of `field` as compared by the evaluator
    pub fn field(&self, field: PathField) -> u64 {
        match field {
            PathField::Uid => self.uid as u64,
            PathField::Gid => self.gid as u64,
            PathField::Ino => self.ino,
            PathField::Major => self.dev.major as u64,
            PathField::Minor => self.dev.minor as u64,
            PathField::Perm => (self.mode & S_IALLUGO) as u64,
            PathField::Type => (self.mode & S_IFMT) as u64,
            PathField::DevMajor => self.rdev.major as u64,
            PathField::DevMinor => self.rdev.minor as u64,
        }
    }
}

/// A resolved path supplied by the filesystem layer
pub trait PathNode: Send + Sync {
    /// Metadata of the backing object, `None` if there is none
    fn stat(&self) -> Option<MiniStat>;

    /// Take a reference to the parent node. The cache drops it as soon as
    /// the parent's metadata has been read.
    fn parent(&self) -> Option<Arc<dyn PathNode>>;
}

/// In-memory path node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPathNode {
    #[serde(default)]
    pub stat: Option<MiniStat>,
    #[serde(default)]
    pub parent: Option<Box<StaticPathNode>>,
}

impl StaticPathNode {
    pub fn new(stat: MiniStat) -> Self {
        StaticPathNode {
            stat: Some(stat),
            parent: None,
        }
    }

    /// Node with no backing object
    pub fn negative() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: StaticPathNode) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

impl PathNode for StaticPathNode {
    fn stat(&self) -> Option<MiniStat> {
        self.stat
    }

    fn parent(&self) -> Option<Arc<dyn PathNode>> {
        self.parent
            .as_ref()
            .map(|parent| Arc::new(parent.as_ref().clone()) as Arc<dyn PathNode>)
    }
}

/// Paths of a request plus their lazily fetched metadata
#[derive(Default)]
pub struct ObjectInfo {
    path1: Option<Arc<dyn PathNode>>,
    path2: Option<Arc<dyn PathNode>>,
    stat: [MiniStat; 4],
    stat_valid: [bool; 4],
    validate_done: bool,
}

impl ObjectInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path1(mut self, node: Arc<dyn PathNode>) -> Self {
        self.path1 = Some(node);
        self
    }

    pub fn with_path2(mut self, node: Arc<dyn PathNode>) -> Self {
        self.path2 = Some(node);
        self
    }

    /// True once attributes have been fetched for this request
    pub fn is_resolved(&self) -> bool {
        self.validate_done
    }

    /// Fetch metadata for every available role. Only the first call does
    /// any work.
    pub fn resolve(&mut self) {
        if self.validate_done {
            return;
        }
        self.fetch_attributes();
        self.validate_done = true;
    }

    /// Metadata for `role`, resolving on first use. `None` if the role's
    /// path is absent or has no backing object.
    pub fn stat(&mut self, role: PathRole) -> Option<&MiniStat> {
        self.resolve();
        let index = role.index();
        self.stat_valid[index].then(|| &self.stat[index])
    }

    fn fetch_attributes(&mut self) {
        for role in PathRole::ALL {
            let base = match role {
                PathRole::Path1 | PathRole::Path1Parent => self.path1.as_ref(),
                PathRole::Path2 | PathRole::Path2Parent => self.path2.as_ref(),
            };
            let Some(base) = base else {
                continue;
            };

            let stat = if role.is_parent() {
                base.parent().and_then(|parent| parent.stat())
            } else {
                base.stat()
            };

            if let Some(stat) = stat {
                debug!("Fetched attributes for {}: {:?}", role.prefix(), stat);
                self.stat[role.index()] = stat;
                self.stat_valid[role.index()] = true;
            }
        }
    }
}

impl fmt::Debug for ObjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectInfo")
            .field("path1", &self.path1.is_some())
            .field("path2", &self.path2.is_some())
            .field("stat_valid", &self.stat_valid)
            .field("validate_done", &self.validate_done)
            .finish()
    }
}
