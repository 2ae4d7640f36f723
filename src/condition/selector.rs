//! Operand selectors and the keyword table
//!
//! Every clause side is either a keyword selector (process credential,
//! file-type constant, permission-bit constant, path attribute) or an
//! inline numeric/group literal ([`Selector::Number`]).

use ahash::AHashMap;
use std::fmt;
use std::sync::OnceLock;

/// File type mask
pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;

pub const S_ISUID: u32 = 0o4000;
pub const S_ISGID: u32 = 0o2000;
pub const S_ISVTX: u32 = 0o1000;
pub const S_IRUSR: u32 = 0o400;
pub const S_IWUSR: u32 = 0o200;
pub const S_IXUSR: u32 = 0o100;
pub const S_IRGRP: u32 = 0o040;
pub const S_IWGRP: u32 = 0o020;
pub const S_IXGRP: u32 = 0o010;
pub const S_IROTH: u32 = 0o004;
pub const S_IWOTH: u32 = 0o002;
pub const S_IXOTH: u32 = 0o001;

/// All permission bits including setuid/setgid/sticky
pub const S_IALLUGO: u32 = 0o7777;

/// Credential of the current task
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Uid,
    Euid,
    Suid,
    Fsuid,
    Gid,
    Egid,
    Sgid,
    Fsgid,
    Pid,
    Ppid,
}

impl TaskField {
    pub const ALL: [TaskField; 10] = [
        TaskField::Uid,
        TaskField::Euid,
        TaskField::Suid,
        TaskField::Fsuid,
        TaskField::Gid,
        TaskField::Egid,
        TaskField::Sgid,
        TaskField::Fsgid,
        TaskField::Pid,
        TaskField::Ppid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskField::Uid => "uid",
            TaskField::Euid => "euid",
            TaskField::Suid => "suid",
            TaskField::Fsuid => "fsuid",
            TaskField::Gid => "gid",
            TaskField::Egid => "egid",
            TaskField::Sgid => "sgid",
            TaskField::Fsgid => "fsgid",
            TaskField::Pid => "pid",
            TaskField::Ppid => "ppid",
        }
    }
}

/// File-type test constant
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Socket,
    Symlink,
    File,
    BlockDev,
    Directory,
    CharDev,
    Fifo,
}

impl FileType {
    pub const ALL: [FileType; 7] = [
        FileType::Socket,
        FileType::Symlink,
        FileType::File,
        FileType::BlockDev,
        FileType::Directory,
        FileType::CharDev,
        FileType::Fifo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FileType::Socket => "socket",
            FileType::Symlink => "symlink",
            FileType::File => "file",
            FileType::BlockDev => "block",
            FileType::Directory => "directory",
            FileType::CharDev => "char",
            FileType::Fifo => "fifo",
        }
    }

    /// `S_IF*` value compared against a path's `type` field
    pub fn value(self) -> u32 {
        match self {
            FileType::Socket => S_IFSOCK,
            FileType::Symlink => S_IFLNK,
            FileType::File => S_IFREG,
            FileType::BlockDev => S_IFBLK,
            FileType::Directory => S_IFDIR,
            FileType::CharDev => S_IFCHR,
            FileType::Fifo => S_IFIFO,
        }
    }
}

/// Permission-bit constant (a "bit-operand")
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeBit {
    Setuid,
    Setgid,
    Sticky,
    OwnerRead,
    OwnerWrite,
    OwnerExecute,
    GroupRead,
    GroupWrite,
    GroupExecute,
    OthersRead,
    OthersWrite,
    OthersExecute,
}

impl ModeBit {
    pub const ALL: [ModeBit; 12] = [
        ModeBit::Setuid,
        ModeBit::Setgid,
        ModeBit::Sticky,
        ModeBit::OwnerRead,
        ModeBit::OwnerWrite,
        ModeBit::OwnerExecute,
        ModeBit::GroupRead,
        ModeBit::GroupWrite,
        ModeBit::GroupExecute,
        ModeBit::OthersRead,
        ModeBit::OthersWrite,
        ModeBit::OthersExecute,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModeBit::Setuid => "setuid",
            ModeBit::Setgid => "setgid",
            ModeBit::Sticky => "sticky",
            ModeBit::OwnerRead => "owner_read",
            ModeBit::OwnerWrite => "owner_write",
            ModeBit::OwnerExecute => "owner_execute",
            ModeBit::GroupRead => "group_read",
            ModeBit::GroupWrite => "group_write",
            ModeBit::GroupExecute => "group_execute",
            ModeBit::OthersRead => "others_read",
            ModeBit::OthersWrite => "others_write",
            ModeBit::OthersExecute => "others_execute",
        }
    }

    pub fn value(self) -> u32 {
        match self {
            ModeBit::Setuid => S_ISUID,
            ModeBit::Setgid => S_ISGID,
            ModeBit::Sticky => S_ISVTX,
            ModeBit::OwnerRead => S_IRUSR,
            ModeBit::OwnerWrite => S_IWUSR,
            ModeBit::OwnerExecute => S_IXUSR,
            ModeBit::GroupRead => S_IRGRP,
            ModeBit::GroupWrite => S_IWGRP,
            ModeBit::GroupExecute => S_IXGRP,
            ModeBit::OthersRead => S_IROTH,
            ModeBit::OthersWrite => S_IWOTH,
            ModeBit::OthersExecute => S_IXOTH,
        }
    }
}

/// Which path of the request an attribute is taken from
///
/// Discriminants double as slot indices in the attribute cache.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRole {
    Path1 = 0,
    Path1Parent = 1,
    Path2 = 2,
    Path2Parent = 3,
}

impl PathRole {
    pub const ALL: [PathRole; 4] = [
        PathRole::Path1,
        PathRole::Path1Parent,
        PathRole::Path2,
        PathRole::Path2Parent,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_parent(self) -> bool {
        matches!(self, PathRole::Path1Parent | PathRole::Path2Parent)
    }

    pub fn prefix(self) -> &'static str {
        match self {
            PathRole::Path1 => "path1",
            PathRole::Path1Parent => "path1.parent",
            PathRole::Path2 => "path2",
            PathRole::Path2Parent => "path2.parent",
        }
    }
}

/// Attribute of a filesystem object
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathField {
    Uid,
    Gid,
    Ino,
    Major,
    Minor,
    Perm,
    Type,
    DevMajor,
    DevMinor,
}

impl PathField {
    pub const ALL: [PathField; 9] = [
        PathField::Uid,
        PathField::Gid,
        PathField::Ino,
        PathField::Major,
        PathField::Minor,
        PathField::Perm,
        PathField::Type,
        PathField::DevMajor,
        PathField::DevMinor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PathField::Uid => "uid",
            PathField::Gid => "gid",
            PathField::Ino => "ino",
            PathField::Major => "major",
            PathField::Minor => "minor",
            PathField::Perm => "perm",
            PathField::Type => "type",
            PathField::DevMajor => "dev_major",
            PathField::DevMinor => "dev_minor",
        }
    }
}

/// What one side of a clause resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Task(TaskField),
    FileType(FileType),
    Mode(ModeBit),
    Path(PathRole, PathField),
    /// Side carries the next inline numeric/group literal
    Number,
}

const TASK_BASE: u8 = 0;
const FILE_TYPE_BASE: u8 = TASK_BASE + TaskField::ALL.len() as u8;
const MODE_BASE: u8 = FILE_TYPE_BASE + FileType::ALL.len() as u8;
const PATH_BASE: u8 = MODE_BASE + ModeBit::ALL.len() as u8;
const NUMBER_TAG: u8 = PATH_BASE + (PathRole::ALL.len() * PathField::ALL.len()) as u8;

impl Selector {
    /// Look up a keyword. Unknown words return `None` and are treated as
    /// numeric/group literals by the parser.
    pub fn from_keyword(word: &str) -> Option<Selector> {
        keyword_table().get(word).copied()
    }

    /// Stable one-byte tag used in the compiled layout
    pub fn tag(self) -> u8 {
        match self {
            Selector::Task(f) => TASK_BASE + f as u8,
            Selector::FileType(t) => FILE_TYPE_BASE + t as u8,
            Selector::Mode(m) => MODE_BASE + m as u8,
            Selector::Path(role, field) => {
                PATH_BASE + role as u8 * PathField::ALL.len() as u8 + field as u8
            }
            Selector::Number => NUMBER_TAG,
        }
    }

    pub fn is_bit_operand(self) -> bool {
        matches!(self, Selector::Mode(_))
    }

    /// True for `pathN[.parent].perm`
    pub fn is_permission_field(self) -> bool {
        matches!(self, Selector::Path(_, PathField::Perm))
    }

    /// Every keyword selector, in tag order
    pub fn keywords() -> impl Iterator<Item = Selector> {
        let task = TaskField::ALL.into_iter().map(Selector::Task);
        let types = FileType::ALL.into_iter().map(Selector::FileType);
        let modes = ModeBit::ALL.into_iter().map(Selector::Mode);
        let paths = PathRole::ALL.into_iter().flat_map(|role| {
            PathField::ALL
                .into_iter()
                .map(move |field| Selector::Path(role, field))
        });
        task.chain(types).chain(modes).chain(paths)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Task(field) => write!(f, "task.{}", field.name()),
            Selector::FileType(t) => f.write_str(t.name()),
            Selector::Mode(m) => f.write_str(m.name()),
            Selector::Path(role, field) => write!(f, "{}.{}", role.prefix(), field.name()),
            Selector::Number => f.write_str("<number>"),
        }
    }
}

fn keyword_table() -> &'static AHashMap<String, Selector> {
    static TABLE: OnceLock<AHashMap<String, Selector>> = OnceLock::new();
    TABLE.get_or_init(|| Selector::keywords().map(|s| (s.to_string(), s)).collect())
}
