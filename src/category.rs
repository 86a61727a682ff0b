//! Task category registry
//!
//! Every timed event produced by the engine's instrumentation points belongs
//! to exactly one category from a closed, build-time-known space: build phase
//! markers, action lifecycle steps, remote-execution RPC phases, VFS
//! operations, interpreter calls, and so on. Each category carries the two
//! knobs the admission and retention machinery runs on:
//!
//! - an **admission threshold**: the minimum duration for an event to be
//!   recorded standalone instead of folded into its parent's aggregate, and
//! - a **slow-retention capacity**: how many of the slowest instances to keep
//!   for the category (zero disables slow tracking entirely).
//!
//! The registry is an immutable table built once at startup from an explicit
//! definition list and shared by handle across all session coordinators.
//! Derived flags (file-system, interpreter) are computed from explicit
//! membership lists at build time and stored, never re-derived from name
//! strings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stable identifier for a task category.
///
/// Declaration order is the canonical order: it drives `Ord`, iteration via
/// [`CategoryId::ALL`], and the dense index returned by [`CategoryId::index`]
/// that downstream components use to size per-category arrays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    Phase,
    Action,
    ActionCheck,
    ActionLock,
    ActionRelease,
    ActionUpdate,
    ActionComplete,
    Info,
    CreatePackage,
    RemoteExecution,
    LocalExecution,
    Scanner,
    LocalParse,
    UploadTime,
    ProcessTime,
    RemoteQueue,
    RemoteSetup,
    Fetch,
    VfsStat,
    VfsDir,
    VfsReadlink,
    VfsDigest,
    VfsXattr,
    VfsDelete,
    VfsOpen,
    VfsRead,
    VfsWrite,
    VfsGlob,
    VfsRemoteStat,
    VfsRemoteDir,
    VfsRemoteRead,
    Wait,
    ThreadName,
    GraphEval,
    NodeCompute,
    CriticalPath,
    CriticalPathComponent,
    GcNotification,
    LocalCpuUsage,
    ActionCounts,
    InterpreterParser,
    InterpreterUserFn,
    InterpreterBuiltinFn,
    InterpreterCompiledFn,
    ActionFsStaging,
    RemoteCacheCheck,
    RemoteDownload,
    RemoteNetwork,
    Unknown,
}

use CategoryId as C;

impl CategoryId {
    /// Size of the category space.
    pub const COUNT: usize = Self::ALL.len();

    /// The designated fallback for events that cannot be classified.
    pub const FALLBACK: CategoryId = CategoryId::Unknown;

    /// All categories in declaration order.
    pub const ALL: [CategoryId; 49] = [
        C::Phase,
        C::Action,
        C::ActionCheck,
        C::ActionLock,
        C::ActionRelease,
        C::ActionUpdate,
        C::ActionComplete,
        C::Info,
        C::CreatePackage,
        C::RemoteExecution,
        C::LocalExecution,
        C::Scanner,
        C::LocalParse,
        C::UploadTime,
        C::ProcessTime,
        C::RemoteQueue,
        C::RemoteSetup,
        C::Fetch,
        C::VfsStat,
        C::VfsDir,
        C::VfsReadlink,
        C::VfsDigest,
        C::VfsXattr,
        C::VfsDelete,
        C::VfsOpen,
        C::VfsRead,
        C::VfsWrite,
        C::VfsGlob,
        C::VfsRemoteStat,
        C::VfsRemoteDir,
        C::VfsRemoteRead,
        C::Wait,
        C::ThreadName,
        C::GraphEval,
        C::NodeCompute,
        C::CriticalPath,
        C::CriticalPathComponent,
        C::GcNotification,
        C::LocalCpuUsage,
        C::ActionCounts,
        C::InterpreterParser,
        C::InterpreterUserFn,
        C::InterpreterBuiltinFn,
        C::InterpreterCompiledFn,
        C::ActionFsStaging,
        C::RemoteCacheCheck,
        C::RemoteDownload,
        C::RemoteNetwork,
        C::Unknown,
    ];

    /// Dense index of this category, suitable for per-category arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Admission threshold for lightweight, high-frequency tasks.
const TEN_MILLIS: Duration = Duration::from_millis(10);

/// Admission threshold for remote-execution phases.
const FIFTY_MILLIS: Duration = Duration::from_millis(50);

/// Builtin category table: (id, description, admission threshold, slow
/// retention capacity), in declaration order.
///
/// Non-zero retention capacities are 30: a replace-min heap that briefly
/// holds one extra element peaks at 31 entries, a complete binary tree.
const DEFS: &[(CategoryId, &str, Option<Duration>, usize)] = &[
    (C::Phase, "build phase marker", None, 0),
    (C::Action, "action processing", None, 0),
    (C::ActionCheck, "action dependency checking", Some(TEN_MILLIS), 0),
    (C::ActionLock, "action resource lock", Some(TEN_MILLIS), 0),
    (C::ActionRelease, "action resource release", Some(TEN_MILLIS), 0),
    (C::ActionUpdate, "update action information", Some(TEN_MILLIS), 0),
    (C::ActionComplete, "complete action execution", None, 0),
    (C::Info, "general information", None, 0),
    (C::CreatePackage, "package creation", None, 0),
    (C::RemoteExecution, "remote action execution", None, 0),
    (C::LocalExecution, "local action execution", None, 0),
    (C::Scanner, "include scanner", None, 0),
    (C::LocalParse, "local parse to prepare for remote execution", Some(FIFTY_MILLIS), 30),
    (C::UploadTime, "remote execution upload time", Some(FIFTY_MILLIS), 0),
    (C::ProcessTime, "remote execution process wall time", Some(FIFTY_MILLIS), 0),
    (C::RemoteQueue, "remote execution queuing time", Some(FIFTY_MILLIS), 30),
    (C::RemoteSetup, "remote execution setup", Some(FIFTY_MILLIS), 0),
    (C::Fetch, "remote execution file fetching", Some(FIFTY_MILLIS), 30),
    (C::VfsStat, "VFS stat", Some(TEN_MILLIS), 30),
    (C::VfsDir, "VFS readdir", Some(TEN_MILLIS), 30),
    (C::VfsReadlink, "VFS readlink", Some(TEN_MILLIS), 30),
    (C::VfsDigest, "VFS digest", Some(TEN_MILLIS), 30),
    (C::VfsXattr, "VFS xattr", Some(TEN_MILLIS), 30),
    (C::VfsDelete, "VFS delete", Some(TEN_MILLIS), 0),
    (C::VfsOpen, "VFS open", Some(TEN_MILLIS), 30),
    (C::VfsRead, "VFS read", Some(TEN_MILLIS), 30),
    (C::VfsWrite, "VFS write", Some(TEN_MILLIS), 30),
    (C::VfsGlob, "globbing", None, 30),
    (C::VfsRemoteStat, "remote VFS stat", Some(TEN_MILLIS), 0),
    (C::VfsRemoteDir, "remote VFS readdir", Some(TEN_MILLIS), 0),
    (C::VfsRemoteRead, "remote VFS read", Some(TEN_MILLIS), 0),
    (C::Wait, "thread wait", Some(TEN_MILLIS), 0),
    (C::ThreadName, "thread name", None, 0),
    (C::GraphEval, "dependency graph evaluator", None, 0),
    (C::NodeCompute, "graph node computation", None, 0),
    (C::CriticalPath, "critical path", None, 0),
    (C::CriticalPathComponent, "critical path component", None, 0),
    (C::GcNotification, "gc notification", None, 0),
    (C::LocalCpuUsage, "cpu counters", None, 0),
    (C::ActionCounts, "action counters", None, 0),
    (C::InterpreterParser, "interpreter parser", None, 0),
    (C::InterpreterUserFn, "interpreter user function call", None, 0),
    (C::InterpreterBuiltinFn, "interpreter builtin function call", None, 0),
    (C::InterpreterCompiledFn, "interpreter compiled user function call", None, 0),
    (C::ActionFsStaging, "staging per-action file system", None, 0),
    (C::RemoteCacheCheck, "remote action cache check", None, 0),
    (C::RemoteDownload, "remote output download", None, 0),
    (C::RemoteNetwork, "remote network", None, 0),
    (C::Unknown, "unknown event", None, 0),
];

/// Categories whose events come from the virtual file system layer.
const FILESYSTEM: &[CategoryId] = &[
    C::VfsStat,
    C::VfsDir,
    C::VfsReadlink,
    C::VfsDigest,
    C::VfsXattr,
    C::VfsDelete,
    C::VfsOpen,
    C::VfsRead,
    C::VfsWrite,
    C::VfsGlob,
    C::VfsRemoteStat,
    C::VfsRemoteDir,
    C::VfsRemoteRead,
];

/// Categories that time interpreter / user-code execution.
const INTERPRETER: &[CategoryId] = &[
    C::InterpreterParser,
    C::InterpreterUserFn,
    C::InterpreterBuiltinFn,
    C::InterpreterCompiledFn,
];

/// Immutable metadata for a single task category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Stable identifier.
    pub id: CategoryId,
    /// Human-readable description.
    pub description: &'static str,
    /// Minimum duration for standalone recording. `None` means the category
    /// has no threshold and every event is emitted standalone.
    pub admission_threshold: Option<Duration>,
    /// How many of the slowest instances to keep. Zero disables slow
    /// tracking for this category.
    pub slow_retention_capacity: usize,
    /// True if this category instruments file-system operations.
    pub is_filesystem: bool,
    /// True if this category times interpreter / user-code execution.
    pub is_interpreter: bool,
}

impl Category {
    /// Whether a slow-event tracker collects instances of this category.
    pub fn collects_slowest_instances(&self) -> bool {
        self.slow_retention_capacity > 0
    }
}

/// Registry of all task categories, built once and never mutated.
///
/// Lookup is total: the category space is closed, so every `CategoryId`
/// resolves to a definition by construction.
///
/// # Example
///
/// ```
/// use demora::category::{CategoryId, CategoryRegistry};
///
/// let registry = CategoryRegistry::builtin();
/// let vfs_read = registry.get(CategoryId::VfsRead);
/// assert_eq!(vfs_read.description, "VFS read");
/// assert!(vfs_read.is_filesystem);
/// assert!(vfs_read.collects_slowest_instances());
/// ```
#[derive(Debug)]
pub struct CategoryRegistry {
    table: Vec<Category>,
}

impl CategoryRegistry {
    /// Build the registry from the builtin definition table.
    ///
    /// # Panics
    ///
    /// Panics if the definition table is inconsistent (missing or reordered
    /// ids, or a non-zero retention capacity that breaks the heap sizing
    /// convention). Both indicate a defect in this module, not a runtime
    /// condition.
    pub fn builtin() -> Self {
        let table: Vec<Category> = DEFS
            .iter()
            .map(|&(id, description, admission_threshold, slow_retention_capacity)| Category {
                id,
                description,
                admission_threshold,
                slow_retention_capacity,
                is_filesystem: FILESYSTEM.contains(&id),
                is_interpreter: INTERPRETER.contains(&id),
            })
            .collect();

        assert_eq!(table.len(), CategoryId::COUNT, "definition table incomplete");
        for (index, category) in table.iter().enumerate() {
            assert_eq!(
                category.id.index(),
                index,
                "definition table out of declaration order at {:?}",
                category.id
            );
            let capacity = category.slow_retention_capacity;
            assert!(
                capacity == 0 || (capacity + 2).is_power_of_two(),
                "retention capacity {} for {:?} breaks the heap sizing convention",
                capacity,
                category.id
            );
        }

        Self { table }
    }

    /// Look up the metadata for a category. Total and deterministic.
    pub fn get(&self, id: CategoryId) -> &Category {
        &self.table[id.index()]
    }

    /// Size of the category space, for sizing per-category arrays.
    pub fn count(&self) -> usize {
        self.table.len()
    }

    /// Human-readable description for a category.
    pub fn description_for(&self, id: CategoryId) -> &'static str {
        self.get(id).description
    }

    /// All categories in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.table.iter()
    }
}
