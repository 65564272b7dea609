//! Focus-space primitives for FocusSpace: the curated entry forest, its
//! tree-mutation algebra, persistence, and file-system reconciliation.
//! 管理 FocusSpace 焦點空間（檔案、資料夾與分組樹系）的核心模組。

mod util;

pub mod debounce;
pub mod entry;
pub mod locator;
pub mod monitor;
pub mod serial;
pub mod space;
pub mod space_store;
pub mod tree;

pub use debounce::Debouncer;
pub use entry::{EntryId, EntryKind, EntryMetadata, FocusEntry, DEFAULT_SECTION_LABEL};
pub use locator::{EntryLocator, LocatorError};
pub use monitor::{
    reconcile, SpaceFileEvent, SpaceFileEventKind, SpaceMonitor, SpaceMonitorError,
};
pub use serial::{
    from_serializable, to_serializable, SerialError, SerializedEntry, SerializedSpace,
    SPACE_FORMAT_VERSION,
};
pub use space::{CancelFlag, FocusSpace, SpaceError, SpaceEvent, DEFAULT_SAVE_DEBOUNCE};
pub use space_store::{SpaceStore, SpaceStoreError};
pub use tree::TreeOps;
