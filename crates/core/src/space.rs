use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::debounce::Debouncer;
use crate::entry::{EntryId, EntryKind, EntryMetadata, FocusEntry, DEFAULT_SECTION_LABEL};
use crate::locator::EntryLocator;
use crate::serial::{self, SerializedSpace, SPACE_FORMAT_VERSION};
use crate::space_store::{SpaceStore, SpaceStoreError};
use crate::tree::TreeOps;
use crate::util::unix_millis;

/// Quiet period between the last mutation and the debounced save.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Notification emitted through [`FocusSpace::subscribe`] channels.
/// 透過 [`FocusSpace::subscribe`] 頻道發出的通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceEvent {
    /// The forest changed; consumers re-pull state via the query surface.
    /// 樹系已變更；訂閱者應重新查詢最新狀態。
    Changed,
    /// A persistence attempt failed. In-memory state is untouched.
    /// 持久化失敗；記憶體內的狀態不受影響。
    SaveFailed(String),
}

/// Cooperative cancellation handle for long-running operations.
/// 長時間操作使用的協作式取消旗標。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Errors surfaced by [`FocusSpace`] I/O paths.
/// [`FocusSpace`] 進行 I/O 時可能出現的錯誤。
#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("space persistence error: {0}")]
    Store(#[from] SpaceStoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct ChangeNotifier {
    senders: Vec<Sender<SpaceEvent>>,
}

impl ChangeNotifier {
    fn subscribe(&mut self) -> Receiver<SpaceEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    fn emit(&mut self, event: SpaceEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// The sole mutable owner of the curated forest. Wraps the tree algebra with
/// id generation, persistence scheduling, and change notification. Built as
/// an explicitly owned instance rather than a global singleton; shut down
/// with [`flush`].
/// 焦點空間的唯一擁有者；包裝樹系操作並負責識別碼產生、持久化排程與變更通知。
///
/// [`flush`]: FocusSpace::flush
#[derive(Debug)]
pub struct FocusSpace {
    entries: Vec<FocusEntry>,
    ops: TreeOps,
    store: SpaceStore,
    workspace_root: Option<PathBuf>,
    dirty: bool,
    save_debounce: Debouncer,
    notifier: ChangeNotifier,
}

impl FocusSpace {
    /// Loads the persisted forest once at startup. Missing or corrupt data
    /// degrades to an empty space; it never propagates.
    /// 啟動時載入一次持久化資料；遺失或損毀時退化為空樹系。
    pub fn init(store: SpaceStore) -> Self {
        let entries = match store.load() {
            Ok(Some(space)) => serial::from_serializable(space.entries).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(_) => Vec::new(),
        };
        Self {
            entries,
            ops: TreeOps::new(),
            store,
            workspace_root: None,
            dirty: false,
            save_debounce: Debouncer::new(DEFAULT_SAVE_DEBOUNCE),
            notifier: ChangeNotifier::default(),
        }
    }

    /// Sets the root used to compute `relative_path` metadata.
    /// 設定用來計算相對路徑的工作區根目錄。
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn set_save_debounce(&mut self, delay: Duration) {
        self.save_debounce = Debouncer::new(delay);
    }

    /// Subscribes to change notifications.
    /// 訂閱變更通知。
    pub fn subscribe(&mut self) -> Receiver<SpaceEvent> {
        self.notifier.subscribe()
    }

    /// Adds a file or folder entry. The parent is honored only when it
    /// resolves to an entry that accepts children; otherwise the entry lands
    /// at root level. No duplicate check; duplicates are caller policy. A
    /// `Section` kind is routed to section construction (the path argument
    /// is ignored).
    /// 新增檔案或資料夾條目；父層無效時放到根層。不檢查重複。
    pub fn add_entry(
        &mut self,
        path: impl Into<PathBuf>,
        kind: EntryKind,
        parent: Option<&EntryId>,
        label: Option<String>,
    ) -> EntryId {
        if kind == EntryKind::Section {
            let label = label.unwrap_or_else(|| DEFAULT_SECTION_LABEL.to_string());
            return self.insert_section(label, parent);
        }
        let path = path.into();
        let mut entry = match kind {
            EntryKind::File => FocusEntry::new_file(&path),
            EntryKind::Folder => FocusEntry::new_folder(&path),
            EntryKind::Section => unreachable!("section kind handled above"),
        };
        entry.label = label;
        entry.metadata = Some(EntryMetadata {
            date_added: unix_millis(),
            relative_path: Some(relative_to(self.workspace_root.as_deref(), &path)),
            order: Some(self.container_len(parent) as u32),
            git_status: None,
        });
        let id = entry.id.clone();
        self.insert(entry, parent);
        self.mark_changed();
        id
    }

    /// Creates a root-level section.
    /// 建立根層分組。
    pub fn create_section(&mut self, label: impl Into<String>) -> EntryId {
        self.insert_section(label.into(), None)
    }

    /// Removes an entry and its whole subtree. `false` without side effects
    /// when the id is unknown.
    /// 移除條目與其整棵子樹；識別碼不存在時回傳 `false` 且無任何副作用。
    pub fn remove_entry(&mut self, id: &EntryId) -> bool {
        let removed = self.ops.remove_by_id(&mut self.entries, id);
        if removed {
            self.mark_changed();
        }
        removed
    }

    /// Removes every entry carrying the locator (duplicates included).
    /// Returns the number of entries removed.
    /// 移除所有指向該路徑的條目（含重複者），回傳移除數量。
    pub fn remove_by_locator(&mut self, path: impl AsRef<Path>) -> usize {
        let locator = EntryLocator::path(path.as_ref());
        let mut removed = 0;
        while let Some(entry) = self.ops.find_by_locator(&self.entries, &locator) {
            let id = entry.id.clone();
            if !self.ops.remove_by_id(&mut self.entries, &id) {
                break;
            }
            removed += 1;
        }
        if removed > 0 {
            self.mark_changed();
        }
        removed
    }

    /// Moves an entry to the end of a section (or to root level when
    /// `None`). Rejects self-containment and moves into any descendant of
    /// the moved entry.
    /// 將條目移至分組末端（`None` 表示根層）；拒絕移入自身或其子孫。
    pub fn move_to_section(&mut self, id: &EntryId, section: Option<&EntryId>) -> bool {
        self.move_to_section_impl(id, section, None)
    }

    /// Same as [`move_to_section`] with an explicit insertion index, clamped
    /// to the destination length.
    /// 同 [`move_to_section`]，但指定插入位置（超界時夾到尾端）。
    ///
    /// [`move_to_section`]: FocusSpace::move_to_section
    pub fn move_to_section_at(
        &mut self,
        id: &EntryId,
        section: Option<&EntryId>,
        position: usize,
    ) -> bool {
        self.move_to_section_impl(id, section, Some(position))
    }

    /// Repositions an entry within its current container.
    /// 在目前容器內調整條目順序。
    pub fn reorder_entry(
        &mut self,
        id: &EntryId,
        new_index: usize,
        parent: Option<&EntryId>,
    ) -> bool {
        let moved = self.ops.reorder_entry(&mut self.entries, id, new_index, parent);
        if moved {
            self.mark_changed();
        }
        moved
    }

    /// Overrides (or resets) an entry's display label.
    /// 覆寫或清除條目的顯示標籤。
    pub fn set_label(&mut self, id: &EntryId, label: Option<String>) -> bool {
        let changed = match self.ops.find_by_id_mut(&mut self.entries, id) {
            Some(entry) => {
                entry.label = label;
                true
            }
            None => false,
        };
        if changed {
            self.mark_changed();
        }
        changed
    }

    /// Rewrites the locator of every entry matching `old_path` (duplicates
    /// included), refreshing `relative_path` metadata. Returns the number of
    /// entries updated. Consumed by file-system reconciliation.
    /// 將所有符合舊路徑的條目改指向新路徑並更新相對路徑，回傳更新數量。
    pub fn relocate(&mut self, old_path: impl AsRef<Path>, new_path: impl AsRef<Path>) -> usize {
        let old = EntryLocator::path(old_path.as_ref());
        let new_path = new_path.as_ref().to_path_buf();
        let relative = relative_to(self.workspace_root.as_deref(), &new_path);
        let mut updated = 0;
        loop {
            let Some(found) = self.ops.find_by_locator(&self.entries, &old) else {
                break;
            };
            let id = found.id.clone();
            match self.ops.find_by_id_mut(&mut self.entries, &id) {
                Some(entry) => {
                    entry.locator = EntryLocator::path(new_path.clone());
                    if let Some(metadata) = entry.metadata.as_mut() {
                        metadata.relative_path = Some(relative.clone());
                    }
                    updated += 1;
                }
                None => break,
            }
        }
        if updated > 0 {
            self.mark_changed();
        }
        updated
    }

    /// Retrieves the live view of an entry.
    /// 取得條目的即時檢視。
    pub fn entry(&mut self, id: &EntryId) -> Option<&FocusEntry> {
        self.ops.find_by_id(&self.entries, id)
    }

    /// Root-level entries when `parent` is `None`, that parent's children
    /// otherwise; empty for unknown ids.
    /// 取得根層條目或指定父層的子條目；識別碼無效時回傳空集合。
    pub fn entries(&mut self, parent: Option<&EntryId>) -> &[FocusEntry] {
        match parent {
            None => &self.entries,
            Some(parent_id) => self
                .ops
                .find_by_id(&self.entries, parent_id)
                .and_then(|entry| entry.children.as_deref())
                .unwrap_or(&[]),
        }
    }

    pub fn top_level_entries(&self) -> &[FocusEntry] {
        &self.entries
    }

    /// Whether any entry (anywhere in the forest) carries this locator.
    /// 樹系中是否存在指向該路徑的條目。
    pub fn has_entry(&mut self, path: impl AsRef<Path>) -> bool {
        let locator = EntryLocator::path(path.as_ref());
        self.ops.find_by_locator(&self.entries, &locator).is_some()
    }

    pub fn parent_of(&self, id: &EntryId) -> Option<&FocusEntry> {
        self.ops.find_parent(&self.entries, id)
    }

    pub fn depth(&self, id: &EntryId) -> Option<usize> {
        self.ops.depth(&self.entries, id)
    }

    pub fn path_to(&self, id: &EntryId) -> Vec<&FocusEntry> {
        self.ops.path_to(&self.entries, id)
    }

    pub fn entry_count(&self) -> usize {
        self.ops.count(&self.entries)
    }

    pub fn entries_of_kind(&self, kind: EntryKind) -> Vec<&FocusEntry> {
        self.ops.entries_by_kind(&self.entries, kind)
    }

    pub fn flatten(&self) -> Vec<&FocusEntry> {
        self.ops.flatten(&self.entries)
    }

    /// Empties the forest, schedules persistence, fires a notification.
    /// 清空樹系並排程儲存、發出通知。
    pub fn clear_all(&mut self) {
        self.ops.clear(&mut self.entries);
        self.mark_changed();
    }

    /// Defers cache invalidation across a multi-step mutation.
    /// 延後快取清除，供多步驟變更使用。
    pub fn start_batch(&mut self) {
        self.ops.start_batch();
    }

    pub fn end_batch(&mut self) {
        self.ops.end_batch();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Current serialized snapshot, stamped with version and mtime.
    /// 目前的序列化快照，附上版本與時間戳。
    pub fn snapshot(&self) -> SerializedSpace {
        SerializedSpace {
            version: SPACE_FORMAT_VERSION.to_string(),
            last_modified: unix_millis(),
            entries: serial::to_serializable(&self.entries),
        }
    }

    /// Saves when dirty and the debounce quiet period has elapsed. Returns
    /// whether a save was attempted. Save failures are reported through the
    /// event channel; in-memory state stays authoritative.
    /// 若有未儲存變更且靜止期已過則寫入磁碟；失敗透過事件回報。
    pub fn maybe_flush(&mut self, now: Instant) -> bool {
        if self.dirty && self.save_debounce.is_due(now) {
            self.persist();
            return true;
        }
        false
    }

    /// Saves immediately; the shutdown path.
    /// 立即寫入磁碟；關閉流程使用。
    pub fn flush(&mut self) -> Result<(), SpaceError> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        self.dirty = false;
        self.save_debounce.reset();
        Ok(())
    }

    /// Eagerly mirrors a folder entry's real directory into its children:
    /// directories first, name-ordered, down to `max_depth` levels, skipping
    /// paths the exclude predicate rejects. Cancellation keeps whatever was
    /// collected so far. Unknown or non-folder ids return `Ok(0)`.
    /// 將資料夾條目的實際目錄內容展開為子條目；取消時保留已收集的部分。
    pub fn materialize_folder(
        &mut self,
        id: &EntryId,
        max_depth: usize,
        cancel: &CancelFlag,
        exclude: impl Fn(&Path) -> bool,
    ) -> Result<usize, SpaceError> {
        let dir = match self.ops.find_by_id(&self.entries, id) {
            Some(entry) if entry.kind == EntryKind::Folder => match entry.locator.as_path() {
                Some(path) => path.to_path_buf(),
                None => return Ok(0),
            },
            _ => return Ok(0),
        };
        if max_depth == 0 {
            return Ok(0);
        }
        let root = self.workspace_root.clone();
        let mut added = 0;
        let children = build_children(
            &dir,
            max_depth,
            cancel,
            &exclude,
            root.as_deref(),
            &mut added,
        )?;
        if let Some(entry) = self.ops.find_by_id_mut(&mut self.entries, id) {
            entry.children = Some(children);
        }
        self.mark_changed();
        Ok(added)
    }

    fn insert_section(&mut self, label: String, parent: Option<&EntryId>) -> EntryId {
        let mut entry = FocusEntry::new_section(label);
        entry.metadata = Some(EntryMetadata {
            date_added: unix_millis(),
            relative_path: None,
            order: Some(self.container_len(parent) as u32),
            git_status: None,
        });
        let id = entry.id.clone();
        self.insert(entry, parent);
        self.mark_changed();
        id
    }

    fn insert(&mut self, entry: FocusEntry, parent: Option<&EntryId>) {
        if let Some(parent_id) = parent {
            let parent_ok = matches!(
                self.ops.find_by_id(&self.entries, parent_id),
                Some(found) if found.accepts_children()
            );
            if parent_ok {
                if let Some(target) = self.ops.find_by_id_mut(&mut self.entries, parent_id) {
                    self.ops.add_child(target, entry);
                    return;
                }
            }
        }
        self.ops.add_root(&mut self.entries, entry);
    }

    fn container_len(&mut self, parent: Option<&EntryId>) -> usize {
        match parent {
            None => self.entries.len(),
            Some(parent_id) => match self.ops.find_by_id(&self.entries, parent_id) {
                Some(found) if found.accepts_children() => found.child_count(),
                _ => self.entries.len(),
            },
        }
    }

    fn move_to_section_impl(
        &mut self,
        id: &EntryId,
        section: Option<&EntryId>,
        position: Option<usize>,
    ) -> bool {
        if let Some(section_id) = section {
            if section_id == id {
                return false;
            }
            // destination on the moved entry's own path means a cycle
            let path = self.ops.path_to(&self.entries, section_id);
            if path.iter().any(|entry| entry.id == *id) {
                return false;
            }
        }
        let moved = self
            .ops
            .move_entry_at(&mut self.entries, id, section, position);
        if moved {
            self.mark_changed();
        }
        moved
    }

    fn mark_changed(&mut self) {
        self.dirty = true;
        self.save_debounce.touch(Instant::now());
        self.notifier.emit(SpaceEvent::Changed);
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();
        match self.store.save(&snapshot) {
            Ok(()) => {
                self.dirty = false;
                self.save_debounce.reset();
            }
            Err(err) => self.notifier.emit(SpaceEvent::SaveFailed(err.to_string())),
        }
    }
}

fn relative_to(root: Option<&Path>, path: &Path) -> String {
    if let Some(root) = root {
        if let Ok(stripped) = path.strip_prefix(root) {
            return stripped.to_string_lossy().into_owned();
        }
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn build_children(
    dir: &Path,
    depth_left: usize,
    cancel: &CancelFlag,
    exclude: &impl Fn(&Path) -> bool,
    root: Option<&Path>,
    added: &mut usize,
) -> Result<Vec<FocusEntry>, SpaceError> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for dir_entry in fs::read_dir(dir)? {
        if cancel.is_cancelled() {
            break;
        }
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if exclude(&path) {
            continue;
        }
        let file_type = dir_entry.file_type()?;
        if file_type.is_dir() {
            dirs.push(path);
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    dirs.sort();
    files.sort();

    let mut out = Vec::with_capacity(dirs.len() + files.len());
    for path in dirs {
        if cancel.is_cancelled() {
            break;
        }
        let mut folder = FocusEntry::new_folder(&path);
        folder.metadata = Some(mirror_metadata(root, &path, out.len() as u32));
        if depth_left > 1 {
            folder.children = Some(build_children(
                &path,
                depth_left - 1,
                cancel,
                exclude,
                root,
                added,
            )?);
        }
        *added += 1;
        out.push(folder);
    }
    for path in files {
        if cancel.is_cancelled() {
            break;
        }
        let mut file = FocusEntry::new_file(&path);
        file.metadata = Some(mirror_metadata(root, &path, out.len() as u32));
        *added += 1;
        out.push(file);
    }
    Ok(out)
}

fn mirror_metadata(root: Option<&Path>, path: &Path, order: u32) -> EntryMetadata {
    EntryMetadata {
        date_added: unix_millis(),
        relative_path: Some(relative_to(root, path)),
        order: Some(order),
        git_status: None,
    }
}
