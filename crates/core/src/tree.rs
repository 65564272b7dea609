use std::collections::HashMap;

use crate::entry::{EntryId, EntryKind, FocusEntry};
use crate::locator::EntryLocator;

/// Child-index trail from the forest root down to an entry.
/// 由樹系根部到條目的子節點索引路徑。
type IndexPath = Vec<usize>;

/// The single authority for structural queries and mutations over a forest
/// owned by the caller. Carries the two lookup caches and the batch flag;
/// no other module walks `children` directly.
/// 樹系結構查詢與變更的唯一入口；持有查詢快取與批次旗標。
#[derive(Debug, Default)]
pub struct TreeOps {
    id_cache: HashMap<String, IndexPath>,
    locator_cache: HashMap<String, IndexPath>,
    batching: bool,
}

impl TreeOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a batch window: cache invalidation is deferred until
    /// [`end_batch`]. Purely a cache-coherence optimization; no atomicity.
    /// 開始批次模式；快取清除延後到 [`end_batch`] 一次完成。
    ///
    /// [`end_batch`]: TreeOps::end_batch
    pub fn start_batch(&mut self) {
        self.batching = true;
    }

    /// Ends the batch window and performs exactly one invalidation.
    /// 結束批次模式並執行一次快取清除。
    pub fn end_batch(&mut self) {
        self.batching = false;
        self.id_cache.clear();
        self.locator_cache.clear();
    }

    fn invalidate(&mut self) {
        if self.batching {
            return;
        }
        self.id_cache.clear();
        self.locator_cache.clear();
    }

    /// Finds an entry by id, pre-order. Cached; a hit is verified against the
    /// live forest and falls back to a fresh search when stale, so lookups
    /// stay correct even inside a batch window.
    /// 依識別碼搜尋條目；快取命中會先驗證，失效時重新搜尋。
    pub fn find_by_id<'a>(
        &mut self,
        forest: &'a [FocusEntry],
        id: &EntryId,
    ) -> Option<&'a FocusEntry> {
        if let Some(path) = self.id_cache.get(id.as_str()) {
            if let Some(entry) = resolve(forest, path) {
                if entry.id == *id {
                    return Some(entry);
                }
            }
        }
        let mut trail = Vec::new();
        let found = search_by(forest, &mut trail, &|entry: &FocusEntry| entry.id == *id)?;
        self.id_cache.insert(id.as_str().to_string(), trail);
        Some(found)
    }

    /// Mutable lookup by id. Conservatively invalidates the caches, since
    /// the caller may change anything the cached trails describe.
    /// 依識別碼取得可變參考；保守起見先清除快取。
    pub fn find_by_id_mut<'a>(
        &mut self,
        forest: &'a mut Vec<FocusEntry>,
        id: &EntryId,
    ) -> Option<&'a mut FocusEntry> {
        self.invalidate();
        search_mut(forest, id)
    }

    /// Finds the first pre-order entry carrying the locator. Duplicates are
    /// legal; "first in pre-order" is the deterministic tie-break.
    /// 依定位尋找條目；允許重複時回傳前序走訪的第一個。
    pub fn find_by_locator<'a>(
        &mut self,
        forest: &'a [FocusEntry],
        locator: &EntryLocator,
    ) -> Option<&'a FocusEntry> {
        let key = locator.canonical();
        if let Some(path) = self.locator_cache.get(&key) {
            if let Some(entry) = resolve(forest, path) {
                if entry.locator == *locator {
                    return Some(entry);
                }
            }
        }
        let mut trail = Vec::new();
        let found = search_by(forest, &mut trail, &|entry: &FocusEntry| {
            entry.locator == *locator
        })?;
        self.locator_cache.insert(key, trail);
        Some(found)
    }

    /// Finds the parent of an entry; `None` for root-level or unknown ids.
    /// Uncached: parent trails are cheap and would otherwise widen the
    /// invalidation surface.
    /// 尋找父條目；根層或不存在的識別碼回傳 `None`。不使用快取。
    pub fn find_parent<'a>(
        &self,
        forest: &'a [FocusEntry],
        child_id: &EntryId,
    ) -> Option<&'a FocusEntry> {
        parent_of(forest, child_id)
    }

    /// Appends a child, creating the children vector when absent.
    /// 加入子條目；必要時建立子節點容器。
    pub fn add_child(&mut self, parent: &mut FocusEntry, child: FocusEntry) {
        parent.children.get_or_insert_with(Vec::new).push(child);
        self.invalidate();
    }

    /// Appends an entry at forest root level.
    /// 在樹系根層加入條目。
    pub fn add_root(&mut self, forest: &mut Vec<FocusEntry>, entry: FocusEntry) {
        forest.push(entry);
        self.invalidate();
    }

    /// Removes the entry and its whole subtree from wherever it sits. Root
    /// level is scanned before recursing; ids are unique so the first match
    /// is the only match.
    /// 移除條目與其整棵子樹；先掃描根層再遞迴。
    pub fn remove_by_id(&mut self, forest: &mut Vec<FocusEntry>, id: &EntryId) -> bool {
        let removed = remove_in(forest, id);
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Detaches an entry, returning it together with its previous container
    /// and index so a failed move can restore it.
    /// 取下條目並回傳原父層與索引，供移動失敗時還原。
    pub fn detach(
        &mut self,
        forest: &mut Vec<FocusEntry>,
        id: &EntryId,
    ) -> Option<(FocusEntry, Option<EntryId>, usize)> {
        let detached = detach_in(forest, None, id);
        if detached.is_some() {
            self.invalidate();
        }
        detached
    }

    /// Moves an entry to the end of the new parent's children (forest root
    /// when `None`). See [`move_entry_at`] for the full contract.
    /// 將條目移動到新父層的末端；`None` 表示根層。
    ///
    /// [`move_entry_at`]: TreeOps::move_entry_at
    pub fn move_entry(
        &mut self,
        forest: &mut Vec<FocusEntry>,
        id: &EntryId,
        new_parent: Option<&EntryId>,
    ) -> bool {
        self.move_entry_at(forest, id, new_parent, None)
    }

    /// Moves an entry under a new parent at the given index, clamped to
    /// `[0, len]`: an out-of-range position lands at the end rather than
    /// failing. Fails when the entry or destination is missing, or the
    /// destination does not accept children. If the destination vanished
    /// together with the detached subtree, the entry is restored to its
    /// original slot and the call fails; the forest is never corrupted.
    /// 將條目移到新父層的指定位置（超出範圍時夾到尾端）。條目或目的地不存在、
    /// 或目的地不可容納子條目時失敗；目的地隨子樹一併被取下時會原位還原。
    pub fn move_entry_at(
        &mut self,
        forest: &mut Vec<FocusEntry>,
        id: &EntryId,
        new_parent: Option<&EntryId>,
        position: Option<usize>,
    ) -> bool {
        if let Some(parent_id) = new_parent {
            match self.find_by_id(forest, parent_id) {
                Some(parent) if parent.accepts_children() => {}
                _ => return false,
            }
        }
        let Some((entry, old_parent, old_index)) = self.detach(forest, id) else {
            return false;
        };
        match new_parent {
            None => {
                let index = position.unwrap_or(forest.len()).min(forest.len());
                forest.insert(index, entry);
            }
            Some(parent_id) => match search_mut(forest, parent_id) {
                Some(parent) => {
                    let children = parent.children.get_or_insert_with(Vec::new);
                    let index = position.unwrap_or(children.len()).min(children.len());
                    children.insert(index, entry);
                }
                None => {
                    self.reattach(forest, entry, old_parent.as_ref(), old_index);
                    return false;
                }
            },
        }
        self.invalidate();
        true
    }

    /// Repositions an entry within its *current* container only. Fails when
    /// the entry is not found in that exact container; the index is clamped
    /// after removal.
    /// 在目前容器內調整條目順序；條目不在該容器時失敗。
    pub fn reorder_entry(
        &mut self,
        forest: &mut Vec<FocusEntry>,
        id: &EntryId,
        new_index: usize,
        parent: Option<&EntryId>,
    ) -> bool {
        let moved = match parent {
            None => reorder_in(forest, id, new_index),
            Some(parent_id) => match search_mut(forest, parent_id) {
                Some(entry) => match entry.children.as_mut() {
                    Some(children) => reorder_in(children, id, new_index),
                    None => false,
                },
                None => false,
            },
        };
        if moved {
            self.invalidate();
        }
        moved
    }

    /// Empties the forest.
    /// 清空整個樹系。
    pub fn clear(&mut self, forest: &mut Vec<FocusEntry>) {
        forest.clear();
        self.invalidate();
    }

    /// Materialized pre-order traversal: every entry exactly once.
    /// 前序走訪，回傳所有條目各一次。
    pub fn flatten<'a>(&self, forest: &'a [FocusEntry]) -> Vec<&'a FocusEntry> {
        let mut out = Vec::new();
        collect(forest, &mut out);
        out
    }

    /// Pre-order filter by kind.
    /// 依類型過濾的前序走訪結果。
    pub fn entries_by_kind<'a>(
        &self,
        forest: &'a [FocusEntry],
        kind: EntryKind,
    ) -> Vec<&'a FocusEntry> {
        self.flatten(forest)
            .into_iter()
            .filter(|entry| entry.kind == kind)
            .collect()
    }

    /// Depth of an entry: root level is 0, `None` when not found.
    /// 條目深度；根層為 0，不存在回傳 `None`。
    pub fn depth(&self, forest: &[FocusEntry], id: &EntryId) -> Option<usize> {
        depth_in(forest, id, 0)
    }

    /// Root-to-target inclusive path; empty when not found.
    /// 由根到目標的完整路徑；找不到時為空。
    pub fn path_to<'a>(&self, forest: &'a [FocusEntry], id: &EntryId) -> Vec<&'a FocusEntry> {
        let mut trail = Vec::new();
        if path_in(forest, id, &mut trail) {
            trail
        } else {
            Vec::new()
        }
    }

    /// Total entry count.
    /// 條目總數。
    pub fn count(&self, forest: &[FocusEntry]) -> usize {
        self.flatten(forest).len()
    }

    fn reattach(
        &mut self,
        forest: &mut Vec<FocusEntry>,
        entry: FocusEntry,
        parent: Option<&EntryId>,
        index: usize,
    ) {
        match parent.and_then(|parent_id| search_mut(forest, parent_id)) {
            Some(parent) => {
                let children = parent.children.get_or_insert_with(Vec::new);
                let index = index.min(children.len());
                children.insert(index, entry);
            }
            None => {
                let index = index.min(forest.len());
                forest.insert(index, entry);
            }
        }
        self.invalidate();
    }
}

fn resolve<'a>(forest: &'a [FocusEntry], path: &[usize]) -> Option<&'a FocusEntry> {
    let (first, rest) = path.split_first()?;
    let mut current = forest.get(*first)?;
    for index in rest {
        current = current.children.as_ref()?.get(*index)?;
    }
    Some(current)
}

fn search_by<'a, F>(
    forest: &'a [FocusEntry],
    trail: &mut IndexPath,
    matches: &F,
) -> Option<&'a FocusEntry>
where
    F: Fn(&FocusEntry) -> bool,
{
    for (index, entry) in forest.iter().enumerate() {
        trail.push(index);
        if matches(entry) {
            return Some(entry);
        }
        if let Some(children) = &entry.children {
            if let Some(found) = search_by(children, trail, matches) {
                return Some(found);
            }
        }
        trail.pop();
    }
    None
}

fn search_mut<'a>(forest: &'a mut [FocusEntry], id: &EntryId) -> Option<&'a mut FocusEntry> {
    for entry in forest.iter_mut() {
        if entry.id == *id {
            return Some(entry);
        }
        if let Some(children) = entry.children.as_mut() {
            if let Some(found) = search_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn parent_of<'a>(forest: &'a [FocusEntry], child_id: &EntryId) -> Option<&'a FocusEntry> {
    for entry in forest {
        if let Some(children) = &entry.children {
            if children.iter().any(|child| child.id == *child_id) {
                return Some(entry);
            }
            if let Some(found) = parent_of(children, child_id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_in(forest: &mut Vec<FocusEntry>, id: &EntryId) -> bool {
    if let Some(index) = forest.iter().position(|entry| entry.id == *id) {
        forest.remove(index);
        return true;
    }
    for entry in forest.iter_mut() {
        if let Some(children) = entry.children.as_mut() {
            if remove_in(children, id) {
                return true;
            }
        }
    }
    false
}

fn detach_in(
    forest: &mut Vec<FocusEntry>,
    parent: Option<&EntryId>,
    id: &EntryId,
) -> Option<(FocusEntry, Option<EntryId>, usize)> {
    if let Some(index) = forest.iter().position(|entry| entry.id == *id) {
        return Some((forest.remove(index), parent.cloned(), index));
    }
    for entry in forest.iter_mut() {
        let owner = entry.id.clone();
        if let Some(children) = entry.children.as_mut() {
            if let Some(found) = detach_in(children, Some(&owner), id) {
                return Some(found);
            }
        }
    }
    None
}

fn reorder_in(container: &mut Vec<FocusEntry>, id: &EntryId, new_index: usize) -> bool {
    let Some(current) = container.iter().position(|entry| entry.id == *id) else {
        return false;
    };
    let entry = container.remove(current);
    let index = new_index.min(container.len());
    container.insert(index, entry);
    true
}

fn collect<'a>(forest: &'a [FocusEntry], out: &mut Vec<&'a FocusEntry>) {
    for entry in forest {
        out.push(entry);
        if let Some(children) = &entry.children {
            collect(children, out);
        }
    }
}

fn depth_in(forest: &[FocusEntry], id: &EntryId, level: usize) -> Option<usize> {
    for entry in forest {
        if entry.id == *id {
            return Some(level);
        }
        if let Some(children) = &entry.children {
            if let Some(found) = depth_in(children, id, level + 1) {
                return Some(found);
            }
        }
    }
    None
}

fn path_in<'a>(forest: &'a [FocusEntry], id: &EntryId, trail: &mut Vec<&'a FocusEntry>) -> bool {
    for entry in forest {
        trail.push(entry);
        if entry.id == *id {
            return true;
        }
        if let Some(children) = &entry.children {
            if path_in(children, id, trail) {
                return true;
            }
        }
        trail.pop();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FocusEntry;

    fn sample_forest() -> (Vec<FocusEntry>, EntryId, EntryId, EntryId, EntryId) {
        // section
        // ├── a.rs
        // └── b.rs
        // loose.txt
        let mut section = FocusEntry::new_section("Work");
        let file_a = FocusEntry::new_file("/ws/a.rs");
        let file_b = FocusEntry::new_file("/ws/b.rs");
        let loose = FocusEntry::new_file("/ws/loose.txt");
        let (section_id, a_id, b_id, loose_id) = (
            section.id.clone(),
            file_a.id.clone(),
            file_b.id.clone(),
            loose.id.clone(),
        );
        section.children = Some(vec![file_a, file_b]);
        (vec![section, loose], section_id, a_id, b_id, loose_id)
    }

    #[test]
    fn find_by_id_reaches_nested_entries() {
        let (forest, section_id, a_id, _, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        assert_eq!(ops.find_by_id(&forest, &a_id).unwrap().id, a_id);
        assert_eq!(ops.find_by_id(&forest, &section_id).unwrap().id, section_id);
        assert_eq!(ops.find_by_id(&forest, &loose_id).unwrap().id, loose_id);
        assert!(ops
            .find_by_id(&forest, &EntryId::from_string("missing"))
            .is_none());
    }

    #[test]
    fn repeated_lookups_return_the_same_entry() {
        let (forest, _, a_id, _, _) = sample_forest();
        let mut ops = TreeOps::new();
        let first = ops.find_by_id(&forest, &a_id).unwrap() as *const FocusEntry;
        let second = ops.find_by_id(&forest, &a_id).unwrap() as *const FocusEntry;
        assert_eq!(first, second);
    }

    #[test]
    fn find_by_locator_returns_first_preorder_duplicate() {
        let (mut forest, section_id, _, _, _) = sample_forest();
        // a root-level duplicate of the nested a.rs, appended after the section
        let duplicate = FocusEntry::new_file("/ws/a.rs");
        let duplicate_id = duplicate.id.clone();
        forest.push(duplicate);

        let mut ops = TreeOps::new();
        let found = ops
            .find_by_locator(&forest, &EntryLocator::path("/ws/a.rs"))
            .unwrap();
        // the nested copy comes first in pre-order
        assert_ne!(found.id, duplicate_id);
        assert_eq!(
            ops.find_parent(&forest, &found.id).unwrap().id,
            section_id
        );
    }

    #[test]
    fn find_parent_is_none_for_roots_and_unknown_ids() {
        let (forest, section_id, a_id, _, loose_id) = sample_forest();
        let ops = TreeOps::new();
        assert!(ops.find_parent(&forest, &section_id).is_none());
        assert!(ops.find_parent(&forest, &loose_id).is_none());
        assert_eq!(ops.find_parent(&forest, &a_id).unwrap().id, section_id);
        assert!(ops
            .find_parent(&forest, &EntryId::from_string("missing"))
            .is_none());
    }

    #[test]
    fn remove_by_id_discards_whole_subtree() {
        let (mut forest, section_id, a_id, b_id, _) = sample_forest();
        let mut ops = TreeOps::new();
        assert_eq!(ops.count(&forest), 4);
        assert!(ops.remove_by_id(&mut forest, &section_id));
        assert_eq!(ops.count(&forest), 1);
        assert!(ops.find_by_id(&forest, &a_id).is_none());
        assert!(ops.find_by_id(&forest, &b_id).is_none());
        assert!(!ops.remove_by_id(&mut forest, &section_id));
    }

    #[test]
    fn move_preserves_total_count() {
        let (mut forest, section_id, _, _, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        let before = ops.count(&forest);
        assert!(ops.move_entry(&mut forest, &loose_id, Some(&section_id)));
        assert_eq!(ops.count(&forest), before);
        assert_eq!(ops.find_parent(&forest, &loose_id).unwrap().id, section_id);
    }

    #[test]
    fn move_to_root_detaches_from_parent() {
        let (mut forest, _, a_id, _, _) = sample_forest();
        let mut ops = TreeOps::new();
        assert!(ops.move_entry(&mut forest, &a_id, None));
        assert!(ops.find_parent(&forest, &a_id).is_none());
        assert_eq!(forest.last().unwrap().id, a_id);
    }

    #[test]
    fn move_into_file_or_folder_fails() {
        let (mut forest, _, a_id, b_id, loose_id) = sample_forest();
        let folder = FocusEntry::new_folder("/ws/src");
        let folder_id = folder.id.clone();
        forest.push(folder);

        let mut ops = TreeOps::new();
        assert!(!ops.move_entry(&mut forest, &loose_id, Some(&a_id)));
        assert!(!ops.move_entry(&mut forest, &b_id, Some(&folder_id)));
        assert_eq!(ops.count(&forest), 5);
    }

    #[test]
    fn move_with_out_of_range_position_lands_at_end() {
        let (mut forest, section_id, a_id, b_id, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        assert!(ops.move_entry_at(&mut forest, &loose_id, Some(&section_id), Some(999)));
        let section = ops.find_by_id(&forest, &section_id).unwrap();
        let order: Vec<_> = section
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|entry| entry.id.clone())
            .collect();
        assert_eq!(order, vec![a_id, b_id, loose_id]);
    }

    #[test]
    fn move_at_position_zero_prepends() {
        let (mut forest, section_id, a_id, _, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        assert!(ops.move_entry_at(&mut forest, &loose_id, Some(&section_id), Some(0)));
        let section = ops.find_by_id(&forest, &section_id).unwrap();
        let children = section.children.as_ref().unwrap();
        assert_eq!(children[0].id, loose_id);
        assert_eq!(children[1].id, a_id);
    }

    #[test]
    fn move_into_own_descendant_restores_the_subtree() {
        // nested: outer section > inner section; moving outer into inner
        // would detach the destination along with the subtree
        let mut inner = FocusEntry::new_section("Inner");
        let inner_id = inner.id.clone();
        inner.children = Some(Vec::new());
        let mut outer = FocusEntry::new_section("Outer");
        let outer_id = outer.id.clone();
        outer.children = Some(vec![inner]);
        let mut forest = vec![outer];

        let mut ops = TreeOps::new();
        assert!(!ops.move_entry(&mut forest, &outer_id, Some(&inner_id)));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, outer_id);
        assert_eq!(ops.find_parent(&forest, &inner_id).unwrap().id, outer_id);
    }

    #[test]
    fn reorder_moves_within_current_container() {
        let f1 = FocusEntry::new_file("/ws/f1");
        let f2 = FocusEntry::new_file("/ws/f2");
        let f3 = FocusEntry::new_file("/ws/f3");
        let (id1, id2, id3) = (f1.id.clone(), f2.id.clone(), f3.id.clone());
        let mut forest = vec![f1, f2, f3];

        let mut ops = TreeOps::new();
        assert!(ops.reorder_entry(&mut forest, &id1, 2, None));
        let order: Vec<_> = forest.iter().map(|entry| entry.id.clone()).collect();
        assert_eq!(order, vec![id2, id3, id1]);
    }

    #[test]
    fn reorder_fails_outside_the_named_container() {
        let (mut forest, section_id, _, _, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        // loose.txt is at root level, not inside the section
        assert!(!ops.reorder_entry(&mut forest, &loose_id, 0, Some(&section_id)));
        assert_eq!(forest.last().unwrap().id, loose_id);
    }

    #[test]
    fn reorder_index_is_clamped() {
        let (mut forest, section_id, a_id, b_id, _) = sample_forest();
        let mut ops = TreeOps::new();
        assert!(ops.reorder_entry(&mut forest, &a_id, 42, Some(&section_id)));
        let section = ops.find_by_id(&forest, &section_id).unwrap();
        let children = section.children.as_ref().unwrap();
        assert_eq!(children[0].id, b_id);
        assert_eq!(children[1].id, a_id);
    }

    #[test]
    fn flatten_is_preorder() {
        let (forest, section_id, a_id, b_id, loose_id) = sample_forest();
        let ops = TreeOps::new();
        let flat: Vec<_> = ops
            .flatten(&forest)
            .into_iter()
            .map(|entry| entry.id.clone())
            .collect();
        assert_eq!(flat, vec![section_id, a_id, b_id, loose_id]);
    }

    #[test]
    fn entries_by_kind_preserves_preorder() {
        let (forest, _, a_id, b_id, loose_id) = sample_forest();
        let ops = TreeOps::new();
        let files: Vec<_> = ops
            .entries_by_kind(&forest, EntryKind::File)
            .into_iter()
            .map(|entry| entry.id.clone())
            .collect();
        assert_eq!(files, vec![a_id, b_id, loose_id]);
        assert_eq!(ops.entries_by_kind(&forest, EntryKind::Folder).len(), 0);
    }

    #[test]
    fn depth_and_path() {
        let (forest, section_id, a_id, _, _) = sample_forest();
        let ops = TreeOps::new();
        assert_eq!(ops.depth(&forest, &section_id), Some(0));
        assert_eq!(ops.depth(&forest, &a_id), Some(1));
        assert_eq!(ops.depth(&forest, &EntryId::from_string("missing")), None);

        let path: Vec<_> = ops
            .path_to(&forest, &a_id)
            .into_iter()
            .map(|entry| entry.id.clone())
            .collect();
        assert_eq!(path, vec![section_id, a_id]);
        assert!(ops
            .path_to(&forest, &EntryId::from_string("missing"))
            .is_empty());
    }

    #[test]
    fn cached_lookup_reflects_mutations() {
        let (mut forest, section_id, a_id, _, _) = sample_forest();
        let mut ops = TreeOps::new();
        assert!(ops.find_by_id(&forest, &a_id).is_some());
        assert!(ops.remove_by_id(&mut forest, &section_id));
        assert!(ops.find_by_id(&forest, &a_id).is_none());
    }

    #[test]
    fn cached_lookup_reflects_mutations_across_a_batch_window() {
        let (mut forest, section_id, a_id, _, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        assert!(ops.find_by_id(&forest, &a_id).is_some());
        assert!(ops.find_by_id(&forest, &loose_id).is_some());

        ops.start_batch();
        assert!(ops.move_entry(&mut forest, &loose_id, Some(&section_id)));
        assert!(ops.remove_by_id(&mut forest, &a_id));
        ops.end_batch();

        assert!(ops.find_by_id(&forest, &a_id).is_none());
        assert_eq!(ops.find_parent(&forest, &loose_id).unwrap().id, section_id);
        assert_eq!(ops.count(&forest), 3);
    }

    #[test]
    fn stale_cache_trail_is_treated_as_a_miss_mid_batch() {
        let (mut forest, _, a_id, _, loose_id) = sample_forest();
        let mut ops = TreeOps::new();
        // populate the cache with the current trails
        assert!(ops.find_by_id(&forest, &a_id).is_some());
        assert!(ops.find_by_id(&forest, &loose_id).is_some());

        ops.start_batch();
        // shifts loose.txt's root index while invalidation is deferred, so
        // its cached trail now resolves to a different entry
        assert!(ops.move_entry_at(&mut forest, &a_id, None, Some(0)));
        let found = ops.find_by_id(&forest, &loose_id).unwrap();
        assert_eq!(found.id, loose_id);
        ops.end_batch();
    }

    #[test]
    fn add_child_creates_children_vector_when_absent() {
        let mut section = FocusEntry::new_section("S");
        section.children = None;
        let child = FocusEntry::new_file("/ws/x");
        let mut ops = TreeOps::new();
        ops.add_child(&mut section, child);
        assert_eq!(section.child_count(), 1);
    }
}
