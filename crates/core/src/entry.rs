use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::locator::EntryLocator;
use crate::util::unix_millis;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Fallback display label for sections without an explicit label.
pub const DEFAULT_SECTION_LABEL: &str = "Untitled Section";

/// Unique identifier assigned to each entry in the focus space.
/// 焦點空間中每個條目的唯一識別碼。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generates a fresh identifier. Ids combine a timestamp with a process
    /// counter so they stay unique across sessions and are never reused.
    /// 產生新的識別碼；結合時間戳與流水號，跨工作階段也不會重複。
    pub fn new() -> Self {
        let seq = NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{seq:04x}", unix_millis()))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of entry. Immutable after creation.
/// 條目的類型；建立後不可變更。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
    Section,
}

impl EntryKind {
    pub fn is_section(&self) -> bool {
        matches!(self, EntryKind::Section)
    }
}

/// Informational annotations carried by an entry; never required for
/// structural correctness.
/// 條目的附註資訊（加入時間、相對路徑、順序、git 狀態），不影響結構正確性。
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    #[serde(default)]
    pub date_added: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_status: Option<String>,
}

/// One node of the curated forest: a file, a folder, or a section.
/// 焦點空間樹系中的單一節點：檔案、資料夾或分組。
#[derive(Debug, Clone, PartialEq)]
pub struct FocusEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub locator: EntryLocator,
    pub label: Option<String>,
    /// Present (possibly empty) for folders and sections, absent for files.
    /// 資料夾與分組必有（可為空）；檔案一律為 `None`。
    pub children: Option<Vec<FocusEntry>>,
    pub metadata: Option<EntryMetadata>,
}

impl FocusEntry {
    pub fn new_file(path: impl Into<PathBuf>) -> Self {
        Self {
            id: EntryId::new(),
            kind: EntryKind::File,
            locator: EntryLocator::path(path),
            label: None,
            children: None,
            metadata: None,
        }
    }

    pub fn new_folder(path: impl Into<PathBuf>) -> Self {
        Self {
            id: EntryId::new(),
            kind: EntryKind::Folder,
            locator: EntryLocator::path(path),
            label: None,
            children: Some(Vec::new()),
            metadata: None,
        }
    }

    /// Creates a section: a pure grouping container with a synthetic locator.
    /// An empty label is normalized away so the default label applies.
    /// 建立分組；使用合成定位，空白標籤自動改用預設名稱。
    pub fn new_section(label: impl Into<String>) -> Self {
        let id = EntryId::new();
        let label = label.into();
        let label = if label.trim().is_empty() {
            None
        } else {
            Some(label)
        };
        Self {
            locator: EntryLocator::section(id.as_str()),
            id,
            kind: EntryKind::Section,
            label,
            children: Some(Vec::new()),
            metadata: None,
        }
    }

    /// Whether the public move/reorder operations may place entries inside
    /// this one. Folder children mirror the filesystem and are populated by
    /// materialization only, so sections are the only valid destinations.
    /// 是否允許透過移動/排序操作置入子條目；僅分組可作為目的地。
    pub fn accepts_children(&self) -> bool {
        self.kind.is_section()
    }

    pub fn child_count(&self) -> usize {
        self.children.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Display name: explicit label, else the locator's final path segment,
    /// else the default section label.
    /// 顯示名稱：優先使用標籤，否則取路徑最後一段；分組預設為固定名稱。
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.locator {
            EntryLocator::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            EntryLocator::Section(_) => DEFAULT_SECTION_LABEL.to_string(),
        }
    }
}
