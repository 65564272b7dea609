use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::{EntryId, EntryKind, EntryMetadata, FocusEntry};
use crate::locator::{EntryLocator, LocatorError};

/// Current on-disk format version.
pub const SPACE_FORMAT_VERSION: &str = "1.0.0";

/// Persisted envelope: version, last-modified stamp, and the root forest in
/// display order.
/// 持久化外層結構：格式版本、最後修改時間與依顯示順序排列的根層條目。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSpace {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub entries: Vec<SerializedEntry>,
}

fn default_version() -> String {
    SPACE_FORMAT_VERSION.to_string()
}

/// Structurally identical shadow of [`FocusEntry`] with the locator
/// flattened to its canonical string form. Conversion is lossless both ways.
/// [`FocusEntry`] 的序列化影子型別；定位資訊展平為標準字串，轉換無損。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedEntry {
    pub id: String,
    pub locator_string: String,
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SerializedEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

/// Errors raised while rebuilding entries from their serialized form.
/// 從序列化形式還原條目時可能出現的錯誤。
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("entry {id}: {source}")]
    Locator {
        id: String,
        #[source]
        source: LocatorError,
    },
}

impl SerializedEntry {
    pub fn from_entry(entry: &FocusEntry) -> Self {
        Self {
            id: entry.id.as_str().to_string(),
            locator_string: entry.locator.canonical(),
            kind: entry.kind,
            label: entry.label.clone(),
            children: entry
                .children
                .as_ref()
                .map(|children| children.iter().map(Self::from_entry).collect()),
            metadata: entry.metadata.clone(),
        }
    }

    /// Rebuilds the in-memory entry. Files are normalized to carry no
    /// children regardless of what the payload claims; folders and sections
    /// always end up with a (possibly empty) children vector.
    /// 還原條目；檔案一律不帶子節點，資料夾與分組保證有子節點容器。
    pub fn into_entry(self) -> Result<FocusEntry, SerialError> {
        let locator = EntryLocator::parse(&self.locator_string).map_err(|source| {
            SerialError::Locator {
                id: self.id.clone(),
                source,
            }
        })?;
        let children = match (self.kind, self.children) {
            (EntryKind::File, _) => None,
            (_, Some(children)) => Some(
                children
                    .into_iter()
                    .map(Self::into_entry)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (_, None) => Some(Vec::new()),
        };
        Ok(FocusEntry {
            id: EntryId::from_string(self.id),
            kind: self.kind,
            locator,
            label: self.label,
            children,
            metadata: self.metadata,
        })
    }
}

/// Converts a forest to its serialized shadow.
/// 將樹系轉為序列化影子結構。
pub fn to_serializable(forest: &[FocusEntry]) -> Vec<SerializedEntry> {
    forest.iter().map(SerializedEntry::from_entry).collect()
}

/// Rebuilds a forest from its serialized shadow.
/// 從序列化影子結構還原樹系。
pub fn from_serializable(entries: Vec<SerializedEntry>) -> Result<Vec<FocusEntry>, SerialError> {
    entries
        .into_iter()
        .map(SerializedEntry::into_entry)
        .collect()
}
