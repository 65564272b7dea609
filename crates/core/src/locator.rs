use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

const B64_PREFIX: &str = "b64:";
const SECTION_PREFIX: &str = "section:";

/// Identifies what an entry points at: a real filesystem location for files
/// and folders, or a synthetic token for sections.
/// 描述條目指向的位置：檔案/資料夾對應真實路徑，分組則使用合成代號。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryLocator {
    Path(PathBuf),
    Section(String),
}

/// Errors raised while decoding a canonical locator string.
/// 解析定位字串時可能出現的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("invalid base64 locator payload: {0}")]
    InvalidBase64(String),
    #[error("invalid locator payload: {0}")]
    InvalidPath(String),
}

impl EntryLocator {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        EntryLocator::Path(path.into())
    }

    pub fn section(token: impl Into<String>) -> Self {
        EntryLocator::Section(token.into())
    }

    /// Returns the real filesystem path, `None` for section locators.
    /// 取得真實路徑；分組定位回傳 `None`。
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            EntryLocator::Path(path) => Some(path),
            EntryLocator::Section(_) => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, EntryLocator::Section(_))
    }

    /// Canonical string form: UTF-8 path text, base64 for non-UTF-8 paths,
    /// `section:` prefix for synthetic locators. Lossless with [`parse`].
    /// 標準字串形式；與 [`parse`] 互為無損轉換。
    ///
    /// [`parse`]: EntryLocator::parse
    pub fn canonical(&self) -> String {
        match self {
            EntryLocator::Path(path) => encode_path(path),
            EntryLocator::Section(token) => format!("{SECTION_PREFIX}{token}"),
        }
    }

    /// Decodes a string produced by [`canonical`].
    /// 從標準字串還原定位資訊。
    ///
    /// [`canonical`]: EntryLocator::canonical
    pub fn parse(text: &str) -> Result<Self, LocatorError> {
        if let Some(token) = text.strip_prefix(SECTION_PREFIX) {
            return Ok(EntryLocator::Section(token.to_string()));
        }
        decode_path(text).map(EntryLocator::Path)
    }
}

impl fmt::Display for EntryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn encode_path(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_string(),
        None => {
            let bytes = path_to_bytes(path);
            let b64 = BASE64.encode(bytes);
            format!("{B64_PREFIX}{b64}")
        }
    }
}

fn decode_path(text: &str) -> Result<PathBuf, LocatorError> {
    if let Some(rest) = text.strip_prefix(B64_PREFIX) {
        let bytes = BASE64
            .decode(rest.as_bytes())
            .map_err(|err| LocatorError::InvalidBase64(err.to_string()))?;
        bytes_to_path(bytes)
    } else {
        Ok(PathBuf::from(text))
    }
}

fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Cow::Borrowed(path.as_os_str().as_bytes())
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        let wide: Vec<u16> = path.as_os_str().encode_wide().collect();
        let mut bytes = Vec::with_capacity(wide.len() * 2);
        for unit in wide {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        Cow::Owned(bytes)
    }
}

fn bytes_to_path(bytes: Vec<u8>) -> Result<PathBuf, LocatorError> {
    #[cfg(unix)]
    {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;
        Ok(PathBuf::from(OsString::from_vec(bytes)))
    }

    #[cfg(windows)]
    {
        use std::ffi::OsString;
        use std::os::windows::ffi::OsStringExt;
        if bytes.len() % 2 != 0 {
            return Err(LocatorError::InvalidPath(
                "encoded Windows path has odd byte length".to_string(),
            ));
        }
        let wide: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(PathBuf::from(OsString::from_wide(&wide)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_path_round_trips_as_plain_text() {
        let locator = EntryLocator::path("/workspace/src/main.rs");
        let canonical = locator.canonical();
        assert_eq!(canonical, "/workspace/src/main.rs");
        assert_eq!(EntryLocator::parse(&canonical).unwrap(), locator);
    }

    #[test]
    fn section_locator_round_trips_with_prefix() {
        let locator = EntryLocator::section("18f3a2-0001");
        let canonical = locator.canonical();
        assert!(canonical.starts_with("section:"));
        let parsed = EntryLocator::parse(&canonical).unwrap();
        assert_eq!(parsed, locator);
        assert!(parsed.is_synthetic());
        assert!(parsed.as_path().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_round_trips_through_base64() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![0x2f, 0x74, 0x6d, 0x70, 0x2f, 0xff, 0xfe]);
        let locator = EntryLocator::path(PathBuf::from(raw));
        let canonical = locator.canonical();
        assert!(canonical.starts_with("b64:"));
        assert_eq!(EntryLocator::parse(&canonical).unwrap(), locator);
    }

    #[test]
    fn malformed_base64_payload_is_rejected() {
        let err = EntryLocator::parse("b64:!!!").unwrap_err();
        assert!(matches!(err, LocatorError::InvalidBase64(_)));
    }
}
