//! FocusSpace 的偏好設定：去抖動間隔、展開深度與排除規則。
//! Preferences for FocusSpace: debounce intervals, materialization depth,
//! and exclude rules, persisted as JSON.

pub mod excludes;
pub mod preferences;

pub use excludes::{ExcludeError, ExcludeMatcher, ExcludePattern};
pub use preferences::{Preferences, PreferencesError, PreferencesStore};
