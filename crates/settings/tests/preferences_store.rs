use focusspace_settings::{ExcludeMatcher, ExcludePattern, Preferences, PreferencesStore};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let store = PreferencesStore::load(&path).expect("load defaults");
    assert_eq!(store.preferences().save_debounce_ms, 500);
    assert_eq!(store.preferences().watch_debounce_ms, 300);
    assert_eq!(store.preferences().max_materialize_depth, 3);
    assert!(store.preferences().exclude.is_empty());
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let mut store = PreferencesStore::new(path.clone(), Preferences::default());
    store
        .update(|prefs| {
            prefs.save_debounce_ms = 1_000;
            prefs.exclude.push(ExcludePattern::Suffix(".log".to_string()));
            prefs.exclude.push(ExcludePattern::Glob("**/target/**".to_string()));
        })
        .expect("save");

    let reloaded = PreferencesStore::load(&path).expect("reload");
    assert_eq!(reloaded.preferences().save_debounce_ms, 1_000);
    assert_eq!(reloaded.preferences().exclude.len(), 2);

    let matcher = ExcludeMatcher::compile(&reloaded.preferences().exclude).expect("compile");
    assert!(matcher.is_excluded("/ws/build.log"));
    assert!(matcher.is_excluded("/ws/target/debug/app"));
    assert!(!matcher.is_excluded("/ws/src/main.rs"));
}

#[test]
fn overwrite_sanitizes_out_of_range_values() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let mut store = PreferencesStore::load(&path).expect("default");
    let mut prefs = store.preferences().clone();
    prefs.save_debounce_ms = 0;
    prefs.watch_debounce_ms = 999_999;
    prefs.max_materialize_depth = 0;
    prefs.exclude.push(ExcludePattern::Glob("   ".to_string()));

    store.overwrite(prefs).expect("overwrite");

    let current = store.preferences();
    assert_eq!(current.save_debounce_ms, 500);
    assert_eq!(current.watch_debounce_ms, 60_000);
    assert_eq!(current.max_materialize_depth, 3);
    assert!(current.exclude.is_empty());
}

#[test]
fn legacy_version_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, r#"{"version": 0, "saveDebounceMs": 250}"#).expect("write");

    let store = PreferencesStore::load(&path).expect("load");
    assert_eq!(store.preferences().version, 1);
    // unknown/camel-cased keys from older builds fall back to defaults
    assert_eq!(store.preferences().save_debounce_ms, 500);
}

#[test]
fn sparse_payload_fills_in_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, r#"{"save_debounce_ms": 250}"#).expect("write");

    let store = PreferencesStore::load(&path).expect("load");
    assert_eq!(store.preferences().save_debounce_ms, 250);
    assert_eq!(store.preferences().watch_debounce_ms, 300);
    assert_eq!(store.preferences().version, 1);
}
