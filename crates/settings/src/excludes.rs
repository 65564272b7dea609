use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 排除規則的種類：副檔名字尾、glob 樣式或正規表示式。 / Exclude rule flavors: suffix, glob pattern, or regex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExcludePattern {
    Suffix(String),
    Glob(String),
    Regex(String),
}

/// 編譯排除規則時可能出現的錯誤。 / Error raised while compiling exclude rules.
#[derive(Debug, Error)]
pub enum ExcludeError {
    #[error("invalid exclude pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// 將所有排除規則編譯為正規表示式，對路徑字串進行比對。 / Compiles every exclude rule down to a regex matched against path text.
#[derive(Debug)]
pub struct ExcludeMatcher {
    rules: Vec<Regex>,
}

impl ExcludeMatcher {
    pub fn compile(patterns: &[ExcludePattern]) -> Result<Self, ExcludeError> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let source = match pattern {
                ExcludePattern::Suffix(suffix) => format!("{}$", regex::escape(suffix)),
                ExcludePattern::Glob(glob) => glob_to_regex(glob),
                ExcludePattern::Regex(expr) => expr.clone(),
            };
            let rule = Regex::new(&source).map_err(|err| ExcludeError::Invalid {
                pattern: source.clone(),
                source: err,
            })?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 路徑是否符合任一排除規則。 / Whether the path text matches any exclude rule.
    pub fn is_excluded(&self, path: impl AsRef<std::path::Path>) -> bool {
        let text = path.as_ref().to_string_lossy();
        self.rules.iter().any(|rule| rule.is_match(&text))
    }
}

/// `**` 匹配任意層級、`*` 不跨目錄、`?` 匹配單一字元。 / `**` spans directories, `*` stays within one segment, `?` is a single character.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // swallow a following separator so "**/" matches zero levels
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        out.push_str("(?:.*/)?");
                    } else {
                        out.push_str(".*");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_rules_match_path_endings() {
        let matcher =
            ExcludeMatcher::compile(&[ExcludePattern::Suffix(".log".to_string())]).unwrap();
        assert!(matcher.is_excluded("/ws/debug.log"));
        assert!(!matcher.is_excluded("/ws/debug.log.txt"));
        assert!(!matcher.is_excluded("/ws/catalog"));
    }

    #[test]
    fn glob_star_stays_within_a_segment() {
        let matcher =
            ExcludeMatcher::compile(&[ExcludePattern::Glob("/ws/*.tmp".to_string())]).unwrap();
        assert!(matcher.is_excluded("/ws/a.tmp"));
        assert!(!matcher.is_excluded("/ws/nested/a.tmp"));
    }

    #[test]
    fn double_star_spans_directories() {
        let matcher =
            ExcludeMatcher::compile(&[ExcludePattern::Glob("**/node_modules/**".to_string())])
                .unwrap();
        assert!(matcher.is_excluded("/ws/node_modules/lodash/index.js"));
        assert!(matcher.is_excluded("/ws/app/node_modules/x"));
        assert!(!matcher.is_excluded("/ws/src/modules.rs"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let matcher =
            ExcludeMatcher::compile(&[ExcludePattern::Glob("/ws/v?.txt".to_string())]).unwrap();
        assert!(matcher.is_excluded("/ws/v1.txt"));
        assert!(!matcher.is_excluded("/ws/v12.txt"));
    }

    #[test]
    fn raw_regex_rules_pass_through() {
        let matcher =
            ExcludeMatcher::compile(&[ExcludePattern::Regex(r"/target/".to_string())]).unwrap();
        assert!(matcher.is_excluded("/ws/target/debug/app"));
        assert!(!matcher.is_excluded("/ws/src/lib.rs"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let result = ExcludeMatcher::compile(&[ExcludePattern::Regex("(".to_string())]);
        assert!(matches!(result, Err(ExcludeError::Invalid { .. })));
    }

    #[test]
    fn empty_rule_set_excludes_nothing() {
        let matcher = ExcludeMatcher::compile(&[]).unwrap();
        assert!(matcher.is_empty());
        assert!(!matcher.is_excluded("/anything"));
    }
}
