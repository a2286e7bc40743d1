//! 对象键规范化 / Object key normalization
//!
//! OSS has a flat namespace, so the logical location prefix and file name
//! are folded into a single forward-slash key here. Resolution is pure:
//! the same `(location, name)` always yields the same key.

/// Resolve the flat-namespace object key for a logical name, e.g.
/// location `/media/` + name `test.txt` -> `media/test.txt`.
///
/// 1. Leading slashes in `name` are stripped (absolute-looking names are
///    treated as relative to the location).
/// 2. `.` / `..` segments collapse with URL-join semantics: `..` cannot
///    climb above the location root, excess segments are dropped.
/// 3. A trailing slash on the joined path survives normalization, so
///    directory markers keep their `/` suffix.
/// 4. The result always uses forward slashes and has no leading slash.
pub fn resolve_key(location: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    let joined = format!("{}/{}", location.trim_end_matches('/'), name);
    let had_trailing = joined.ends_with('/');

    let mut key = clean_segments(&joined);
    // normalization drops the slash of directory markers, put it back / 目录标记保留尾部斜杠
    if had_trailing && !key.is_empty() && !key.ends_with('/') {
        key.push('/');
    }
    key
}

/// Normalized logical path returned to callers by `save` (the location
/// prefix is not part of it) / save 返回的规范化逻辑路径
pub fn normalize_logical(name: &str) -> String {
    if name.is_empty() {
        return ".".to_string();
    }
    let absolute = name.starts_with('/');
    let cleaned = clean_segments(name);
    match (absolute, cleaned.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", cleaned),
        (false, true) => ".".to_string(),
        (false, false) => cleaned,
    }
}

/// Clean path, handle ., .. and duplicate / / 清理路径，处理 . 和 .. 和重复的 /
fn clean_segments(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_key_basic() {
        assert_eq!(resolve_key("/media/", "test.txt"), "media/test.txt");
        assert_eq!(resolve_key("/media/", "/test.txt"), "media/test.txt");
        assert_eq!(resolve_key("/static/", "css/site.css"), "static/css/site.css");
        assert_eq!(resolve_key("media", "test.txt"), "media/test.txt");
        assert_eq!(resolve_key("", "test.txt"), "test.txt");
    }

    #[test]
    fn test_resolve_key_is_deterministic() {
        let a = resolve_key("/media/", "a/b/../c.txt");
        let b = resolve_key("/media/", "a/b/../c.txt");
        assert_eq!(a, b);
        assert_eq!(a, "media/a/c.txt");
    }

    #[test]
    fn test_resolve_key_trailing_slash_survives() {
        assert_eq!(resolve_key("/media/", "test/"), "media/test/");
        assert_eq!(resolve_key("/media/", "a/b/"), "media/a/b/");
        assert_eq!(resolve_key("/media/", ""), "media/");
    }

    #[test]
    fn test_resolve_key_collapses_segments() {
        assert_eq!(resolve_key("/media/", "a//b"), "media/a/b");
        assert_eq!(resolve_key("/media/", "./a/./b"), "media/a/b");
        assert_eq!(resolve_key("/media/", "a/../b.txt"), "media/b.txt");
    }

    #[test]
    fn test_resolve_key_clamps_parent_escapes() {
        // `..` cannot climb above the root of the joined path
        assert_eq!(resolve_key("/media/", "../../etc/passwd"), "etc/passwd");
        assert_eq!(resolve_key("/media/", "a/../../../b"), "b");
    }

    #[test]
    fn test_resolve_key_forward_slashes_only() {
        assert_eq!(resolve_key("/media/", "a\\b\\c.txt"), "media/a/b/c.txt");
        assert!(!resolve_key("/media/", "x\\y").contains('\\'));
    }

    #[test]
    fn test_normalize_logical() {
        assert_eq!(normalize_logical("test.txt"), "test.txt");
        assert_eq!(normalize_logical("a/./b.txt"), "a/b.txt");
        assert_eq!(normalize_logical("a//b.txt"), "a/b.txt");
        assert_eq!(normalize_logical("/a/b.txt"), "/a/b.txt");
        assert_eq!(normalize_logical(""), ".");
        assert_eq!(normalize_logical("a/.."), ".");
    }
}
