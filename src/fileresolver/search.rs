//! Tier 3 — filesystem search (spec.md §4.3, §7 `DirectoryInaccessible`).
//! Recurses directory-by-directory so one inaccessible or cloud-placeholder
//! folder doesn't abort the whole scan; returns a hit only on an
//! unambiguous single match.

use std::path::{Path, PathBuf};

/// The roots searched for a bare filename, in order: documents, desktop,
/// downloads, then up to three OneDrive roots (personal / consumer /
/// commercial) (spec.md §4.3).
pub fn search_roots(home: &Path) -> Vec<PathBuf> {
    let mut roots = vec![
        home.join("Documents"),
        home.join("Desktop"),
        home.join("Downloads"),
    ];
    for onedrive_env in ["OneDrive", "OneDriveConsumer", "OneDriveCommercial"] {
        if let Ok(path) = std::env::var(onedrive_env) {
            roots.push(PathBuf::from(path));
        }
    }
    roots
}

/// Searches `roots` recursively for a file named `filename` (case-
/// insensitive). Returns `Some(path)` only when exactly one match is found
/// across all roots; zero or multiple matches are ambiguous and return
/// `None` — the resolver never guesses (spec.md §4.3).
pub fn find_unique_match(roots: &[PathBuf], filename: &str) -> Option<PathBuf> {
    let mut matches = Vec::new();
    for root in roots {
        walk(root, filename, &mut matches);
    }
    match matches.len() {
        1 => matches.pop(),
        _ => None,
    }
}

fn walk(dir: &Path, filename: &str, matches: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("search skipped inaccessible directory {dir:?}: {e}");
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        if file_type.is_dir() {
            walk(&path, filename, matches);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.eq_ignore_ascii_case(filename) {
                matches.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn single_match_is_returned() {
        let dir = std::env::temp_dir().join("windowanchor-search-single");
        let sub = dir.join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("notes.txt"), b"x").unwrap();

        let hit = find_unique_match(&[dir.clone()], "notes.txt");
        assert_eq!(hit, Some(sub.join("notes.txt")));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn ambiguous_matches_return_none() {
        let dir = std::env::temp_dir().join("windowanchor-search-ambiguous");
        let a = dir.join("a");
        let b = dir.join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("notes.txt"), b"x").unwrap();
        fs::write(b.join("notes.txt"), b"y").unwrap();

        assert_eq!(find_unique_match(&[dir.clone()], "notes.txt"), None);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn zero_matches_return_none() {
        let dir = std::env::temp_dir().join("windowanchor-search-empty");
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(find_unique_match(&[dir.clone()], "ghost.txt"), None);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn inaccessible_sibling_does_not_abort_scan() {
        let dir = std::env::temp_dir().join("windowanchor-search-sibling");
        let good = dir.join("good");
        fs::create_dir_all(&good).unwrap();
        fs::write(good.join("target.txt"), b"x").unwrap();
        // A nonexistent sibling simulates an inaccessible/placeholder folder;
        // walk() must log and continue rather than propagate an error.
        walk(&dir.join("missing"), "target.txt", &mut Vec::new());
        let hit = find_unique_match(&[dir.clone()], "target.txt");
        assert_eq!(hit, Some(good.join("target.txt")));
        fs::remove_dir_all(&dir).unwrap();
    }
}
