// src/shards.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One pre-built collective-component index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    /// Collective component id taken from the directory name.
    pub id: u64,
    pub name: String,
    /// `<dir>/<name>/<name>`, the prefix handed to the index loader.
    pub prefix: PathBuf,
}

/// The first run of ASCII digits in `name`, e.g. `idx_007` -> 7.
pub fn parse_shard_id(name: &str) -> Result<u64> {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse()
        .map_err(|_| Error::ShardName(name.to_string()))
}

/// Splits `dir/idx_*` into `dir` and the name pattern `idx_*`.
/// A path whose last component has no `*` or `?` is a plain directory.
fn split_pattern(location: &Path) -> (PathBuf, Option<String>) {
    let last = location.file_name().map(|n| n.to_string_lossy().into_owned());
    match last {
        Some(name) if name.contains(['*', '?']) => {
            let dir = match location.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (dir, Some(name))
        }
        _ => (location.to_path_buf(), None),
    }
}

/// Shell-style match of a whole name: `*` is any run of characters, `?` exactly one.
fn name_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    // position after the last `*` and the name index it was tried at
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            p += 1;
            star = Some((p, n));
        } else if let Some((sp, sn)) = star {
            p = sp;
            n = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Every shard directory at `location`, sorted by id.
///
/// `location` is either a directory whose subdirectories are the shards, or
/// such a directory followed by a name pattern (`shards/idx_*`). Directories
/// without a numeric id in their name are not shards and are skipped.
pub fn discover_shards<P: AsRef<Path>>(location: P) -> Result<Vec<ShardInfo>> {
    let (dir, pattern) = split_pattern(location.as_ref());
    let mut shards = Vec::new();

    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };
        if let Some(pattern) = &pattern {
            if !name_matches(pattern, &name) {
                continue;
            }
        }
        let id = match parse_shard_id(&name) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        shards.push(ShardInfo {
            id,
            prefix: path.join(&name),
            name,
        });
    }

    shards.sort_by_key(|s| s.id);
    if let Some(pair) = shards.windows(2).find(|w| w[0].id == w[1].id) {
        return Err(Error::InvalidInput(format!(
            "shards `{}` and `{}` share component id {}",
            pair[0].name, pair[1].name, pair[0].id
        )));
    }
    log::info!("found {} collective component indexes in {}", shards.len(), dir.display());
    Ok(shards)
}

/// Create `base`, or `base_v.1`, `base_v.2`, ... if it already exists.
/// Returns the directory actually created.
pub fn create_fresh_dir<P: AsRef<Path>>(base: P) -> Result<PathBuf> {
    let base = base.as_ref();
    let mut serial = 0usize;
    loop {
        let candidate = if serial == 0 {
            base.to_path_buf()
        } else {
            let mut name = base.as_os_str().to_owned();
            name.push(format!("_v.{}", serial));
            PathBuf::from(name)
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => serial += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn shard_ids_from_names() {
        assert_eq!(parse_shard_id("idx_007").unwrap(), 7);
        assert_eq!(parse_shard_id("idx_123_k31").unwrap(), 123);
        assert_eq!(parse_shard_id("42").unwrap(), 42);
        assert!(matches!(parse_shard_id("idx_"), Err(Error::ShardName(_))));
    }

    #[test]
    fn discovers_shard_directories_in_id_order() {
        let dir = tempdir().unwrap();
        for name in ["idx_010", "idx_002", "idx_001"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let shards = discover_shards(dir.path()).unwrap();
        let ids: Vec<u64> = shards.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 10]);
        assert_eq!(shards[0].prefix, dir.path().join("idx_001").join("idx_001"));
    }

    #[test]
    fn directories_without_an_id_are_skipped() {
        let dir = tempdir().unwrap();
        for name in ["idx_3", "tmp", "logs"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let shards = discover_shards(dir.path()).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].name, "idx_3");
    }

    #[test]
    fn trailing_name_pattern_selects_shards() {
        let dir = tempdir().unwrap();
        for name in ["idx_1", "idx_2", "backup_7", "idx_old"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let shards = discover_shards(dir.path().join("idx_*")).unwrap();
        let names: Vec<&str> = shards.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["idx_1", "idx_2"]);
        assert_eq!(shards[1].prefix, dir.path().join("idx_2").join("idx_2"));
    }

    #[test]
    fn wildcard_names() {
        assert!(name_matches("idx_*", "idx_001"));
        assert!(name_matches("idx_?", "idx_1"));
        assert!(!name_matches("idx_?", "idx_12"));
        assert!(name_matches("*_k31", "idx_5_k31"));
        assert!(name_matches("a*b*c", "aXbYbZc"));
        assert!(!name_matches("idx_*", "backup_7"));
        assert!(name_matches("*", ""));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("idx_1")).unwrap();
        fs::create_dir(dir.path().join("idx_001")).unwrap();
        assert!(matches!(discover_shards(dir.path()), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn fresh_dir_gets_serial_suffix() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("fasta_out");
        assert_eq!(create_fresh_dir(&base).unwrap(), base);
        let second = create_fresh_dir(&base).unwrap();
        assert_eq!(second, dir.path().join("fasta_out_v.1"));
        let third = create_fresh_dir(&base).unwrap();
        assert_eq!(third, dir.path().join("fasta_out_v.2"));
    }
}
