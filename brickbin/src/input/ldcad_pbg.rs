//! LDCad part bin group (.pbg) adapter

use super::RawEntry;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// LDCad part bin groups open with an options section
pub const SIGNATURE: &[u8] = b"[options]";

/// Inventory lines look like `3001.dat ... [color=4] [count=12]`
static ITEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^.]*)\.dat.*\[color=\d+\] \[count=(\d+)\]$").expect("valid item regex")
});

/// Parse the inventory section of an LDCad part bin group. Lines before the
/// `<items>` marker are group options; lines after it that don't look like
/// part references are skipped.
pub fn parse(path: &Path) -> Result<Vec<RawEntry>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    if !lines.by_ref().any(|line| line.starts_with("<items>")) {
        return Err(Error::FormatUnrecognized(
            "LDCad file has no <items> section".to_string(),
        ));
    }

    let mut entries = Vec::new();
    for line in lines {
        let Some(captures) = ITEM_LINE.captures(line.trim_end()) else {
            continue;
        };
        let quantity = captures[2].parse::<i64>().map_err(|_| {
            Error::FormatUnrecognized(format!("invalid count in line {:?}", line))
        })?;
        entries.push(RawEntry {
            id: captures[1].to_string(),
            quantity,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_items_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.pbg");
        std::fs::write(
            &path,
            "[options]\nkind=setList\n<items>\n\
             3001.dat [lots of stuff] [color=4] [count=12]\n\
             3622.dat [color=11] [count=3]\n\
             not an item line\n",
        )
        .unwrap();

        let entries = parse(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "3001");
        assert_eq!(entries[0].quantity, 12);
        assert_eq!(entries[1].id, "3622");
        assert_eq!(entries[1].quantity, 3);
    }

    #[test]
    fn rejects_file_without_items_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.pbg");
        std::fs::write(&path, "[options]\nkind=setList\n").unwrap();

        assert!(parse(&path).is_err());
    }
}
