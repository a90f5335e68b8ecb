//! Rebrickable CSV part list adapter

use super::RawEntry;
use crate::{Error, Result};
use std::path::Path;

/// First header columns of a Rebrickable CSV export
pub const SIGNATURE: &[u8] = b"Part,Color,Quantity";

/// Parse a Rebrickable CSV export into raw rows.
///
/// The column positions are taken from the header line rather than assumed,
/// since exports may carry trailing columns such as "Is Spare".
pub fn parse(path: &Path) -> Result<Vec<RawEntry>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| Error::FormatUnrecognized("empty Rebrickable CSV file".to_string()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let part_column = column_index(&columns, "Part")?;
    let quantity_column = column_index(&columns, "Quantity")?;

    let mut entries = Vec::new();
    for (number, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let id = field(&fields, part_column, number)?;
        let quantity = field(&fields, quantity_column, number)?
            .trim()
            .parse::<i64>()
            .map_err(|_| {
                Error::FormatUnrecognized(format!(
                    "invalid quantity on CSV line {}",
                    number + 2
                ))
            })?;
        entries.push(RawEntry {
            id: id.trim().to_string(),
            quantity,
        });
    }

    Ok(entries)
}

fn column_index(columns: &[&str], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| *c == name)
        .ok_or_else(|| Error::FormatUnrecognized(format!("CSV header missing {:?} column", name)))
}

fn field<'a>(fields: &[&'a str], index: usize, line: usize) -> Result<&'a str> {
    fields.get(index).copied().ok_or_else(|| {
        Error::FormatUnrecognized(format!("short row on CSV line {}", line + 2))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn parses_part_and_quantity_columns() {
        let (_dir, path) = write_csv(
            "Part,Color,Quantity,Is Spare\n3001,4,5,False\n3001,1,3,False\n3002a,0,2,True\n",
        );

        let entries = parse(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "3001");
        assert_eq!(entries[0].quantity, 5);
        assert_eq!(entries[2].id, "3002a");
        assert_eq!(entries[2].quantity, 2);
    }

    #[test]
    fn rejects_non_numeric_quantity() {
        let (_dir, path) = write_csv("Part,Color,Quantity\n3001,4,many\n");
        assert!(parse(&path).is_err());
    }

    #[test]
    fn rejects_missing_quantity_column() {
        let (_dir, path) = write_csv("Part,Color,Count\n3001,4,5\n");
        assert!(parse(&path).is_err());
    }
}
