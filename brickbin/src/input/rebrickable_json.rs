//! Rebrickable API JSON inventory adapter
//!
//! Decodes the set-parts response shape, whether uploaded directly or
//! materialized by the set resolution step.

use super::RawEntry;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// A Rebrickable API response starts with its result count
pub const SIGNATURE: &[u8] = b"{\"count\":";

#[derive(Debug, Deserialize)]
struct SetInventory {
    results: Vec<InventoryLine>,
}

#[derive(Debug, Deserialize)]
struct InventoryLine {
    quantity: i64,
    part: InventoryPart,
}

#[derive(Debug, Deserialize)]
struct InventoryPart {
    part_num: String,
}

pub fn parse(path: &Path) -> Result<Vec<RawEntry>> {
    let content = std::fs::read_to_string(path)?;
    let inventory: SetInventory = serde_json::from_str(&content)
        .map_err(|e| Error::FormatUnrecognized(format!("invalid Rebrickable JSON: {}", e)))?;

    Ok(inventory
        .results
        .into_iter()
        .map(|line| RawEntry {
            id: line.part.part_num,
            quantity: line.quantity,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_inventory_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        std::fs::write(
            &path,
            r#"{"count": 2, "next": null, "results": [
                {"id": 1, "quantity": 4, "part": {"part_num": "3001", "name": "Brick 2 x 4"}},
                {"id": 2, "quantity": 2, "part": {"part_num": "3020a", "name": "Plate 2 x 4"}}
            ]}"#,
        )
        .unwrap();

        let entries = parse(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "3001");
        assert_eq!(entries[0].quantity, 4);
        assert_eq!(entries[1].id, "3020a");
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        std::fs::write(&path, r#"{"count": 2, "results": "#).unwrap();

        assert!(parse(&path).is_err());
    }
}
