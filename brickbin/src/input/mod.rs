//! Input format adapters and registry dispatch
//!
//! Every supported inventory format reduces to the same canonical contract:
//! a list of (identity, quantity) rows, which `normalize` collapses into one
//! ascending `PartRecord` per DesignID. Formats are distinguished purely by a
//! literal byte-prefix signature; dispatch tries adapters in fixed priority
//! order and accepts the first whose signature matches and whose parse
//! succeeds.

pub mod brickstore_xml;
pub mod ldcad_pbg;
pub mod rebrickable_csv;
pub mod rebrickable_json;
pub mod rebrickable_set;

use crate::config::Config;
use crate::services::rebrickable_client::RebrickableClient;
use crate::types::PartRecord;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One raw inventory row as extracted by an adapter, before canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Part identity as written in the input (may carry mold/print suffixes)
    pub id: String,
    pub quantity: i64,
}

/// Closed set of file adapters, listed in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    RebrickableJson,
    RebrickableCsv,
    BrickStoreXml,
    LdcadPbg,
}

impl InputFormat {
    /// Dispatch priority order
    pub const ALL: [InputFormat; 4] = [
        InputFormat::RebrickableJson,
        InputFormat::RebrickableCsv,
        InputFormat::BrickStoreXml,
        InputFormat::LdcadPbg,
    ];

    /// Literal byte prefix identifying this format
    fn signature(&self) -> &'static [u8] {
        match self {
            InputFormat::RebrickableJson => rebrickable_json::SIGNATURE,
            InputFormat::RebrickableCsv => rebrickable_csv::SIGNATURE,
            InputFormat::BrickStoreXml => brickstore_xml::SIGNATURE,
            InputFormat::LdcadPbg => ldcad_pbg::SIGNATURE,
        }
    }

    /// Cheap byte-prefix test; an exact prefix match is required.
    pub fn match_signature(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(self.signature())
    }

    /// Parse the file into raw (identity, quantity) rows.
    pub fn parse(&self, path: &Path) -> Result<Vec<RawEntry>> {
        match self {
            InputFormat::RebrickableJson => rebrickable_json::parse(path),
            InputFormat::RebrickableCsv => rebrickable_csv::parse(path),
            InputFormat::BrickStoreXml => brickstore_xml::parse(path),
            InputFormat::LdcadPbg => ldcad_pbg::parse(path),
        }
    }

    /// File extension associated with this format
    pub fn extension(&self) -> &'static str {
        match self {
            InputFormat::RebrickableJson => ".json",
            InputFormat::RebrickableCsv => ".csv",
            InputFormat::BrickStoreXml => ".bsx",
            InputFormat::LdcadPbg => ".pbg",
        }
    }
}

/// Comma-separated list of supported file extensions, for front-end display.
pub fn supported_extensions() -> String {
    InputFormat::ALL
        .iter()
        .map(|f| f.extension())
        .collect::<Vec<_>>()
        .join(",")
}

/// Load an inventory from a set identifier and/or a file.
///
/// A set identifier is resolved first through the typed two-phase protocol:
/// the Rebrickable API response is materialized as a JSON file, which is then
/// dispatched like any uploaded file. A failed or inapplicable resolution
/// falls through to the supplied file, if any.
pub async fn load(
    set: Option<&str>,
    file: Option<&Path>,
    config: &Config,
    rebrickable: &RebrickableClient,
) -> Result<Vec<PartRecord>> {
    let mut path = file.map(Path::to_path_buf);

    if let Some(set) = set {
        let work_file = config.work_file_path();
        match rebrickable_set::resolve(rebrickable, config.rebrickable_key(), set, &work_file).await
        {
            Ok(rebrickable_set::Resolution::Fetched(fetched)) => path = Some(fetched),
            Ok(rebrickable_set::Resolution::NotApplicable(reason)) => {
                debug!("Set resolution not applicable: {}", reason);
            }
            Err(e) => warn!("Set lookup for {:?} failed: {}", set, e),
        }
    }

    let Some(path) = path else {
        return Err(Error::FormatUnrecognized("no input supplied".to_string()));
    };

    dispatch_file(&path)
}

/// Try each adapter in priority order against the file's byte prefix.
pub fn dispatch_file(path: &Path) -> Result<Vec<PartRecord>> {
    let prefix = read_prefix(path)?;

    for format in InputFormat::ALL {
        if !format.match_signature(&prefix) {
            continue;
        }
        match format.parse(path) {
            Ok(entries) => {
                debug!("Parsed {} as {:?}", path.display(), format);
                return Ok(normalize(entries));
            }
            Err(e) => {
                warn!("{:?} signature matched but parse failed: {}", format, e);
            }
        }
    }

    Err(Error::FormatUnrecognized(format!(
        "no adapter signature matched {}",
        path.display()
    )))
}

/// Collapse raw rows into the canonical working set: strip non-numeric
/// decoration from identities (keeping the leading digit run; entries without
/// one are dropped), sum quantities per DesignID, ascending order.
pub fn normalize(entries: Vec<RawEntry>) -> Vec<PartRecord> {
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    for entry in entries {
        let Some(design_id) = leading_digits(&entry.id) else {
            debug!("Dropping entry with non-numeric identity {:?}", entry.id);
            continue;
        };
        *totals.entry(design_id).or_insert(0) += entry.quantity;
    }

    totals
        .into_iter()
        .map(|(design_id, quantity)| PartRecord {
            design_id,
            quantity,
        })
        .collect()
}

/// Leading digit run of an identity string, e.g. "3001a" -> 3001.
fn leading_digits(id: &str) -> Option<i64> {
    let digits: String = id.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Read enough leading bytes for the longest adapter signature.
fn read_prefix(path: &Path) -> Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let mut prefix = vec![0u8; 64];
    let read = file.read(&mut prefix)?;
    prefix.truncate(read);
    Ok(prefix)
}
