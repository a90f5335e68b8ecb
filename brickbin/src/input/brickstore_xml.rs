//! BrickStore XML (.bsx) inventory adapter

use super::RawEntry;
use crate::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

/// BrickStore documents open with their own root element
pub const SIGNATURE: &[u8] = b"<BrickStoreXML>";

/// Which child of the current Item we are reading text for
#[derive(PartialEq)]
enum Field {
    ItemId,
    Qty,
    Other,
}

/// Parse the Inventory/Item elements of a BrickStore document, taking the
/// ItemID and Qty children of each item.
pub fn parse(path: &Path) -> Result<Vec<RawEntry>> {
    let content = std::fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&content);

    let mut entries = Vec::new();
    let mut in_inventory = false;
    let mut in_item = false;
    let mut field = Field::Other;
    let mut item_id: Option<String> = None;
    let mut quantity: Option<i64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"Inventory" => in_inventory = true,
                b"Item" if in_inventory => {
                    in_item = true;
                    item_id = None;
                    quantity = None;
                }
                b"ItemID" if in_item => field = Field::ItemId,
                b"Qty" if in_item => field = Field::Qty,
                _ => field = Field::Other,
            },
            Ok(Event::Text(t)) if in_item => {
                let text = t
                    .unescape()
                    .map_err(|e| xml_error(&e))?
                    .trim()
                    .to_string();
                match field {
                    Field::ItemId => item_id = Some(text),
                    Field::Qty => {
                        quantity = Some(text.parse().map_err(|_| {
                            Error::FormatUnrecognized(format!("invalid Qty value {:?}", text))
                        })?)
                    }
                    Field::Other => {}
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"Inventory" => in_inventory = false,
                b"Item" if in_item => {
                    in_item = false;
                    match (item_id.take(), quantity.take()) {
                        (Some(id), Some(quantity)) => entries.push(RawEntry { id, quantity }),
                        _ => {
                            return Err(Error::FormatUnrecognized(
                                "Item missing ItemID or Qty".to_string(),
                            ))
                        }
                    }
                }
                _ => field = Field::Other,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(&e)),
        }
    }

    Ok(entries)
}

fn xml_error(e: &quick_xml::Error) -> Error {
    Error::FormatUnrecognized(format!("invalid BrickStore XML: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inventory_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.bsx");
        std::fs::write(
            &path,
            "<BrickStoreXML>\n<Inventory>\n\
             <Item><ItemID>3001</ItemID><ItemTypeID>P</ItemTypeID><ColorID>5</ColorID><Qty>2</Qty></Item>\n\
             <Item><ItemID>3622</ItemID><ColorID>11</ColorID><Qty>7</Qty></Item>\n\
             </Inventory>\n</BrickStoreXML>\n",
        )
        .unwrap();

        let entries = parse(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "3001");
        assert_eq!(entries[0].quantity, 2);
        assert_eq!(entries[1].id, "3622");
        assert_eq!(entries[1].quantity, 7);
    }

    #[test]
    fn rejects_item_without_quantity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.bsx");
        std::fs::write(
            &path,
            "<BrickStoreXML><Inventory><Item><ItemID>3001</ItemID></Item></Inventory></BrickStoreXML>",
        )
        .unwrap();

        assert!(parse(&path).is_err());
    }
}
