//! JSON import/export of a learner's review items.
//! A bundle carries content and scheduling state, so an exported collection
//! can be moved to another store without losing review history.

use crate::database::ItemStore;
use crate::error::StoreResult;
use crate::models::ReviewItem;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBundle {
    pub owner_id: String,
    pub items: Vec<ReviewItem>,
}

/// Exports all items of `owner_id` to a JSON file at the specified path.
/// Returns the number of exported items.
pub fn export_items_to_path<P: AsRef<Path>>(
    store: &ItemStore,
    owner_id: &str,
    path: P,
) -> StoreResult<usize> {
    let bundle = ItemBundle {
        owner_id: owner_id.to_string(),
        items: store.list_items(owner_id, None)?,
    };

    let json_string = serde_json::to_string_pretty(&bundle)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(json_string.as_bytes())?;

    info!(owner_id, count = bundle.items.len(), path = %path.as_ref().display(), "exported items");
    Ok(bundle.items.len())
}

/// Imports a bundle into the store under `owner_id`.
///
/// Every item is checked before anything is written; a single item with
/// corrupted scheduling state or invalid content aborts the whole import.
/// Imported items get fresh ids, in bundle order.
pub fn import_items<P: AsRef<Path>>(
    store: &ItemStore,
    owner_id: &str,
    path: P,
) -> StoreResult<Vec<ReviewItem>> {
    let mut file = File::open(path.as_ref())?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let bundle: ItemBundle = serde_json::from_str(&contents)?;

    for item in &bundle.items {
        item.validate()?;
        item.content.clone().normalized()?;
    }

    let imported = bundle
        .items
        .iter()
        .map(|item| store.insert_item(owner_id, item))
        .collect::<StoreResult<Vec<_>>>()?;

    info!(
        owner_id,
        from_owner = %bundle.owner_id,
        count = imported.len(),
        "imported items"
    );
    Ok(imported)
}
