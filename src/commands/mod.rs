use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use crate::catalog::Catalog;
use crate::cli::StoreArgs;
use crate::store::open_store;

pub mod curriculum;
pub mod generate;
pub mod import_external;
pub mod init;
pub mod prompt;
pub mod status;
pub mod texts;
pub mod transfer;
pub mod validate;

/// Loads the catalog and opens (creating if needed) the store it describes.
pub(crate) fn open_catalog_store(args: &StoreArgs) -> Result<(Catalog, Connection)> {
    let catalog = Catalog::load_or_standard(args.catalog_path.as_deref())?;
    let db_path = args.resolved_db_path();
    debug!(db_path = %db_path.display(), "opening store");
    let connection = open_store(&db_path, &catalog)?;
    Ok((catalog, connection))
}
