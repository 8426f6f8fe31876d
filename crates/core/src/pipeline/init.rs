//! Schema initialization stage

use tracing::info;

use crate::staging::{SchemaDefinition, SchemaError, StoreHandle};

/// Create the store tables if they do not exist yet
///
/// Safe to call any number of times against the same store.
pub fn init_schema(store: &StoreHandle, schema: &SchemaDefinition) -> Result<(), SchemaError> {
    info!(
        stage = "init",
        database = %store.path().display(),
        schema = %schema.describe(),
        "Initializing store schema"
    );

    let ddl = schema.load()?;
    let db = store.open()?;
    db.apply_schema(&ddl)?;

    info!(stage = "init", database = %store.path().display(), "Store schema ready");
    Ok(())
}
