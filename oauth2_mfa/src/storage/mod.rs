mod data_store;
mod errors;
mod schema_validation;

pub(crate) async fn init() -> Result<(), errors::StorageError> {
    let _ = *data_store::GENERIC_DATA_STORE;

    Ok(())
}

pub(crate) use data_store::{DB_TABLE_PREFIX, GENERIC_DATA_STORE};
pub(crate) use schema_validation::{validate_postgres_table_schema, validate_sqlite_table_schema};
