//! Keyspace and table provisioning.

use super::session::{Session, Statement, StoreError};
use super::tables::Table;
use crate::error::AppError;
use tracing::info;

/// Longest keyspace name the store accepts.
const MAX_KEYSPACE_LEN: usize = 48;

/// Check that `name` can be interpolated into DDL as an unquoted identifier.
pub fn validate_keyspace_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(format!("keyspace name must start with a letter: {:?}", name)),
    }
    if name.len() > MAX_KEYSPACE_LEN {
        return Err(format!(
            "keyspace name longer than {} characters: {:?}",
            MAX_KEYSPACE_LEN, name
        ));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!(
            "keyspace name may only contain letters, digits and '_': {:?}",
            name
        ));
    }
    Ok(())
}

/// Create the keyspace with `SimpleStrategy` replication if it does not exist.
///
/// # Errors
/// Returns a provisioning error if the name or factor is invalid or the store
/// rejects the statement.
pub async fn ensure_keyspace<S: Session>(
    session: &S,
    name: &str,
    replication_factor: u32,
) -> Result<(), AppError> {
    validate_keyspace_name(name).map_err(|e| AppError::Provisioning(StoreError::InvalidRequest(e)))?;
    if replication_factor == 0 {
        return Err(AppError::Provisioning(StoreError::InvalidRequest(
            "replication factor must be at least 1".to_string(),
        )));
    }

    session
        .execute(
            &Statement::CreateKeyspace {
                name: name.to_string(),
                replication_factor,
            },
            Vec::new(),
        )
        .await
        .map_err(AppError::Provisioning)?;

    info!(
        "Keyspace {} ensured (replication_factor={})",
        name, replication_factor
    );
    Ok(())
}

/// Create every table of the investments keyspace if absent.
///
/// Expects the keyspace to be selected already.
pub async fn ensure_schema<S: Session>(session: &S) -> Result<(), AppError> {
    info!("Ensuring {} tables...", Table::ALL.len());
    for table in Table::ALL {
        session
            .execute(&Statement::CreateTable(table), Vec::new())
            .await
            .map_err(AppError::Provisioning)?;
        info!("Table {} ensured", table);
    }
    info!("Schema ready");
    Ok(())
}

/// Provision the keyspace, select it, and provision its tables.
pub async fn init_store<S: Session>(
    session: &S,
    keyspace: &str,
    replication_factor: u32,
) -> Result<(), AppError> {
    ensure_keyspace(session, keyspace, replication_factor).await?;
    session
        .use_keyspace(keyspace)
        .await
        .map_err(AppError::Provisioning)?;
    ensure_schema(session).await
}
