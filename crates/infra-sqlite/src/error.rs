// sqlx::Error → TransportError
use courier_core::port::TransportError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> TransportError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some("2067") | Some("1555") => TransportError::Backend(format!(
                    "Unique constraint violation: {}",
                    db_err.message()
                )),
                Some("787") | Some("3850") => TransportError::Backend(format!(
                    "Foreign key constraint violation: {}",
                    db_err.message()
                )),
                Some("5") => TransportError::Backend(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some("13") => {
                    TransportError::Backend(format!("Database full: {}", db_err.message()))
                }
                Some(code) => TransportError::Backend(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
                None => TransportError::Backend(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::RowNotFound => TransportError::Backend("Row not found".to_string()),
        _ => TransportError::Backend(err.to_string()),
    }
}
