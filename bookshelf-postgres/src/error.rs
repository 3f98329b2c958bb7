/// Returns `true` when `error` was raised by a unique constraint.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(error) => error.is_unique_violation(),
        _ => false,
    }
}

/// Returns `true` when `error` was raised by a foreign key constraint.
pub fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(error) => error.is_foreign_key_violation(),
        _ => false,
    }
}
