use sqlx::PgPool;

/// Executes the database commands defined in [`crate::entities`].
///
/// Every command is a plain struct with a `kanau::processor::Processor`
/// implementation on this type.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
