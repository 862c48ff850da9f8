#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("schema unavailable: table `{table}` has no bound package data; run analysis first")]
    SchemaUnavailable { table: String },

    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("seed store error: {0}")]
    Store(#[from] devac_store::StoreError),

    #[error("query backend exhausted retries after {attempts} attempt(s): {source}")]
    RetriesExhausted { attempts: u32, source: rusqlite::Error },
}

impl QueryError {
    /// `true` for errors the retry loop should attempt again (transient
    /// backend conditions), `false` for schema/syntax errors that will
    /// never succeed on retry (spec §4.2, "schema errors are not
    /// retried").
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QueryError::Sql(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }
}
