//! Single-use PostgreSQL connections.
//!
//! Every interaction with the target database opens a fresh connection and
//! closes it as soon as the work is done. There is no pool and no retry.

use crate::error::{AssistantError, AssistantResult};
use crate::models::ConnectionParams;
use sqlx::{Connection, PgConnection};
use tracing::{debug, warn};

/// Open a new connection with the given parameters.
pub async fn open(params: &ConnectionParams) -> AssistantResult<PgConnection> {
    debug!(target_db = %params.display_target(), "Opening connection");
    PgConnection::connect_with(&params.connect_options())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(_) => AssistantError::from(e),
            other => AssistantError::connection(
                format!("Cannot connect to {}: {}", params.display_target(), other),
                "Check host, port, credentials and that PostgreSQL is running",
            ),
        })
}

/// Close a connection, logging instead of failing when the goodbye is lost.
pub async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close connection cleanly");
    }
}
