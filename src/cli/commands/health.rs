use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::database::{PgStorage, Storage};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    let storage = PgStorage::new(pool.clone());
    let result = storage.ping().await;
    pool.close().await;

    result?;
    output_success(&output_format, "Database is reachable", Some(json!({ "database": "ok" })))
}
