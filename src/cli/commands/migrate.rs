use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::database::schema::ensure_schema;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    output_success(&output_format, "Schema is up to date", None)
}
