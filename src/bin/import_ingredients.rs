//! Load ingredients from a headerless `name,measurement_unit` CSV file.
//!
//! Usage: `import-ingredients data/ingredients.csv`

use std::io::Read;

use foodgram_api::{config::database_url, db::create_pool};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
struct IngredientRow {
    name: String,
    measurement_unit: String,
}

fn parse_rows<R: Read>(reader: R) -> anyhow::Result<Vec<IngredientRow>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in csv.records().enumerate() {
        let record = record?;
        let (Some(name), Some(unit)) = (record.get(0), record.get(1)) else {
            anyhow::bail!("line {}: expected `name,measurement_unit`", line + 1);
        };
        if name.is_empty() || unit.is_empty() {
            tracing::warn!(line = line + 1, "skipping row with an empty field");
            continue;
        }
        rows.push(IngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        });
    }
    Ok(rows)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: import-ingredients <file.csv>"))?;
    let rows = parse_rows(std::fs::File::open(&path)?)?;

    let pool = create_pool(&database_url()?).await?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0_u64;
    for row in &rows {
        let result = sqlx::query(
            r#"
            INSERT INTO ingredients (id, name, measurement_unit)
            VALUES ($1, $2, $3)
            ON CONFLICT (name, measurement_unit) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.name)
        .bind(&row.measurement_unit)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;

    tracing::info!(
        file = %path,
        read = rows.len(),
        inserted,
        "ingredients imported"
    );
    Ok(())
}
