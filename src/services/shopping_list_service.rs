use std::collections::BTreeMap;
use std::fmt;

use sqlx::FromRow;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    pdf,
    state::AppState,
};

pub const SHOPPING_LIST_TITLE: &str = "Shopping list";
pub const SHOPPING_LIST_FILENAME: &str = "Shopping.pdf";

/// One ingredient line of one recipe in the cart.
#[derive(Debug, Clone, FromRow)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

impl fmt::Display for ShoppingListLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.name, self.amount, self.measurement_unit)
    }
}

/// Sum amounts per (name, unit). Missing amounts count as zero; output is sorted by name then unit.
pub fn aggregate(rows: impl IntoIterator<Item = CartIngredientRow>) -> Vec<ShoppingListLine> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_default() +=
            i64::from(row.amount.unwrap_or(0));
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListLine {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub async fn cart_ingredients(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<Vec<CartIngredientRow>> {
    let rows = sqlx::query_as::<_, CartIngredientRow>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_carts c
        JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

/// Aggregated shopping list of the caller rendered as PDF bytes.
pub async fn download_shopping_list(state: &AppState, user: &AuthUser) -> AppResult<Vec<u8>> {
    let lines: Vec<String> = aggregate(cart_ingredients(state, user).await?)
        .iter()
        .map(ToString::to_string)
        .collect();

    let font = match &state.config.shopping_list_font {
        Some(path) => Some(tokio::fs::read(path).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("cannot read font {path}: {e}"))
        })?),
        None => None,
    };

    tracing::debug!(user_id = %user.user_id, lines = lines.len(), "rendering shopping list");
    let bytes = pdf::render(SHOPPING_LIST_TITLE, &lines, font.as_deref())?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: Option<i32>) -> CartIngredientRow {
        CartIngredientRow {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn sums_same_name_and_unit() {
        let lines = aggregate(vec![row("Salt", "g", Some(5)), row("Salt", "g", Some(3))]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].to_string(), "Salt - 8 g");
    }

    #[test]
    fn different_units_stay_separate() {
        let lines = aggregate(vec![
            row("Sugar", "g", Some(100)),
            row("Sugar", "tbsp", Some(2)),
            row("Sugar", "g", Some(50)),
        ]);
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Sugar - 150 g", "Sugar - 2 tbsp"]);
    }

    #[test]
    fn missing_amount_counts_as_zero_and_output_is_sorted() {
        let lines = aggregate(vec![
            row("Water", "ml", None),
            row("Flour", "g", Some(200)),
            row("Water", "ml", Some(250)),
        ]);
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Flour - 200 g", "Water - 250 ml"]);
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
