use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use validator::Validate;

use crate::{error::AppResult, models::Ingredient};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct IngredientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters."))]
    pub name: String,
    #[validate(length(
        min = 1,
        max = 200,
        message = "Measurement unit must be between 1 and 200 characters."
    ))]
    pub measurement_unit: String,
}

impl IngredientRequest {
    pub fn into_valid(self) -> AppResult<Self> {
        let request = Self {
            name: self.name.trim().to_string(),
            measurement_unit: self.measurement_unit.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IngredientQuery {
    /// Case-sensitive name prefix.
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct IngredientList {
    #[schema(value_type = Vec<Ingredient>)]
    pub items: Vec<Ingredient>,
}
