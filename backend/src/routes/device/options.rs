use actix_web::{get, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogOption {
    pub value: String,
    pub label: String,
}

fn to_options(entries: &[(&str, &str)]) -> Vec<CatalogOption> {
    entries
        .iter()
        .map(|(value, label)| CatalogOption {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
}

/// List the fixed fuel type codes. Public reference data, no login needed.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 200, description = "Success", body = [CatalogOption])
    )
)]
#[get("/fuel_options")]
pub async fn fuel_options() -> impl Responder {
    HttpResponse::Ok().json(to_options(catalog::FUEL_TYPES))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TechnologyQuery {
    pub fuel_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TechnologyOptions {
    pub options: Vec<CatalogOption>,
}

/// List the technology codes valid for a fuel type. An unknown fuel type
/// yields an empty list rather than an error so the client can clear its
/// dependent dropdown.
#[utoipa::path(
    context_path = "/device",
    params(TechnologyQuery),
    responses(
        (status = 200, description = "Success", body = TechnologyOptions)
    )
)]
#[get("/technology_options")]
pub async fn technology_options(query: web::Query<TechnologyQuery>) -> impl Responder {
    let options = to_options(catalog::technology_options(&query.fuel_type));
    HttpResponse::Ok().json(TechnologyOptions { options })
}
