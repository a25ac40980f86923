pub mod add;
pub mod get_issue_requests;
pub mod remove;
pub mod submit;
pub mod update;

use actix_web::web;
use db_connector::models::issue_requests::IssueRequest;
use diesel::{prelude::*, result::Error::NotFound};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::Error,
    utils::{get_connection, web_block_unpacked},
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/issue_request")
            .service(add::add)
            .service(get_issue_requests::get_issue_requests)
            .service(submit::submit)
            .service(get_issue_requests::get_issue_request)
            .service(update::update)
            .service(remove::remove),
    );
}

/// Client-facing issue request representation. Carries the device name so
/// list views need no second lookup.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueRequestResponse {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub status: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub period_of_production: Option<String>,
    pub production_amount: f64,
    pub recipient_account: String,
    pub notes: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl IssueRequestResponse {
    pub fn new(request: IssueRequest, device_name: String) -> Self {
        IssueRequestResponse {
            id: request.id.to_string(),
            device_id: request.device_id.to_string(),
            device_name,
            status: request.status,
            start_date: request.start_date,
            end_date: request.end_date,
            period_of_production: request.period_of_production,
            production_amount: request.production_amount,
            recipient_account: request.recipient_account,
            notes: request.notes,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Load an issue request as a given principal. Non-owners get a uniform
/// `Unauthorized` so existence is not leaked; admins see everything.
pub(crate) async fn get_issue_request_for_user(
    state: &web::Data<AppState>,
    request_id: uuid::Uuid,
    uid: uuid::Uuid,
    is_admin: bool,
) -> actix_web::Result<IssueRequest> {
    let mut conn = get_connection(state)?;
    let request = web_block_unpacked(move || {
        use db_connector::schema::issue_requests::dsl as issue_requests;

        let mut query = issue_requests::issue_requests.find(request_id).into_boxed();
        if !is_admin {
            query = query.filter(issue_requests::user_id.eq(uid));
        }

        match query.select(IssueRequest::as_select()).get_result(&mut conn) {
            Ok(request) => Ok(request),
            Err(NotFound) => Err(Error::Unauthorized),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    Ok(request)
}
