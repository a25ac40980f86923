use std::str::FromStr;

use actix_web::{error::ErrorBadRequest, patch, web, HttpResponse, Responder};
use actix_web_validator::Json;
use chrono::NaiveDate;
use db_connector::models::issue_requests::IssueRequest;
use diesel::{prelude::*, AsChangeset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    notify::Event,
    routes::device::round6,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    workflow::Status,
    AppState,
};

use super::{get_issue_request_for_user, IssueRequestResponse};

/// Partial update. Absent fields keep their persisted value. `status` is
/// only writable by administrators; the device binding is fixed at
/// creation and cannot be moved.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateIssueRequestSchema {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub period_of_production: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub production_amount: Option<f64>,
    #[validate(length(min = 1, max = 255))]
    pub recipient_account: Option<String>,
    pub notes: Option<String>,
    pub status: Option<Status>,
}

#[derive(AsChangeset)]
#[diesel(table_name = db_connector::schema::issue_requests)]
struct IssueRequestChangeset {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    period_of_production: Option<String>,
    production_amount: Option<f64>,
    recipient_account: Option<String>,
    notes: Option<String>,
    status: Option<String>,
    updated_at: chrono::NaiveDateTime,
}

/// Update an issue request. The date ordering rule is checked against the
/// merged view of the request and the persisted row. A status change
/// notifies the request owner.
#[utoipa::path(
    context_path = "/issue_request",
    request_body = UpdateIssueRequestSchema,
    responses(
        (status = 200, description = "Issue request was updated", body = IssueRequestResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Issue request does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[patch("/{id}")]
pub async fn update(
    state: web::Data<AppState>,
    data: Json<UpdateIssueRequestSchema>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let request_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    let request = get_issue_request_for_user(&state, request_id, user.id, user.is_admin).await?;

    let data = data.into_inner();
    if !user.is_admin && data.status.is_some() {
        return Err(Error::StatusIsReadOnly.into());
    }

    let start_date = data.start_date.unwrap_or(request.start_date);
    let end_date = data.end_date.unwrap_or(request.end_date);
    if end_date <= start_date {
        let mut err = ValidationError::new("end_date");
        err.message = Some("End date must be after start date".into());
        return Err(ErrorBadRequest(err));
    }

    let requested_status = data.status;
    let changeset = IssueRequestChangeset {
        start_date: data.start_date,
        end_date: data.end_date,
        period_of_production: data.period_of_production,
        production_amount: data.production_amount.map(round6),
        recipient_account: data.recipient_account,
        notes: data.notes,
        status: requested_status.map(|s| s.as_str().to_string()),
        updated_at: chrono::Utc::now().naive_utc(),
    };

    let owner = get_user(&state, request.user_id).await?;
    let mut conn = get_connection(&state)?;
    let device_id = request.device_id;
    let device_name: String = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        match devices::devices
            .find(device_id)
            .select(devices::device_name)
            .get_result(&mut conn)
        {
            Ok(name) => Ok(name),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    let mut conn = get_connection(&state)?;
    let notifier = state.notifier.clone();
    let device_name_cpy = device_name.clone();
    let request = web_block_unpacked(move || {
        use db_connector::schema::issue_requests::dsl as issue_requests;

        conn.transaction::<_, Error, _>(|conn| {
            let current: String = issue_requests::issue_requests
                .find(request_id)
                .select(issue_requests::status)
                .for_update()
                .get_result(conn)?;
            let current = Status::from_str(&current)?;

            diesel::update(issue_requests::issue_requests.find(request_id))
                .set(&changeset)
                .execute(conn)?;

            let updated: IssueRequest = issue_requests::issue_requests
                .find(request_id)
                .select(IssueRequest::as_select())
                .get_result(conn)?;

            // Enqueue last: nothing is queued if any statement fails.
            if let Some(new_status) = requested_status {
                if new_status != current {
                    notifier.dispatch(Event::IssueRequestStatusChanged {
                        device_name: device_name_cpy,
                        owner: (&owner).into(),
                        old_status: current,
                        new_status,
                    })?;
                }
            }

            Ok(updated)
        })
    })
    .await?;

    Ok(HttpResponse::Ok().json(IssueRequestResponse::new(request, device_name)))
}
