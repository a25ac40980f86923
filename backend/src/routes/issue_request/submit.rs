use std::str::FromStr;

use actix_web::{post, web, HttpResponse, Responder};
use diesel::prelude::*;
use serde_json::json;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    notify::Event,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    workflow::Status,
    AppState,
};

use super::get_issue_request_for_user;

/// Submit an issue request for admin review. Legal only while the request
/// is in `draft`.
#[utoipa::path(
    context_path = "/issue_request",
    responses(
        (status = 200, description = "Issue request was submitted"),
        (status = 400, description = "Issue request is not in draft"),
        (status = 401, description = "Issue request does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[post("/{id}/submit")]
pub async fn submit(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let request_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    let request = get_issue_request_for_user(&state, request_id, user.id, user.is_admin).await?;
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
    let new_status = web_block_unpacked(move || {
        use db_connector::schema::issue_requests::dsl as issue_requests;

        conn.transaction::<_, Error, _>(|conn| {
            let current: String = issue_requests::issue_requests
                .find(request_id)
                .select(issue_requests::status)
                .for_update()
                .get_result(conn)?;
            let current = Status::from_str(&current)?;

            let Some(new_status) = current.submit() else {
                return Err(Error::IssueRequestNotDraft);
            };

            diesel::update(issue_requests::issue_requests.find(request_id))
                .set((
                    issue_requests::status.eq(new_status.as_str()),
                    issue_requests::updated_at.eq(chrono::Utc::now().naive_utc()),
                ))
                .execute(conn)?;

            notifier.dispatch(Event::IssueRequestStatusChanged {
                device_name,
                owner: (&owner).into(),
                old_status: current,
                new_status,
            })?;

            Ok(new_status)
        })
    })
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": new_status })))
}
