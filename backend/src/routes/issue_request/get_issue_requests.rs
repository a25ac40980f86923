use actix_web::{get, web, HttpResponse, Responder};
use db_connector::models::issue_requests::IssueRequest;
use diesel::prelude::*;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    AppState,
};

use super::{get_issue_request_for_user, IssueRequestResponse};

/// List issue requests with their device names. Users see their own
/// requests, admins see all of them.
#[utoipa::path(
    context_path = "/issue_request",
    responses(
        (status = 200, description = "Success", body = [IssueRequestResponse])
    ),
    security(("jwt" = []))
)]
#[get("/get_issue_requests")]
pub async fn get_issue_requests(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let user = get_user(&state, uid.into()).await?;

    let mut conn = get_connection(&state)?;
    let requests: Vec<(IssueRequest, String)> = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;
        use db_connector::schema::issue_requests::dsl as issue_requests;

        let mut query = issue_requests::issue_requests
            .inner_join(devices::devices)
            .order(issue_requests::created_at.desc())
            .into_boxed();
        if !user.is_admin {
            query = query.filter(issue_requests::user_id.eq(user.id));
        }

        match query
            .select((IssueRequest::as_select(), devices::device_name))
            .load(&mut conn)
        {
            Ok(requests) => Ok(requests),
            Err(err) => {
                log::error!("Failed to load issue requests: {err}");
                Err(Error::InternalError)
            }
        }
    })
    .await?;

    let requests: Vec<IssueRequestResponse> = requests
        .into_iter()
        .map(|(request, device_name)| IssueRequestResponse::new(request, device_name))
        .collect();

    Ok(HttpResponse::Ok().json(requests))
}

/// Get a single issue request.
#[utoipa::path(
    context_path = "/issue_request",
    responses(
        (status = 200, description = "Success", body = IssueRequestResponse),
        (status = 401, description = "Issue request does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[get("/{id}")]
pub async fn get_issue_request(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let request_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    let request = get_issue_request_for_user(&state, request_id, user.id, user.is_admin).await?;

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

    Ok(HttpResponse::Ok().json(IssueRequestResponse::new(request, device_name)))
}
