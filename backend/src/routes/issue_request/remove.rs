use actix_web::{delete, web, HttpResponse, Responder};
use diesel::prelude::*;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    AppState,
};

use super::get_issue_request_for_user;

/// Delete an issue request.
#[utoipa::path(
    context_path = "/issue_request",
    responses(
        (status = 200, description = "Issue request was deleted"),
        (status = 401, description = "Issue request does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[delete("/{id}")]
pub async fn remove(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let request_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    get_issue_request_for_user(&state, request_id, user.id, user.is_admin).await?;

    let mut conn = get_connection(&state)?;
    web_block_unpacked(move || {
        use db_connector::schema::issue_requests::dsl as issue_requests;

        match diesel::delete(issue_requests::issue_requests.find(request_id)).execute(&mut conn) {
            Ok(_) => Ok(()),
            Err(err) => {
                log::error!("Failed to delete issue request {request_id}: {err}");
                Err(Error::InternalError)
            }
        }
    })
    .await?;

    Ok(HttpResponse::Ok().finish())
}
