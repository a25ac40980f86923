use actix_web::{delete, web, HttpResponse, Responder};
use diesel::prelude::*;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    AppState,
};

use super::get_device_for_user;

/// Delete a device. Documents and issue requests attached to it go with it
/// via the cascade on their foreign keys.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 200, description = "Device was deleted"),
        (status = 401, description = "Device does not belong to the caller")
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
    let device_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    get_device_for_user(&state, device_id, user.id, user.is_admin).await?;

    let mut conn = get_connection(&state)?;
    web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        match diesel::delete(devices::devices.find(device_id)).execute(&mut conn) {
            Ok(_) => Ok(()),
            Err(err) => {
                log::error!("Failed to delete device {device_id}: {err}");
                Err(Error::InternalError)
            }
        }
    })
    .await?;

    Ok(HttpResponse::Ok().finish())
}
