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

use super::get_device_for_user;

/// Submit a device for admin review. Legal only while the device is in
/// `draft`. The persisted status is re-read inside the transaction so a
/// concurrent update cannot slip a second submit through.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 200, description = "Device was submitted"),
        (status = 400, description = "Device is not in draft"),
        (status = 401, description = "Device does not belong to the caller")
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
    let device_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    let device = get_device_for_user(&state, device_id, user.id, user.is_admin).await?;
    let owner = get_user(&state, device.user_id).await?;

    let mut conn = get_connection(&state)?;
    let notifier = state.notifier.clone();
    let new_status = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        conn.transaction::<_, Error, _>(|conn| {
            let current: String = devices::devices
                .find(device_id)
                .select(devices::status)
                .for_update()
                .get_result(conn)?;
            let current = Status::from_str(&current)?;

            let Some(new_status) = current.submit() else {
                return Err(Error::DeviceNotDraft);
            };

            diesel::update(devices::devices.find(device_id))
                .set((
                    devices::status.eq(new_status.as_str()),
                    devices::updated_at.eq(chrono::Utc::now().naive_utc()),
                ))
                .execute(conn)?;

            notifier.dispatch(Event::DeviceStatusChanged {
                device_name: device.device_name.clone(),
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
