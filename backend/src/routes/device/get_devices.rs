use actix_web::{get, web, HttpResponse, Responder};
use db_connector::models::devices::Device;
use diesel::prelude::*;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    AppState,
};

use super::{get_device_for_user, DeviceResponse};

/// List devices. Users see their own devices, admins see all of them.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 200, description = "Success", body = [DeviceResponse])
    ),
    security(("jwt" = []))
)]
#[get("/get_devices")]
pub async fn get_devices(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let user = get_user(&state, uid.into()).await?;

    let mut conn = get_connection(&state)?;
    let devices: Vec<Device> = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        let mut query = devices::devices
            .order(devices::created_at.desc())
            .into_boxed();
        if !user.is_admin {
            query = query.filter(devices::user_id.eq(user.id));
        }

        match query.select(Device::as_select()).load(&mut conn) {
            Ok(devices) => Ok(devices),
            Err(err) => {
                log::error!("Failed to load devices: {err}");
                Err(Error::InternalError)
            }
        }
    })
    .await?;

    let devices: Vec<DeviceResponse> = devices.into_iter().map(DeviceResponse::from).collect();

    Ok(HttpResponse::Ok().json(devices))
}

/// Get a single device.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 200, description = "Success", body = DeviceResponse),
        (status = 401, description = "Device does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[get("/{id}")]
pub async fn get_device(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let device_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    let device = get_device_for_user(&state, device_id, user.id, user.is_admin).await?;

    Ok(HttpResponse::Ok().json(DeviceResponse::from(device)))
}
