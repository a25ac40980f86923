use std::str::FromStr;

use actix_web::{error::ErrorBadRequest, patch, web, HttpResponse, Responder};
use actix_web_validator::Json;
use chrono::NaiveDate;
use db_connector::models::devices::Device;
use diesel::{prelude::*, AsChangeset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    notify::Event,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    workflow::Status,
    AppState,
};

use super::{
    get_device_for_user, round6, validate_device_fields, DeviceFields, DeviceResponse,
};

/// Partial update. Absent fields keep their persisted value. `status` and
/// `rejection_reason` are only writable by administrators.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDeviceSchema {
    #[validate(length(min = 1, max = 255))]
    pub device_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub issuer_organisation: Option<String>,
    pub default_account_code: Option<String>,
    pub fuel_type: Option<String>,
    pub technology_type: Option<String>,
    #[validate(range(min = 0.000001))]
    pub capacity: Option<f64>,
    pub commissioning_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postcode: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub public_funding: Option<String>,
    pub funding_end_date: Option<NaiveDate>,
    pub onsite_consumer: Option<String>,
    pub onsite_consumer_details: Option<String>,
    pub auxiliary_energy: Option<String>,
    pub auxiliary_energy_details: Option<String>,
    pub additional_notes: Option<String>,
    pub status: Option<Status>,
    pub rejection_reason: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = db_connector::schema::devices)]
struct DeviceChangeset {
    device_name: Option<String>,
    issuer_organisation: Option<String>,
    default_account_code: Option<String>,
    fuel_type: Option<String>,
    technology_type: Option<String>,
    capacity: Option<f64>,
    commissioning_date: Option<NaiveDate>,
    effective_date: Option<NaiveDate>,
    address: Option<String>,
    country: Option<String>,
    postcode: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    public_funding: Option<String>,
    funding_end_date: Option<NaiveDate>,
    onsite_consumer: Option<String>,
    onsite_consumer_details: Option<String>,
    auxiliary_energy: Option<String>,
    auxiliary_energy_details: Option<String>,
    additional_notes: Option<String>,
    status: Option<String>,
    rejection_reason: Option<String>,
    updated_at: chrono::NaiveDateTime,
}

/// Update a device. The cross-field rules are checked against the merged
/// view of the request and the persisted row, so a partial update cannot
/// leave an invalid combination behind. A status change dispatched by an
/// administrator notifies the device owner.
#[utoipa::path(
    context_path = "/device",
    request_body = UpdateDeviceSchema,
    responses(
        (status = 200, description = "Device was updated", body = DeviceResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Device does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[patch("/{id}")]
pub async fn update(
    state: web::Data<AppState>,
    data: Json<UpdateDeviceSchema>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let device_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    let device = get_device_for_user(&state, device_id, user.id, user.is_admin).await?;

    let data = data.into_inner();
    if !user.is_admin && (data.status.is_some() || data.rejection_reason.is_some()) {
        return Err(Error::StatusIsReadOnly.into());
    }
    if data.rejection_reason.is_some() && data.status != Some(Status::Rejected) {
        let mut err = ValidationError::new("rejection_reason");
        err.message = Some("A rejection reason requires the rejected status".into());
        return Err(ErrorBadRequest(err));
    }

    let merged = DeviceFields {
        fuel_type: data.fuel_type.as_deref().unwrap_or(&device.fuel_type),
        technology_type: data
            .technology_type
            .as_deref()
            .unwrap_or(&device.technology_type),
        commissioning_date: data.commissioning_date.unwrap_or(device.commissioning_date),
        effective_date: data.effective_date.unwrap_or(device.effective_date),
        public_funding: data
            .public_funding
            .as_deref()
            .or(device.public_funding.as_deref()),
        funding_end_date: data.funding_end_date.or(device.funding_end_date),
        onsite_consumer: data
            .onsite_consumer
            .as_deref()
            .or(device.onsite_consumer.as_deref()),
        onsite_consumer_details: data
            .onsite_consumer_details
            .as_deref()
            .or(device.onsite_consumer_details.as_deref()),
        auxiliary_energy: data
            .auxiliary_energy
            .as_deref()
            .or(device.auxiliary_energy.as_deref()),
        auxiliary_energy_details: data
            .auxiliary_energy_details
            .as_deref()
            .or(device.auxiliary_energy_details.as_deref()),
    };
    validate_device_fields(&merged).map_err(ErrorBadRequest)?;

    let requested_status = data.status;
    let changeset = DeviceChangeset {
        device_name: data.device_name,
        issuer_organisation: data.issuer_organisation,
        default_account_code: data.default_account_code,
        fuel_type: data.fuel_type,
        technology_type: data.technology_type,
        capacity: data.capacity.map(round6),
        commissioning_date: data.commissioning_date,
        effective_date: data.effective_date,
        address: data.address,
        country: data.country,
        postcode: data.postcode,
        latitude: data.latitude.map(round6),
        longitude: data.longitude.map(round6),
        public_funding: data.public_funding,
        funding_end_date: data.funding_end_date,
        onsite_consumer: data.onsite_consumer,
        onsite_consumer_details: data.onsite_consumer_details,
        auxiliary_energy: data.auxiliary_energy,
        auxiliary_energy_details: data.auxiliary_energy_details,
        additional_notes: data.additional_notes,
        status: requested_status.map(|s| s.as_str().to_string()),
        rejection_reason: data.rejection_reason,
        updated_at: chrono::Utc::now().naive_utc(),
    };

    let owner = get_user(&state, device.user_id).await?;
    let mut conn = get_connection(&state)?;
    let notifier = state.notifier.clone();
    let device = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        conn.transaction::<_, Error, _>(|conn| {
            let current: String = devices::devices
                .find(device_id)
                .select(devices::status)
                .for_update()
                .get_result(conn)?;
            let current = Status::from_str(&current)?;

            diesel::update(devices::devices.find(device_id))
                .set(&changeset)
                .execute(conn)?;

            let updated: Device = devices::devices
                .find(device_id)
                .select(Device::as_select())
                .get_result(conn)?;

            // Enqueue last: nothing is queued if any statement fails.
            if let Some(new_status) = requested_status {
                if new_status != current {
                    notifier.dispatch(Event::DeviceStatusChanged {
                        device_name: device.device_name.clone(),
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

    Ok(HttpResponse::Ok().json(DeviceResponse::from(device)))
}
