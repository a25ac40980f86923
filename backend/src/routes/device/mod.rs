pub mod add;
pub mod documents;
pub mod get_devices;
pub mod options;
pub mod remove;
pub mod submit;
pub mod update;

use actix_web::web;
use chrono::NaiveDate;
use db_connector::models::devices::Device;
use diesel::{prelude::*, result::Error::NotFound};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationError;

use crate::{
    catalog,
    error::Error,
    utils::{get_connection, web_block_unpacked},
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/device")
            .service(options::fuel_options)
            .service(options::technology_options)
            .service(add::add)
            .service(get_devices::get_devices)
            .service(documents::add_document)
            .service(documents::get_documents)
            .service(submit::submit)
            .service(get_devices::get_device)
            .service(update::update)
            .service(remove::remove),
    );
}

/// Client-facing device representation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponse {
    pub id: String,
    pub status: String,
    pub device_name: String,
    pub issuer_organisation: String,
    pub default_account_code: Option<String>,
    pub fuel_type: String,
    pub technology_type: String,
    pub capacity: f64,
    pub commissioning_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub address: String,
    pub country: String,
    pub postcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub public_funding: Option<String>,
    pub funding_end_date: Option<NaiveDate>,
    pub onsite_consumer: Option<String>,
    pub onsite_consumer_details: Option<String>,
    pub auxiliary_energy: Option<String>,
    pub auxiliary_energy_details: Option<String>,
    pub additional_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        DeviceResponse {
            id: device.id.to_string(),
            status: device.status,
            device_name: device.device_name,
            issuer_organisation: device.issuer_organisation,
            default_account_code: device.default_account_code,
            fuel_type: device.fuel_type,
            technology_type: device.technology_type,
            capacity: device.capacity,
            commissioning_date: device.commissioning_date,
            effective_date: device.effective_date,
            address: device.address,
            country: device.country,
            postcode: device.postcode,
            latitude: device.latitude,
            longitude: device.longitude,
            public_funding: device.public_funding,
            funding_end_date: device.funding_end_date,
            onsite_consumer: device.onsite_consumer,
            onsite_consumer_details: device.onsite_consumer_details,
            auxiliary_energy: device.auxiliary_energy,
            auxiliary_energy_details: device.auxiliary_energy_details,
            additional_notes: device.additional_notes,
            rejection_reason: device.rejection_reason,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

/// Load a device as a given principal. Non-owners get a uniform
/// `Unauthorized` so existence is not leaked; admins see everything.
pub(crate) async fn get_device_for_user(
    state: &web::Data<AppState>,
    device_id: uuid::Uuid,
    uid: uuid::Uuid,
    is_admin: bool,
) -> actix_web::Result<Device> {
    let mut conn = get_connection(state)?;
    let device = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        let mut query = devices::devices.find(device_id).into_boxed();
        if !is_admin {
            query = query.filter(devices::user_id.eq(uid));
        }

        match query.select(Device::as_select()).get_result(&mut conn) {
            Ok(device) => Ok(device),
            Err(NotFound) => Err(Error::Unauthorized),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    Ok(device)
}

/// Coordinates and amounts are stored with six-digit fractional precision.
pub(crate) fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn schema_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// View over the cross-validated device fields, assembled from the request
/// payload on create and from payload-over-persisted values on update.
pub(crate) struct DeviceFields<'a> {
    pub fuel_type: &'a str,
    pub technology_type: &'a str,
    pub commissioning_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub public_funding: Option<&'a str>,
    pub funding_end_date: Option<NaiveDate>,
    pub onsite_consumer: Option<&'a str>,
    pub onsite_consumer_details: Option<&'a str>,
    pub auxiliary_energy: Option<&'a str>,
    pub auxiliary_energy_details: Option<&'a str>,
}

pub(crate) fn validate_device_fields(fields: &DeviceFields) -> Result<(), ValidationError> {
    if !catalog::is_valid_combination(fields.fuel_type, fields.technology_type) {
        return Err(schema_error(
            "technology_type",
            "Invalid technology for selected fuel type",
        ));
    }

    if fields.effective_date < fields.commissioning_date {
        return Err(schema_error(
            "effective_date",
            "Effective date must be after commissioning date",
        ));
    }

    if matches!(fields.public_funding, Some("Investment") | Some("Production"))
        && fields.funding_end_date.is_none()
    {
        return Err(schema_error(
            "funding_end_date",
            "Funding end date is required for public funding",
        ));
    }

    if fields.onsite_consumer == Some("Yes")
        && fields.onsite_consumer_details.map_or(true, str::is_empty)
    {
        return Err(schema_error(
            "onsite_consumer_details",
            "Details are required for onsite consumers",
        ));
    }

    if fields.auxiliary_energy == Some("Yes")
        && fields.auxiliary_energy_details.map_or(true, str::is_empty)
    {
        return Err(schema_error(
            "auxiliary_energy_details",
            "Details are required for auxiliary energy sources",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fields() -> DeviceFields<'static> {
        DeviceFields {
            fuel_type: "ES100",
            technology_type: "TC110",
            commissioning_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            effective_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            public_funding: None,
            funding_end_date: None,
            onsite_consumer: None,
            onsite_consumer_details: None,
            auxiliary_energy: None,
            auxiliary_energy_details: None,
        }
    }

    #[test]
    fn accepts_valid_fields() {
        assert!(validate_device_fields(&valid_fields()).is_ok());
    }

    #[test]
    fn rejects_wind_technology_on_solar_fuel() {
        let mut fields = valid_fields();
        fields.technology_type = "TC210";
        let err = validate_device_fields(&fields).unwrap_err();
        assert_eq!(err.code, "technology_type");
    }

    #[test]
    fn rejects_effective_date_before_commissioning() {
        let mut fields = valid_fields();
        fields.effective_date = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        let err = validate_device_fields(&fields).unwrap_err();
        assert_eq!(err.code, "effective_date");
    }

    #[test]
    fn equal_dates_are_allowed() {
        let mut fields = valid_fields();
        fields.effective_date = fields.commissioning_date;
        assert!(validate_device_fields(&fields).is_ok());
    }

    #[test]
    fn public_funding_requires_end_date() {
        let mut fields = valid_fields();
        fields.public_funding = Some("Investment");
        let err = validate_device_fields(&fields).unwrap_err();
        assert_eq!(err.code, "funding_end_date");

        fields.funding_end_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        assert!(validate_device_fields(&fields).is_ok());

        fields.public_funding = Some("None");
        fields.funding_end_date = None;
        assert!(validate_device_fields(&fields).is_ok());
    }

    #[test]
    fn onsite_consumer_requires_details() {
        let mut fields = valid_fields();
        fields.onsite_consumer = Some("Yes");
        let err = validate_device_fields(&fields).unwrap_err();
        assert_eq!(err.code, "onsite_consumer_details");

        fields.onsite_consumer_details = Some("Adjacent factory");
        assert!(validate_device_fields(&fields).is_ok());

        fields.onsite_consumer = Some("No");
        fields.onsite_consumer_details = None;
        assert!(validate_device_fields(&fields).is_ok());
    }

    #[test]
    fn auxiliary_energy_requires_details() {
        let mut fields = valid_fields();
        fields.auxiliary_energy = Some("Yes");
        fields.auxiliary_energy_details = Some("");
        let err = validate_device_fields(&fields).unwrap_err();
        assert_eq!(err.code, "auxiliary_energy_details");
    }

    #[test]
    fn rounding_keeps_six_fractional_digits() {
        assert_eq!(round6(1.23456789), 1.234568);
        assert_eq!(round6(-17.8291234999), -17.829123);
        assert_eq!(round6(90.0), 90.0);
    }
}
