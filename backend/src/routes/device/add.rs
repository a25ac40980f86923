use actix_web::{post, web, HttpResponse, Responder};
use actix_web_validator::Json;
use chrono::NaiveDate;
use db_connector::models::devices::Device;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    notify::Event,
    utils::{get_connection, get_user, web_block_unpacked},
    workflow::Status,
    AppState,
};

use super::{round6, validate_device_fields, DeviceFields, DeviceResponse};

#[derive(Debug, Serialize, Deserialize, Validate, Clone, ToSchema)]
#[validate(schema(function = validate_add_device_schema))]
pub struct AddDeviceSchema {
    #[validate(length(min = 1, max = 255))]
    pub device_name: String,
    #[validate(length(min = 1, max = 255))]
    pub issuer_organisation: String,
    pub default_account_code: Option<String>,
    pub fuel_type: String,
    pub technology_type: String,
    #[validate(range(min = 0.000001))]
    pub capacity: f64,
    pub commissioning_date: NaiveDate,
    pub effective_date: NaiveDate,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1, max = 20))]
    pub postcode: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub public_funding: Option<String>,
    pub funding_end_date: Option<NaiveDate>,
    pub onsite_consumer: Option<String>,
    pub onsite_consumer_details: Option<String>,
    pub auxiliary_energy: Option<String>,
    pub auxiliary_energy_details: Option<String>,
    pub additional_notes: Option<String>,
}

fn validate_add_device_schema(schema: &AddDeviceSchema) -> Result<(), ValidationError> {
    validate_device_fields(&DeviceFields {
        fuel_type: &schema.fuel_type,
        technology_type: &schema.technology_type,
        commissioning_date: schema.commissioning_date,
        effective_date: schema.effective_date,
        public_funding: schema.public_funding.as_deref(),
        funding_end_date: schema.funding_end_date,
        onsite_consumer: schema.onsite_consumer.as_deref(),
        onsite_consumer_details: schema.onsite_consumer_details.as_deref(),
        auxiliary_energy: schema.auxiliary_energy.as_deref(),
        auxiliary_energy_details: schema.auxiliary_energy_details.as_deref(),
    })
}

/// Register a new device. The device always starts in `draft`; admins are
/// notified about the new registration.
#[utoipa::path(
    context_path = "/device",
    request_body = AddDeviceSchema,
    responses(
        (status = 201, description = "Device was created", body = DeviceResponse),
        (status = 400, description = "Validation failed")
    ),
    security(("jwt" = []))
)]
#[post("/add")]
pub async fn add(
    state: web::Data<AppState>,
    data: Json<AddDeviceSchema>,
    uid: crate::models::uuid::Uuid,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let user = get_user(&state, uid.into()).await?;

    let data = data.into_inner();
    let now = chrono::Utc::now().naive_utc();
    let device = Device {
        id: uuid::Uuid::new_v4(),
        user_id: user.id,
        status: Status::Draft.as_str().to_string(),
        device_name: data.device_name,
        issuer_organisation: data.issuer_organisation,
        default_account_code: data.default_account_code,
        fuel_type: data.fuel_type,
        technology_type: data.technology_type,
        capacity: round6(data.capacity),
        commissioning_date: data.commissioning_date,
        effective_date: data.effective_date,
        address: data.address,
        country: data.country,
        postcode: data.postcode,
        latitude: round6(data.latitude),
        longitude: round6(data.longitude),
        public_funding: data.public_funding,
        funding_end_date: data.funding_end_date,
        onsite_consumer: data.onsite_consumer,
        onsite_consumer_details: data.onsite_consumer_details,
        auxiliary_energy: data.auxiliary_energy,
        auxiliary_energy_details: data.auxiliary_energy_details,
        additional_notes: data.additional_notes,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    };

    let mut conn = get_connection(&state)?;
    let notifier = state.notifier.clone();
    let device_cpy = device.clone();
    let device = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl::*;

        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(devices).values(&device_cpy).execute(conn)?;

            notifier.dispatch(Event::DeviceCreated {
                device_name: device_cpy.device_name.clone(),
                owner: (&user).into(),
            })?;

            Ok(device_cpy)
        })
    })
    .await?;

    Ok(HttpResponse::Created().json(DeviceResponse::from(device)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        defer,
        middleware::jwt::JwtMiddleware,
        routes::auth::{
            login::tests::login_user,
            register::tests::{create_user, delete_test_user},
        },
        tests::configure,
    };
    use actix_web::{cookie::Cookie, test, App};

    pub fn test_device_schema() -> AddDeviceSchema {
        AddDeviceSchema {
            device_name: "Test Plant".to_string(),
            issuer_organisation: "Test Org".to_string(),
            default_account_code: None,
            fuel_type: "ES100".to_string(),
            technology_type: "TC110".to_string(),
            capacity: 12.5,
            commissioning_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            effective_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            address: "1 Test Street".to_string(),
            country: "Zimbabwe".to_string(),
            postcode: "000000".to_string(),
            latitude: -17.829123,
            longitude: 31.053028,
            public_funding: None,
            funding_end_date: None,
            onsite_consumer: None,
            onsite_consumer_details: None,
            auxiliary_energy: None,
            auxiliary_energy_details: None,
            additional_notes: None,
        }
    }

    pub async fn add_test_device(token: &str) -> DeviceResponse {
        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token.to_string()))
            .set_json(test_device_schema())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        test::read_body_json(resp).await
    }

    pub fn delete_test_devices(mail: &str) {
        use db_connector::schema::devices::dsl as devices;
        use db_connector::schema::users::dsl as users;

        let pool = db_connector::test_connection_pool();
        let mut conn = pool.get().unwrap();
        let uid: uuid::Uuid = users::users
            .filter(users::email.eq(mail.to_lowercase()))
            .select(users::id)
            .get_result(&mut conn)
            .unwrap();
        diesel::delete(devices::devices.filter(devices::user_id.eq(uid)))
            .execute(&mut conn)
            .expect("Error deleting test devices");
    }

    #[actix_web::test]
    async fn test_add_valid_device() {
        let mail = "device_add@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;

        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));
        assert_eq!(device.status, "draft");
        assert_eq!(device.device_name, "Test Plant");
    }

    #[actix_web::test]
    async fn test_add_rejects_invalid_technology() {
        let mail = "device_add_invalid_tech@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        // TC210 is a wind technology, not valid for solar
        let mut schema = test_device_schema();
        schema.technology_type = "TC210".to_string();
        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token))
            .set_json(schema)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_add_rejects_effective_before_commissioning() {
        let mail = "device_add_bad_dates@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let mut schema = test_device_schema();
        schema.effective_date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token))
            .set_json(schema)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_add_rejects_out_of_bounds_latitude() {
        let mail = "device_add_bad_lat@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let mut schema = test_device_schema();
        schema.latitude = 91.0;
        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token))
            .set_json(schema)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_add_requires_auth() {
        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let req = test::TestRequest::post()
            .uri("/add")
            .set_json(test_device_schema())
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
