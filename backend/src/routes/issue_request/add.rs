use actix_web::{post, web, HttpResponse, Responder};
use actix_web_validator::Json;
use chrono::NaiveDate;
use db_connector::models::{devices::Device, issue_requests::IssueRequest};
use diesel::{prelude::*, result::Error::NotFound};
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

use super::IssueRequestResponse;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, ToSchema)]
#[validate(schema(function = validate_add_issue_request_schema))]
pub struct AddIssueRequestSchema {
    pub device_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 255))]
    pub period_of_production: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub production_amount: f64,
    #[validate(length(min = 1, max = 255))]
    pub recipient_account: String,
    pub notes: Option<String>,
}

fn validate_add_issue_request_schema(
    schema: &AddIssueRequestSchema,
) -> Result<(), ValidationError> {
    if schema.end_date <= schema.start_date {
        let mut err = ValidationError::new("end_date");
        err.message = Some("End date must be after start date".into());
        return Err(err);
    }

    Ok(())
}

/// File an issue request for certificates produced by an owned device. The
/// request starts in `draft`; admins are notified about the new filing.
#[utoipa::path(
    context_path = "/issue_request",
    request_body = AddIssueRequestSchema,
    responses(
        (status = 201, description = "Issue request was created", body = IssueRequestResponse),
        (status = 400, description = "Validation failed or device is not owned by the caller")
    ),
    security(("jwt" = []))
)]
#[post("/add")]
pub async fn add(
    state: web::Data<AppState>,
    data: Json<AddIssueRequestSchema>,
    uid: crate::models::uuid::Uuid,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let user = get_user(&state, uid.into()).await?;

    let data = data.into_inner();
    let device_id = parse_uuid(&data.device_id)?;

    // Filing against someone else's device is a validation error, not an
    // authorization one: the caller knows the device exists.
    let mut conn = get_connection(&state)?;
    let owner_id = user.id;
    let device = web_block_unpacked(move || {
        use db_connector::schema::devices::dsl as devices;

        match devices::devices
            .find(device_id)
            .filter(devices::user_id.eq(owner_id))
            .select(Device::as_select())
            .get_result(&mut conn)
        {
            Ok(device) => Ok(device),
            Err(NotFound) => Err(Error::DeviceNotOwned),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    let now = chrono::Utc::now().naive_utc();
    let request = IssueRequest {
        id: uuid::Uuid::new_v4(),
        device_id,
        user_id: user.id,
        status: Status::Draft.as_str().to_string(),
        start_date: data.start_date,
        end_date: data.end_date,
        period_of_production: data.period_of_production,
        production_amount: round6(data.production_amount),
        recipient_account: data.recipient_account,
        notes: data.notes,
        upload_file: None,
        created_at: now,
        updated_at: now,
    };

    let mut conn = get_connection(&state)?;
    let notifier = state.notifier.clone();
    let request_cpy = request.clone();
    let device_name = device.device_name.clone();
    let request = web_block_unpacked(move || {
        use db_connector::schema::issue_requests::dsl::*;

        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(issue_requests)
                .values(&request_cpy)
                .execute(conn)?;

            notifier.dispatch(Event::IssueRequestCreated {
                device_name,
                owner: (&user).into(),
            })?;

            Ok(request_cpy)
        })
    })
    .await?;

    Ok(HttpResponse::Created().json(IssueRequestResponse::new(request, device.device_name)))
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
        routes::device::add::tests::{add_test_device, delete_test_devices},
        tests::configure,
    };
    use actix_web::{cookie::Cookie, test, App};

    pub fn test_issue_request_schema(device_id: &str) -> AddIssueRequestSchema {
        AddIssueRequestSchema {
            device_id: device_id.to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            period_of_production: Some("Q1 2024".to_string()),
            production_amount: 1500.0,
            recipient_account: "ACC-001".to_string(),
            notes: None,
        }
    }

    pub async fn add_test_issue_request(token: &str, device_id: &str) -> IssueRequestResponse {
        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token.to_string()))
            .set_json(test_issue_request_schema(device_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        test::read_body_json(resp).await
    }

    pub fn delete_test_issue_requests(mail: &str) {
        use db_connector::schema::issue_requests::dsl as issue_requests;
        use db_connector::schema::users::dsl as users;

        let pool = db_connector::test_connection_pool();
        let mut conn = pool.get().unwrap();
        let uid: uuid::Uuid = users::users
            .filter(users::email.eq(mail.to_lowercase()))
            .select(users::id)
            .get_result(&mut conn)
            .unwrap();
        diesel::delete(issue_requests::issue_requests.filter(issue_requests::user_id.eq(uid)))
            .execute(&mut conn)
            .expect("Error deleting test issue requests");
    }

    #[actix_web::test]
    async fn test_add_issue_request() {
        let mail = "issue_request_add@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;
        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));
        defer!(delete_test_issue_requests(mail));

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token))
            .set_json(test_issue_request_schema(&device.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let request: IssueRequestResponse = test::read_body_json(resp).await;
        assert_eq!(request.status, "draft");
        assert_eq!(request.device_name, "Test Plant");
    }

    #[actix_web::test]
    async fn test_end_date_must_be_after_start_date() {
        let mail = "issue_request_dates@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;
        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let mut schema = test_issue_request_schema(&device.id);
        schema.end_date = schema.start_date;
        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token))
            .set_json(schema)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_foreign_device_is_rejected() {
        let owner_mail = "issue_request_owner@test.invalid";
        let other_mail = "issue_request_other@test.invalid";
        create_user(owner_mail).await;
        defer!(delete_test_user(owner_mail));
        create_user(other_mail).await;
        defer!(delete_test_user(other_mail));

        let owner_token = login_user(owner_mail).await;
        let device = add_test_device(&owner_token).await;
        defer!(delete_test_devices(owner_mail));

        let other_token = login_user(other_mail).await;

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", other_token))
            .set_json(test_issue_request_schema(&device.id))
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_zero_production_amount_is_rejected() {
        let mail = "issue_request_amount@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;
        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add);
        let app = test::init_service(app).await;

        let mut schema = test_issue_request_schema(&device.id);
        schema.production_amount = 0.0;
        let req = test::TestRequest::post()
            .uri("/add")
            .cookie(Cookie::new("access_token", token))
            .set_json(schema)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
