use actix_web::{post, web, HttpResponse, Responder};
use actix_web_validator::Json;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use db_connector::models::{profiles::Profile, users::User};
use diesel::prelude::*;

use crate::{
    error::Error,
    models::register::RegisterSchema,
    notify::Event,
    utils::{get_connection, web_block_unpacked},
    AppState,
};

pub fn hash_pass(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(err) => {
            log::error!("Failed to hash password: {err}");
            Err(Error::InternalError)
        }
    }
}

/// Register a new user. The profile is created in the same transaction; a
/// "user created" notification is enqueued before the transaction commits.
#[utoipa::path(
    context_path = "/auth",
    request_body = RegisterSchema,
    responses(
        (status = 201, description = "Registration was successful"),
        (status = 409, description = "A user with this name or email already exists")
    )
)]
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    data: Json<RegisterSchema>,
) -> actix_web::Result<impl Responder> {
    let user_mail = data.email.to_lowercase();
    let user_name = data.name.clone();

    let mut conn = get_connection(&state)?;
    let mail_cpy = user_mail.clone();
    let name_cpy = user_name.clone();
    let existing: i64 = web_block_unpacked(move || {
        use db_connector::schema::users::dsl::*;

        match users
            .filter(email.eq(&mail_cpy).or(name.eq(&name_cpy)))
            .count()
            .get_result(&mut conn)
        {
            Ok(count) => Ok(count),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    if existing != 0 {
        return Err(Error::UserAlreadyExists.into());
    }

    let password_hash = hash_pass(&data.password)?;
    let now = chrono::Utc::now().naive_utc();
    let user = User {
        id: uuid::Uuid::new_v4(),
        name: user_name,
        email: user_mail,
        password: password_hash,
        is_active: true,
        is_admin: false,
        created_at: now,
    };
    let profile = Profile {
        id: uuid::Uuid::new_v4(),
        user_id: user.id,
        first_name: String::new(),
        last_name: String::new(),
        profile_picture: None,
        created_at: now,
        updated_at: now,
    };

    let mut conn = get_connection(&state)?;
    let notifier = state.notifier.clone();
    web_block_unpacked(move || {
        use db_connector::schema::profiles::dsl as profiles;
        use db_connector::schema::users::dsl as users;

        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(users::users).values(&user).execute(conn)?;
            diesel::insert_into(profiles::profiles)
                .values(&profile)
                .execute(conn)?;

            // Enqueue failure aborts the registration.
            notifier.dispatch(Event::UserCreated {
                user: (&user).into(),
            })?;

            Ok(())
        })
    })
    .await?;

    Ok(HttpResponse::Created())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{defer, tests::configure};
    use actix_web::{http::header::ContentType, test, App};

    pub async fn create_user(mail: &str) {
        let app = App::new().configure(configure).service(register);
        let app = test::init_service(app).await;
        let user = RegisterSchema {
            name: mail.to_string(),
            email: mail.to_string(),
            password: "TestTestTest".to_string(),
        };
        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .set_json(user)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    pub fn delete_test_user(mail: &str) {
        use db_connector::schema::users::dsl::*;
        let pool = db_connector::test_connection_pool();
        let mut conn = pool.get().unwrap();
        diesel::delete(users.filter(email.eq(mail.to_lowercase())))
            .execute(&mut conn)
            .expect("Error deleting test user");
    }

    pub fn make_test_admin(mail: &str) {
        use db_connector::schema::users::dsl::*;
        let pool = db_connector::test_connection_pool();
        let mut conn = pool.get().unwrap();
        diesel::update(users.filter(email.eq(mail.to_lowercase())))
            .set(is_admin.eq(true))
            .execute(&mut conn)
            .expect("Error promoting test user");
    }

    #[actix_web::test]
    async fn test_no_data() {
        let app = App::new().configure(configure).service(register);
        let app = test::init_service(app).await;
        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }

    #[actix_web::test]
    async fn test_short_password() {
        let app = App::new().configure(configure).service(register);
        let app = test::init_service(app).await;
        let user = RegisterSchema {
            name: "Test".to_string(),
            email: "Test@test.invalid".to_string(),
            password: "Test".to_string(),
        };
        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .set_json(user)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }

    #[actix_web::test]
    async fn test_invalid_email() {
        let app = App::new().configure(configure).service(register);
        let app = test::init_service(app).await;
        let user = RegisterSchema {
            name: "Test".to_string(),
            email: "Testtest.invalid".to_string(),
            password: "TestTestTest".to_string(),
        };
        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .set_json(user)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }

    #[actix_web::test]
    async fn test_valid_request() {
        let mail = "register_valid@test.invalid";
        let app = App::new().configure(configure).service(register);
        let app = test::init_service(app).await;
        let user = RegisterSchema {
            name: mail.to_string(),
            email: mail.to_string(),
            password: "TestTestTest".to_string(),
        };
        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .set_json(user)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        delete_test_user(mail);
    }

    #[actix_web::test]
    async fn test_registration_creates_profile() {
        use db_connector::schema::profiles::dsl as profiles;
        use db_connector::schema::users::dsl as users;

        let mail = "register_profile@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));

        let pool = db_connector::test_connection_pool();
        let mut conn = pool.get().unwrap();
        let uid: uuid::Uuid = users::users
            .filter(users::email.eq(mail))
            .select(users::id)
            .get_result(&mut conn)
            .unwrap();
        let count: i64 = profiles::profiles
            .filter(profiles::user_id.eq(uid))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn test_existing_user() {
        let mail = "register_existing@test.invalid";
        let app = App::new().configure(configure).service(register);
        let app = test::init_service(app).await;
        let user = RegisterSchema {
            name: mail.to_string(),
            email: mail.to_string(),
            password: "TestTestTest".to_string(),
        };
        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .set_json(user.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        defer!(delete_test_user(mail));

        let req = test::TestRequest::post()
            .uri("/register")
            .insert_header(ContentType::json())
            .set_json(user)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 409);
    }
}
