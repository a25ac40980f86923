use actix_web::{cookie::Cookie, post, web, HttpResponse, Responder};
use actix_web_validator::Json;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{Duration, Utc};
use db_connector::models::users::User;
use diesel::{prelude::*, result::Error::NotFound};

use crate::{
    error::Error,
    models::{filtered_user::FilteredUser, login::LoginSchema, token_claims::TokenClaims},
    utils::{get_connection, web_block_unpacked},
    AppState,
};

const TOKEN_AGE_MINUTES: i64 = 60;

/// Log a user in. Sets the jwt as an `access_token` cookie and returns the
/// filtered user.
#[utoipa::path(
    context_path = "/auth",
    request_body = LoginSchema,
    responses(
        (status = 200, description = "Login was successful", body = FilteredUser),
        (status = 400, description = "Wrong username or password")
    )
)]
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    data: Json<LoginSchema>,
) -> actix_web::Result<impl Responder> {
    let mut conn = get_connection(&state)?;
    let user_mail = data.email.to_lowercase();
    let user: User = web_block_unpacked(move || {
        use db_connector::schema::users::dsl::*;

        match users
            .filter(email.eq(&user_mail))
            .select(User::as_select())
            .get_result(&mut conn)
        {
            Ok(user) => Ok(user),
            Err(NotFound) => Err(Error::WrongCredentials),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    if !user.is_active {
        return Err(Error::WrongCredentials.into());
    }

    let password_hash = match PasswordHash::new(&user.password) {
        Ok(hash) => hash,
        Err(_err) => return Err(Error::InternalError.into()),
    };

    if Argon2::default()
        .verify_password(data.password.as_bytes(), &password_hash)
        .is_err()
    {
        return Err(Error::WrongCredentials.into());
    }

    let now = Utc::now();
    let claims = TokenClaims {
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(TOKEN_AGE_MINUTES)).timestamp() as usize,
        sub: user.id.to_string(),
    };

    let token = match jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(state.jwt_secret.as_ref()),
    ) {
        Ok(token) => token,
        Err(_err) => return Err(Error::InternalError.into()),
    };

    let cookie = Cookie::build("access_token", token)
        .path("/")
        .max_age(actix_web::cookie::time::Duration::minutes(TOKEN_AGE_MINUTES))
        .http_only(true)
        .finish();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(FilteredUser::from(user)))
}
