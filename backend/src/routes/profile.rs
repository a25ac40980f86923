use actix_web::{get, put, web, HttpResponse, Responder};
use actix_web_validator::Json;
use db_connector::models::profiles::Profile;
use diesel::{prelude::*, result::Error::NotFound};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    utils::{get_connection, get_user, web_block_unpacked},
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .service(get_profile)
            .service(update_profile),
    );
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProfileSchema {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

#[derive(Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileSchema {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
}

async fn load_profile(
    state: &web::Data<AppState>,
    uid: uuid::Uuid,
) -> actix_web::Result<Profile> {
    let mut conn = get_connection(state)?;
    let profile = web_block_unpacked(move || {
        use db_connector::schema::profiles::dsl::*;

        match profiles
            .filter(user_id.eq(uid))
            .select(Profile::as_select())
            .get_result(&mut conn)
        {
            Ok(profile) => Ok(profile),
            Err(NotFound) => Err(Error::ProfileDoesNotExist),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    Ok(profile)
}

/// Get the calling user's profile.
#[utoipa::path(
    context_path = "/profile",
    responses(
        (status = 200, description = "Success", body = ProfileSchema),
        (status = 404, description = "Profile does not exist")
    ),
    security(("jwt" = []))
)]
#[get("")]
pub async fn get_profile(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let user = get_user(&state, uid.clone().into()).await?;
    let profile = load_profile(&state, uid.into()).await?;

    Ok(HttpResponse::Ok().json(ProfileSchema {
        id: profile.id.to_string(),
        username: user.name,
        email: user.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        profile_picture: profile.profile_picture,
    }))
}

/// Update the calling user's profile.
#[utoipa::path(
    context_path = "/profile",
    request_body = UpdateProfileSchema,
    responses(
        (status = 200, description = "Success", body = ProfileSchema),
        (status = 404, description = "Profile does not exist")
    ),
    security(("jwt" = []))
)]
#[put("")]
pub async fn update_profile(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    data: Json<UpdateProfileSchema>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let user = get_user(&state, uid.clone().into()).await?;
    let profile = load_profile(&state, uid.into()).await?;

    let new_first = data.first_name.clone().unwrap_or(profile.first_name);
    let new_last = data.last_name.clone().unwrap_or(profile.last_name);
    let new_picture = data
        .profile_picture
        .clone()
        .or(profile.profile_picture);

    let mut conn = get_connection(&state)?;
    let profile_id = profile.id;
    let (first_cpy, last_cpy, picture_cpy) = (new_first.clone(), new_last.clone(), new_picture.clone());
    web_block_unpacked(move || {
        use db_connector::schema::profiles::dsl::*;

        match diesel::update(profiles.find(profile_id))
            .set((
                first_name.eq(first_cpy),
                last_name.eq(last_cpy),
                profile_picture.eq(picture_cpy),
                updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
        {
            Ok(_) => Ok(()),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    Ok(HttpResponse::Ok().json(ProfileSchema {
        id: profile_id.to_string(),
        username: user.name,
        email: user.email,
        first_name: new_first,
        last_name: new_last,
        profile_picture: new_picture,
    }))
}
