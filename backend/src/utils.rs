use std::str::FromStr;

use actix_web::web;
use db_connector::models::users::User;
use diesel::prelude::*;
use diesel::{
    r2d2::{ConnectionManager, PooledConnection},
    result::Error::NotFound,
    PgConnection,
};

use crate::{error::Error, AppState};

pub fn get_connection(
    state: &web::Data<AppState>,
) -> actix_web::Result<PooledConnection<ConnectionManager<PgConnection>>> {
    match state.pool.get() {
        Ok(conn) => Ok(conn),
        Err(_err) => Err(Error::InternalError.into()),
    }
}

pub async fn web_block_unpacked<F, R>(f: F) -> Result<R, actix_web::Error>
where
    F: FnOnce() -> Result<R, Error> + Send + 'static,
    R: Send + 'static,
{
    match web::block(f).await {
        Ok(res) => match res {
            Ok(v) => Ok(v),
            Err(err) => Err(err.into()),
        },
        Err(_err) => Err(Error::InternalError.into()),
    }
}

pub fn parse_uuid(uuid: &str) -> actix_web::Result<uuid::Uuid> {
    match uuid::Uuid::from_str(uuid) {
        Ok(v) => Ok(v),
        Err(err) => Err(actix_web::error::ErrorBadRequest(err)),
    }
}

pub async fn get_user(
    state: &web::Data<AppState>,
    uid: uuid::Uuid,
) -> actix_web::Result<User> {
    let mut conn = get_connection(state)?;
    let user = web_block_unpacked(move || {
        use db_connector::schema::users::dsl::*;

        match users
            .find(uid)
            .select(User::as_select())
            .get_result(&mut conn)
        {
            Ok(user) => Ok(user),
            Err(NotFound) => Err(Error::UserDoesNotExist),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    Ok(user)
}
