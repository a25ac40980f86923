use std::future::{ready, Ready};

use actix_web::HttpMessage;

/// The authenticated caller's id, placed into the request extensions by the
/// jwt middleware.
#[derive(Clone, Debug)]
pub struct Uuid(pub uuid::Uuid);

impl Uuid {
    pub fn new(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl From<Uuid> for uuid::Uuid {
    fn from(value: Uuid) -> Self {
        value.0
    }
}

impl actix_web::FromRequest for Uuid {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let ext = req.extensions();
        match ext.get::<uuid::Uuid>() {
            Some(id) => ready(Ok(Self::new(*id))),
            None => ready(Err(actix_web::error::ErrorUnauthorized(""))),
        }
    }
}
