use actix_web::{error, http::StatusCode, HttpResponse};
use derive_more::{Display, Error};

#[derive(Debug, Display, Error, PartialEq)]
pub enum Error {
    #[display("An internal error occured. Please try again later")]
    InternalError,
    #[display("An account with this email already exists")]
    UserAlreadyExists,
    #[display("Wrong username or password")]
    WrongCredentials,
    #[display("Unauthorized")]
    Unauthorized,
    #[display("Only draft devices can be submitted")]
    DeviceNotDraft,
    #[display("Only draft issue requests can be submitted")]
    IssueRequestNotDraft,
    #[display("User does not exist")]
    UserDoesNotExist,
    #[display("Profile does not exist")]
    ProfileDoesNotExist,
    #[display("Only administrators can change the status directly")]
    StatusIsReadOnly,
    #[display("You do not own this device")]
    DeviceNotOwned,
    #[display("A device can have at most five documents")]
    TooManyDocuments,
    #[display("Unknown document type")]
    UnknownDocumentType,
}

// Lets domain errors travel through diesel transactions: any unhandled
// database error aborts the transaction as an internal error.
impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        log::error!("Database error: {err}");
        Error::InternalError
    }
}

impl error::ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::WrongCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DeviceNotDraft => StatusCode::BAD_REQUEST,
            Self::IssueRequestNotDraft => StatusCode::BAD_REQUEST,
            Self::UserDoesNotExist => StatusCode::BAD_REQUEST,
            Self::ProfileDoesNotExist => StatusCode::NOT_FOUND,
            Self::StatusIsReadOnly => StatusCode::BAD_REQUEST,
            Self::DeviceNotOwned => StatusCode::BAD_REQUEST,
            Self::TooManyDocuments => StatusCode::BAD_REQUEST,
            Self::UnknownDocumentType => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::error::ResponseError;

    #[actix_web::test]
    async fn failed_submit_has_json_error_body() {
        let resp = Error::DeviceNotDraft.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
        assert_eq!(body["error"], "Only draft devices can be submitted");

        let resp = Error::IssueRequestNotDraft.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
        assert_eq!(body["error"], "Only draft issue requests can be submitted");
    }

    #[actix_web::test]
    async fn every_variant_renders_as_json() {
        let resp = Error::Unauthorized.error_response();
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
        assert!(body["error"].is_string());
    }
}
