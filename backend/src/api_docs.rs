use std::net::Ipv4Addr;

use actix_web::{App, HttpServer};
pub use backend::*;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct JwtToken;

impl Modify for JwtToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        )
    }
}

/**
 * Start a server that hosts the api documentation.
 */
#[actix_web::main]
async fn main() {
    #[derive(OpenApi)]
    #[openapi(
        paths(
            routes::auth::login::login,
            routes::auth::register::register,
            routes::profile::get_profile,
            routes::profile::update_profile,
            routes::device::add::add,
            routes::device::get_devices::get_devices,
            routes::device::get_devices::get_device,
            routes::device::update::update,
            routes::device::remove::remove,
            routes::device::submit::submit,
            routes::device::options::fuel_options,
            routes::device::options::technology_options,
            routes::device::documents::add_document,
            routes::device::documents::get_documents,
            routes::issue_request::add::add,
            routes::issue_request::get_issue_requests::get_issue_requests,
            routes::issue_request::get_issue_requests::get_issue_request,
            routes::issue_request::update::update,
            routes::issue_request::remove::remove,
            routes::issue_request::submit::submit,
        ),
        components(schemas(
            models::login::LoginSchema,
            models::register::RegisterSchema,
            routes::profile::ProfileSchema,
            routes::profile::UpdateProfileSchema,
            routes::device::DeviceResponse,
            routes::device::add::AddDeviceSchema,
            routes::device::update::UpdateDeviceSchema,
            routes::device::options::CatalogOption,
            routes::device::options::TechnologyOptions,
            routes::device::documents::DocumentResponse,
            routes::issue_request::IssueRequestResponse,
            routes::issue_request::add::AddIssueRequestSchema,
            routes::issue_request::update::UpdateIssueRequestSchema,
            models::filtered_user::FilteredUser,
            workflow::Status,
        )),
        modifiers(&JwtToken)
    )]
    struct ApiDoc;

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new().service(SwaggerUi::new("/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind((Ipv4Addr::UNSPECIFIED, 12345))
    .unwrap()
    .run()
    .await
    .unwrap();
}
