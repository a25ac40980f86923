use std::path::Path;

use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Datelike;
use db_connector::models::device_documents::DeviceDocument;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::Error,
    middleware::jwt::JwtMiddleware,
    utils::{get_connection, get_user, parse_uuid, web_block_unpacked},
    AppState,
};

use super::get_device_for_user;

pub const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("SF02", "SF-02 Production Facility Registration"),
    ("SF02C", "SF-02C Ownership Declaration"),
    ("METER", "Metering Evidence"),
    ("DIAGRAM", "Single Line Diagram"),
    ("PHOTOS", "Project Photos"),
];

/// Supporting evidence: one slot per document kind, five at most.
pub const MAX_DOCUMENTS: i64 = 5;

#[derive(Debug, MultipartForm)]
pub struct UploadDocumentForm {
    pub document_type: Text<String>,
    #[multipart(limit = "10MB")]
    pub file: TempFile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: String,
    pub document_type: String,
    pub file_path: String,
    pub uploaded_at: chrono::NaiveDateTime,
}

impl From<DeviceDocument> for DocumentResponse {
    fn from(doc: DeviceDocument) -> Self {
        DocumentResponse {
            id: doc.id.to_string(),
            document_type: doc.document_type,
            file_path: doc.file_path,
            uploaded_at: doc.uploaded_at,
        }
    }
}

fn is_known_document_type(document_type: &str) -> bool {
    DOCUMENT_TYPES.iter().any(|(code, _)| *code == document_type)
}

// Keeps only the last path component and drops characters that have no
// business in a stored filename.
fn sanitize_file_name(name: &str) -> String {
    let name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

/// Attach a supporting document to a device. Files land under
/// `media_root/device_documents/<year>/<month>/<day>/`.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 201, description = "Document was stored", body = DocumentResponse),
        (status = 400, description = "Unknown document type or document limit reached"),
        (status = 401, description = "Device does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[post("/{id}/documents")]
pub async fn add_document(
    state: web::Data<AppState>,
    form: MultipartForm<UploadDocumentForm>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let device_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    get_device_for_user(&state, device_id, user.id, user.is_admin).await?;

    let form = form.into_inner();
    let document_type = form.document_type.into_inner();
    if !is_known_document_type(&document_type) {
        return Err(Error::UnknownDocumentType.into());
    }

    let now = chrono::Utc::now().naive_utc();
    let file_name = sanitize_file_name(form.file.file_name.as_deref().unwrap_or("upload"));
    let document_id = uuid::Uuid::new_v4();
    let relative_path = format!(
        "device_documents/{:04}/{:02}/{:02}/{document_id}_{file_name}",
        now.year(),
        now.month(),
        now.day()
    );

    let target = Path::new(&state.media_root).join(&relative_path);
    if let Some(parent) = target.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            log::error!("Failed to create document directory: {err}");
            return Err(Error::InternalError.into());
        }
    }
    if let Err(err) = std::fs::copy(form.file.file.path(), &target) {
        log::error!("Failed to store document: {err}");
        return Err(Error::InternalError.into());
    }

    let document = DeviceDocument {
        id: document_id,
        device_id,
        document_type,
        file_path: relative_path,
        uploaded_at: now,
    };

    // The count and the insert share a transaction with the device row
    // locked, so concurrent uploads cannot slip past the cap.
    let mut conn = get_connection(&state)?;
    let document_cpy = document.clone();
    let inserted = web_block_unpacked(move || {
        use db_connector::schema::device_documents::dsl as documents;
        use db_connector::schema::devices::dsl as devices;

        conn.transaction::<_, Error, _>(|conn| {
            let _: uuid::Uuid = devices::devices
                .find(device_id)
                .select(devices::id)
                .for_update()
                .get_result(conn)?;

            let existing: i64 = documents::device_documents
                .filter(documents::device_id.eq(device_id))
                .count()
                .get_result(conn)?;
            if existing >= MAX_DOCUMENTS {
                return Err(Error::TooManyDocuments);
            }

            diesel::insert_into(documents::device_documents)
                .values(&document_cpy)
                .execute(conn)?;

            Ok(())
        })
    })
    .await;

    if let Err(err) = inserted {
        if let Err(remove_err) = std::fs::remove_file(&target) {
            log::warn!(
                "Failed to remove stored document {}: {remove_err}",
                document.file_path
            );
        }
        return Err(err);
    }

    Ok(HttpResponse::Created().json(DocumentResponse::from(document)))
}

/// List the documents attached to a device.
#[utoipa::path(
    context_path = "/device",
    responses(
        (status = 200, description = "Success", body = [DocumentResponse]),
        (status = 401, description = "Device does not belong to the caller")
    ),
    security(("jwt" = []))
)]
#[get("/{id}/documents")]
pub async fn get_documents(
    state: web::Data<AppState>,
    uid: crate::models::uuid::Uuid,
    path: web::Path<String>,
    _jwt: JwtMiddleware,
) -> actix_web::Result<impl Responder> {
    let device_id = parse_uuid(&path)?;
    let user = get_user(&state, uid.into()).await?;
    get_device_for_user(&state, device_id, user.id, user.is_admin).await?;

    let mut conn = get_connection(&state)?;
    let documents: Vec<DeviceDocument> = web_block_unpacked(move || {
        use db_connector::schema::device_documents::dsl as documents;

        match documents::device_documents
            .filter(documents::device_id.eq(device_id))
            .order(documents::uploaded_at.asc())
            .select(DeviceDocument::as_select())
            .load(&mut conn)
        {
            Ok(documents) => Ok(documents),
            Err(_err) => Err(Error::InternalError),
        }
    })
    .await?;

    let documents: Vec<DocumentResponse> =
        documents.into_iter().map(DocumentResponse::from).collect();

    Ok(HttpResponse::Ok().json(documents))
}

#[cfg(test)]
mod tests {
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
    use actix_web::{cookie::Cookie, http::header, test, App};

    fn multipart_body(document_type: &str) -> (header::ContentType, Vec<u8>) {
        let boundary = "----testboundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"document_type\"\r\n\r\n\
             {document_type}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"evidence.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             fake pdf content\r\n\
             --{boundary}--\r\n"
        );
        let content_type = header::ContentType(
            format!("multipart/form-data; boundary={boundary}")
                .parse()
                .unwrap(),
        );
        (content_type, body.into_bytes())
    }

    #[actix_web::test]
    async fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("meter reading.pdf"), "meterreading.pdf");
        assert_eq!(sanitize_file_name("evidence.pdf"), "evidence.pdf");
    }

    #[actix_web::test]
    async fn test_upload_and_list_document() {
        let mail = "device_documents@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;
        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add_document)
            .service(get_documents);
        let app = test::init_service(app).await;

        let (content_type, body) = multipart_body("METER");
        let req = test::TestRequest::post()
            .uri(&format!("/{}/documents", device.id))
            .cookie(Cookie::new("access_token", token.clone()))
            .insert_header(content_type)
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let document: DocumentResponse = test::read_body_json(resp).await;
        assert_eq!(document.document_type, "METER");
        assert!(document.file_path.starts_with("device_documents/"));
        assert!(document.file_path.ends_with("evidence.pdf"));

        let req = test::TestRequest::get()
            .uri(&format!("/{}/documents", device.id))
            .cookie(Cookie::new("access_token", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let documents: Vec<DocumentResponse> = test::read_body_json(resp).await;
        assert_eq!(documents.len(), 1);
    }

    #[actix_web::test]
    async fn test_unknown_document_type() {
        let mail = "device_documents_type@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;
        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add_document);
        let app = test::init_service(app).await;

        let (content_type, body) = multipart_body("NOT_A_TYPE");
        let req = test::TestRequest::post()
            .uri(&format!("/{}/documents", device.id))
            .cookie(Cookie::new("access_token", token))
            .insert_header(content_type)
            .set_payload(body)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_document_limit() {
        let mail = "device_documents_limit@test.invalid";
        create_user(mail).await;
        defer!(delete_test_user(mail));
        let token = login_user(mail).await;
        let device = add_test_device(&token).await;
        defer!(delete_test_devices(mail));

        let app = App::new()
            .configure(configure)
            .wrap(JwtMiddleware)
            .service(add_document);
        let app = test::init_service(app).await;

        for _ in 0..MAX_DOCUMENTS {
            let (content_type, body) = multipart_body("PHOTOS");
            let req = test::TestRequest::post()
                .uri(&format!("/{}/documents", device.id))
                .cookie(Cookie::new("access_token", token.clone()))
                .insert_header(content_type)
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 201);
        }

        let (content_type, body) = multipart_body("PHOTOS");
        let req = test::TestRequest::post()
            .uri(&format!("/{}/documents", device.id))
            .cookie(Cookie::new("access_token", token))
            .insert_header(content_type)
            .set_payload(body)
            .to_request();
        let resp = crate::tests::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
