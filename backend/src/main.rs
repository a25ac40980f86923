use std::sync::mpsc::channel;

use actix_web::{
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
pub use backend::*;

use db_connector::{get_connection_pool, run_migrations};
use lettre::{transport::smtp::authentication::Credentials, SmtpTransport};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode,
};

#[cfg(not(debug_assertions))]
use simplelog::WriteLogger;

use backend::notify::worker::{self, MailConfig};
use backend::notify::Notifier;

fn build_mailer() -> Option<SmtpTransport> {
    let email = std::env::var("EMAIL_USER").ok()?;
    let pass = std::env::var("EMAIL_PASS").ok()?;
    let relay = std::env::var("EMAIL_RELAY").ok()?;
    let port: u16 = std::env::var("EMAIL_RELAY_PORT").ok()?.parse().ok()?;

    let mailer = SmtpTransport::relay(&relay)
        .ok()?
        .port(port)
        .credentials(Credentials::new(email, pass))
        .build();

    Some(mailer)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap()
        .build();

    #[cfg(not(debug_assertions))]
    let write_logger = WriteLogger::new(
        LevelFilter::Info,
        log_config.clone(),
        std::fs::File::create(format!(
            "/logs/backend-{}.log",
            chrono::Local::now().format("%Y-%m-%d-%H")
        ))
        .unwrap(),
    );

    #[cfg(debug_assertions)]
    CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Debug,
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])
    .unwrap();

    #[cfg(not(debug_assertions))]
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            log_config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        write_logger,
    ])
    .unwrap();

    dotenvy::dotenv().ok();

    let pool = get_connection_pool();
    let mut conn = pool.get().expect("Failed to get connection from pool");
    run_migrations(&mut conn).expect("Failed to run migrations");

    let mailer = build_mailer();
    if mailer.is_none() {
        log::warn!("EMAIL_* is not fully set, outgoing mail will be dropped");
    }

    let admin_emails: Vec<String> = std::env::var("ADMIN_EMAILS")
        .expect("ADMIN_EMAILS must be set")
        .split(',')
        .map(|mail| mail.trim().to_string())
        .filter(|mail| !mail.is_empty())
        .collect();

    let mail_config = MailConfig {
        app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "Zim-Rec".to_string()),
        admin_url: std::env::var("ADMIN_URL").expect("ADMIN_URL must be set"),
        admin_emails,
        sender_name: std::env::var("SENDER_NAME").expect("SENDER_NAME must be set"),
        sender_email: std::env::var("SENDER_EMAIL").expect("SENDER_EMAIL must be set"),
    };

    let (tx, rx) = channel();
    worker::start(rx, mailer, mail_config);

    let state = web::Data::new(AppState {
        pool,
        jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set!"),
        notifier: Notifier::new(tx),
        media_root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
    });

    let server = HttpServer::new(move || {
        let cors = actix_cors::Cors::permissive();
        App::new()
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .app_data(state.clone())
            .service(web::scope("/api").configure(routes::configure))
    });

    #[cfg(debug_assertions)]
    let port = "8081";
    #[cfg(not(debug_assertions))]
    let port = "8080";

    let addr = format!("0.0.0.0:{port}");

    server.bind(&addr)?.run().await?;

    Ok(())
}
