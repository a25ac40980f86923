//! Delivery worker: expands events into per-recipient mail jobs, renders the
//! template pairs and sends them with bounded retries.

use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use askama::Template;
use lettre::message::MultiPart;
use lettre::{Message, SmtpTransport, Transport};

use super::Event;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(60);
const RETRY_BACKOFF_MAX: Duration = Duration::from_secs(700);
const HARD_TIME_LIMIT: Duration = Duration::from_secs(360);

#[derive(Clone)]
pub struct MailConfig {
    pub app_name: String,
    pub admin_url: String,
    pub admin_emails: Vec<String>,
    pub sender_name: String,
    pub sender_email: String,
}

/// A single rendered mail job. Events fan out into one of these per
/// recipient.
#[derive(Debug, Clone)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Template)]
#[template(path = "user_created.html")]
struct UserCreatedHtml<'a> {
    name: &'a str,
    app_name: &'a str,
}

#[derive(Template)]
#[template(path = "user_created.txt")]
struct UserCreatedText<'a> {
    name: &'a str,
    app_name: &'a str,
}

#[derive(Template)]
#[template(path = "admin/new_user.html")]
struct NewUserHtml<'a> {
    name: &'a str,
    email: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/new_user.txt")]
struct NewUserText<'a> {
    name: &'a str,
    email: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/new_device.html")]
struct NewDeviceHtml<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/new_device.txt")]
struct NewDeviceText<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "device_status_update.html")]
struct DeviceStatusHtml<'a> {
    name: &'a str,
    device_name: &'a str,
    status: &'a str,
    app_name: &'a str,
}

#[derive(Template)]
#[template(path = "device_status_update.txt")]
struct DeviceStatusText<'a> {
    name: &'a str,
    device_name: &'a str,
    status: &'a str,
    app_name: &'a str,
}

#[derive(Template)]
#[template(path = "admin/device_status_change.html")]
struct DeviceStatusChangeHtml<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    old_status: &'a str,
    new_status: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/device_status_change.txt")]
struct DeviceStatusChangeText<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    old_status: &'a str,
    new_status: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/new_issue_request.html")]
struct NewIssueRequestHtml<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/new_issue_request.txt")]
struct NewIssueRequestText<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "issue_request_status_update.html")]
struct IssueRequestStatusHtml<'a> {
    name: &'a str,
    device_name: &'a str,
    status: &'a str,
    app_name: &'a str,
}

#[derive(Template)]
#[template(path = "issue_request_status_update.txt")]
struct IssueRequestStatusText<'a> {
    name: &'a str,
    device_name: &'a str,
    status: &'a str,
    app_name: &'a str,
}

#[derive(Template)]
#[template(path = "admin/issue_request_status_change.html")]
struct IssueRequestStatusChangeHtml<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    old_status: &'a str,
    new_status: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "admin/issue_request_status_change.txt")]
struct IssueRequestStatusChangeText<'a> {
    device_name: &'a str,
    owner_email: &'a str,
    old_status: &'a str,
    new_status: &'a str,
    app_name: &'a str,
    admin_url: &'a str,
}

fn render<T: Template, H: Template>(text: T, html: H) -> Option<(String, String)> {
    let text = match text.render() {
        Ok(body) => body,
        Err(err) => {
            log::error!("Failed to render text template: {err}");
            return None;
        }
    };
    let html = match html.render() {
        Ok(body) => body,
        Err(err) => {
            log::error!("Failed to render html template: {err}");
            return None;
        }
    };
    Some((text, html))
}

fn admin_mails(config: &MailConfig, subject: &str, text: String, html: String) -> Vec<Mail> {
    config
        .admin_emails
        .iter()
        .map(|admin| Mail {
            to: admin.clone(),
            subject: subject.to_string(),
            text: text.clone(),
            html: html.clone(),
        })
        .collect()
}

/// Expand one event into its mail jobs: the user-facing mail where the event
/// has one, plus one mail per configured admin address.
pub fn expand(event: &Event, config: &MailConfig) -> Vec<Mail> {
    let mut mails = Vec::new();

    match event {
        Event::UserCreated { user } => {
            if let Some((text, html)) = render(
                UserCreatedText {
                    name: &user.name,
                    app_name: &config.app_name,
                },
                UserCreatedHtml {
                    name: &user.name,
                    app_name: &config.app_name,
                },
            ) {
                mails.push(Mail {
                    to: user.email.clone(),
                    subject: format!("Welcome to {}", config.app_name),
                    text,
                    html,
                });
            }

            if let Some((text, html)) = render(
                NewUserText {
                    name: &user.name,
                    email: &user.email,
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
                NewUserHtml {
                    name: &user.name,
                    email: &user.email,
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
            ) {
                mails.extend(admin_mails(config, "New User Registration", text, html));
            }
        }
        Event::DeviceCreated { device_name, owner } => {
            if let Some((text, html)) = render(
                NewDeviceText {
                    device_name,
                    owner_email: &owner.email,
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
                NewDeviceHtml {
                    device_name,
                    owner_email: &owner.email,
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
            ) {
                let subject = format!("New Device Submitted: {device_name}");
                mails.extend(admin_mails(config, &subject, text, html));
            }
        }
        Event::DeviceStatusChanged {
            device_name,
            owner,
            old_status,
            new_status,
        } => {
            if let Some((text, html)) = render(
                DeviceStatusText {
                    name: &owner.name,
                    device_name,
                    status: new_status.as_str(),
                    app_name: &config.app_name,
                },
                DeviceStatusHtml {
                    name: &owner.name,
                    device_name,
                    status: new_status.as_str(),
                    app_name: &config.app_name,
                },
            ) {
                mails.push(Mail {
                    to: owner.email.clone(),
                    subject: "Device Status Update".to_string(),
                    text,
                    html,
                });
            }

            if let Some((text, html)) = render(
                DeviceStatusChangeText {
                    device_name,
                    owner_email: &owner.email,
                    old_status: old_status.as_str(),
                    new_status: new_status.as_str(),
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
                DeviceStatusChangeHtml {
                    device_name,
                    owner_email: &owner.email,
                    old_status: old_status.as_str(),
                    new_status: new_status.as_str(),
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
            ) {
                let subject = format!("Device Status Changed: {device_name}");
                mails.extend(admin_mails(config, &subject, text, html));
            }
        }
        Event::IssueRequestCreated { device_name, owner } => {
            if let Some((text, html)) = render(
                NewIssueRequestText {
                    device_name,
                    owner_email: &owner.email,
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
                NewIssueRequestHtml {
                    device_name,
                    owner_email: &owner.email,
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
            ) {
                let subject = format!("New Issue Request from {}", owner.email);
                mails.extend(admin_mails(config, &subject, text, html));
            }
        }
        Event::IssueRequestStatusChanged {
            device_name,
            owner,
            old_status,
            new_status,
        } => {
            if let Some((text, html)) = render(
                IssueRequestStatusText {
                    name: &owner.name,
                    device_name,
                    status: new_status.as_str(),
                    app_name: &config.app_name,
                },
                IssueRequestStatusHtml {
                    name: &owner.name,
                    device_name,
                    status: new_status.as_str(),
                    app_name: &config.app_name,
                },
            ) {
                mails.push(Mail {
                    to: owner.email.clone(),
                    subject: "Issue Request Status Update".to_string(),
                    text,
                    html,
                });
            }

            if let Some((text, html)) = render(
                IssueRequestStatusChangeText {
                    device_name,
                    owner_email: &owner.email,
                    old_status: old_status.as_str(),
                    new_status: new_status.as_str(),
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
                IssueRequestStatusChangeHtml {
                    device_name,
                    owner_email: &owner.email,
                    old_status: old_status.as_str(),
                    new_status: new_status.as_str(),
                    app_name: &config.app_name,
                    admin_url: &config.admin_url,
                },
            ) {
                let subject = format!("Issue Request Status Changed: {device_name}");
                mails.extend(admin_mails(config, &subject, text, html));
            }
        }
    }

    mails
}

/// Delay before retry number `attempt` (zero-based). Doubles from the base
/// delay up to the configured cap.
fn backoff_delay(attempt: u32) -> Duration {
    let delay = RETRY_DELAY.saturating_mul(1 << attempt.min(16));
    delay.min(RETRY_BACKOFF_MAX)
}

fn send(mailer: &SmtpTransport, config: &MailConfig, mail: &Mail) -> Result<(), String> {
    let from = format!("{} <{}>", config.sender_name, config.sender_email)
        .parse()
        .map_err(|err| format!("Invalid sender address: {err}"))?;
    let to = mail
        .to
        .parse()
        .map_err(|err| format!("Invalid recipient address {}: {err}", mail.to))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(&mail.subject)
        .multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        ))
        .map_err(|err| format!("Failed to build mail: {err}"))?;

    mailer
        .send(&message)
        .map(|_| ())
        .map_err(|err| format!("Failed to send mail: {err}"))
}

/// Send one mail job, retrying with backoff until the retry ceiling or the
/// per-job deadline is hit. Exhausted jobs are reported, never re-raised.
fn deliver(mailer: &SmtpTransport, config: &MailConfig, mail: &Mail) {
    let started = Instant::now();

    for attempt in 0..=MAX_RETRIES {
        match send(mailer, config, mail) {
            Ok(()) => {
                log::debug!("Sent \"{}\" to {}", mail.subject, mail.to);
                return;
            }
            Err(err) => {
                log::warn!(
                    "Delivery attempt {} of \"{}\" to {} failed: {err}",
                    attempt + 1,
                    mail.subject,
                    mail.to
                );
            }
        }

        if attempt == MAX_RETRIES {
            break;
        }
        let delay = backoff_delay(attempt);
        if started.elapsed() + delay > HARD_TIME_LIMIT {
            break;
        }
        std::thread::sleep(delay);
    }

    log::error!(
        "Giving up on \"{}\" to {} after {:?}",
        mail.subject,
        mail.to,
        started.elapsed()
    );
}

/// Spawn the delivery thread. It runs until every `Notifier` handle is
/// dropped. Without a mailer (tests, local setups) jobs are logged and
/// dropped.
pub fn start(
    rx: Receiver<Event>,
    mailer: Option<SmtpTransport>,
    config: MailConfig,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            for mail in expand(&event, &config) {
                match &mailer {
                    Some(mailer) => deliver(mailer, &config, &mail),
                    None => log::info!(
                        "No mailer configured, dropping \"{}\" to {}",
                        mail.subject,
                        mail.to
                    ),
                }
            }
        }
    })
}
