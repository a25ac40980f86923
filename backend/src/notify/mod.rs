//! Domain events and the notification dispatch contract.
//!
//! Writes that create an entity or change its status emit exactly one
//! [`Event`]. Enqueueing is synchronous and happens inside the write
//! transaction: if the queue is gone the triggering request fails and the
//! transaction rolls back. Delivery runs on the worker thread
//! ([`worker::start`]) and is invisible to the original request.

pub mod worker;

use std::sync::mpsc::Sender;

use db_connector::models::users::User;

use crate::error::Error;
use crate::workflow::Status;

/// Recipient-facing snapshot of the acting user. Events carry copies so the
/// worker never has to touch the database.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UserCreated {
        user: UserInfo,
    },
    DeviceCreated {
        device_name: String,
        owner: UserInfo,
    },
    DeviceStatusChanged {
        device_name: String,
        owner: UserInfo,
        old_status: Status,
        new_status: Status,
    },
    IssueRequestCreated {
        device_name: String,
        owner: UserInfo,
    },
    IssueRequestStatusChanged {
        device_name: String,
        owner: UserInfo,
        old_status: Status,
        new_status: Status,
    },
}

/// Handle for enqueueing events, shared through `AppState`.
#[derive(Clone)]
pub struct Notifier {
    tx: Sender<Event>,
}

impl Notifier {
    pub fn new(tx: Sender<Event>) -> Self {
        Notifier { tx }
    }

    /// Hand an event to the delivery worker. A send failure means the worker
    /// is gone; the caller must treat this as fatal to the request.
    pub fn dispatch(&self, event: Event) -> Result<(), Error> {
        self.tx.send(event).map_err(|err| {
            log::error!("Notification queue is closed, dropping event: {err}");
            Error::InternalError
        })
    }
}
