pub mod device_documents;
pub mod devices;
pub mod issue_requests;
pub mod profiles;
pub mod users;
