use db_connector::models::users::User;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User representation safe to hand back to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FilteredUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for FilteredUser {
    fn from(value: User) -> Self {
        FilteredUser {
            id: value.id.to_string(),
            name: value.name,
            email: value.email,
            is_admin: value.is_admin,
        }
    }
}
