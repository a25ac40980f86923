use diesel::prelude::*;

use super::{devices::Device, users::User};

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Associations)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Device))]
#[diesel(table_name = crate::schema::issue_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IssueRequest {
    pub id: uuid::Uuid,
    pub device_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub status: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub period_of_production: Option<String>,
    pub production_amount: f64,
    pub recipient_account: String,
    pub notes: Option<String>,
    pub upload_file: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}
