use diesel::prelude::*;

use super::users::User;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Associations)]
#[diesel(belongs_to(User))]
#[diesel(table_name = crate::schema::devices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Device {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub status: String,
    pub device_name: String,
    pub issuer_organisation: String,
    pub default_account_code: Option<String>,
    pub fuel_type: String,
    pub technology_type: String,
    pub capacity: f64,
    pub commissioning_date: chrono::NaiveDate,
    pub effective_date: chrono::NaiveDate,
    pub address: String,
    pub country: String,
    pub postcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub public_funding: Option<String>,
    pub funding_end_date: Option<chrono::NaiveDate>,
    pub onsite_consumer: Option<String>,
    pub onsite_consumer_details: Option<String>,
    pub auxiliary_energy: Option<String>,
    pub auxiliary_energy_details: Option<String>,
    pub additional_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}
