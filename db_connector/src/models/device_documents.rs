use diesel::prelude::*;

use super::devices::Device;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Associations)]
#[diesel(belongs_to(Device))]
#[diesel(table_name = crate::schema::device_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeviceDocument {
    pub id: uuid::Uuid,
    pub device_id: uuid::Uuid,
    pub document_type: String,
    pub file_path: String,
    pub uploaded_at: chrono::NaiveDateTime,
}
