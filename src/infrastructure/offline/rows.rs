use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct OperationRow {
    pub id: String,
    pub action: String,
    pub payload: String,
    pub parent_id: Option<String>,
    pub status: String,
    pub retry_count: i64,
    pub depends_on: Option<String>,
    pub server_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AttachmentRow {
    pub id: String,
    pub parent_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub status: String,
    pub retry_count: i64,
    pub depends_on: Option<String>,
    pub server_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
