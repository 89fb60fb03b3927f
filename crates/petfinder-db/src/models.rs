/// Database row types — these map directly to SQLite rows.
/// Distinct from petfinder-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub reset_code: Option<String>,
    pub reset_expires: Option<i64>,
    pub pending_email: Option<String>,
    pub pending_email_code: Option<String>,
    pub created_at: String,
}

pub struct PetRow {
    pub id: String,
    pub name: String,
    pub species: String,
    pub breed: String,
    pub birth_date: String,
    pub description: String,
    pub city: String,
    pub image: String,
    pub status: String,
    pub last_seen: Option<String>,
    pub owner_id: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub pet_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

pub struct ReportRow {
    pub id: String,
    pub pet_id: String,
    pub report_type: String,
    pub description: String,
    pub location: String,
    pub reporter_id: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
}
