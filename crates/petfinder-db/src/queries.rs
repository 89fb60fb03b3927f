use crate::models::{CommentRow, PetRow, PostRow, ReportRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

const USER_COLUMNS: &str = "id, username, email, password, role, is_verified, verification_code, \
     reset_code, reset_expires, pending_email, pending_email_code, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        verification_code: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, verification_code)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, email, password_hash, verification_code],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn email_in_use(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn set_verification_code(&self, email: &str, code: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET verification_code = ?2 WHERE email = ?1",
                [email, code],
            )?;
            Ok(())
        })
    }

    /// Match-and-clear in a single statement: the account is marked verified
    /// and the code wiped only if the supplied code matches the stored one.
    /// Returns false (and leaves the row untouched) on any mismatch, including
    /// a replay of an already-consumed code.
    pub fn consume_verification_code(&self, email: &str, code: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_verified = 1, verification_code = NULL
                 WHERE email = ?1 AND verification_code = ?2",
                [email, code],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_reset_code(&self, email: &str, code: &str, expires_unix: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET reset_code = ?2, reset_expires = ?3 WHERE email = ?1",
                rusqlite::params![email, code, expires_unix],
            )?;
            Ok(())
        })
    }

    /// Consume a reset code and store the new password hash in one
    /// conditional update. Email, code, and unexpired expiry must all match
    /// simultaneously; a wrong code and an expired one are indistinguishable
    /// to the caller.
    pub fn consume_reset_code(
        &self,
        email: &str,
        code: &str,
        now_unix: i64,
        new_password_hash: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?4, reset_code = NULL, reset_expires = NULL
                 WHERE email = ?1 AND reset_code = ?2 AND reset_expires > ?3",
                rusqlite::params![email, code, now_unix, new_password_hash],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_pending_email(&self, user_id: &str, new_email: &str, code: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET pending_email = ?2, pending_email_code = ?3 WHERE id = ?1",
                [user_id, new_email, code],
            )?;
            Ok(())
        })
    }

    /// Promote the pending email to primary, clearing both pending fields in
    /// the same statement. Returns false if the code does not match or the
    /// pending fields were already consumed.
    pub fn confirm_pending_email(&self, user_id: &str, code: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET email = pending_email, pending_email = NULL, pending_email_code = NULL
                 WHERE id = ?1 AND pending_email IS NOT NULL AND pending_email_code = ?2",
                [user_id, code],
            )?;
            Ok(changed > 0)
        })
    }

    /// One-shot variant keyed on the old address: old email, pending email,
    /// and code must all match.
    pub fn confirm_pending_email_by_addresses(
        &self,
        old_email: &str,
        new_email: &str,
        code: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET email = pending_email, pending_email = NULL, pending_email_code = NULL
                 WHERE email = ?1 AND pending_email = ?2 AND pending_email_code = ?3",
                [old_email, new_email, code],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        username: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                     username = COALESCE(?2, username),
                     email = COALESCE(?3, email),
                     password = COALESCE(?4, password)
                 WHERE id = ?1",
                rusqlite::params![user_id, username, email, password_hash],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete an account and everything it owns in one transaction:
    /// comments it wrote, reports it filed, comments and reports on its
    /// pets, the pets themselves, and its forum posts.
    pub fn delete_user_cascade(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM comments WHERE author_id = ?1
                     OR pet_id IN (SELECT id FROM pets WHERE owner_id = ?1)",
                [user_id],
            )?;
            tx.execute(
                "DELETE FROM lost_found_reports WHERE reporter_id = ?1
                     OR pet_id IN (SELECT id FROM pets WHERE owner_id = ?1)",
                [user_id],
            )?;
            tx.execute("DELETE FROM pets WHERE owner_id = ?1", [user_id])?;
            tx.execute("DELETE FROM posts WHERE author_id = ?1", [user_id])?;
            tx.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Pets --

    #[allow(clippy::too_many_arguments)]
    pub fn insert_pet(
        &self,
        id: &str,
        name: &str,
        species: &str,
        breed: &str,
        birth_date: &str,
        description: &str,
        city: &str,
        image: &str,
        last_seen: Option<&str>,
        owner_id: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO pets (id, name, species, breed, birth_date, description, city, image, last_seen, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id, name, species, breed, birth_date, description, city, image, last_seen,
                    owner_id
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_pet(&self, id: &str) -> Result<Option<PetRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, species, breed, birth_date, description, city, image, status, last_seen, owner_id, created_at
                 FROM pets WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_pet_row).optional()?;
            Ok(row)
        })
    }

    /// Owner lookup for the authorization policy. Always hits the store so
    /// ownership changes between requests are observed.
    pub fn get_pet_owner(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row("SELECT owner_id FROM pets WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(owner)
        })
    }

    pub fn list_pets(&self) -> Result<Vec<PetRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, species, breed, birth_date, description, city, image, status, last_seen, owner_id, created_at
                 FROM pets ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], map_pet_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_pets_by_status(&self, status: &str, limit: u32) -> Result<Vec<PetRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, species, breed, birth_date, description, city, image, status, last_seen, owner_id, created_at
                 FROM pets WHERE status = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![status, limit], map_pet_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_pet(
        &self,
        id: &str,
        name: Option<&str>,
        species: Option<&str>,
        breed: Option<&str>,
        birth_date: Option<&str>,
        description: Option<&str>,
        city: Option<&str>,
        image: Option<&str>,
        status: Option<&str>,
        last_seen: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE pets SET
                     name = COALESCE(?2, name),
                     species = COALESCE(?3, species),
                     breed = COALESCE(?4, breed),
                     birth_date = COALESCE(?5, birth_date),
                     description = COALESCE(?6, description),
                     city = COALESCE(?7, city),
                     image = COALESCE(?8, image),
                     status = COALESCE(?9, status),
                     last_seen = COALESCE(?10, last_seen)
                 WHERE id = ?1",
                rusqlite::params![
                    id, name, species, breed, birth_date, description, city, image, status,
                    last_seen
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a pet together with its comments and reports.
    pub fn delete_pet_cascade(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM comments WHERE pet_id = ?1", [id])?;
            tx.execute("DELETE FROM lost_found_reports WHERE pet_id = ?1", [id])?;
            let changed = tx.execute("DELETE FROM pets WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, pet_id: &str, author_id: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, pet_id, author_id, content) VALUES (?1, ?2, ?3, ?4)",
                [id, pet_id, author_id, content],
            )?;
            Ok(())
        })
    }

    pub fn get_comments_for_pet(&self, pet_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, pet_id))
    }

    // -- Lost & Found reports --

    pub fn insert_report(
        &self,
        id: &str,
        pet_id: &str,
        report_type: &str,
        description: &str,
        location: &str,
        reporter_id: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO lost_found_reports (id, pet_id, report_type, description, location, reporter_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                [id, pet_id, report_type, description, location, reporter_id],
            )?;
            Ok(())
        })
    }

    pub fn list_reports(&self) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pet_id, report_type, description, location, reporter_id, created_at
                 FROM lost_found_reports ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ReportRow {
                        id: row.get(0)?,
                        pet_id: row.get(1)?,
                        report_type: row.get(2)?,
                        description: row.get(3)?,
                        location: row.get(4)?,
                        reporter_id: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Forum posts --

    pub fn insert_post(&self, id: &str, title: &str, content: &str, author_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, content, author_id) VALUES (?1, ?2, ?3, ?4)",
                [id, title, content, author_id],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.title, p.content, p.author_id, u.username, p.created_at
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 WHERE p.id = ?1",
            )?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_post_author(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let author = conn
                .query_row("SELECT author_id FROM posts WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(author)
        })
    }

    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.title, p.content, p.author_id, u.username, p.created_at
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 ORDER BY p.created_at DESC",
            )?;
            let rows = stmt
                .query_map([], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: &str, title: Option<&str>, content: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET
                     title = COALESCE(?2, title),
                     content = COALESCE(?3, content)
                 WHERE id = ?1",
                rusqlite::params![id, title, content],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column names come from the fixed call sites above, never from input
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        is_verified: row.get(5)?,
        verification_code: row.get(6)?,
        reset_code: row.get(7)?,
        reset_expires: row.get(8)?,
        pending_email: row.get(9)?,
        pending_email_code: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_pet_row(row: &rusqlite::Row) -> std::result::Result<PetRow, rusqlite::Error> {
    Ok(PetRow {
        id: row.get(0)?,
        name: row.get(1)?,
        species: row.get(2)?,
        breed: row.get(3)?,
        birth_date: row.get(4)?,
        description: row.get(5)?,
        city: row.get(6)?,
        image: row.get(7)?,
        status: row.get(8)?,
        last_seen: row.get(9)?,
        owner_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_post_row(row: &rusqlite::Row) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get::<_, Option<String>>(4)?.unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(5)?,
    })
}

fn query_comments(conn: &Connection, pet_id: &str) -> Result<Vec<CommentRow>> {
    // JOIN users to fetch author_username in a single query (eliminates N+1)
    let mut stmt = conn.prepare(
        "SELECT c.id, c.pet_id, c.author_id, u.username, c.content, c.created_at
         FROM comments c
         LEFT JOIN users u ON c.author_id = u.id
         WHERE c.pet_id = ?1
         ORDER BY c.created_at DESC",
    )?;

    let rows = stmt
        .query_map([pet_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                pet_id: row.get(1)?,
                author_id: row.get(2)?,
                author_username: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "unknown".to_string()),
                content: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
