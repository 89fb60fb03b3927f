use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            username            TEXT NOT NULL UNIQUE,
            email               TEXT NOT NULL UNIQUE,
            password            TEXT NOT NULL,
            role                TEXT NOT NULL DEFAULT 'user',
            is_verified         INTEGER NOT NULL DEFAULT 0,
            verification_code   TEXT,
            reset_code          TEXT,
            reset_expires       INTEGER,
            pending_email       TEXT,
            pending_email_code  TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS pets (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            species     TEXT NOT NULL,
            breed       TEXT NOT NULL,
            birth_date  TEXT NOT NULL,
            description TEXT NOT NULL,
            city        TEXT NOT NULL,
            image       TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'available',
            last_seen   TEXT,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_pets_owner
            ON pets(owner_id);

        CREATE INDEX IF NOT EXISTS idx_pets_status
            ON pets(status, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            pet_id      TEXT NOT NULL REFERENCES pets(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_pet
            ON comments(pet_id, created_at);

        CREATE TABLE IF NOT EXISTS lost_found_reports (
            id          TEXT PRIMARY KEY,
            pet_id      TEXT NOT NULL REFERENCES pets(id),
            report_type TEXT NOT NULL,
            description TEXT NOT NULL,
            location    TEXT NOT NULL,
            reporter_id TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_pet
            ON lost_found_reports(pet_id);

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            author_id   TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
