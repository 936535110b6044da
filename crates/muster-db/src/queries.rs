use chrono::NaiveDateTime;
use rusqlite::{Connection, params};

use muster_types::api::{EventReply, UserReply};
use muster_types::time::Timestamp;

use crate::Database;
use crate::StoreError;
use crate::models::{self, Event, User};

impl Database {
    // -- Users --

    /// Inserts a prepared user and returns it with the store-assigned id.
    /// The password is hashed here, immediately before the write.
    pub fn save_user(&self, user: &User) -> Result<User, StoreError> {
        let hashed = models::hash_password(&user.password)
            .map_err(|e| StoreError::Hash(e.to_string()))?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (nickname, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.nickname,
                    user.email,
                    hashed,
                    user.created_at,
                    user.updated_at
                ],
            )?;

            let mut saved = user.clone();
            saved.id = conn.last_insert_rowid() as u32;
            saved.password = hashed.clone();
            Ok(saved)
        })
    }

    pub fn find_user(&self, id: u32) -> Result<User, StoreError> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Streams every user row to `sink`, converting timestamps to the wire
    /// representation per row. No buffering: each row is pushed as soon as
    /// it decodes. A sink returning false cancels the iteration; the cursor
    /// drops on every exit path.
    pub fn for_each_user(
        &self,
        sink: &mut dyn FnMut(UserReply) -> bool,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, nickname, email, created_at, updated_at FROM users ORDER BY id",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let reply = UserReply {
                    id: row.get(0)?,
                    nickname: row.get(1)?,
                    email: row.get(2)?,
                    created_at: Timestamp::from(row.get::<_, NaiveDateTime>(3)?),
                    updated_at: Timestamp::from(row.get::<_, NaiveDateTime>(4)?),
                };
                if !sink(reply) {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Column-level update of password, nickname, email and updated_at,
    /// followed by a re-read of the full row.
    pub fn update_user(&self, user: &User, id: u32) -> Result<User, StoreError> {
        let hashed = models::hash_password(&user.password)
            .map_err(|e| StoreError::Hash(e.to_string()))?;

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1, nickname = ?2, email = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![hashed, user.nickname, user.email, user.updated_at, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            query_user(conn, id)
        })
    }

    /// Hard delete. Zero matching rows is reported as NotFound, not as a
    /// silent no-op.
    pub fn delete_user(&self, id: u32) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            Ok(changed as u64)
        })
    }

    // -- Events --

    /// Inserts a prepared event, then looks up and attaches the author on
    /// the returned value. A missing author is an observable error, not a
    /// silently absent relation.
    pub fn save_event(&self, event: &Event) -> Result<Event, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (title, content, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.title,
                    event.content,
                    event.author_id,
                    event.created_at,
                    event.updated_at
                ],
            )?;

            let mut saved = event.clone();
            saved.id = conn.last_insert_rowid() as u64;
            saved.author = Some(query_user(conn, event.author_id)?);
            Ok(saved)
        })
    }

    pub fn find_event(&self, id: u64) -> Result<Event, StoreError> {
        self.with_conn(|conn| {
            let mut event = query_event(conn, id)?;
            event.author = Some(query_user(conn, event.author_id)?);
            Ok(event)
        })
    }

    /// Streams every event row to `sink`. Streamed rows carry `author_id`
    /// only; the denormalized author is attached on unary reads.
    pub fn for_each_event(
        &self,
        sink: &mut dyn FnMut(EventReply) -> bool,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, author_id, created_at, updated_at
                 FROM events ORDER BY id",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let reply = EventReply {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    author_id: row.get(3)?,
                    author: None,
                    created_at: Timestamp::from(row.get::<_, NaiveDateTime>(4)?),
                    updated_at: Timestamp::from(row.get::<_, NaiveDateTime>(5)?),
                };
                if !sink(reply) {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Column-level update of title, content and updated_at, then a re-read
    /// returning the current row with its author attached.
    pub fn update_event(&self, event: &Event, id: u64) -> Result<Event, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE events SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![event.title, event.content, event.updated_at, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("event"));
            }
            let mut updated = query_event(conn, id)?;
            updated.author = Some(query_user(conn, updated.author_id)?);
            Ok(updated)
        })
    }

    /// Hard delete, filtered by owner: only the event's author may remove
    /// it. Zero matching rows (absent id or wrong owner) is NotFound.
    pub fn delete_event(&self, id: u64, author_id: u32) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM events WHERE id = ?1 AND author_id = ?2",
                params![id, author_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("event"));
            }
            Ok(changed as u64)
        })
    }
}

fn query_user(conn: &Connection, id: u32) -> Result<User, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, nickname, email, password, created_at, updated_at FROM users WHERE id = ?1",
    )?;

    stmt.query_row([id], |row| {
        Ok(User {
            id: row.get(0)?,
            nickname: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("user"),
        other => other.into(),
    })
}

fn query_event(conn: &Connection, id: u64) -> Result<Event, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, author_id, created_at, updated_at FROM events WHERE id = ?1",
    )?;

    stmt.query_row([id], |row| {
        Ok(Event {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            author: None,
            author_id: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("event"),
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verify_password;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, nickname: &str, email: &str) -> User {
        let user = User::prepare(nickname, email, "password");
        db.save_user(&user).unwrap()
    }

    #[test]
    fn save_assigns_id_and_hashes() {
        let db = db();
        let saved = seed_user(&db, "pet", "pet@example.com");
        assert_eq!(saved.id, 1);
        assert_ne!(saved.password, "password");
        assert!(verify_password(&saved.password, "password"));

        let found = db.find_user(saved.id).unwrap();
        assert_eq!(found.nickname, "pet");
        assert_eq!(found.email, "pet@example.com");
        assert_eq!(found.password, saved.password);
    }

    #[test]
    fn find_missing_user_is_not_found() {
        let db = db();
        let err = db.find_user(42).unwrap_err();
        assert!(err.is_not_found(), "got {err:?}");
    }

    #[test]
    fn duplicate_email_is_constraint() {
        let db = db();
        seed_user(&db, "pet", "pet@example.com");
        let dup = User::prepare("other", "pet@example.com", "password");
        let err = db.save_user(&dup).unwrap_err();
        assert!(err.is_constraint(), "got {err:?}");
    }

    #[test]
    fn duplicate_nickname_is_constraint() {
        let db = db();
        seed_user(&db, "pet", "pet@example.com");
        let dup = User::prepare("pet", "other@example.com", "password");
        let err = db.save_user(&dup).unwrap_err();
        assert!(err.is_constraint(), "got {err:?}");
    }

    #[test]
    fn update_overwrites_columns_and_rereads() {
        let db = db();
        let saved = seed_user(&db, "pet", "pet@example.com");

        let patch = User::prepare("petra", "petra@example.com", "newpass");
        let updated = db.update_user(&patch, saved.id).unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.nickname, "petra");
        assert_eq!(updated.email, "petra@example.com");
        assert!(verify_password(&updated.password, "newpass"));
        // created_at is not an updatable column
        assert_eq!(updated.created_at, saved.created_at);
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let db = db();
        let patch = User::prepare("petra", "petra@example.com", "newpass");
        let err = db.update_user(&patch, 42).unwrap_err();
        assert!(err.is_not_found(), "got {err:?}");
    }

    #[test]
    fn delete_reports_rows_affected() {
        let db = db();
        let saved = seed_user(&db, "pet", "pet@example.com");
        assert_eq!(db.delete_user(saved.id).unwrap(), 1);

        let err = db.delete_user(saved.id).unwrap_err();
        assert!(err.is_not_found(), "got {err:?}");
    }

    #[test]
    fn for_each_user_streams_in_id_order() {
        let db = db();
        seed_user(&db, "a", "a@example.com");
        seed_user(&db, "b", "b@example.com");
        seed_user(&db, "c", "c@example.com");

        let mut seen = Vec::new();
        db.for_each_user(&mut |user| {
            seen.push(user.id);
            true
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn for_each_user_sink_can_cancel() {
        let db = db();
        seed_user(&db, "a", "a@example.com");
        seed_user(&db, "b", "b@example.com");

        let mut seen = 0;
        db.for_each_user(&mut |_| {
            seen += 1;
            false
        })
        .unwrap();
        assert_eq!(seen, 1);

        // cursor is released: writes still go through afterwards
        seed_user(&db, "c", "c@example.com");
    }

    #[test]
    fn save_event_attaches_author() {
        let db = db();
        let author = seed_user(&db, "pet", "pet@example.com");

        let event = Event::prepare("launch", "all hands", author.id);
        let saved = db.save_event(&event).unwrap();
        assert_eq!(saved.id, 1);
        let attached = saved.author.expect("author attached");
        assert_eq!(attached.id, author.id);
        assert_eq!(attached.nickname, "pet");
    }

    #[test]
    fn save_event_without_author_is_constraint() {
        let db = db();
        let event = Event::prepare("launch", "all hands", 42);
        let err = db.save_event(&event).unwrap_err();
        assert!(err.is_constraint(), "got {err:?}");
    }

    #[test]
    fn find_event_denormalizes_author() {
        let db = db();
        let author = seed_user(&db, "pet", "pet@example.com");
        let saved = db
            .save_event(&Event::prepare("launch", "all hands", author.id))
            .unwrap();

        let found = db.find_event(saved.id).unwrap();
        assert_eq!(found.title, "launch");
        assert_eq!(found.content, "all hands");
        assert_eq!(found.author.unwrap().email, "pet@example.com");
    }

    #[test]
    fn update_event_keeps_author_id() {
        let db = db();
        let author = seed_user(&db, "pet", "pet@example.com");
        let saved = db
            .save_event(&Event::prepare("launch", "all hands", author.id))
            .unwrap();

        let patch = Event::prepare("launch v2", "rescheduled", author.id);
        let updated = db.update_event(&patch, saved.id).unwrap();
        assert_eq!(updated.title, "launch v2");
        assert_eq!(updated.content, "rescheduled");
        assert_eq!(updated.author_id, author.id);
        assert_eq!(updated.created_at, saved.created_at);
        assert_eq!(updated.author.unwrap().id, author.id);
    }

    #[test]
    fn delete_event_filters_by_owner() {
        let db = db();
        let author = seed_user(&db, "pet", "pet@example.com");
        let stranger = seed_user(&db, "sam", "sam@example.com");
        let saved = db
            .save_event(&Event::prepare("launch", "all hands", author.id))
            .unwrap();

        let err = db.delete_event(saved.id, stranger.id).unwrap_err();
        assert!(err.is_not_found(), "got {err:?}");
        // the row survives a stranger's attempt
        assert!(db.find_event(saved.id).is_ok());

        assert_eq!(db.delete_event(saved.id, author.id).unwrap(), 1);
    }

    #[test]
    fn for_each_event_rows_carry_author_id_only() {
        let db = db();
        let author = seed_user(&db, "pet", "pet@example.com");
        db.save_event(&Event::prepare("one", "c", author.id)).unwrap();
        db.save_event(&Event::prepare("two", "c", author.id)).unwrap();

        let mut seen = Vec::new();
        db.for_each_event(&mut |event| {
            assert!(event.author.is_none());
            seen.push((event.id, event.author_id));
            true
        })
        .unwrap();
        assert_eq!(seen, vec![(1, author.id), (2, author.id)]);
    }
}
