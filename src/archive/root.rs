use std::path::Path;

use super::Archive;

use crate::errors::SeisDataErr;

impl Archive {
    const DB_FILE: &'static str = "index.db";

    /// Initialize a new archive.
    pub fn create(root: &dyn AsRef<Path>) -> Result<Self, SeisDataErr> {
        let db_file = root.as_ref().join(Archive::DB_FILE);
        let root = root.as_ref().to_path_buf();

        std::fs::create_dir_all(&root)?; // The event directories live here too.

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        db_conn.execute_batch(include_str!("root/create_index.sql"))?;

        Ok(Archive { root, db_conn })
    }

    /// Open an existing archive.
    pub fn connect(root: &dyn AsRef<Path>) -> Result<Self, SeisDataErr> {
        let db_file = root.as_ref().join(Archive::DB_FILE);
        let root = root.as_ref().to_path_buf();

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE,
        )?;

        Self::validate_db_structure(&db_conn)?;

        Ok(Archive { root, db_conn })
    }

    /// Open the archive in `root`, creating it if there isn't one yet.
    pub fn create_or_connect(root: &dyn AsRef<Path>) -> Result<Self, SeisDataErr> {
        if root.as_ref().join(Archive::DB_FILE).exists() {
            Self::connect(root)
        } else {
            Self::create(root)
        }
    }

    /// Retrieve a path to the root. Event directories are stored under it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_db_structure(db_conn: &rusqlite::Connection) -> Result<(), SeisDataErr> {
        let num_tables: i64 = db_conn.query_row(
            "SELECT COUNT(name) FROM sqlite_master WHERE type='table' ORDER BY name",
            rusqlite::NO_PARAMS,
            |row| row.get(0),
        )?;

        if num_tables != 2 {
            return Err(SeisDataErr::InvalidSchema);
        }

        let mut stmt =
            db_conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;

        let iter = stmt.query_map(rusqlite::NO_PARAMS, |row: &rusqlite::Row| {
            let name: String = row.get(0)?;
            Ok(name == "events" || name == "waveforms")
        })?;

        for valid in iter {
            match valid {
                Ok(true) => {}
                Ok(false) => return Err(SeisDataErr::InvalidSchema),
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}
