//! Persistence for the signed-in session.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::Session;

/// Where the session survives between runs.
///
/// A file store writes `<dir>/<storage_key>.json`; a memory store keeps the
/// session for the life of the process only.
#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    memory: Mutex<Option<Session>>,
}

#[derive(Serialize, Deserialize)]
struct SessionFile {
    version: u8,
    session: Session,
}

impl SessionStore {
    /// A store backed by `<dir>/<storage_key>.json`.
    pub fn file(dir: impl AsRef<Path>, storage_key: &str) -> Self {
        Self {
            path: Some(dir.as_ref().join(format!("{storage_key}.json"))),
            memory: Mutex::new(None),
        }
    }

    /// A store that forgets everything when dropped.
    pub fn memory() -> Self {
        Self {
            path: None,
            memory: Mutex::new(None),
        }
    }

    /// The file backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads the stored session.
    ///
    /// A corrupt file is treated as no session and logged.
    pub fn load(&self) -> Result<Option<Session>> {
        let Some(path) = &self.path else {
            return Ok(self.lock().clone());
        };
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io("failed to open session file", err)),
        };
        match from_reader::<_, SessionFile>(BufReader::new(file)) {
            Ok(stored) => Ok(Some(stored.session)),
            Err(err) => {
                warn!("ignoring unreadable session file {}: {err}", path.display());
                Ok(None)
            }
        }
    }

    /// Replaces the stored session.
    pub fn save(&self, session: &Session) -> Result<()> {
        let Some(path) = &self.path else {
            *self.lock() = Some(session.clone());
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| Error::io("failed to create session directory", err))?;
        }
        let file =
            File::create(path).map_err(|err| Error::io("failed to create session file", err))?;
        restrict_permissions(&file)?;
        let stored = SessionFile {
            version: 1,
            session: session.clone(),
        };
        to_writer_pretty(BufWriter::new(file), &stored)
            .map_err(|err| Error::serialization("failed to write session", Some(Box::new(err))))
    }

    /// Removes the stored session.  Clearing an empty store succeeds.
    pub fn clear(&self) -> Result<()> {
        let Some(path) = &self.path else {
            *self.lock() = None;
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io("failed to remove session file", err)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.memory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|err| Error::io("failed to restrict session file permissions", err))
}

#[cfg(not(unix))]
fn restrict_permissions(_: &File) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_session;

    #[test]
    fn memory_round_trip() {
        let store = SessionStore::memory();
        assert_eq!(store.load().unwrap(), None);
        store.save(&test_session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(test_session()));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_uses_storage_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::file(dir.path(), "easydiet-auth");
        assert_eq!(store.path(), Some(dir.path().join("easydiet-auth.json").as_path()));
        assert_eq!(store.load().unwrap(), None);
        store.save(&test_session()).unwrap();

        let reopened = SessionStore::file(dir.path(), "easydiet-auth");
        assert_eq!(reopened.load().unwrap(), Some(test_session()));
        reopened.clear().unwrap();
        reopened.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("k.json"), "{not json").unwrap();
        let store = SessionStore::file(dir.path(), "k");
        assert_eq!(store.load().unwrap(), None);
    }
}
