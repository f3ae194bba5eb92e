//! Client state remembered between runs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use tracing::warn;

use crate::error::{Error, Result};

/// File name of the state file inside the state directory.
pub const STATE_FILE: &str = "chat_state.json";

/// What the client remembers between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientState {
    /// The conversation open when the client last exited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_conversation_id: Option<String>,
}

impl ClientState {
    /// The state file inside `dir`.
    pub fn path_in(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(STATE_FILE)
    }

    /// Loads state from `path`.  A missing or unreadable file is empty state.
    pub fn load(path: &Path) -> Self {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    warn!("could not open {}: {err}", path.display());
                }
                return Self::default();
            }
        };
        match from_reader(BufReader::new(file)) {
            Ok(state) => state,
            Err(err) => {
                warn!("ignoring unreadable state file {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Writes state to `path`, creating its directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| Error::io("failed to create state directory", err))?;
        }
        let file = File::create(path).map_err(|err| Error::io("failed to create state file", err))?;
        to_writer_pretty(BufWriter::new(file), self)
            .map_err(|err| Error::serialization("failed to write state", Some(Box::new(err))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = ClientState::path_in(dir.path().join("nested"));
        assert_eq!(ClientState::load(&path), ClientState::default());

        let state = ClientState {
            last_conversation_id: Some("c1".to_string()),
        };
        state.save(&path).unwrap();
        assert_eq!(ClientState::load(&path), state);
    }

    #[test]
    fn corrupt_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = ClientState::path_in(dir.path());
        fs::write(&path, "[]").unwrap();
        assert_eq!(ClientState::load(&path), ClientState::default());
    }
}
