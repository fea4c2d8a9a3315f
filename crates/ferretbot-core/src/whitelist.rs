use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{domain::Nick, Result};

/// Authorized users, persisted as one comma-separated line.
///
/// The in-memory set is authoritative; the file is rewritten wholesale after
/// every change and a failed write only leaves the disk copy stale.
#[derive(Clone, Debug)]
pub struct Whitelist {
    path: PathBuf,
    users: BTreeSet<Nick>,
}

impl Whitelist {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            users: BTreeSet::new(),
        }
    }

    /// Load from disk. A missing or unreadable file yields an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match read_users(&path) {
            Ok(users) => {
                info!(count = users.len(), file = %path.display(), "loaded whitelist");
                Self { path, users }
            }
            Err(e) => {
                warn!(file = %path.display(), "whitelist unavailable, starting empty: {e}");
                Self::empty(path)
            }
        }
    }

    pub fn contains(&self, nick: &Nick) -> bool {
        self.users.contains(nick)
    }

    /// Returns `true` when the nick was not present before.
    pub fn add(&mut self, nick: Nick) -> bool {
        self.users.insert(nick)
    }

    /// Returns `true` when the nick was present and got removed.
    pub fn remove(&mut self, nick: &Nick) -> bool {
        self.users.remove(nick)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.serialized())?;
        Ok(())
    }

    /// Best-effort save: failures are logged and otherwise ignored.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(file = %self.path.display(), "failed to save whitelist: {e}");
        }
    }

    fn serialized(&self) -> String {
        self.users
            .iter()
            .map(Nick::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn read_users(path: &Path) -> Result<BTreeSet<Nick>> {
    let txt = fs::read_to_string(path)?;
    Ok(txt
        .split(',')
        .map(Nick::new)
        .filter(|n| !n.as_str().is_empty())
        .collect())
}
