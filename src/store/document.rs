use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};

const TABLE_EXTENSION: &str = "json";

/// Directory of JSON documents, one pretty-printed file per table.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over `{root}/{table}.json`, so a reader never sees a truncated table.
/// There is no locking: two processes sharing a root overwrite each other.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn open_default() -> StoreResult<Self> {
        Self::open(default_root())
    }

    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|source| StoreError::CreateRoot {
            path: root.to_path_buf(),
            source,
        })?;
        info!(root = %root.display(), "document store opened");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: &str) -> StoreResult<PathBuf> {
        validate_table_name(table)?;
        Ok(self.root.join(format!("{table}.{TABLE_EXTENSION}")))
    }

    /// Replaces the whole content of `table` with `value`.
    pub fn save<T: Serialize + ?Sized>(&self, table: &str, value: &T) -> StoreResult<()> {
        let path = self.table_path(table)?;
        let json = to_json(table, value)?;
        write_atomic(&self.root, &path, json.as_bytes())
            .map_err(|source| io_error(table, source))?;
        debug!(table, bytes = json.len(), "table saved");
        Ok(())
    }

    /// Reads `table`, returning `None` when the file is missing or blank.
    pub fn load<T: DeserializeOwned>(&self, table: &str) -> StoreResult<Option<T>> {
        let path = self.table_path(table)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(table, "table not found");
                return Ok(None);
            }
            Err(source) => return Err(io_error(table, source)),
        };
        if json.trim().is_empty() {
            debug!(table, "table file is empty");
            return Ok(None);
        }
        let value = serde_json::from_str(&json).map_err(|source| StoreError::Deserialize {
            table: table.to_owned(),
            source,
        })?;
        Ok(Some(value))
    }

    /// Same as [`save`](Self::save), with the file write on the blocking pool.
    pub async fn save_async<T: Serialize + ?Sized>(
        &self,
        table: &str,
        value: &T,
    ) -> StoreResult<()> {
        let path = self.table_path(table)?;
        let json = to_json(table, value)?;
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || write_atomic(&root, &path, json.as_bytes()))
            .await
            .map_err(|source| StoreError::Background {
                table: table.to_owned(),
                source,
            })?
            .map_err(|source| io_error(table, source))?;
        debug!(table, "table saved in background");
        Ok(())
    }

    /// Same as [`load`](Self::load), run on the blocking pool.
    pub async fn load_async<T>(&self, table: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let store = self.clone();
        let owned = table.to_owned();
        tokio::task::spawn_blocking(move || store.load::<T>(&owned))
            .await
            .map_err(|source| StoreError::Background {
                table: table.to_owned(),
                source,
            })?
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.table_path(table)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Removes the table file. Returns `false` when there was nothing to remove.
    pub fn delete_table(&self, table: &str) -> StoreResult<bool> {
        let path = self.table_path(table)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(table, "table deleted");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(io_error(table, source)),
        }
    }

    /// Names of every `*.json` file in the root, sorted.
    pub fn list_tables(&self) -> StoreResult<Vec<String>> {
        let list_error = |source: std::io::Error| StoreError::ListTables {
            path: self.root.clone(),
            source,
        };
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(list_error)? {
            let path = entry.map_err(list_error)?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(TABLE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                tables.push(stem.to_owned());
            }
        }
        tables.sort();
        Ok(tables)
    }
}

/// `C:\temp` on Windows, `{temp}/Filebase` elsewhere.
pub fn default_root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\temp")
    } else {
        std::env::temp_dir().join("Filebase")
    }
}

fn validate_table_name(table: &str) -> StoreResult<()> {
    let invalid = table.trim().is_empty()
        || table.starts_with('.')
        || table.contains(['/', '\\', '\0'])
        || table.contains("..");
    if invalid {
        return Err(StoreError::InvalidTableName(table.to_owned()));
    }
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(table: &str, value: &T) -> StoreResult<String> {
    serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        table: table.to_owned(),
        source,
    })
}

fn write_atomic(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|err| err.error)?;
    Ok(())
}

fn io_error(table: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        table: table.to_owned(),
        source,
    }
}
