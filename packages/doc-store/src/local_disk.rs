use std::{fs, io, path};

use async_trait::async_trait;
use serde_json::value::Value as JsonValue;

use crate::{DocKey, Persistence, Snapshot, StoreError};

/// Persists the whole document set as one JSON object file.
///
/// The file maps each key to its raw JSON text:
///
/// ```json
/// {
///   "progress_json": "{\"A\":\"learned\"}",
///   "settings_all_json": "{\"sort_mode\":\"RANDOM\"}"
/// }
/// ```
///
/// Writes go to a sibling `*.tmp` file which is synced and then renamed over
/// the real file, so readers of the directory only ever see a complete set.
pub struct JsonFilePersistence {
    file_path: path::PathBuf,
    temp_path: path::PathBuf,
}

impl JsonFilePersistence {
    /// Use `file_name` inside the existing, writable directory `root`.
    pub fn new(root: path::PathBuf, file_name: &str) -> Result<JsonFilePersistence, StoreError> {
        let attr = fs::metadata(&root)
            .map_err(|error| StoreError::io(format!("inspecting {}", root.display()), error))?;

        if !attr.is_dir() {
            return Err(StoreError::io(
                format!("inspecting {}", root.display()),
                io::Error::other("Root path must be a directory."),
            ));
        }

        if attr.permissions().readonly() {
            return Err(StoreError::io(
                format!("inspecting {}", root.display()),
                io::Error::other("Root directory must be writable"),
            ));
        }

        let root = root
            .canonicalize()
            .map_err(|error| StoreError::io(format!("resolving {}", root.display()), error))?;

        Ok(JsonFilePersistence {
            file_path: root.join(file_name),
            temp_path: root.join(format!("{}.tmp", file_name)),
        })
    }

    pub fn file_path(&self) -> &path::Path {
        &self.file_path
    }

    fn parse_document_set(text: &str) -> Result<Snapshot, StoreError> {
        let value: JsonValue = serde_json::from_str(text).map_err(|e| StoreError::Corrupt {
            message: format!("state file is not valid JSON: {}", e),
        })?;

        let JsonValue::Object(map) = value else {
            return Err(StoreError::Corrupt {
                message: "state file must hold a JSON object".to_string(),
            });
        };

        let mut documents = Vec::with_capacity(map.len());
        for (name, raw) in map {
            let key = match DocKey::parse(&name) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(key = %name, error = %err, "skipping stored document");
                    continue;
                }
            };

            // Documents are stored as raw text; anything else was written by hand.
            let raw = match raw {
                JsonValue::String(text) => text,
                other => serde_json::to_string(&other)?,
            };
            documents.push((key, raw));
        }

        Ok(documents.into_iter().collect())
    }

    fn render_document_set(snapshot: &Snapshot) -> Result<Vec<u8>, StoreError> {
        let map: serde_json::Map<String, JsonValue> = snapshot
            .iter()
            .map(|(key, raw)| (key.to_string(), JsonValue::String(raw.to_string())))
            .collect();
        Ok(serde_json::to_vec_pretty(&JsonValue::Object(map))?)
    }
}

#[async_trait]
impl Persistence for JsonFilePersistence {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        tracing::debug!("Reading {}...", self.file_path.display());

        let text = match tokio::fs::read_to_string(&self.file_path).await {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::new()),
            Err(error) => {
                return Err(StoreError::io(
                    format!("reading {}", self.file_path.display()),
                    error,
                ))
            }
        };

        if text.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        Self::parse_document_set(&text)
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        tracing::debug!("Writing {}...", self.file_path.display());

        let bytes = Self::render_document_set(snapshot)?;

        if let Err(err) = self.replace_with(&bytes).await {
            if let Err(error) = tokio::fs::remove_file(&self.temp_path).await {
                if error.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        file = %self.temp_path.display(),
                        error = %error,
                        "failed to remove temporary state file"
                    );
                }
            }
            return Err(err);
        }

        self.sync_parent().await
    }
}

impl JsonFilePersistence {
    /// Write `bytes` to the temporary file, sync it and rename it over the
    /// state file.
    async fn replace_with(&self, bytes: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(&self.temp_path, bytes)
            .await
            .map_err(|error| {
                StoreError::io(format!("writing {}", self.temp_path.display()), error)
            })?;

        let file = tokio::fs::File::open(&self.temp_path)
            .await
            .map_err(|error| {
                StoreError::io(format!("opening {}", self.temp_path.display()), error)
            })?;
        file.sync_all().await.map_err(|error| {
            StoreError::io(format!("syncing {}", self.temp_path.display()), error)
        })?;
        drop(file);

        tokio::fs::rename(&self.temp_path, &self.file_path)
            .await
            .map_err(|error| {
                StoreError::io(format!("replacing {}", self.file_path.display()), error)
            })
    }

    /// Sync the containing directory so the rename itself is durable.
    #[cfg(unix)]
    async fn sync_parent(&self) -> Result<(), StoreError> {
        let Some(parent) = self.file_path.parent() else {
            return Ok(());
        };
        let dir = tokio::fs::File::open(parent)
            .await
            .map_err(|error| StoreError::io(format!("opening {}", parent.display()), error))?;
        dir.sync_all()
            .await
            .map_err(|error| StoreError::io(format!("syncing {}", parent.display()), error))
    }

    #[cfg(not(unix))]
    async fn sync_parent(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
