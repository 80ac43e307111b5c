//! Saved schematics
//!
//! Images a user chose to keep from replies, optionally grouped into
//! folders. Process-local; nothing is persisted.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SchematicError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Schematic not found: {0}")]
    NotFound(String),
}

/// What is being saved: the image and the reply data it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchematicSource {
    pub image_url: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub original_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schematic {
    pub id: String,
    pub name: String,
    pub folder_id: Option<String>,
    pub image_url: String,
    pub display_name: String,
    pub original_data: serde_json::Value,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderContents {
    #[serde(flatten)]
    pub folder: Folder,
    pub schematics: Vec<Schematic>,
}

/// Folders with their schematics, plus schematics outside any folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchematicTree {
    pub folders: Vec<FolderContents>,
    pub ungrouped: Vec<Schematic>,
}

#[derive(Debug, Default)]
struct StoreState {
    /// Creation order
    folders: Vec<Folder>,
    /// Save order
    schematics: Vec<Schematic>,
}

#[derive(Debug, Default)]
pub struct SchematicStore {
    state: RwLock<StoreState>,
}

impl SchematicStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_folder(&self, name: &str) -> Result<Folder, SchematicError> {
        let name = non_empty(name)?;
        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
        };
        self.state.write().folders.push(folder.clone());
        tracing::info!("Created folder {} ({})", folder.name, folder.id);
        Ok(folder)
    }

    /// Remove a folder; its schematics become ungrouped. Returns how many moved.
    pub fn delete_folder(&self, folder_id: &str) -> Result<usize, SchematicError> {
        let mut state = self.state.write();
        let before = state.folders.len();
        state.folders.retain(|f| f.id != folder_id);
        if state.folders.len() == before {
            return Err(SchematicError::FolderNotFound(folder_id.to_string()));
        }

        let mut moved = 0;
        for schematic in state
            .schematics
            .iter_mut()
            .filter(|s| s.folder_id.as_deref() == Some(folder_id))
        {
            schematic.folder_id = None;
            moved += 1;
        }
        tracing::info!("Deleted folder {folder_id}, ungrouped {moved} schematics");
        Ok(moved)
    }

    /// Save an image under `name`. A blank `folder_id` means ungrouped.
    pub fn save(
        &self,
        name: &str,
        folder_id: Option<&str>,
        source: SchematicSource,
    ) -> Result<Schematic, SchematicError> {
        let name = non_empty(name)?;
        let folder_id = folder_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let mut state = self.state.write();
        if let Some(id) = &folder_id {
            if !state.folders.iter().any(|f| &f.id == id) {
                return Err(SchematicError::FolderNotFound(id.clone()));
            }
        }

        let schematic = Schematic {
            id: Uuid::new_v4().to_string(),
            name,
            folder_id,
            image_url: source.image_url,
            display_name: source.display_name,
            original_data: source.original_data,
            saved_at: Utc::now(),
        };
        state.schematics.push(schematic.clone());
        tracing::info!("Saved schematic {} ({})", schematic.name, schematic.id);
        Ok(schematic)
    }

    pub fn delete_schematic(&self, id: &str) -> Result<Schematic, SchematicError> {
        let mut state = self.state.write();
        let index = state
            .schematics
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SchematicError::NotFound(id.to_string()))?;
        Ok(state.schematics.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<Schematic> {
        self.state
            .read()
            .schematics
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn list(&self) -> SchematicTree {
        let state = self.state.read();
        let folders = state
            .folders
            .iter()
            .map(|folder| FolderContents {
                folder: folder.clone(),
                schematics: state
                    .schematics
                    .iter()
                    .filter(|s| s.folder_id.as_deref() == Some(folder.id.as_str()))
                    .cloned()
                    .collect(),
            })
            .collect();
        let ungrouped = state
            .schematics
            .iter()
            .filter(|s| s.folder_id.is_none())
            .cloned()
            .collect();
        SchematicTree { folders, ungrouped }
    }
}

fn non_empty(name: &str) -> Result<String, SchematicError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SchematicError::EmptyName);
    }
    Ok(name.to_string())
}
