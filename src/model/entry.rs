//! Entry: metadata snapshot of one remote item
//!
//! The cache treats entries as immutable values. Serialization goes through a
//! private wire struct that mirrors the drive item JSON, so the rest of the
//! crate only ever sees the folder/file discriminator as an enum.

use crate::types::{ItemId, ROOT_ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder/file discriminator with the metadata specific to each
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Folder {
        child_count: Option<u64>,
    },
    File {
        mime_type: Option<String>,
        /// Pre-authenticated content reference, short lived
        download_url: Option<String>,
    },
}

/// Remote item metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireItem", into = "WireItem")]
pub struct Entry {
    pub id: ItemId,
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl Entry {
    /// Sentinel entry for the synthetic root folder
    pub fn root(name: impl Into<String>) -> Self {
        Self::folder(ROOT_ID, name)
    }

    pub fn folder(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Folder { child_count: None },
            size: None,
            modified: None,
        }
    }

    pub fn file(id: impl Into<ItemId>, name: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::File {
                mime_type,
                download_url: None,
            },
            size: None,
            modified: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, EntryKind::Folder { .. })
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    pub fn download_url(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::File { download_url, .. } => download_url.as_deref(),
            EntryKind::Folder { .. } => None,
        }
    }

    /// Short description of the kind for listings
    pub fn kind_label(&self) -> String {
        match &self.kind {
            EntryKind::Folder {
                child_count: Some(n),
            } => format!("folder ({} items)", n),
            EntryKind::Folder { child_count: None } => "folder".to_string(),
            EntryKind::File {
                mime_type: Some(mime),
                ..
            } => mime.clone(),
            EntryKind::File { .. } => "file".to_string(),
        }
    }

    /// Human readable size, empty for folders and unknown sizes
    pub fn formatted_size(&self) -> String {
        if self.is_folder() {
            return String::new();
        }
        match self.size {
            Some(bytes) => format_bytes(bytes),
            None => String::new(),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// One page of a children listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub value: Vec<Entry>,
    /// Absolute URL of the next page, absent on the last page
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireItem {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(
        rename = "lastModifiedDateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    folder: Option<WireFolder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<WireFile>,
    #[serde(
        rename = "@microsoft.graph.downloadUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFolder {
    #[serde(rename = "childCount", default, skip_serializing_if = "Option::is_none")]
    child_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFile {
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
}

impl From<WireItem> for Entry {
    fn from(item: WireItem) -> Self {
        // Items that are neither folders nor files (packages, notebooks) list as files
        let kind = match item.folder {
            Some(folder) => EntryKind::Folder {
                child_count: folder.child_count,
            },
            None => EntryKind::File {
                mime_type: item.file.and_then(|f| f.mime_type),
                download_url: item.download_url,
            },
        };
        Entry {
            id: item.id,
            name: item.name,
            kind,
            size: item.size,
            modified: item.last_modified,
        }
    }
}

impl From<Entry> for WireItem {
    fn from(entry: Entry) -> Self {
        let (folder, file, download_url) = match entry.kind {
            EntryKind::Folder { child_count } => (Some(WireFolder { child_count }), None, None),
            EntryKind::File {
                mime_type,
                download_url,
            } => (None, Some(WireFile { mime_type }), download_url),
        };
        WireItem {
            id: entry.id,
            name: entry.name,
            size: entry.size,
            last_modified: entry.modified,
            folder,
            file,
            download_url,
        }
    }
}
