use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const DEFAULT_GVFS_ROOT: &str = "/run/user/1000/gvfs";
pub const DEFAULT_STORAGE_NAME: &str = "Interner Speicher";
const SOURCE_ID_LEN: usize = 8;

static MTP_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mtp:host=([^/]+)").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AndroidFolder {
    Dcim,
    Camera,
    WhatsAppImages,
    WhatsAppVideos,
}

impl AndroidFolder {
    pub const ALL: [AndroidFolder; 4] = [
        AndroidFolder::Dcim,
        AndroidFolder::Camera,
        AndroidFolder::WhatsAppImages,
        AndroidFolder::WhatsAppVideos,
    ];

    /// Path of the folder below the device's storage root.
    pub fn relative_path(self, storage_name: &str) -> PathBuf {
        let tail = match self {
            AndroidFolder::Dcim => "DCIM",
            AndroidFolder::Camera => "DCIM/Camera",
            AndroidFolder::WhatsAppImages => {
                "Android/media/com.whatsapp/WhatsApp/Media/WhatsApp Images"
            }
            AndroidFolder::WhatsAppVideos => {
                "Android/media/com.whatsapp/WhatsApp/Media/WhatsApp Video"
            }
        };
        Path::new(storage_name).join(tail)
    }
}

/// Compact id for a device or other source: the first 8 hex digits of the
/// SHA-256 of `identifier`, uppercased.
pub fn compute_source_id(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut hex = format!("{:X}", digest);
    hex.truncate(SOURCE_ID_LEN);
    hex
}

pub fn extract_device_identifier(mount_path: &Path) -> Option<String> {
    let raw = mount_path.to_string_lossy();
    MTP_HOST
        .captures(&raw)
        .map(|caps| caps[1].to_string())
}

/// First MTP device mounted below `gvfs_root`.
pub fn find_mtp_mount(gvfs_root: &Path) -> Result<PathBuf> {
    let mut mounts = Vec::new();
    for entry in fs::read_dir(gvfs_root)
        .with_context(|| format!("failed to read gvfs directory: {}", gvfs_root.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", gvfs_root.display()))?;
        mounts.push(entry.path());
    }
    mounts.sort();

    match mounts.into_iter().next() {
        Some(mount) => Ok(mount),
        None => bail!("no MTP devices found in {}", gvfs_root.display()),
    }
}
