use crate::{DatabaseError, DatabaseResult};
use quarry_base::Guid;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const META_FILE_FORMAT_VERSION: u32 = 2;
pub const META_FILE_EXTENSION: &str = "meta";

/// The text sidecar stored next to every source file. Carries the guid (the
/// stable identity of the asset), user labels, and per-importer settings.
/// Users keep these under version control, so encoding is deterministic and
/// parsing is tolerant.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaFile {
    pub file_format_version: u32,
    pub guid: Guid,
    pub labels: Vec<String>,
    pub folder_asset: bool,
    /// One entry per importer section, keyed by importer name, value as the
    /// importer's own JSON settings blob
    pub importer_settings: serde_json::Map<String, serde_json::Value>,
}

impl MetaFile {
    pub fn new(guid: Guid) -> MetaFile {
        MetaFile {
            file_format_version: META_FILE_FORMAT_VERSION,
            guid,
            labels: Vec::default(),
            folder_asset: false,
            importer_settings: serde_json::Map::default(),
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::default();
        let _ = writeln!(out, "fileFormatVersion: {}", self.file_format_version);
        let _ = writeln!(out, "guid: {}", self.guid);
        if self.folder_asset {
            out.push_str("folderAsset: \"yes\"\n");
        }
        if !self.labels.is_empty() {
            out.push_str("labels:\n");
            for label in &self.labels {
                let _ = writeln!(out, "- {}", label);
            }
        }
        for (importer, settings) in &self.importer_settings {
            let _ = writeln!(out, "{}: {}", importer, settings);
        }
        out
    }

    /// Parses a meta file. Unknown keys whose values parse as JSON become
    /// importer settings; anything else is skipped with a warning so a
    /// hand-edited file does not take the whole asset down.
    pub fn decode(text: &str) -> DatabaseResult<MetaFile> {
        let mut file_format_version = None;
        let mut guid = None;
        let mut folder_asset = false;
        let mut labels = Vec::default();
        let mut importer_settings = serde_json::Map::default();
        let mut in_labels = false;

        for line in text.lines() {
            if in_labels {
                if let Some(label) = line.strip_prefix("- ") {
                    labels.push(label.trim().to_string());
                    continue;
                }
                in_labels = false;
            }

            let (key, value) = match line.split_once(':') {
                Some(pair) => pair,
                None => {
                    if !line.trim().is_empty() {
                        log::warn!("skipping unparseable meta file line {:?}", line);
                    }
                    continue;
                }
            };
            let value = value.trim();

            match key {
                "fileFormatVersion" => {
                    file_format_version = Some(value.parse::<u32>().map_err(|_| {
                        DatabaseError::Validation(format!(
                            "bad fileFormatVersion {:?} in meta file",
                            value
                        ))
                    })?);
                }
                "guid" => {
                    guid = Some(value.parse::<Guid>().map_err(|_| {
                        DatabaseError::Validation(format!("bad guid {:?} in meta file", value))
                    })?);
                }
                "folderAsset" => {
                    folder_asset = value == "\"yes\"" || value == "yes";
                }
                "labels" => {
                    in_labels = true;
                }
                importer => match serde_json::from_str::<serde_json::Value>(value) {
                    Ok(settings) => {
                        importer_settings.insert(importer.to_string(), settings);
                    }
                    Err(_) => {
                        log::warn!("skipping unparseable meta file section {:?}", importer);
                    }
                },
            }
        }

        let guid = guid
            .ok_or_else(|| DatabaseError::Validation("meta file has no guid".to_string()))?;
        Ok(MetaFile {
            file_format_version: file_format_version.unwrap_or(META_FILE_FORMAT_VERSION),
            guid,
            labels,
            folder_asset,
            importer_settings,
        })
    }

    pub fn read(path: &Path) -> DatabaseResult<MetaFile> {
        let text = std::fs::read_to_string(path)?;
        MetaFile::decode(&text)
    }

    /// Writes atomically through a temporary so a crash mid-write cannot
    /// leave a truncated meta file behind.
    pub fn write(
        &self,
        path: &Path,
    ) -> DatabaseResult<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DatabaseError::Validation(format!("invalid meta path {:?}", path)))?;
        let tmp_path = path.with_file_name(format!("{}.tmp", file_name));
        std::fs::write(&tmp_path, self.encode())?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// `Assets/Foo.png` -> `Assets/Foo.png.meta`
pub fn meta_path_for(asset_path: &Path) -> PathBuf {
    let mut path = asset_path.as_os_str().to_os_string();
    path.push(".");
    path.push(META_FILE_EXTENSION);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let mut meta = MetaFile::new(Guid::new_unique());
        meta.labels.push("hero".to_string());
        meta.labels.push("environment art".to_string());
        meta.importer_settings.insert(
            "TextureImporter".to_string(),
            serde_json::json!({"maxSize": 1024, "srgb": true}),
        );
        let decoded = MetaFile::decode(&meta.encode()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn folder_asset_flag_round_trips() {
        let mut meta = MetaFile::new(Guid::new_unique());
        meta.folder_asset = true;
        let decoded = MetaFile::decode(&meta.encode()).unwrap();
        assert!(decoded.folder_asset);
    }

    #[test]
    fn missing_guid_is_an_error() {
        assert!(MetaFile::decode("fileFormatVersion: 2\n").is_err());
    }

    #[test]
    fn junk_lines_are_tolerated() {
        let guid = Guid::new_unique();
        let text = format!(
            "fileFormatVersion: 2\nguid: {}\nsome stray line\nbrokenSection: {{not json\n",
            guid
        );
        let decoded = MetaFile::decode(&text).unwrap();
        assert_eq!(decoded.guid, guid);
        assert!(decoded.importer_settings.is_empty());
    }

    #[test]
    fn meta_path_appends_the_extension() {
        assert_eq!(
            meta_path_for(Path::new("Assets/Foo.png")),
            PathBuf::from("Assets/Foo.png.meta")
        );
    }
}
