use crate::prelude::*;

/// A scene file, optionally followed by `:Collection` to export only
/// the meshes reachable from that collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRef {
    pub path: PathBuf,
    pub collection: Option<String>,
}

impl SceneRef {
    pub fn parse(arg: &str) -> Self {
        if let Some((path, collection)) = arg.rsplit_once(':') {
            if !path.is_empty()
                && !collection.is_empty()
                && !collection.contains(['/', '\\'])
            {
                return Self {
                    path: PathBuf::from(path),
                    collection: Some(collection.to_owned()),
                };
            }
        }
        Self {
            path: PathBuf::from(arg),
            collection: None,
        }
    }
}

/// The part of the output path that selects the vertex format.
pub fn format_target(out_file: &Path) -> String {
    out_file
        .file_name()
        .unwrap_or(out_file.as_os_str())
        .to_string_lossy()
        .into_owned()
}
