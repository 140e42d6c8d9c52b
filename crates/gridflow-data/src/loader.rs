//! File discovery, format detection and deserialization helpers.
//!
//! Every catalog file may be written in RON, TOML or JSON; the format is
//! picked from the extension. TOML files wrap their list in a top-level
//! table key (`[[connectors]]`), the other formats are bare lists.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A value that parses but cannot describe a valid node.
    #[error("invalid {field} for '{name}' in {file}: {detail}")]
    Invalid {
        file: PathBuf,
        name: String,
        field: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [&str; 3] = ["ron", "toml", "json"];

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.{ron,toml,json}` in `dir`.
///
/// Returns `Ok(None)` if none exists and `ConflictingFormats` if more than
/// one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a whole file as `T` in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Read a list of `T`. TOML lists live under `toml_key`; RON and JSON
/// files are the bare list.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let mut table: toml::Table =
                toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .remove(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution
// ===========================================================================

/// Look up `name`, or fail with `UnresolvedRef`.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResourceData;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gridflow_loader_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn formats_follow_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("resources")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_and_require() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "resources").unwrap(), None);
        assert!(matches!(
            require_data_file(&dir, "resources"),
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "resources"
        ));

        fs::write(dir.join("resources.toml"), "").unwrap();
        assert_eq!(
            require_data_file(&dir, "resources").unwrap(),
            dir.join("resources.toml")
        );
        cleanup(&dir);
    }

    #[test]
    fn two_formats_conflict() {
        let dir = make_test_dir("conflict");
        fs::write(dir.join("connectors.ron"), "[]").unwrap();
        fs::write(dir.join("connectors.json"), "[]").unwrap();
        assert!(matches!(
            find_data_file(&dir, "connectors"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn lists_in_every_format() {
        let dir = make_test_dir("lists");
        let ron = dir.join("r.ron");
        let json = dir.join("r.json");
        let toml = dir.join("r.toml");
        fs::write(&ron, r#"[(name: "power"), (name: "water")]"#).unwrap();
        fs::write(&json, r#"[{"name": "power"}, {"name": "water"}]"#).unwrap();
        fs::write(
            &toml,
            "[[resources]]\nname = \"power\"\n\n[[resources]]\nname = \"water\"\n",
        )
        .unwrap();

        for path in [&ron, &json, &toml] {
            let list: Vec<ResourceData> = deserialize_list(path, "resources").unwrap();
            assert_eq!(list.len(), 2, "{}", path.display());
            assert_eq!(list[1].name, "water");
        }
        cleanup(&dir);
    }

    #[test]
    fn toml_list_needs_its_key() {
        let dir = make_test_dir("toml_key");
        let path = dir.join("r.toml");
        fs::write(&path, "other = 1\n").unwrap();
        let result: Result<Vec<ResourceData>, _> = deserialize_list(&path, "resources");
        assert!(matches!(result, Err(DataLoadError::Parse { ref detail, .. }) if detail.contains("resources")));
        cleanup(&dir);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = make_test_dir("parse");
        let path = dir.join("bad.ron");
        fs::write(&path, "not ron {{{").unwrap();
        let err = deserialize_list::<ResourceData>(&path, "resources").unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
        assert!(err.to_string().contains("bad.ron"));
        cleanup(&dir);
    }

    #[test]
    fn name_helpers() {
        let mut map = HashMap::new();
        map.insert("power".to_string(), 3u32);
        let file = Path::new("connectors.ron");

        assert_eq!(*resolve_name(&map, "power", file, "resource").unwrap(), 3);
        assert!(matches!(
            resolve_name(&map, "steam", file, "resource"),
            Err(DataLoadError::UnresolvedRef { expected_kind: "resource", ref name, .. }) if name == "steam"
        ));
        assert!(check_duplicate(&map, "steam", file).is_ok());
        assert!(matches!(
            check_duplicate(&map, "power", file),
            Err(DataLoadError::DuplicateName { .. })
        ));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DataLoadError = io.into();
        assert!(matches!(err, DataLoadError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
