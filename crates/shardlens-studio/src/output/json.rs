//! JSON artifact output writer and reader.

use super::FileType;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::de::{DeserializeOwned, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Write an artifact to a JSON file
///
/// **Public** - main entry point for artifact output
///
/// The value is fully built before the file is created, so a failure before
/// serialization leaves no file behind.
///
/// # Arguments
/// * `artifact` - Any serializable artifact (its first field must be `fileType`)
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::Io` - I/O error during write
/// * `OutputError::Json` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let artifact = analyze_keys(loader.as_mut(), &KeysConfig::default())?;
/// write_artifact(&artifact, "keys.json")?;
/// ```
pub fn write_artifact<T: Serialize>(
    artifact: &T,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing artifact to: {}", output_path.display());

    super::validate_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    // Serialize fully before touching the file
    let mut buffer = Vec::new();
    write_artifact_to(artifact, &mut buffer)?;
    std::fs::write(output_path, &buffer)?;

    info!(
        "Artifact written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Write an artifact as pretty JSON to any writer (stdout, buffers)
pub fn write_artifact_to<T: Serialize, W: Write>(
    artifact: &T,
    writer: W,
) -> Result<(), OutputError> {
    let mut writer = std::io::BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, artifact)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Determine which analysis produced a file
///
/// A root `[` is the historical trace layout. A root `{` must carry
/// `fileType` as its first key.
///
/// # Errors
/// * `OutputError::UnexpectedToken` - empty file or any other first token
/// * `OutputError::MissingFileType` - the first key is not `fileType`
/// * `OutputError::UnknownFileType` - `fileType` names no known kind
pub fn sniff_file_type(path: impl AsRef<Path>) -> Result<FileType, OutputError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let mut reader = BufReader::new(File::open(path)?);

    match first_token(&mut reader)? {
        Some(b'[') => return Ok(FileType::Trace),
        Some(b'{') => {}
        _ => return Err(OutputError::UnexpectedToken(name)),
    }

    let mut de = serde_json::Deserializer::from_reader(reader);
    let file_type = de
        .deserialize_map(FirstKeyVisitor)?
        .ok_or_else(|| OutputError::MissingFileType(name.clone()))?;

    debug!("{} has file type {}", name, file_type);

    file_type
        .parse()
        .map_err(|file_type| OutputError::UnknownFileType {
            path: name,
            file_type,
        })
}

/// Peek at the first non-whitespace byte without consuming it
fn first_token(reader: &mut impl BufRead) -> Result<Option<u8>, OutputError> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                let token = buf[i];
                reader.consume(i);
                return Ok(Some(token));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Reads the `fileType` value when it is the first key, skipping everything else
struct FirstKeyVisitor;

impl<'de> Visitor<'de> for FirstKeyVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let file_type = match map.next_key::<String>()?.as_deref() {
            Some("fileType") => Some(map.next_value::<String>()?),
            Some(_) => {
                map.next_value::<IgnoredAny>()?;
                None
            }
            None => None,
        };

        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(file_type)
    }
}

/// Read an artifact, checking its kind first
///
/// # Errors
/// * `OutputError::WrongFileType` - the file holds another kind of artifact
/// * Any error from [`sniff_file_type`] or JSON decoding
pub fn read_artifact<T: DeserializeOwned>(
    input_path: impl AsRef<Path>,
    expected: FileType,
) -> Result<T, OutputError> {
    let input_path = input_path.as_ref();
    let found = sniff_file_type(input_path)?;
    if found != expected {
        return Err(OutputError::WrongFileType {
            path: input_path.display().to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }

    debug!("Reading {} artifact from: {}", expected, input_path.display());
    let file = File::open(input_path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
