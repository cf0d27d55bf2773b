use crate::error::WriteError;
use crate::item::ListItem;
use std::fs::{self, File, Permissions};
use std::io::{prelude::*, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// One csv column: its header and the record field it is filled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub header: String,
    pub field: String,
}

impl Column {
    pub fn new(header: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            field: field.into(),
        }
    }
}

/// The fixed projection written for every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    pub columns: Vec<Column>,
}

impl CsvLayout {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// `Title, Year, <id header>` as used for movies and shows.
    pub fn titled(id_header: &str, id_field: &str) -> Self {
        Self::new(vec![
            Column::new("Title", "title"),
            Column::new("Year", "year"),
            Column::new(id_header, id_field),
        ])
    }
}

/// A finished export sitting in a temp file next to its destination.
///
/// Nothing at the destination changes until [`Staged::commit`].
#[derive(Debug)]
pub struct Staged {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl Staged {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged file over its destination.
    pub fn commit(self) -> Result<PathBuf, WriteError> {
        let Self { tmp, path } = self;
        tmp.persist(&path)
            .map_err(|e| io_error(&path, e.error))?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}

/// Stage the records verbatim as a pretty printed json array.
pub fn stage_json(items: &[ListItem], path: &Path) -> Result<Staged, WriteError> {
    stage(path, |w| {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut *w, formatter);
        serde::Serialize::serialize(items, &mut ser).map_err(|source| WriteError::Json {
            path: path.into(),
            source,
        })?;
        w.write_all(b"\n").map_err(|source| io_error(path, source))
    })
}

/// Stage a header row and one projected row per record, ordered by title.
///
/// Records without a title sort as the empty string. The sort is stable, so
/// records sharing a title keep the order they were fetched in.
pub fn stage_csv(items: &[ListItem], layout: &CsvLayout, path: &Path) -> Result<Staged, WriteError> {
    let mut sorted: Vec<&ListItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.title().unwrap_or("").cmp(b.title().unwrap_or("")));

    stage(path, |w| {
        let csv_error = |source| WriteError::Csv {
            path: path.into(),
            source,
        };
        let mut writer = csv::Writer::from_writer(w);

        writer
            .write_record(layout.columns.iter().map(|c| c.header.as_str()))
            .map_err(csv_error)?;
        for item in sorted {
            let row: Vec<_> = layout.columns.iter().map(|c| item.field(&c.field)).collect();
            writer
                .write_record(row.iter().map(|cell| cell.as_bytes()))
                .map_err(csv_error)?;
        }

        writer.flush().map_err(|source| io_error(path, source))
    })
}

pub fn write_json(items: &[ListItem], path: &Path) -> Result<(), WriteError> {
    stage_json(items, path)?.commit().map(drop)
}

pub fn write_csv(items: &[ListItem], layout: &CsvLayout, path: &Path) -> Result<(), WriteError> {
    stage_csv(items, layout, path)?.commit().map(drop)
}

/// Read a json export back.
pub fn read_json(path: &Path) -> Result<Vec<ListItem>, WriteError> {
    let file = File::open(path).map_err(|source| io_error(path, source))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| WriteError::Json {
        path: path.into(),
        source,
    })
}

fn io_error(path: &Path, source: std::io::Error) -> WriteError {
    WriteError::Io {
        path: path.into(),
        source,
    }
}

/// Write to a temp file in the directory of `path`.
///
/// The temp file takes the permissions of the file it will replace, or 0644
/// on unix for a new export.
fn stage<F>(path: &Path, write: F) -> Result<Staged, WriteError>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<(), WriteError>,
{
    let parent = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => PathBuf::from("."),
        Some(p) => p.to_path_buf(),
        None => return Err(WriteError::MissingParent(path.into())),
    };
    if !parent.is_dir() {
        return Err(WriteError::MissingParent(path.into()));
    }

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|source| io_error(path, source))?;
    {
        let mut w = BufWriter::new(&mut tmp);
        write(&mut w)?;
        w.flush().map_err(|source| io_error(path, source))?;
    }

    if let Some(permissions) = target_permissions(path) {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|source| io_error(path, source))?;
    }

    Ok(Staged {
        tmp,
        path: path.into(),
    })
}

fn target_permissions(path: &Path) -> Option<Permissions> {
    fs::metadata(path)
        .map(|meta| meta.permissions())
        .ok()
        .or_else(new_file_permissions)
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
