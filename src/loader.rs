use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::Hasher;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use calamine::{Data, DataType as _, Reader, Xlsx};
use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::{debug, info};

use crate::domain::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    XLSX,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Reads spreadsheet files into DataFrames.
///
/// Successful loads are memoized by file content, so reopening the same file
/// does not reparse it. The cache has no eviction and lives as long as the
/// process does.
#[derive(Default)]
pub struct Loader {
    cache: HashMap<u64, DataFrame>,
    parses: usize,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<DataFrame, ViewerError> {
        let file_info = Self::get_file_info(path)?;
        let bytes = fs::read(&file_info.path)?;
        let key = content_key(&bytes);

        if let Some(frame) = self.cache.get(&key) {
            debug!("Cache hit for {:?}, skipping parse", file_info.path);
            return Ok(frame.clone());
        }

        info!(
            "Parsing {:?} ({} bytes, {:?})",
            file_info.path, file_info.file_size, file_info.file_type
        );
        let frame = Self::parse(&bytes, file_info.file_type)?;
        self.parses += 1;
        self.cache.insert(key, frame.clone());
        Ok(frame)
    }

    /// Number of times a file was actually parsed (cache misses).
    pub fn parses(&self) -> usize {
        self.parses
    }

    fn parse(bytes: &[u8], file_type: FileType) -> Result<DataFrame, ViewerError> {
        let frame = match file_type {
            FileType::CSV => CsvReadOptions::default()
                .with_has_header(true)
                .into_reader_with_file_handle(Cursor::new(bytes))
                .finish()?,
            FileType::PARQUET => ParquetReader::new(Cursor::new(bytes)).finish()?,
            FileType::ARROW => IpcReader::new(Cursor::new(bytes)).finish()?,
            FileType::XLSX => Self::read_xlsx(bytes)?,
        };
        Ok(frame)
    }

    fn read_xlsx(bytes: &[u8]) -> Result<DataFrame, ViewerError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let sheet_names = workbook.sheet_names();
        let sheet = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ViewerError::LoadingFailed("workbook has no sheets".into()))?;
        let range = workbook.worksheet_range(&sheet)?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| ViewerError::LoadingFailed(format!("sheet '{sheet}' is empty")))?;
        let names: Vec<String> = header.iter().map(|c| c.to_string()).collect();
        let records: Vec<&[Data]> = rows.collect();

        let columns: Vec<Column> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| Self::build_column(name, idx, &records))
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    // Column dtype is inferred from the cells: a column holding only one cell
    // category (plus blanks) gets a typed series, anything mixed falls back to
    // strings.
    fn build_column(name: &str, idx: usize, records: &[&[Data]]) -> Column {
        let mut bools = false;
        let mut ints = false;
        let mut floats = false;
        let mut datetimes = false;
        let mut others = false;
        for row in records {
            match row.get(idx) {
                None | Some(Data::Empty) => {}
                Some(Data::Bool(_)) => bools = true,
                Some(Data::Int(_)) => ints = true,
                Some(Data::Float(_)) => floats = true,
                Some(Data::DateTime(_)) | Some(Data::DateTimeIso(_)) => datetimes = true,
                Some(_) => others = true,
            }
        }

        let name: PlSmallStr = name.into();
        let kinds = [bools, ints || floats, datetimes]
            .iter()
            .filter(|&&k| k)
            .count();
        if others || kinds > 1 {
            let data: Vec<Option<String>> = records
                .iter()
                .map(|row| match row.get(idx) {
                    None | Some(Data::Empty) => None,
                    Some(d) => Some(d.to_string()),
                })
                .collect();
            Series::new(name, data).into_column()
        } else if bools {
            let data: Vec<Option<bool>> = records
                .iter()
                .map(|row| row.get(idx).and_then(|d| d.get_bool()))
                .collect();
            Series::new(name, data).into_column()
        } else if datetimes {
            let data: Vec<Option<NaiveDateTime>> = records
                .iter()
                .map(|row| row.get(idx).and_then(|d| d.as_datetime()))
                .collect();
            Series::new(name, data).into_column()
        } else if floats {
            let data: Vec<Option<f64>> = records
                .iter()
                .map(|row| row.get(idx).and_then(|d| d.as_f64()))
                .collect();
            Series::new(name, data).into_column()
        } else if ints {
            let data: Vec<Option<i64>> = records
                .iter()
                .map(|row| row.get(idx).and_then(|d| d.as_i64()))
                .collect();
            Series::new(name, data).into_column()
        } else {
            // All blank
            let data: Vec<Option<String>> = vec![None; records.len()];
            Series::new(name, data).into_column()
        }
    }

    fn detect_file_type(path: &Path) -> Result<FileType, ViewerError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("XLSX") => Ok(FileType::XLSX),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(ViewerError::UnknownFileType),
        }
    }

    fn get_file_info(path: &Path) -> Result<FileInfo, ViewerError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ViewerError::FileNotFound,
            ErrorKind::PermissionDenied => ViewerError::PermissionDenied,
            _ => ViewerError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(ViewerError::LoadingFailed("not a file".into()));
        }

        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size: metadata.len(),
            file_type: Self::detect_file_type(path)?,
        })
    }
}

fn content_key(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_csv_with_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "data.csv", "a,b\n1,x\n2,y\n");

        let mut loader = Loader::new();
        let frame = loader.load(&path).unwrap();
        assert_eq!(frame.shape(), (2, 2));
        let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn identical_content_is_parsed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "data.csv", "a,b\n1,x\n");

        let mut loader = Loader::new();
        let first = loader.load(&path).unwrap();
        let second = loader.load(&path).unwrap();
        assert_eq!(loader.parses(), 1);
        assert!(first.equals_missing(&second));

        // A copy with the same bytes hits the cache as well
        let copy = write_csv(&dir, "copy.csv", "a,b\n1,x\n");
        loader.load(&copy).unwrap();
        assert_eq!(loader.parses(), 1);
    }

    #[test]
    fn changed_content_is_reparsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "data.csv", "a\n1\n");

        let mut loader = Loader::new();
        loader.load(&path).unwrap();
        write_csv(&dir, "data.csv", "a\n1\n2\n");
        let frame = loader.load(&path).unwrap();
        assert_eq!(loader.parses(), 2);
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let mut loader = Loader::new();
        let err = loader.load(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, ViewerError::FileNotFound));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "data.txt", "a\n1\n");

        let mut loader = Loader::new();
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, ViewerError::UnknownFileType));
    }

    #[test]
    fn corrupt_xlsx_fails_with_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "data.xlsx", "this is not a zip archive");

        let mut loader = Loader::new();
        let err = loader.load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load file:"));
    }
}
