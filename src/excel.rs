//! Excel workbook ingestion.
//!
//! Uploaded `.xlsx` files are stored on disk under a generated name and
//! registered in the database (see `TrackerDb::insert_excel_file`). The
//! active workbook's first sheet can be read back as header-keyed string
//! records: blank headers become `Column{n}` and missing cells become
//! empty strings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};

use crate::errors::ExcelError;

/// Validate and persist an uploaded workbook. Returns the generated
/// on-disk name; the caller registers it in the database.
pub fn save_workbook(
    uploads_dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<String, ExcelError> {
    if original_name.trim().is_empty() {
        return Err(ExcelError::InvalidFileName {
            name: original_name.to_string(),
        });
    }
    if !original_name.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(ExcelError::UnsupportedFormat {
            file_name: original_name.to_string(),
        });
    }
    std::fs::create_dir_all(uploads_dir)?;
    let stored_name = format!("{}.xlsx", uuid::Uuid::new_v4().simple());
    std::fs::write(uploads_dir.join(&stored_name), bytes)?;
    Ok(stored_name)
}

/// Read the first sheet of a workbook as one string map per data row.
///
/// The first row supplies the keys; a blank header cell in column `n`
/// (1-based) yields the key `Column{n}`. Cells missing from a data row
/// map to empty strings. A workbook with no sheet or no header row reads
/// as zero records.
pub fn read_rows(path: &Path) -> Result<Vec<BTreeMap<String, String>>, ExcelError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| ExcelError::Workbook(e.to_string()))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(result) => result.map_err(|e| ExcelError::Workbook(e.to_string()))?,
        None => return Ok(Vec::new()),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let text = cell_text(cell);
                let text = text.trim();
                if text.is_empty() {
                    format!("Column{}", i + 1)
                } else {
                    text.to_string()
                }
            })
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for row in rows {
        let mut record = BTreeMap::new();
        for (i, key) in headers.iter().enumerate() {
            let value = row.get(i).map(cell_text).unwrap_or_default();
            record.insert(key.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Stored `.xlsx` file names found in the uploads directory, sorted.
pub fn list_stored(uploads_dir: &Path) -> Result<Vec<String>, ExcelError> {
    if !uploads_dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(uploads_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_ascii_lowercase().ends_with(".xlsx") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Resolve a stored file name inside the uploads directory, rejecting
/// anything that could escape it.
pub fn stored_file_path(uploads_dir: &Path, name: &str) -> Result<PathBuf, ExcelError> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(ExcelError::InvalidFileName {
            name: name.to_string(),
        });
    }
    let path = uploads_dir.join(name);
    if !path.is_file() {
        return Err(ExcelError::FileNotFound {
            name: name.to_string(),
        });
    }
    Ok(path)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    fn write_fixture(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        // Header row with a blank cell in column 2.
        sheet.write(0, 0, "Name").unwrap();
        sheet.write(0, 2, "Age").unwrap();
        sheet.write(1, 0, "Bolt").unwrap();
        sheet.write(1, 1, "M8").unwrap();
        sheet.write(1, 2, 30).unwrap();
        // Second data row leaves columns 2 and 3 empty.
        sheet.write(2, 0, "Nut").unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_save_workbook_rejects_non_xlsx() {
        let dir = tempdir().unwrap();
        let err = save_workbook(dir.path(), "roster.csv", b"data").unwrap_err();
        assert!(matches!(err, ExcelError::UnsupportedFormat { .. }));

        let err = save_workbook(dir.path(), "roster.xls", b"data").unwrap_err();
        assert!(matches!(err, ExcelError::UnsupportedFormat { .. }));

        let err = save_workbook(dir.path(), "  ", b"data").unwrap_err();
        assert!(matches!(err, ExcelError::InvalidFileName { .. }));
    }

    #[test]
    fn test_save_workbook_generates_name() {
        let dir = tempdir().unwrap();
        let stored = save_workbook(dir.path(), "Roster.XLSX", b"bytes").unwrap();
        assert!(stored.ends_with(".xlsx"));
        assert_ne!(stored, "Roster.XLSX");
        assert!(dir.path().join(&stored).is_file());
    }

    #[test]
    fn test_read_rows_headers_and_gaps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixture.xlsx");
        write_fixture(&path);

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0]["Name"], "Bolt");
        assert_eq!(rows[0]["Column2"], "M8");
        assert_eq!(rows[0]["Age"], "30");

        assert_eq!(rows[1]["Name"], "Nut");
        assert_eq!(rows[1]["Column2"], "");
        assert_eq!(rows[1]["Age"], "");
    }

    #[test]
    fn test_read_rows_header_only_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("headers.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write(0, 0, "Name").unwrap();
        workbook.save(&path).unwrap();

        assert!(read_rows(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_rows_empty_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        workbook.save(&path).unwrap();

        assert!(read_rows(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_rows_rejects_garbage_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        assert!(matches!(
            read_rows(&path),
            Err(ExcelError::Workbook(_)) | Err(ExcelError::Io(_))
        ));
    }

    #[test]
    fn test_stored_file_path_guards() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ok.xlsx"), b"x").unwrap();

        assert!(stored_file_path(dir.path(), "ok.xlsx").is_ok());
        assert!(matches!(
            stored_file_path(dir.path(), "../etc/passwd"),
            Err(ExcelError::InvalidFileName { .. })
        ));
        assert!(matches!(
            stored_file_path(dir.path(), "a/b.xlsx"),
            Err(ExcelError::InvalidFileName { .. })
        ));
        assert!(matches!(
            stored_file_path(dir.path(), "missing.xlsx"),
            Err(ExcelError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_list_stored() {
        let dir = tempdir().unwrap();
        assert!(list_stored(&dir.path().join("absent")).unwrap().is_empty());

        std::fs::write(dir.path().join("b.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("a.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let names = list_stored(dir.path()).unwrap();
        assert_eq!(names, vec!["a.xlsx".to_string(), "b.xlsx".to_string()]);
    }
}
