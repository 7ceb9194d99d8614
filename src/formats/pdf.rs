// 📄 Page-table reader - first table on the first page of a document
//
// The text layer of page 1 is split into cells on tabs or runs of two or
// more spaces. The first line with at least two cells is the header.

use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Table rows, header first. Cells may be absent.
pub type PageTable = Vec<Vec<Option<String>>>;

/// Minimal contract for anything that can hand back a page table
pub trait PageTableReader {
    /// The first extractable table on the first page, header row first
    fn first_page_table(&self) -> Result<PageTable>;

    /// Where the table came from (for diagnostics)
    fn origin(&self) -> String {
        "in-memory table".to_string()
    }
}

// ============================================================================
// PDF READER (lopdf text layer)
// ============================================================================

pub struct PdfTableReader {
    path: PathBuf,
}

impl PdfTableReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        PdfTableReader {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PageTableReader for PdfTableReader {
    fn first_page_table(&self) -> Result<PageTable> {
        let document = lopdf::Document::load(&self.path)?;

        let first_page = document
            .get_pages()
            .keys()
            .next()
            .copied()
            .ok_or_else(|| IngestError::MissingTable {
                path: self.path.clone(),
            })?;

        let text = document.extract_text(&[first_page])?;
        let table = split_text_table(&text);
        debug!(path = %self.path.display(), rows = table.len(), "extracted page table");

        if table.is_empty() {
            return Err(IngestError::MissingTable {
                path: self.path.clone(),
            });
        }

        Ok(table)
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Split page text into table rows.
///
/// Lines with fewer than two cells (titles, footers) are not part of the table.
pub fn split_text_table(text: &str) -> PageTable {
    text.lines()
        .map(split_cells)
        .filter(|cells| cells.len() >= 2)
        .map(|cells| cells.into_iter().map(Some).collect())
        .collect()
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('\t')
        .flat_map(|part| part.split("  "))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// IN-MEMORY READER
// ============================================================================

/// A table that was already extracted elsewhere
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable(pub PageTable);

impl PageTableReader for InMemoryTable {
    fn first_page_table(&self) -> Result<PageTable> {
        if self.0.is_empty() {
            return Err(IngestError::MissingTable {
                path: PathBuf::from(self.origin()),
            });
        }
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// One-page PDF with each line in its own text object
    fn write_pdf(path: &Path, lines: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![50.into(), (780 - 20 * i as i64).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_reads_table_from_pdf_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset3.pdf");
        write_pdf(
            &path,
            &[
                "Quarterly Performance",
                "Year  Quarter  Revenue (in $)  Memberships Sold",
                "2022  Q1  2,100,000  1,200",
                "2022  Q2  2,200,000  1,250",
            ],
        );

        let table = PdfTableReader::new(&path).first_page_table().unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table[0][0].as_deref(), Some("Year"));
        assert_eq!(table[0][2].as_deref(), Some("Revenue (in $)"));
        assert_eq!(table[1][2].as_deref(), Some("2,100,000"));
        assert_eq!(table[2][3].as_deref(), Some("1,250"));
    }

    #[test]
    fn test_pdf_without_table_lines_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        write_pdf(&path, &["Quarterly Performance", "No figures this quarter"]);

        assert!(matches!(
            PdfTableReader::new(&path).first_page_table(),
            Err(IngestError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_split_text_table() {
        let text = "Quarterly Performance\n\
                    Year  Quarter  Revenue (in $)  Memberships Sold\n\
                    2022\tQ1\t2,100,000\t1,200\n\
                    \n\
                    Page 1";

        let table = split_text_table(text);

        assert_eq!(table.len(), 2);
        assert_eq!(table[0][2].as_deref(), Some("Revenue (in $)"));
        assert_eq!(table[1][0].as_deref(), Some("2022"));
        assert_eq!(table[1][3].as_deref(), Some("1,200"));
    }

    #[test]
    fn test_empty_in_memory_table_is_missing() {
        let reader = InMemoryTable::default();
        assert!(matches!(
            reader.first_page_table(),
            Err(IngestError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_missing_pdf_is_an_error() {
        let reader = PdfTableReader::new("does/not/exist.pdf");
        assert!(reader.first_page_table().is_err());
    }
}
