// Raw-format collaborators: turn a document file into rows/shapes the
// extractors can clean. They know nothing about the business rules.

pub mod pdf;
pub mod pptx;

pub use pdf::{split_text_table, InMemoryTable, PageTable, PageTableReader, PdfTableReader};
pub use pptx::{load_deck, load_deck_from_reader, parse_slide_xml, Deck, Shape, Slide};
