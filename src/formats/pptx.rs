// 🖼️ Slide-deck reader - PPTX (OOXML zip) into slides of table/text shapes
//
// Slides are read from ppt/slides/slideN.xml in numeric order. Within a slide
// shapes keep document order:
//   - every a:tbl becomes Shape::Table (trimmed cell text)
//   - every p:sp with a text body becomes Shape::Text (paragraphs joined by \n)

use crate::error::{IngestError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const SLIDE_SUFFIX: &str = ".xml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Table(Vec<Vec<String>>),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

impl Deck {
    /// All shapes across all slides, in slide order
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.slides.iter().flat_map(|slide| slide.shapes.iter())
    }
}

pub fn load_deck(path: &Path) -> Result<Deck> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    load_deck_from_reader(file)
}

pub fn load_deck_from_reader<R: Read + Seek>(reader: R) -> Result<Deck> {
    let mut archive = ZipArchive::new(reader)?;

    let mut slide_names: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slide_names.sort();

    let mut deck = Deck::default();
    for (number, name) in slide_names {
        let mut xml = String::new();
        archive
            .by_name(&name)?
            .read_to_string(&mut xml)
            .map_err(|e| IngestError::io(&name, e))?;

        let slide = parse_slide_xml(&xml)?;
        debug!(slide = number, shapes = slide.shapes.len(), "parsed slide");
        deck.slides.push(slide);
    }

    Ok(deck)
}

/// "ppt/slides/slide12.xml" → 12 (layouts, notes and rels are skipped)
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(SLIDE_SUFFIX)?
        .parse()
        .ok()
}

// ============================================================================
// SLIDE XML
// ============================================================================

/// Shape being assembled while walking the slide XML
#[derive(Default)]
struct ShapeState {
    /// Paragraphs of the current p:sp text body (None outside a text body)
    text: Option<Vec<String>>,
    /// Rows of the current a:tbl
    table: Option<Vec<Vec<String>>>,
    row: Vec<String>,
    /// Paragraphs of the current a:tc
    cell: Option<Vec<String>>,
    paragraph: Option<String>,
    in_run_text: bool,
}

pub fn parse_slide_xml(xml: &str) -> Result<Slide> {
    let mut reader = Reader::from_str(xml);
    let mut state = ShapeState::default();
    let mut slide = Slide::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"txBody" if state.table.is_none() => state.text = Some(Vec::new()),
                b"tbl" => state.table = Some(Vec::new()),
                b"tr" => state.row.clear(),
                b"tc" => state.cell = Some(Vec::new()),
                b"p" => state.paragraph = Some(String::new()),
                b"t" => state.in_run_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"br" {
                    if let Some(paragraph) = state.paragraph.as_mut() {
                        paragraph.push('\n');
                    }
                }
            }
            Event::Text(e) if state.in_run_text => {
                if let Some(paragraph) = state.paragraph.as_mut() {
                    paragraph.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => state.in_run_text = false,
                b"p" => {
                    let paragraph = state.paragraph.take().unwrap_or_default();
                    if let Some(cell) = state.cell.as_mut() {
                        cell.push(paragraph);
                    } else if let Some(text) = state.text.as_mut() {
                        text.push(paragraph);
                    }
                }
                b"tc" => {
                    let cell = state.cell.take().unwrap_or_default();
                    state.row.push(cell.join("\n").trim().to_string());
                }
                b"tr" => {
                    if let Some(table) = state.table.as_mut() {
                        table.push(std::mem::take(&mut state.row));
                    }
                }
                b"tbl" => {
                    if let Some(table) = state.table.take() {
                        slide.shapes.push(Shape::Table(table));
                    }
                }
                b"sp" => {
                    if let Some(text) = state.text.take() {
                        slide.shapes.push(Shape::Text(text.join("\n")));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(slide)
}

// ============================================================================
// TESTS
// ============================================================================
