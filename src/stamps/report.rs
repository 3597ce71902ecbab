//! Report generation
//!
//! Projects a collection into a downloadable artifact: a paginated PDF
//! (lopdf) or the flat-text equivalent with the same lines. Nothing here
//! reads the store or mutates the collection.

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::StampCollection;
use super::MAX_STAMPS;
use crate::types::StampbookError;

pub const PAGE_WIDTH: i64 = 600;
pub const PAGE_HEIGHT: i64 = 750;
pub const MARGIN_BOTTOM: i64 = 50;

const TITLE: &str = "Resignation Stamp Report";
const TITLE_SIZE: i64 = 24;
const CONTENT_SIZE: i64 = 14;
const RECORD_SIZE: i64 = 12;
const LINE_STEP: i64 = 20;
const TITLE_COLOR: Rgb = Rgb(0.0, 0.53, 0.24);
const TEXT_COLOR: Rgb = Rgb(0.0, 0.0, 0.0);

/// Output format for a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Text,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Pdf => write!(f, "pdf"),
            ReportFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "text" | "txt" => Ok(ReportFormat::Text),
            other => Err(format!("Unknown report format: {other}")),
        }
    }
}

/// Font resource supplied by the caller
///
/// Treated as opaque: the name is written into the PDF font dictionary
/// as-is and no glyph data is fetched or embedded. The font is declared
/// with WinAnsiEncoding, so PDF text is limited to Windows-1252.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFont {
    pub base_font: String,
}

impl ReportFont {
    pub fn new(base_font: impl Into<String>) -> Self {
        Self {
            base_font: base_font.into(),
        }
    }
}

impl Default for ReportFont {
    fn default() -> Self {
        Self::new("Helvetica")
    }
}

/// A produced export, ready for a download sink
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f32, f32, f32);

/// One positioned text run
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: i64,
    pub y: i64,
    pub size: i64,
    pub text: String,
    color: Rgb,
}

/// Text runs for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<TextLine>,
}

fn header_lines(collection: &StampCollection, user_name: &str) -> [String; 4] {
    [
        TITLE.to_string(),
        format!("Name: {user_name}"),
        format!("Stamps collected: {} / {}", collection.len(), MAX_STAMPS),
        "Stamps:".to_string(),
    ]
}

/// One line per record in collection order: `"{seq}. index {index}: {reason}"`
pub fn record_lines(collection: &StampCollection) -> Vec<String> {
    collection
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. index {}: {}", i + 1, r.index, r.reason))
        .collect()
}

/// Sequential layout: header block on the first page, then records
/// stepping down until the bottom margin forces a new page.
pub fn layout_pages(collection: &StampCollection, user_name: &str) -> Vec<PageLayout> {
    let [title, name, summary, heading] = header_lines(collection, user_name);

    let mut first = PageLayout::default();
    first.lines.push(TextLine {
        x: 50,
        y: PAGE_HEIGHT - 50,
        size: TITLE_SIZE,
        text: title,
        color: TITLE_COLOR,
    });
    for (text, y) in [(name, 80), (summary, 110), (heading, 140)] {
        first.lines.push(TextLine {
            x: 50,
            y: PAGE_HEIGHT - y,
            size: CONTENT_SIZE,
            text,
            color: TEXT_COLOR,
        });
    }

    let mut pages = vec![first];
    let mut y = PAGE_HEIGHT - 170;

    for text in record_lines(collection) {
        if y < MARGIN_BOTTOM {
            pages.push(PageLayout::default());
            y = PAGE_HEIGHT - 50;
        }
        if let Some(page) = pages.last_mut() {
            page.lines.push(TextLine {
                x: 60,
                y,
                size: RECORD_SIZE,
                text,
                color: TEXT_COLOR,
            });
        }
        y -= LINE_STEP;
    }

    pages
}

/// Encode `text` for a WinAnsiEncoding font
///
/// Characters Windows-1252 cannot represent become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut buf = [0u8; 4];
    text.chars()
        .map(|c| {
            let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
            match bytes.as_ref() {
                [b] if !unmappable => *b,
                _ => b'?',
            }
        })
        .collect()
}

fn render_pdf(pages: &[PageLayout], font: &ReportFont) -> Result<Vec<u8>, StampbookError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(font.base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::with_capacity(page.lines.len() * 6);
        for line in &page.lines {
            let Rgb(r, g, b) = line.color;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "rg",
                vec![Object::Real(r.into()), Object::Real(g.into()), Object::Real(b.into())],
            ));
            operations.push(Operation::new("Tf", vec!["F1".into(), line.size.into()]));
            operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(win_ansi(&line.text))],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| StampbookError::Report(format!("Failed to encode page: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| StampbookError::Report(format!("Failed to write PDF: {e}")))?;
    Ok(bytes)
}

fn render_text(collection: &StampCollection, user_name: &str) -> String {
    let header = header_lines(collection, user_name).join("\n");
    let records = record_lines(collection);
    if records.is_empty() {
        format!("{header}\n")
    } else {
        format!("{header}\n\n{}\n", records.join("\n\n"))
    }
}

/// Produce the export artifact for `collection`
pub fn generate(
    collection: &StampCollection,
    user_name: &str,
    format: ReportFormat,
    font: &ReportFont,
) -> Result<Artifact, StampbookError> {
    match format {
        ReportFormat::Pdf => {
            let pages = layout_pages(collection, user_name);
            Ok(Artifact {
                filename: "resignation_stamp_report.pdf".to_string(),
                content_type: "application/pdf",
                bytes: render_pdf(&pages, font)?,
            })
        }
        ReportFormat::Text => Ok(Artifact {
            filename: "resignation_stamp_report.txt".to_string(),
            content_type: "text/plain; charset=utf-8",
            bytes: render_text(collection, user_name).into_bytes(),
        }),
    }
}
