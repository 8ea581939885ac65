//! Multi-page PDF report: title page, one card per post, closing page.

use super::assembler::SnapshotMap;
use crate::analytics::aggregator::AggregatedInsights;
use crate::analytics::labels;
use crate::api::types::FeedItem;
use crate::selection::{DateRange, Platform};
use chrono::NaiveDate;
use printpdf::image_crate::{self, DynamicImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_FILE_NAME: &str = "feed.pdf";
pub const NO_CAPTION: &str = "This post has no caption";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
const WRAP_COLUMNS: usize = 90;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Everything a card shows for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportCard {
    pub item_id: String,
    pub caption: String,
    pub date: Option<NaiveDate>,
    pub reactions: u64,
    pub comments: u64,
    /// `label: value` lines from the post's insight families
    pub summary: Vec<String>,
    /// Downloaded media, when available
    pub media: Option<Vec<u8>>,
}

impl ReportCard {
    pub fn from_item(item: &FeedItem, platform: Platform, insights: Option<&AggregatedInsights>) -> Self {
        let reactions = match platform {
            Platform::Facebook => item.reaction_count(),
            Platform::Instagram => item.like_count(),
        };
        let summary = insights
            .map(|insights| {
                insights
                    .visible_families()
                    .flat_map(|family| {
                        labels::family_rows(family).into_iter().map(move |row| match row.unique {
                            Some(unique) => format!("{} {}: {} (unique {})", family.title, row.label, row.total, unique),
                            None if row.label == family.title => format!("{}: {}", row.label, row.total),
                            None => format!("{} {}: {}", family.title, row.label, row.total),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            item_id: item.id.clone(),
            caption: item.text_or(NO_CAPTION).to_string(),
            date: item.created_on(),
            reactions,
            comments: item.comment_count(),
            summary,
            media: None,
        }
    }

    pub fn with_media(mut self, media: Option<Vec<u8>>) -> Self {
        self.media = media;
        self
    }
}

/// What the report is about, plus its cards in display order.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub title: &'a str,
    pub account_name: &'a str,
    pub platform: Platform,
    pub range: DateRange,
    pub cards: &'a [ReportCard],
}

/// The finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub trait DocumentBuilder: Send + Sync {
    fn build(&self, input: &ReportInput<'_>, snapshots: &SnapshotMap) -> Result<ReportDocument, DocumentError>;
}

/// A4 PDF with builtin Helvetica.
#[derive(Debug, Clone)]
pub struct PdfReportBuilder {
    file_name: String,
}

impl Default for PdfReportBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_NAME)
    }
}

impl PdfReportBuilder {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
        }
    }
}

/// `"March 05, 2024"`
pub fn card_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Greedy word wrap on character count.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > columns {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn text(&mut self, content: &str, size: f32, bold: bool) {
        let height = size * PT_TO_MM * 1.4;
        self.ensure(height);
        self.y -= height;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(content, size, Mm(MARGIN), Mm(self.y), font);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Place an encoded image, scaled to at most `max_width` mm.
    fn image(&mut self, encoded: &[u8], max_width: f32) -> bool {
        let decoded = match image_crate::load_from_memory(encoded) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "Skipping image that could not be decoded");
                return false;
            }
        };
        // PDF images carry no alpha here; flatten to RGB.
        let buffer = decoded.to_rgb8();
        let (px_w, px_h) = buffer.dimensions();
        if px_w == 0 || px_h == 0 {
            return false;
        }
        let rgb = DynamicImage::ImageRgb8(buffer);
        let (px_w, px_h) = (px_w as f32, px_h as f32);

        let width = max_width.min(PAGE_WIDTH - 2.0 * MARGIN);
        let dpi = px_w * 25.4 / width;
        let height = px_h * 25.4 / dpi;
        self.ensure(height);
        self.y -= height;

        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        true
    }
}

impl DocumentBuilder for PdfReportBuilder {
    fn build(&self, input: &ReportInput<'_>, snapshots: &SnapshotMap) -> Result<ReportDocument, DocumentError> {
        let (doc, page, layer) = PdfDocument::new(input.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Title");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DocumentError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| DocumentError::Pdf(e.to_string()))?;

        let mut writer = PageWriter {
            doc: &doc,
            regular,
            bold,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - 100.0,
            pages: 1,
        };

        writer.text(input.title, 32.0, true);
        writer.gap(6.0);
        writer.text(input.account_name, 18.0, false);
        writer.text(&format!("{} report", capitalize(&input.platform.to_string())), 14.0, false);
        writer.text(
            &format!("{} - {}", card_date(input.range.since()), card_date(input.range.until())),
            14.0,
            false,
        );
        writer.text(&format!("{} posts", input.cards.len()), 12.0, false);

        for (index, card) in input.cards.iter().enumerate() {
            writer.new_page();
            writer.text(&format!("Post {} of {}", index + 1, input.cards.len()), 16.0, true);
            if let Some(date) = card.date {
                writer.text(&card_date(date), 11.0, false);
            }
            writer.gap(2.0);

            if let Some(media) = &card.media {
                if writer.image(media, 90.0) {
                    writer.gap(4.0);
                }
            }

            for line in wrap(&card.caption, WRAP_COLUMNS) {
                writer.text(&line, 11.0, false);
            }
            writer.gap(2.0);
            writer.text(
                &format!("Reactions: {}    Comments: {}", card.reactions, card.comments),
                11.0,
                true,
            );
            for line in &card.summary {
                writer.text(line, 10.0, false);
            }

            if let Some(snapshot) = snapshots.get(&card.item_id) {
                match snapshot.png_bytes() {
                    Ok(png) => {
                        writer.gap(4.0);
                        writer.image(&png, PAGE_WIDTH - 2.0 * MARGIN);
                    }
                    Err(e) => warn!(item_id = %card.item_id, error = %e, "Unreadable snapshot"),
                }
            }
        }

        writer.new_page();
        writer.y = PAGE_HEIGHT / 2.0 + 10.0;
        writer.text("Thank you", 36.0, true);
        let pages = writer.pages;

        let bytes = doc.save_to_bytes().map_err(|e| DocumentError::Pdf(e.to_string()))?;
        debug!(pages, bytes = bytes.len(), "Report document written");

        Ok(ReportDocument {
            file_name: self.file_name.clone(),
            bytes,
        })
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
