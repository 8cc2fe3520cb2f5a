// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ticket PDF writer: renders a `ReceiptLayout` onto a single fixed-size
// receipt page using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: a page is a `PdfPage` holding a
// `Vec<Op>` operation list, serialised via `PdfDocument::save()`.

use std::path::Path;

use image::GrayImage;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use ticketwerk_core::error::TicketwerkError;
use tracing::{debug, info, instrument, warn};

use crate::layout::{Block, ReceiptLayout};
use crate::text::{ascii_fold, wrap_text};

/// Receipt paper width.
pub const PAGE_WIDTH_MM: f32 = 58.0;
/// Fixed page length; content that does not fit is dropped.
pub const PAGE_HEIGHT_MM: f32 = 210.0;

const MARGIN_MM: f32 = 3.0;
const QR_EDGE_MM: f32 = 40.0;
const QR_DPI: f32 = 300.0;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.52;
const COURIER_GLYPH_WIDTH: f32 = 0.6;

struct TextStyle {
    font: BuiltinFont,
    size: f32,
    glyph_width: f32,
}

impl TextStyle {
    const fn new(font: BuiltinFont, size: f32, glyph_width: f32) -> Self {
        Self { font, size, glyph_width }
    }

    fn line_height(&self) -> f32 {
        self.size * 1.3
    }
}

/// Renders receipts to single-page PDFs.
pub struct TicketPdfWriter {
    width: Mm,
    height: Mm,
    title: String,
}

impl Default for TicketPdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketPdfWriter {
    pub fn new() -> Self {
        Self {
            width: Mm(PAGE_WIDTH_MM),
            height: Mm(PAGE_HEIGHT_MM),
            title: "Ticket".into(),
        }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Render the layout with `qr` placed at the layout's QR block.
    #[instrument(skip_all, fields(token = %layout.token))]
    pub fn render(&self, layout: &ReceiptLayout, qr: &GrayImage) -> Result<Vec<u8>, TicketwerkError> {
        if qr.width() == 0 || qr.height() == 0 {
            return Err(TicketwerkError::PdfError("QR image is empty".into()));
        }

        let mut doc = PdfDocument::new(&self.title);

        let rgb = image::DynamicImage::ImageLuma8(qr.clone()).to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: qr.width() as usize,
            height: qr.height() as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let qr_id = doc.add_image(&raw);

        let page_w_pt = self.width.into_pt().0;
        let page_h_pt = self.height.into_pt().0;
        let margin_pt = Mm(MARGIN_MM).into_pt().0;
        let usable_w_pt = page_w_pt - 2.0 * margin_pt;

        let mut ops: Vec<Op> = Vec::new();
        let mut cursor_y = page_h_pt - margin_pt;
        let mut dropped = 0usize;

        for block in layout.blocks() {
            match block {
                Block::Qr => {
                    let edge_pt = Mm(QR_EDGE_MM).into_pt().0.min(usable_w_pt);
                    if cursor_y - edge_pt < margin_pt {
                        dropped += 1;
                        continue;
                    }
                    // Native size at QR_DPI, scaled to the target edge.
                    let native_pt = qr.width() as f32 / QR_DPI * 72.0;
                    let scale = edge_pt / native_pt;
                    cursor_y -= edge_pt;
                    ops.push(Op::UseXobject {
                        id: qr_id.clone(),
                        transform: XObjectTransform {
                            translate_x: Some(Pt((page_w_pt - edge_pt) / 2.0)),
                            translate_y: Some(Pt(cursor_y)),
                            scale_x: Some(scale),
                            scale_y: Some(scale),
                            dpi: Some(QR_DPI),
                            rotate: None,
                        },
                    });
                    cursor_y -= 4.0;
                }
                Block::Divider => {
                    let style = TextStyle::new(BuiltinFont::Courier, 7.0, COURIER_GLYPH_WIDTH);
                    let count = (usable_w_pt / (style.size * style.glyph_width)) as usize;
                    let rule = "-".repeat(count.max(1));
                    if !push_line(&mut ops, &style, &rule, page_w_pt, margin_pt, &mut cursor_y) {
                        dropped += 1;
                    }
                }
                Block::Banner(text) => {
                    let rule_style = TextStyle::new(BuiltinFont::Courier, 7.0, COURIER_GLYPH_WIDTH);
                    let count = (usable_w_pt / (rule_style.size * rule_style.glyph_width)) as usize;
                    let rule = "-".repeat(count.max(1));
                    let style = TextStyle::new(BuiltinFont::HelveticaBold, 9.0, AVG_GLYPH_WIDTH);
                    let mut ok = push_line(&mut ops, &rule_style, &rule, page_w_pt, margin_pt, &mut cursor_y);
                    ok &= push_wrapped(&mut ops, &style, &text, page_w_pt, margin_pt, &mut cursor_y);
                    ok &= push_line(&mut ops, &rule_style, &rule, page_w_pt, margin_pt, &mut cursor_y);
                    if !ok {
                        dropped += 1;
                    }
                }
                other => {
                    let (style, text) = match other {
                        Block::Heading(t) => (TextStyle::new(BuiltinFont::HelveticaBold, 12.0, AVG_GLYPH_WIDTH), t),
                        Block::Subtitle(t) => (TextStyle::new(BuiltinFont::HelveticaOblique, 8.0, AVG_GLYPH_WIDTH), t),
                        Block::Emphasis(t) => (TextStyle::new(BuiltinFont::HelveticaBold, 8.0, AVG_GLYPH_WIDTH), t),
                        Block::Mono(t) => (TextStyle::new(BuiltinFont::Courier, 7.0, COURIER_GLYPH_WIDTH), t),
                        Block::Text(t) => (TextStyle::new(BuiltinFont::Helvetica, 8.0, AVG_GLYPH_WIDTH), t),
                        Block::Qr | Block::Divider | Block::Banner(_) => continue,
                    };
                    if !push_wrapped(&mut ops, &style, &text, page_w_pt, margin_pt, &mut cursor_y) {
                        dropped += 1;
                    }
                }
            }
        }

        if dropped > 0 {
            warn!(dropped, "receipt content exceeded the page and was truncated");
        }

        doc.with_pages(vec![PdfPage::new(self.width, self.height, ops)]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(bytes = output.len(), warnings = warnings.len(), "receipt PDF serialised");

        Ok(output)
    }

    /// Render and write the PDF to `path`.
    pub fn write_to_file(
        &self,
        layout: &ReceiptLayout,
        qr: &GrayImage,
        path: impl AsRef<Path>,
    ) -> Result<(), TicketwerkError> {
        let bytes = self.render(layout, qr)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!(path = %path.as_ref().display(), "wrote ticket PDF");
        Ok(())
    }
}

/// Word-wrap `text` and emit centred lines. Returns false if any line fell
/// off the bottom of the page.
fn push_wrapped(
    ops: &mut Vec<Op>,
    style: &TextStyle,
    text: &str,
    page_w_pt: f32,
    margin_pt: f32,
    cursor_y: &mut f32,
) -> bool {
    let usable_w_pt = page_w_pt - 2.0 * margin_pt;
    let max_chars = (usable_w_pt / (style.size * style.glyph_width)) as usize;
    let mut fitted = true;
    for line in wrap_text(&ascii_fold(text), max_chars) {
        fitted &= push_line(ops, style, &line, page_w_pt, margin_pt, cursor_y);
    }
    fitted
}

fn push_line(
    ops: &mut Vec<Op>,
    style: &TextStyle,
    line: &str,
    page_w_pt: f32,
    margin_pt: f32,
    cursor_y: &mut f32,
) -> bool {
    let next_y = *cursor_y - style.line_height();
    if next_y < margin_pt {
        return false;
    }
    *cursor_y = next_y;

    let est_width = line.chars().count() as f32 * style.size * style.glyph_width;
    let x = ((page_w_pt - est_width) / 2.0).max(margin_pt);

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(next_y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(style.size),
        font: style.font.clone(),
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(line.to_string())],
        font: style.font.clone(),
    });
    ops.push(Op::EndTextSection);
    true
}
