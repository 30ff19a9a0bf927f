//! PDF summary: title, the four indicators, then the commission subtotal of
//! every client. Pages break automatically at the bottom margin.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::config::ReportConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::ledger::summary::DashboardReport;
use crate::output::format_money;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const BOTTOM_MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 10.0;
const CELL_WIDTH_MM: f32 = 200.0;
const FONT_SIZE_PT: f32 = 12.0;
const PT_TO_MM: f32 = 0.352_778;
// Average Helvetica glyph advance, in ems.
const AVG_GLYPH_EM: f32 = 0.5;
const LAYER_NAME: &str = "Resumo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    // Distance from the top edge of the current page.
    cursor_mm: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> DashboardResult<Self> {
        let (doc, page, layer) = PdfDocument::new(
            latin1(title),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            LAYER_NAME,
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DashboardError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            font,
            cursor_mm: MARGIN_MM,
            pages: 1,
        })
    }

    fn line(&mut self, text: &str, align: Align) {
        if self.cursor_mm + LINE_HEIGHT_MM > PAGE_HEIGHT_MM - BOTTOM_MARGIN_MM {
            self.new_page();
        }
        let text = latin1(text);
        let x = match align {
            Align::Left => MARGIN_MM,
            Align::Center => {
                MARGIN_MM + ((CELL_WIDTH_MM - approx_text_width_mm(&text)) / 2.0).max(0.0)
            }
        };
        // Baseline sits a little below the vertical middle of the cell.
        let baseline_from_top = self.cursor_mm + LINE_HEIGHT_MM * 0.65;
        self.layer.use_text(
            text,
            FONT_SIZE_PT,
            Mm(x),
            Mm(PAGE_HEIGHT_MM - baseline_from_top),
            &self.font,
        );
        self.cursor_mm += LINE_HEIGHT_MM;
    }

    fn gap(&mut self, mm: f32) {
        self.cursor_mm += mm;
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_mm = MARGIN_MM;
        self.pages += 1;
    }

    fn finish(self) -> DashboardResult<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| DashboardError::Pdf(e.to_string()))
    }
}

enum Block {
    Text(String, Align),
    Gap(f32),
}

fn layout(report: &DashboardReport, settings: &ReportConfig) -> Vec<Block> {
    let money = |value: f64| format_money(&settings.currency_symbol, value);

    let mut blocks = vec![
        Block::Text(settings.pdf_title.clone(), Align::Center),
        Block::Gap(LINE_HEIGHT_MM),
    ];
    for (label, value) in report.summary.labelled() {
        blocks.push(Block::Text(format!("{label}: {}", money(value)), Align::Left));
    }
    blocks.push(Block::Gap(LINE_HEIGHT_MM));
    blocks.push(Block::Text(settings.client_heading.clone(), Align::Left));
    blocks.push(Block::Gap(LINE_HEIGHT_MM / 2.0));
    for group in &report.commission_by_client {
        blocks.push(Block::Text(
            format!("{}: {}", group.key, money(group.value)),
            Align::Left,
        ));
    }
    blocks
}

/// Renders the summary of `report` as PDF bytes.
pub fn render_pdf(report: &DashboardReport, settings: &ReportConfig) -> DashboardResult<Vec<u8>> {
    let mut writer = PageWriter::new(&settings.pdf_title)?;
    for block in layout(report, settings) {
        match block {
            Block::Text(text, align) => writer.line(&text, align),
            Block::Gap(mm) => writer.gap(mm),
        }
    }
    tracing::debug!(
        pages = writer.pages,
        clients = report.commission_by_client.len(),
        "rendered pdf summary"
    );
    writer.finish()
}

/// Text lines in the order [`render_pdf`] lays them out, as they will be
/// encoded.
#[cfg(test)]
fn pdf_lines(report: &DashboardReport, settings: &ReportConfig) -> Vec<String> {
    layout(report, settings)
        .into_iter()
        .filter_map(|block| match block {
            Block::Text(text, _) => Some(latin1(&text)),
            Block::Gap(_) => None,
        })
        .collect()
}

/// The built-in PDF fonts only cover Latin-1; anything outside it is dropped.
pub fn latin1(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) <= 0xFF).collect()
}

fn approx_text_width_mm(text: &str) -> f32 {
    text.chars().count() as f32 * FONT_SIZE_PT * AVG_GLYPH_EM * PT_TO_MM
}
