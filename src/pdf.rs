//! Minimal text-only PDF rendering for the shopping list.
//!
//! Layout runs in PDF points with the origin at the bottom-left corner and is
//! kept separate from rendering so page breaking can be checked without
//! producing a document.

use std::io::Cursor;

use printpdf::{IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

pub const TOP_PT: f32 = 792.0;
pub const LEFT_PT: f32 = 72.0;
pub const BOTTOM_MARGIN_PT: f32 = 36.0;
pub const TITLE_SIZE: f32 = 14.0;
pub const LINE_SIZE: f32 = 12.0;
pub const LINE_SPACING_PT: f32 = 15.0;
const TITLE_GAP_PT: f32 = 25.0;

/// Roboto, embedded so Cyrillic and other non-Latin names render.
pub const DEFAULT_FONT: &[u8] = include_bytes!("../assets/fonts/RobotoMedium.ttf");

/// A piece of text at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub page: usize,
    pub x_pt: f32,
    pub y_pt: f32,
    pub size: f32,
    pub text: String,
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Title on the first page, then one line per entry, starting a new page
/// whenever the cursor would drop below the bottom margin.
pub fn layout(title: &str, lines: &[String]) -> Vec<PlacedText> {
    let mut placed = Vec::with_capacity(lines.len() + 1);
    placed.push(PlacedText {
        page: 0,
        x_pt: LEFT_PT,
        y_pt: TOP_PT,
        size: TITLE_SIZE,
        text: title.to_string(),
    });

    let mut page = 0;
    let mut cursor = TOP_PT - TITLE_GAP_PT;
    for line in lines {
        if cursor < BOTTOM_MARGIN_PT {
            page += 1;
            cursor = TOP_PT;
        }
        placed.push(PlacedText {
            page,
            x_pt: LEFT_PT,
            y_pt: cursor,
            size: LINE_SIZE,
            text: line.clone(),
        });
        cursor -= LINE_SPACING_PT;
    }
    placed
}

fn load_font(doc: &PdfDocumentReference, font: Option<&[u8]>) -> anyhow::Result<IndirectFontRef> {
    doc.add_external_font(Cursor::new(font.unwrap_or(DEFAULT_FONT)))
        .map_err(|e| anyhow::anyhow!("failed to load font: {e:?}"))
}

/// Render `title` and `lines` to PDF bytes. `font` is raw TTF data; the bundled Roboto when `None`.
pub fn render(title: &str, lines: &[String], font: Option<&[u8]>) -> anyhow::Result<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Page 1",
    );
    let font = load_font(&doc, font)?;

    let mut pages = vec![(first_page, first_layer)];
    for item in layout(title, lines) {
        while pages.len() <= item.page {
            let name = format!("Page {}", pages.len() + 1);
            pages.push(doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), name));
        }
        let (page, layer) = pages[item.page];
        doc.get_page(page).get_layer(layer).use_text(
            item.text,
            item.size,
            pt_to_mm(item.x_pt),
            pt_to_mm(item.y_pt),
            &font,
        );
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow::anyhow!("failed to write pdf: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Item {i} - 1 g")).collect()
    }

    #[test]
    fn title_then_lines_on_first_page() {
        let placed = layout("Shopping list", &lines(2));
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[0].size, TITLE_SIZE);
        assert_eq!(placed[0].y_pt, TOP_PT);
        assert_eq!(placed[1].y_pt, 767.0);
        assert_eq!(placed[2].y_pt, 752.0);
        assert!(placed.iter().all(|p| p.page == 0));
    }

    #[test]
    fn breaks_page_at_bottom_margin() {
        // 767, 752, ... 47 fits 49 lines on the first page.
        let placed = layout("Shopping list", &lines(50));
        let first_page = placed.iter().filter(|p| p.page == 0).count();
        assert_eq!(first_page, 50);
        let last = placed.last().expect("placed line");
        assert_eq!(last.page, 1);
        assert_eq!(last.y_pt, TOP_PT);
        assert!(placed.iter().all(|p| p.y_pt >= BOTTOM_MARGIN_PT));
    }

    #[test]
    fn many_lines_span_several_pages() {
        let placed = layout("Shopping list", &lines(200));
        let pages = placed.iter().map(|p| p.page).max().unwrap_or_default();
        assert_eq!(pages, 3);
    }

    #[test]
    fn renders_pdf_bytes() {
        let bytes = render("Shopping list", &lines(60), None).expect("pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_non_latin_lines_with_default_font() {
        let lines = vec!["Соль - 5 г".to_string(), "Мука - 200 г".to_string()];
        let bytes = render("Список покупок", &lines, None).expect("pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn explicit_font_bytes_are_used() {
        let bytes = render("Shopping list", &lines(3), Some(DEFAULT_FONT)).expect("pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
