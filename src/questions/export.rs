// PDF export of a question search
//
// Layout happens in millimetres on an A4 page and is pure; rendering turns the laid-out
// pages into a lopdf document using the standard Helvetica fonts.
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::{group_by_round, QuestionEntry, QuestionQuery};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 7.0;
const SECTION_SPACING: f32 = 10.0;
const FOOTER_OFFSET: f32 = 10.0;

const QUESTION_WRAP: usize = 80;
const META_WRAP: usize = 100;

const PT_PER_MM: f32 = 72.0 / 25.4;
/// Rough Helvetica advance width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

const BLACK: Rgb = Rgb(0, 0, 0);
const ACCENT: Rgb = Rgb(99, 102, 241);
const MUTED: Rgb = Rgb(100, 100, 100);
const FAINT: Rgb = Rgb(150, 150, 150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Left edge in mm
    pub x: f32,
    /// Baseline in mm from the top of the page
    pub y: f32,
    pub size: f32,
    pub bold: bool,
    pub color: Rgb,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<TextLine>,
}

fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_WIDTH / PT_PER_MM
}

fn centered_x(text: &str, size: f32) -> f32 {
    (PAGE_WIDTH / 2.0 - text_width_mm(text, size) / 2.0).max(MARGIN)
}

/// `Filters: Company: X, Role: Y`, or `None` when unfiltered.
pub fn filter_description(query: &QuestionQuery) -> Option<String> {
    let parts: Vec<String> = [
        query.company().map(|c| format!("Company: {}", c)),
        query.role().map(|r| format!("Role: {}", r)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("Filters: {}", parts.join(", ")))
    }
}

/// `interview-questions[-company][-role].pdf`, safe for a Content-Disposition header.
pub fn filename(query: &QuestionQuery) -> String {
    let mut name = String::from("interview-questions");
    for part in [query.company(), query.role()].into_iter().flatten() {
        name.push('-');
        name.extend(part.chars().map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        }));
    }
    name.push_str(".pdf");
    name
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN,
        }
    }

    /// Start a new page unless `required` mm still fit above the bottom margin.
    fn ensure_room(&mut self, required: f32) {
        if self.y + required > PAGE_HEIGHT - MARGIN {
            self.pages.push(Page::default());
            self.y = MARGIN;
        }
    }

    fn put(&mut self, text: String, x: f32, size: f32, bold: bool, color: Rgb) {
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(TextLine {
                text,
                x,
                y,
                size,
                bold,
                color,
            });
        }
    }
}

const HEADER_HEIGHT: f32 = LINE_HEIGHT * 1.5;

/// One numbered question with its metadata line, wrapped to the page width.
struct WrappedEntry {
    question_lines: Vec<String>,
    meta_lines: Vec<String>,
}

impl WrappedEntry {
    fn new(group_number: usize, question_number: usize, entry: &QuestionEntry) -> Self {
        let heading = format!("{}.{}. {}", group_number, question_number, entry.question);
        let meta = format!(
            "{} • {} • {} • Level: {}",
            entry.company, entry.role, entry.year, entry.level
        );
        Self {
            question_lines: textwrap::wrap(&heading, QUESTION_WRAP)
                .into_iter()
                .map(|l| l.into_owned())
                .collect(),
            meta_lines: textwrap::wrap(&meta, META_WRAP)
                .into_iter()
                .map(|l| l.into_owned())
                .collect(),
        }
    }

    fn height(&self) -> f32 {
        let lines = (self.question_lines.len() + self.meta_lines.len()) as f32;
        (lines * LINE_HEIGHT + LINE_HEIGHT * 2.0).max(LINE_HEIGHT * 4.0)
    }
}

/// Lay out `entries` into pages, footers included.
pub fn layout(entries: &[QuestionEntry], query: &QuestionQuery) -> Vec<Page> {
    let mut cursor = Cursor::new();

    let title = "Interview Questions".to_string();
    let title_x = centered_x(&title, 18.0);
    cursor.put(title, title_x, 18.0, true, BLACK);
    cursor.y += LINE_HEIGHT * 2.0;

    if let Some(filters) = filter_description(query) {
        cursor.put(filters, MARGIN, 10.0, false, BLACK);
        cursor.y += LINE_HEIGHT * 1.5;
    }

    for (group_idx, group) in group_by_round(entries).iter().enumerate() {
        let wrapped: Vec<WrappedEntry> = group
            .questions
            .iter()
            .enumerate()
            .map(|(question_idx, entry)| WrappedEntry::new(group_idx + 1, question_idx + 1, entry))
            .collect();

        // A round header never ends a page: it needs room for its first entry too
        let first_height = wrapped.first().map_or(0.0, WrappedEntry::height);
        cursor.ensure_room((HEADER_HEIGHT + first_height).max(SECTION_SPACING + LINE_HEIGHT * 3.0));
        cursor.put(
            format!("Round {}: {}", group.round_number, group.round_name),
            MARGIN,
            14.0,
            true,
            ACCENT,
        );
        cursor.y += HEADER_HEIGHT;

        for entry in wrapped {
            // The whole entry moves to the next page if it does not fit
            cursor.ensure_room(entry.height());

            for line in entry.question_lines {
                cursor.put(line, MARGIN + 5.0, 11.0, true, BLACK);
                cursor.y += LINE_HEIGHT;
            }
            for (idx, line) in entry.meta_lines.into_iter().enumerate() {
                if idx > 0 {
                    cursor.y += LINE_HEIGHT;
                }
                cursor.put(line, MARGIN + 10.0, 9.0, false, MUTED);
            }
            cursor.y += LINE_HEIGHT * 1.5;
        }

        cursor.y += SECTION_SPACING;
    }

    let mut pages = cursor.pages;
    let total_pages = pages.len();
    for (idx, page) in pages.iter_mut().enumerate() {
        let footer = format!(
            "Page {} of {} | Total Questions: {}",
            idx + 1,
            total_pages,
            entries.len()
        );
        page.lines.push(TextLine {
            x: centered_x(&footer, 8.0),
            y: PAGE_HEIGHT - FOOTER_OFFSET,
            text: footer,
            size: 8.0,
            bold: false,
            color: FAINT,
        });
    }
    pages
}

/// Encode text for a WinAnsiEncoding font. Unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn color_component(value: u8) -> Object {
    Object::Real(value as f32 / 255.0)
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut operations = Vec::new();
    for line in &page.lines {
        let font = if line.bold { "F2" } else { "F1" };
        operations.push(Operation::new(
            "rg",
            vec![
                color_component(line.color.0),
                color_component(line.color.1),
                color_component(line.color.2),
            ],
        ));
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![font.into(), Object::Real(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![
                Object::Real(line.x * PT_PER_MM),
                Object::Real((PAGE_HEIGHT - line.y) * PT_PER_MM),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    operations
}

/// Serialize laid-out pages as a PDF document.
pub fn render(pages: &[Page]) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(PAGE_WIDTH * PT_PER_MM),
                Object::Real(PAGE_HEIGHT * PT_PER_MM),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Lay out and render in one step.
pub fn export_pdf(entries: &[QuestionEntry], query: &QuestionQuery) -> Result<Vec<u8>, lopdf::Error> {
    render(&layout(entries, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Level;

    fn entry(round_number: u32, round_name: &str, question: &str) -> QuestionEntry {
        QuestionEntry {
            question: question.into(),
            company: "Google".into(),
            role: "SDE".into(),
            round_number,
            round_name: round_name.into(),
            year: 2024,
            level: Level::Medium,
        }
    }

    fn texts(page: &Page) -> Vec<&str> {
        page.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn filename_includes_filters() {
        assert_eq!(filename(&QuestionQuery::default()), "interview-questions.pdf");
        let query = QuestionQuery {
            company: Some("Google".into()),
            role: Some("SDE \"II\"".into()),
        };
        assert_eq!(filename(&query), "interview-questions-Google-SDE _II_.pdf");
    }

    #[test]
    fn filter_line_lists_present_filters() {
        let query = QuestionQuery {
            company: None,
            role: Some("SDE".into()),
        };
        assert_eq!(filter_description(&query).as_deref(), Some("Filters: Role: SDE"));
        assert!(filter_description(&QuestionQuery::default()).is_none());
    }

    #[test]
    fn single_page_layout() {
        let entries = vec![entry(2, "Technical", "LRU cache"), entry(1, "OA", "Two sum")];
        let query = QuestionQuery {
            company: Some("Google".into()),
            role: None,
        };
        let pages = layout(&entries, &query);

        assert_eq!(pages.len(), 1);
        assert_eq!(
            texts(&pages[0]),
            vec![
                "Interview Questions",
                "Filters: Company: Google",
                "Round 1: OA",
                "1.1. Two sum",
                "Google • SDE • 2024 • Level: Medium",
                "Round 2: Technical",
                "2.1. LRU cache",
                "Google • SDE • 2024 • Level: Medium",
                "Page 1 of 1 | Total Questions: 2",
            ]
        );
    }

    #[test]
    fn entries_never_cross_the_bottom_margin() {
        let entries: Vec<QuestionEntry> = (0..60)
            .map(|i| entry(1 + i / 20, "Round", &format!("Question number {}", i)))
            .collect();
        let pages = layout(&entries, &QuestionQuery::default());

        assert!(pages.len() > 1);
        for (idx, page) in pages.iter().enumerate() {
            let footer = page.lines.last().unwrap();
            assert_eq!(
                footer.text,
                format!(
                    "Page {} of {} | Total Questions: 60",
                    idx + 1,
                    pages.len()
                )
            );
            for line in &page.lines[..page.lines.len() - 1] {
                assert!(line.y <= PAGE_HEIGHT - MARGIN, "line {:?} overflows", line);
            }
        }
    }

    #[test]
    fn question_and_metadata_stay_on_one_page() {
        let entries: Vec<QuestionEntry> = (0..40)
            .map(|i| entry(1, "OA", &format!("Question {}", i)))
            .collect();
        let pages = layout(&entries, &QuestionQuery::default());

        for page in &pages {
            let body: Vec<&TextLine> = page
                .lines
                .iter()
                .filter(|l| l.size == 11.0 || l.size == 9.0)
                .collect();
            // Every question line on a page is followed by its metadata on that page
            if let Some(last) = body.last() {
                assert_eq!(last.size, 9.0);
            }
        }
    }

    #[test]
    fn round_header_is_never_last_on_a_page() {
        let mut entries: Vec<QuestionEntry> = (0..24)
            .map(|i| entry(1, "R1", &format!("Question {}", i)))
            .collect();
        entries.push(entry(2, "R2", "Closing question"));
        let pages = layout(&entries, &QuestionQuery::default());

        assert!(pages.len() > 1);
        for page in &pages {
            let body_last = page.lines.iter().rev().find(|l| l.size != 8.0).unwrap();
            assert_ne!(body_last.size, 14.0, "header {:?} ends a page", body_last.text);
        }
        let header_page = pages
            .iter()
            .position(|p| p.lines.iter().any(|l| l.text == "Round 2: R2"))
            .unwrap();
        assert!(texts(&pages[header_page]).contains(&"2.1. Closing question"));
    }

    #[test]
    fn long_questions_wrap() {
        let long = "Explain ".repeat(30);
        let pages = layout(&[entry(1, "OA", long.trim())], &QuestionQuery::default());
        let question_lines = pages[0].lines.iter().filter(|l| l.size == 11.0).count();
        assert!(question_lines > 1);
    }

    #[test]
    fn win_ansi_maps_bullet_and_replaces_unknown() {
        assert_eq!(win_ansi("a • b"), vec![b'a', b' ', 0x95, b' ', b'b']);
        assert_eq!(win_ansi("é"), vec![0xe9]);
        assert_eq!(win_ansi("中"), vec![b'?']);
    }

    #[test]
    fn rendered_document_has_one_pdf_page_per_layout_page() {
        let entries: Vec<QuestionEntry> = (0..60)
            .map(|i| entry(1, "OA", &format!("Question {}", i)))
            .collect();
        let pages = layout(&entries, &QuestionQuery::default());
        let bytes = render(&pages).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), pages.len());
    }
}
