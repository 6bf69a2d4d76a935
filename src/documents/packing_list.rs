//! Packing list for one destination of a shipping load.

use std::collections::HashMap;

use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use rust_decimal::Decimal;
use serde::Serialize;

use super::format::{filename_date, format_currency, sanitize_for_filename};

pub const ROWS_PER_PAGE: usize = 34;

const PAGE_WIDTH: f32 = 792.0;
const PAGE_HEIGHT: f32 = 612.0;
const MARGIN: f32 = 36.0;
const ROW_HEIGHT: f32 = 11.0;
const TABLE_TOP: f32 = 440.0;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Debug, Clone, PartialEq)]
pub struct PackingPallet {
    pub customer_lot: Option<String>,
    pub bfx_order: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit: String,
    pub release_number: Option<String>,
}

/// Purchase order fields printed next to each group, keyed by resolved PO.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackingPoInfo {
    pub sales_order_number: Option<String>,
    pub customer_item_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipTo {
    pub name: String,
    pub address_lines: Vec<String>,
    pub client_code: String,
    pub client_name: String,
    pub sales_person: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingListHeader {
    pub company_name: String,
    pub revision: String,
    pub load_number: String,
    pub invoice_number: Option<String>,
    pub date: NaiveDate,
    pub ship_to: ShipTo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingListLine {
    pub po: String,
    pub lot_number: String,
    pub item_number: String,
    pub description: String,
    pub quantity: i64,
    pub units: String,
    pub pallets: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingList {
    pub header: PackingListHeader,
    pub lines: Vec<PackingListLine>,
    /// Unique, in first-seen order
    pub release_numbers: Vec<String>,
    /// Count of pallet records the list was built from
    pub total_pallets: i64,
}

impl PackingList {
    pub fn filename(&self) -> String {
        format!(
            "PL_{}_{}.{}.pdf",
            sanitize_for_filename(&self.header.ship_to.name),
            self.header.load_number,
            filename_date(self.header.date)
        )
    }

    pub fn page_count(&self) -> usize {
        self.lines.len().div_ceil(ROWS_PER_PAGE).max(1)
    }
}

/// Customer lot, then internal order, then `-`.
pub fn resolve_customer_po(pallet: &PackingPallet) -> String {
    [pallet.customer_lot.as_deref(), pallet.bfx_order.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or("-")
        .to_string()
}

/// Groups pallets by `(resolved PO, description)` in first-seen order. PO
/// info is looked up once, when a group is created.
pub fn build_packing_list<F>(
    header: PackingListHeader,
    pallets: &[PackingPallet],
    po_info: &HashMap<String, PackingPoInfo>,
    resolve_po: F,
) -> PackingList
where
    F: Fn(&PackingPallet) -> String,
{
    let mut lines: Vec<PackingListLine> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut release_numbers: Vec<String> = Vec::new();

    for pallet in pallets {
        let po = resolve_po(pallet);
        let key = (po.clone(), pallet.description.clone());
        let idx = *index.entry(key).or_insert_with(|| {
            let info = po_info.get(&po);
            lines.push(PackingListLine {
                lot_number: info
                    .and_then(|i| i.sales_order_number.clone())
                    .unwrap_or_else(|| "-".to_string()),
                item_number: info
                    .and_then(|i| i.customer_item_code.clone())
                    .unwrap_or_else(|| "-".to_string()),
                po,
                description: pallet.description.clone(),
                quantity: 0,
                units: pallet.unit.to_uppercase(),
                pallets: 0,
            });
            lines.len() - 1
        });

        let line = &mut lines[idx];
        line.quantity += pallet.quantity;
        line.pallets += 1;

        if let Some(release) = pallet
            .release_number
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        {
            if !release_numbers.iter().any(|r| r == release) {
                release_numbers.push(release.to_string());
            }
        }
    }

    PackingList {
        header,
        lines,
        release_numbers,
        total_pallets: pallets.len() as i64,
    }
}

/// WinAnsi code for a character, matching the `Encoding` of both fonts.
/// Latin-1 covers everything except 0x80-0x9F, where WinAnsi places
/// typographic punctuation instead of control codes.
fn win_ansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => return u8::try_from(u32::from(c)).ok(),
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// Unencodable characters print as `?`.
fn pdf_text(text: &str) -> Object {
    let bytes = text.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Rough Helvetica advance width, good enough for right alignment.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.52
}

#[derive(Default)]
struct PageWriter {
    operations: Vec<Operation>,
}

impl PageWriter {
    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        self.operations.push(Operation::new("BT", vec![]));
        self.operations
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.operations
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        self.operations
            .push(Operation::new("Tj", vec![pdf_text(text)]));
        self.operations.push(Operation::new("ET", vec![]));
    }

    fn text_right(&mut self, font: &str, size: f32, right: f32, y: f32, text: &str) {
        self.text(font, size, right - text_width(text, size), y, text);
    }

    fn rule(&mut self, y: f32) {
        self.operations.push(Operation::new("w", vec![0.5f32.into()]));
        self.operations
            .push(Operation::new("m", vec![MARGIN.into(), y.into()]));
        self.operations
            .push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
        self.operations.push(Operation::new("S", vec![]));
    }

    fn into_content(self) -> Content {
        Content {
            operations: self.operations,
        }
    }
}

struct Column {
    title: &'static str,
    x: f32,
    right_aligned: bool,
}

const COLUMNS: [Column; 7] = [
    Column { title: "PO#", x: MARGIN, right_aligned: false },
    Column { title: "LOT#", x: 140.0, right_aligned: false },
    Column { title: "ITEM#", x: 232.0, right_aligned: false },
    Column { title: "DESCRIPTION", x: 330.0, right_aligned: false },
    Column { title: "QUANTITY", x: 620.0, right_aligned: true },
    Column { title: "UNITS", x: 640.0, right_aligned: false },
    Column { title: "PALLETS", x: PAGE_WIDTH - MARGIN, right_aligned: true },
];

fn write_cell(page: &mut PageWriter, font: &str, column: &Column, y: f32, text: &str) {
    if column.right_aligned {
        page.text_right(font, 8.0, column.x, y, text);
    } else {
        page.text(font, 8.0, column.x, y, text);
    }
}

fn write_page_header(page: &mut PageWriter, list: &PackingList, page_no: usize, pages: usize) {
    let header = &list.header;
    let right = PAGE_WIDTH - MARGIN;

    page.text(BOLD, 16.0, MARGIN, 570.0, &header.company_name);
    page.text(BOLD, 14.0, PAGE_WIDTH / 2.0 - 50.0, 570.0, "PACKING LIST");
    page.text_right(REGULAR, 8.0, right, 574.0, &header.revision);
    page.text_right(
        REGULAR,
        8.0,
        right,
        563.0,
        &format!("PAGE {} OF {}", page_no, pages),
    );
    page.rule(555.0);

    let ship_to = &header.ship_to;
    let mut y = 538.0;
    page.text(BOLD, 9.0, MARGIN, y, "SHIP TO:");
    y -= 12.0;
    page.text(BOLD, 9.0, MARGIN, y, &ship_to.name);
    for line in &ship_to.address_lines {
        y -= 11.0;
        page.text(REGULAR, 9.0, MARGIN, y, line);
    }
    y -= 11.0;
    page.text(
        REGULAR,
        9.0,
        MARGIN,
        y,
        &format!("CLIENT: {} - {}", ship_to.client_code, ship_to.client_name),
    );
    if let Some(sales_person) = &ship_to.sales_person {
        y -= 11.0;
        page.text(REGULAR, 9.0, MARGIN, y, &format!("SALES: {}", sales_person));
    }

    let releases = if list.release_numbers.is_empty() {
        "-".to_string()
    } else {
        list.release_numbers.join(", ")
    };
    let metadata = [
        format!("LOAD: {}", header.load_number),
        format!(
            "INVOICE: {}",
            header.invoice_number.as_deref().unwrap_or("-")
        ),
        format!("RELEASE: {}", releases),
        format!("DATE: {}", header.date.format("%m/%d/%Y")),
    ];
    let mut y = 538.0;
    for line in &metadata {
        page.text_right(REGULAR, 9.0, right, y, line);
        y -= 12.0;
    }

    page.rule(TABLE_TOP + 12.0);
    for column in &COLUMNS {
        write_cell(page, BOLD, column, TABLE_TOP, column.title);
    }
    page.rule(TABLE_TOP - 4.0);
}

/// Letter landscape, `ROWS_PER_PAGE` lines per page, total row on the last
/// page.
pub fn render_packing_list_pdf(list: &PackingList) -> Result<Vec<u8>, lopdf::Error> {
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
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let pages = list.page_count();
    let chunks: Vec<&[PackingListLine]> = if list.lines.is_empty() {
        vec![&list.lines[..]]
    } else {
        list.lines.chunks(ROWS_PER_PAGE).collect()
    };

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for (page_idx, chunk) in chunks.iter().enumerate() {
        let mut page = PageWriter::default();
        write_page_header(&mut page, list, page_idx + 1, pages);

        let mut y = TABLE_TOP - ROW_HEIGHT - 4.0;
        for line in chunk.iter() {
            let cells = [
                line.po.clone(),
                line.lot_number.clone(),
                line.item_number.clone(),
                line.description.clone(),
                format_currency(Decimal::from(line.quantity), 0),
                line.units.clone(),
                line.pallets.to_string(),
            ];
            for (column, cell) in COLUMNS.iter().zip(cells.iter()) {
                write_cell(&mut page, REGULAR, column, y, cell);
            }
            y -= ROW_HEIGHT;
        }

        if page_idx + 1 == pages {
            page.rule(y + ROW_HEIGHT - 3.0);
            y -= 2.0;
            write_cell(&mut page, BOLD, &COLUMNS[3], y, "TOTAL");
            write_cell(
                &mut page,
                BOLD,
                &COLUMNS[6],
                y,
                &list.total_pallets.to_string(),
            );
        }

        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            page.into_content().encode()?,
        ));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let media_box: Vec<Object> = vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PackingListHeader {
        PackingListHeader {
            company_name: "BFX PACKAGING".into(),
            revision: "F-EMB-07 REV. 02".into(),
            load_number: "L-2201".into(),
            invoice_number: Some("FAC-991".into()),
            date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
            ship_to: ShipTo {
                name: "Acme Foods / Laredo".into(),
                address_lines: vec!["1200 Industrial Blvd".into(), "Laredo, TX".into()],
                client_code: "C-300".into(),
                client_name: "Acme Foods Inc".into(),
                sales_person: None,
            },
        }
    }

    fn pallet(lot: Option<&str>, order: Option<&str>, description: &str, qty: i64, release: Option<&str>) -> PackingPallet {
        PackingPallet {
            customer_lot: lot.map(str::to_string),
            bfx_order: order.map(str::to_string),
            description: description.into(),
            quantity: qty,
            unit: "bags".into(),
            release_number: release.map(str::to_string),
        }
    }

    fn po_info() -> HashMap<String, PackingPoInfo> {
        HashMap::from([(
            "PO-1".to_string(),
            PackingPoInfo {
                sales_order_number: Some("SO-10".into()),
                customer_item_code: Some("ITEM-A".into()),
            },
        )])
    }

    #[test]
    fn groups_by_po_and_description() {
        let pallets = vec![
            pallet(Some("PO-1"), None, "Bolsa 25kg", 50, Some("R-1")),
            pallet(Some("PO-1"), None, "Bolsa 25kg", 40, Some("R-2")),
            pallet(None, Some("BFX-7"), "Bolsa 25kg", 50, Some("R-1")),
            pallet(Some("PO-1"), None, "Bolsa 10kg", 50, None),
            pallet(None, None, "Rollo", 12, None),
        ];
        let list = build_packing_list(header(), &pallets, &po_info(), resolve_customer_po);

        let keys: Vec<_> = list
            .lines
            .iter()
            .map(|l| (l.po.as_str(), l.description.as_str(), l.quantity, l.pallets))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("PO-1", "Bolsa 25kg", 90, 2),
                ("BFX-7", "Bolsa 25kg", 50, 1),
                ("PO-1", "Bolsa 10kg", 50, 1),
                ("-", "Rollo", 12, 1),
            ]
        );
        assert_eq!(list.lines[0].lot_number, "SO-10");
        assert_eq!(list.lines[0].item_number, "ITEM-A");
        assert_eq!(list.lines[1].lot_number, "-");
        assert_eq!(list.release_numbers, vec!["R-1", "R-2"]);
    }

    #[test]
    fn total_pallets_matches_group_sum() {
        let pallets: Vec<_> = (0..17)
            .map(|i| pallet(Some(&format!("PO-{}", i % 3)), None, "Bolsa", 50, None))
            .collect();
        let list = build_packing_list(header(), &pallets, &po_info(), resolve_customer_po);
        assert_eq!(list.total_pallets, 17);
        assert_eq!(list.lines.iter().map(|l| l.pallets).sum::<i64>(), list.total_pallets);
    }

    #[test]
    fn filename_uses_sanitized_destination() {
        let list = build_packing_list(header(), &[], &po_info(), resolve_customer_po);
        assert_eq!(list.filename(), "PL_ACME_FOODS_LAREDO_L-2201.09.02.2026.pdf");
    }

    #[test]
    fn renders_one_page_per_block_of_rows() {
        let pallets: Vec<_> = (0..70)
            .map(|i| pallet(Some(&format!("PO-{i}")), None, "Bolsa 25kg", 50, Some("R-1")))
            .collect();
        let list = build_packing_list(header(), &pallets, &po_info(), resolve_customer_po);
        assert_eq!(list.page_count(), 3);

        let bytes = render_packing_list_pdf(&list).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn text_is_encoded_as_win_ansi() {
        let Object::String(bytes, _) = pdf_text("Pe\u{f1}a \u{20ac}5 \u{2013} \u{201c}OK\u{201d} \u{4e2d}") else {
            panic!("expected a string object");
        };
        assert_eq!(bytes, b"Pe\xf1a \x805 \x96 \x93OK\x94 ?".to_vec());
        assert_eq!(win_ansi_byte('\u{0081}'), None);
        assert_eq!(win_ansi_byte('\n'), None);
    }

    #[test]
    fn empty_list_still_renders_a_page() {
        let list = build_packing_list(header(), &[], &po_info(), resolve_customer_po);
        let bytes = render_packing_list_pdf(&list).unwrap();
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }
}
