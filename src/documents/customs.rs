//! Customs document for a shipping load.
//!
//! Pallets are grouped by `description + destination`, priced from the
//! purchase order of the first pallet in each group, and valued for customs
//! with the per-kilogram rate truncated to cents before being multiplied back
//! out. The model is built first and rendered to a workbook separately.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use serde::Serialize;

use super::format::{filename_date, to_cell};

/// Pallets holding fewer packages than this are partial.
pub const PARTIAL_PALLET_THRESHOLD: i64 = 50;
pub const DEFAULT_PIECES_PER_PALLET: i64 = 50_000;
pub const DEFAULT_PIECES_PER_PACKAGE: i64 = 1_000;
/// Pallet count of a full truck.
pub const FULL_LOAD_PALLETS: i64 = 24;
pub const FULL_LOAD_FREIGHT: Decimal = dec!(5000);

const UNASSIGNED_DESTINATION: &str = "tbd";
const GROUP_KEY_SEPARATOR: &str = "__";

/// One pallet as seen by the customs document.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomsPallet {
    pub pt_code: String,
    pub description: String,
    pub destination: Option<String>,
    /// Packages on the pallet
    pub quantity: i64,
    pub gross_weight: Option<Decimal>,
    pub net_weight: Option<Decimal>,
    pub unit: String,
    pub customer_lot: Option<String>,
}

/// Pricing looked up from the purchase order, keyed by customer lot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoPricing {
    pub sales_order_number: Option<String>,
    pub price_per_thousand: Decimal,
    pub pieces_per_pallet: Option<i64>,
    pub pieces_per_package: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageKind {
    Boxes,
    Rolls,
}

impl PackageKind {
    pub fn from_unit(unit: &str) -> Self {
        if unit.trim().eq_ignore_ascii_case("bags") {
            PackageKind::Boxes
        } else {
            PackageKind::Rolls
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            PackageKind::Boxes => "bxs",
            PackageKind::Rolls => "rolls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PalletSlot {
    /// Sequential pallet number, or `"<n> bxs"` / `"<n> rolls"` for partial pallets
    pub label: String,
    pub gross_weight: Decimal,
    pub net_weight: Decimal,
    pub is_partial: bool,
}

/// Customs valuation of one product group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CustomsValuation {
    /// `total_price / total_net_weight`, not truncated
    pub equivalent: Decimal,
    /// `equivalent` truncated (floored) to 2 decimals
    pub truncated_rate: Decimal,
    /// `truncated_rate * total_net_weight`
    pub value: Decimal,
}

impl CustomsValuation {
    /// `None` when there is no net weight to divide by.
    pub fn compute(total_price: Decimal, total_net_weight: Decimal) -> Option<Self> {
        if total_net_weight.is_zero() {
            return None;
        }
        let equivalent = total_price / total_net_weight;
        let truncated_rate = (equivalent * dec!(100)).floor() / dec!(100);
        Some(Self {
            equivalent,
            truncated_rate,
            value: truncated_rate * total_net_weight,
        })
    }
}

/// Running totals for one `(description, destination)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub description: String,
    pub destination: String,
    pub pt_code: String,
    pub customer_lot: Option<String>,
    pub sales_order_number: Option<String>,
    pub package_kind: PackageKind,
    pub price_per_thousand: Decimal,
    pub pieces_per_pallet: i64,
    pub pieces_per_package: i64,
    /// Packages a full pallet counts for
    pub packages_per_pallet: i64,
    pub slots: Vec<PalletSlot>,
    pub total_pallets: i64,
    pub total_gross_weight: Decimal,
    pub total_net_weight: Decimal,
    pub total_pieces: i64,
    pub total_boxes: i64,
    pub total_rolls: i64,
    pub total_price: Decimal,
    pub customs: Option<CustomsValuation>,
}

impl ProductSummary {
    fn new(pallet: &CustomsPallet, destination: String, pricing: Option<&PoPricing>) -> Self {
        let pieces_per_pallet = pricing
            .and_then(|p| p.pieces_per_pallet)
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_PIECES_PER_PALLET);
        let pieces_per_package = pricing
            .and_then(|p| p.pieces_per_package)
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_PIECES_PER_PACKAGE);

        Self {
            description: pallet.description.clone(),
            destination,
            pt_code: pallet.pt_code.clone(),
            customer_lot: pallet.customer_lot.clone(),
            sales_order_number: pricing.and_then(|p| p.sales_order_number.clone()),
            package_kind: PackageKind::from_unit(&pallet.unit),
            price_per_thousand: pricing.map(|p| p.price_per_thousand).unwrap_or_default(),
            pieces_per_pallet,
            pieces_per_package,
            packages_per_pallet: pieces_per_pallet / pieces_per_package,
            slots: Vec::new(),
            total_pallets: 0,
            total_gross_weight: Decimal::ZERO,
            total_net_weight: Decimal::ZERO,
            total_pieces: 0,
            total_boxes: 0,
            total_rolls: 0,
            total_price: Decimal::ZERO,
            customs: None,
        }
    }

    fn add_pallet(&mut self, pallet: &CustomsPallet) {
        let gross = pallet.gross_weight.unwrap_or_default();
        let net = pallet.net_weight.unwrap_or_default();
        let is_partial = pallet.quantity < PARTIAL_PALLET_THRESHOLD;

        let (label, packages) = if is_partial {
            (
                format!("{} {}", pallet.quantity, self.package_kind.short_label()),
                pallet.quantity,
            )
        } else {
            let number = self.slots.iter().filter(|s| !s.is_partial).count() + 1;
            (number.to_string(), self.packages_per_pallet)
        };

        match self.package_kind {
            PackageKind::Boxes => self.total_boxes += packages,
            PackageKind::Rolls => self.total_rolls += packages,
        }

        self.slots.push(PalletSlot {
            label,
            gross_weight: gross,
            net_weight: net,
            is_partial,
        });
        self.total_pallets += 1;
        self.total_gross_weight += gross;
        self.total_net_weight += net;
        self.total_pieces += pallet.quantity * self.pieces_per_package;
    }

    fn finish(&mut self) {
        self.total_price =
            Decimal::from(self.total_pieces) / dec!(1000) * self.price_per_thousand;
        self.customs = CustomsValuation::compute(self.total_price, self.total_net_weight);
    }

    pub fn total_packages(&self) -> i64 {
        self.total_boxes + self.total_rolls
    }
}

/// Freight charged for a partial truck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FreightCharge {
    pub total_pallets: i64,
    /// `FULL_LOAD_FREIGHT / FULL_LOAD_PALLETS`, printed with 4 decimals
    pub rate_per_pallet: Decimal,
    pub amount: Decimal,
}

impl FreightCharge {
    /// Below a full truck freight is prorated by pallet count; a full truck
    /// computes zero here.
    pub fn prorate(total_pallets: i64) -> Self {
        let full_load = Decimal::from(FULL_LOAD_PALLETS);
        let amount = if total_pallets < FULL_LOAD_PALLETS {
            Decimal::from(total_pallets) / full_load * FULL_LOAD_FREIGHT
        } else {
            Decimal::ZERO
        };
        Self {
            total_pallets,
            rate_per_pallet: FULL_LOAD_FREIGHT / full_load,
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationBlock {
    pub name: String,
    /// Indexes into `CustomsDocument::products`
    pub products: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LoadTotals {
    pub pallets: i64,
    pub boxes: i64,
    pub rolls: i64,
    pub gross_weight: Decimal,
    pub net_weight: Decimal,
    pub product_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomsDocument {
    pub load_number: String,
    pub date: NaiveDate,
    pub products: Vec<ProductSummary>,
    pub destinations: Vec<DestinationBlock>,
    pub totals: LoadTotals,
    pub freight: FreightCharge,
    pub grand_total: Decimal,
}

impl CustomsDocument {
    pub fn filename(&self) -> String {
        format!("{}.{}.xlsx", self.load_number, filename_date(self.date))
    }

    /// Longest pallet column across all products.
    pub fn max_slots(&self) -> usize {
        self.products
            .iter()
            .map(|p| p.slots.len())
            .max()
            .unwrap_or(0)
    }
}

pub fn group_key(description: &str, destination: Option<&str>) -> String {
    format!(
        "{}{}{}",
        description,
        GROUP_KEY_SEPARATOR,
        destination_name(destination)
    )
}

fn destination_name(destination: Option<&str>) -> String {
    destination
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(UNASSIGNED_DESTINATION)
        .to_string()
}

/// Groups the load's pallets and computes every total the document prints.
/// Groups keep the order in which they are first seen.
pub fn build_customs_document(
    load_number: &str,
    date: NaiveDate,
    pallets: &[CustomsPallet],
    pricing: &HashMap<String, PoPricing>,
) -> CustomsDocument {
    let mut products: Vec<ProductSummary> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for pallet in pallets {
        let key = group_key(&pallet.description, pallet.destination.as_deref());
        let idx = *index_by_key.entry(key).or_insert_with(|| {
            let lookup = pallet
                .customer_lot
                .as_deref()
                .and_then(|lot| pricing.get(lot));
            products.push(ProductSummary::new(
                pallet,
                destination_name(pallet.destination.as_deref()),
                lookup,
            ));
            products.len() - 1
        });
        products[idx].add_pallet(pallet);
    }

    let mut destinations: Vec<DestinationBlock> = Vec::new();
    let mut totals = LoadTotals::default();
    for (idx, product) in products.iter_mut().enumerate() {
        product.finish();

        totals.pallets += product.total_pallets;
        totals.boxes += product.total_boxes;
        totals.rolls += product.total_rolls;
        totals.gross_weight += product.total_gross_weight;
        totals.net_weight += product.total_net_weight;
        totals.product_value += product.total_price;

        match destinations.iter_mut().find(|d| d.name == product.destination) {
            Some(block) => block.products.push(idx),
            None => destinations.push(DestinationBlock {
                name: product.destination.clone(),
                products: vec![idx],
            }),
        }
    }

    let freight = FreightCharge::prorate(totals.pallets);
    let grand_total = totals.product_value + freight.amount;

    CustomsDocument {
        load_number: load_number.to_string(),
        date,
        products,
        destinations,
        totals,
        freight,
        grand_total,
    }
}

const CURRENCY_FORMAT: &str = "#,##0.00";
const FREIGHT_RATE_FORMAT: &str = "#,##0.0000";
const WEIGHT_FORMAT: &str = "0.00";
const EQUIVALENT_FORMAT: &str = "0.000000000";

struct Styles {
    title: Format,
    header: Format,
    text: Format,
    weight: Format,
    currency: Format,
    freight_rate: Format,
    equivalent: Format,
    integer: Format,
    total_label: Format,
    total_weight: Format,
    total_currency: Format,
}

impl Styles {
    fn new() -> Self {
        let bordered = Format::new().set_border(FormatBorder::Thin);
        let header = bordered
            .clone()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(Color::RGB(0xD9E1F2));
        Self {
            title: Format::new().set_bold().set_font_size(14),
            header,
            text: bordered.clone(),
            weight: bordered.clone().set_num_format(WEIGHT_FORMAT),
            currency: bordered.clone().set_num_format(CURRENCY_FORMAT),
            freight_rate: bordered.clone().set_num_format(FREIGHT_RATE_FORMAT),
            equivalent: bordered.clone().set_num_format(EQUIVALENT_FORMAT),
            integer: bordered.clone().set_num_format("#,##0"),
            total_label: bordered.clone().set_bold(),
            total_weight: bordered.clone().set_bold().set_num_format(WEIGHT_FORMAT),
            total_currency: bordered.set_bold().set_num_format(CURRENCY_FORMAT),
        }
    }
}

/// Renders the customs workbook: pallet grid grouped by destination, one
/// detail row per product, then the load summary.
pub fn render_customs_workbook(
    document: &CustomsDocument,
    company_name: &str,
) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Aduana")?;

    sheet.write_string_with_format(
        0,
        0,
        format!(
            "{} - CARGA {} - {}",
            company_name,
            document.load_number,
            document.date.format("%d/%m/%Y")
        ),
        &styles.title,
    )?;

    // Pallet grid: destination row, product row, Tarima/Bruto/Neto row.
    let mut col: u16 = 0;
    for block in &document.destinations {
        let width = (block.products.len() * 3) as u16;
        sheet.merge_range(2, col, 2, col + width - 1, &block.name.to_uppercase(), &styles.header)?;
        for &idx in &block.products {
            let product = &document.products[idx];
            sheet.merge_range(3, col, 3, col + 2, &product.description, &styles.header)?;
            sheet.write_string_with_format(4, col, "Tarima", &styles.header)?;
            sheet.write_string_with_format(4, col + 1, "Bruto", &styles.header)?;
            sheet.write_string_with_format(4, col + 2, "Neto", &styles.header)?;

            for (row_offset, slot) in product.slots.iter().enumerate() {
                let row = 5 + row_offset as u32;
                sheet.write_string_with_format(row, col, &slot.label, &styles.text)?;
                sheet.write_number_with_format(row, col + 1, to_cell(slot.gross_weight), &styles.weight)?;
                sheet.write_number_with_format(row, col + 2, to_cell(slot.net_weight), &styles.weight)?;
            }
            for row_offset in product.slots.len()..document.max_slots() {
                let row = 5 + row_offset as u32;
                for c in col..col + 3 {
                    sheet.write_blank(row, c, &styles.text)?;
                }
            }

            let total_row = 5 + document.max_slots() as u32;
            sheet.write_string_with_format(
                total_row,
                col,
                format!("{} tarimas", product.total_pallets),
                &styles.total_label,
            )?;
            sheet.write_number_with_format(
                total_row,
                col + 1,
                to_cell(product.total_gross_weight),
                &styles.total_weight,
            )?;
            sheet.write_number_with_format(
                total_row,
                col + 2,
                to_cell(product.total_net_weight),
                &styles.total_weight,
            )?;

            sheet.set_column_width(col, 12)?;
            sheet.set_column_width(col + 1, 11)?;
            sheet.set_column_width(col + 2, 11)?;
            col += 3;
        }
    }

    // Detail block
    let mut row = 5 + document.max_slots() as u32 + 3;
    let headers = [
        "Destino",
        "Descripción",
        "PT",
        "PO",
        "Orden de venta",
        "Tarimas",
        "Cajas / Rollos",
        "Piezas",
        "Precio por millar",
        "Valor total",
        "Peso bruto",
        "Peso neto",
        "Equivalente aduanal",
        "Tasa aduanal",
        "Valor aduanal",
    ];
    for (c, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(row, c as u16, *header, &styles.header)?;
    }
    row += 1;

    for product in &document.products {
        sheet.write_string_with_format(row, 0, &product.destination, &styles.text)?;
        sheet.write_string_with_format(row, 1, &product.description, &styles.text)?;
        sheet.write_string_with_format(row, 2, &product.pt_code, &styles.text)?;
        sheet.write_string_with_format(
            row,
            3,
            product.customer_lot.as_deref().unwrap_or("-"),
            &styles.text,
        )?;
        sheet.write_string_with_format(
            row,
            4,
            product.sales_order_number.as_deref().unwrap_or("-"),
            &styles.text,
        )?;
        sheet.write_number_with_format(row, 5, product.total_pallets as f64, &styles.integer)?;
        sheet.write_string_with_format(
            row,
            6,
            format!(
                "{} {}",
                product.total_packages(),
                product.package_kind.short_label()
            ),
            &styles.text,
        )?;
        sheet.write_number_with_format(row, 7, product.total_pieces as f64, &styles.integer)?;
        sheet.write_number_with_format(row, 8, to_cell(product.price_per_thousand), &styles.currency)?;
        sheet.write_number_with_format(row, 9, to_cell(product.total_price), &styles.currency)?;
        sheet.write_number_with_format(row, 10, to_cell(product.total_gross_weight), &styles.weight)?;
        sheet.write_number_with_format(row, 11, to_cell(product.total_net_weight), &styles.weight)?;
        match &product.customs {
            Some(customs) => {
                sheet.write_number_with_format(row, 12, to_cell(customs.equivalent), &styles.equivalent)?;
                sheet.write_number_with_format(row, 13, to_cell(customs.truncated_rate), &styles.currency)?;
                sheet.write_number_with_format(row, 14, to_cell(customs.value), &styles.currency)?;
            }
            None => {
                for c in 12..=14 {
                    sheet.write_string_with_format(row, c, "-", &styles.text)?;
                }
            }
        }
        row += 1;
    }

    // Load summary
    row += 1;
    let freight_line = format!(
        "Flete ({} tarimas de {})",
        document.freight.total_pallets, FULL_LOAD_PALLETS
    );
    let summary: [(&str, f64, &Format); 4] = [
        (
            "Valor total de producto",
            to_cell(document.totals.product_value),
            &styles.currency,
        ),
        (freight_line.as_str(), to_cell(document.freight.amount), &styles.currency),
        (
            "Flete por tarima",
            to_cell(document.freight.rate_per_pallet),
            &styles.freight_rate,
        ),
        ("Total general", to_cell(document.grand_total), &styles.total_currency),
    ];
    for (label, value, format) in summary {
        sheet.write_string_with_format(row, 0, label, &styles.total_label)?;
        sheet.write_number_with_format(row, 1, value, format)?;
        row += 1;
    }

    row += 1;
    let counts: [(&str, f64, &Format); 5] = [
        ("Total tarimas", document.totals.pallets as f64, &styles.integer),
        ("Total cajas", document.totals.boxes as f64, &styles.integer),
        ("Total rollos", document.totals.rolls as f64, &styles.integer),
        ("Peso bruto total", to_cell(document.totals.gross_weight), &styles.total_weight),
        ("Peso neto total", to_cell(document.totals.net_weight), &styles.total_weight),
    ];
    for (label, value, format) in counts {
        sheet.write_string_with_format(row, 0, label, &styles.total_label)?;
        sheet.write_number_with_format(row, 1, value, format)?;
        row += 1;
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pallet(description: &str, destination: Option<&str>, quantity: i64, net: Decimal) -> CustomsPallet {
        CustomsPallet {
            pt_code: "PT-1001".into(),
            description: description.into(),
            destination: destination.map(str::to_string),
            quantity,
            gross_weight: Some(net + dec!(20)),
            net_weight: Some(net),
            unit: "bags".into(),
            customer_lot: Some("PO-77".into()),
        }
    }

    fn pricing() -> HashMap<String, PoPricing> {
        HashMap::from([(
            "PO-77".to_string(),
            PoPricing {
                sales_order_number: Some("SO-5521".into()),
                price_per_thousand: dec!(812.50),
                pieces_per_pallet: Some(50_000),
                pieces_per_package: Some(1_000),
            },
        )])
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    #[test]
    fn full_and_partial_pallets_are_labeled_and_counted() {
        let pallets = vec![
            pallet("Bolsa 25kg", Some("Monterrey"), 50, dec!(500)),
            pallet("Bolsa 25kg", Some("Monterrey"), 50, dec!(500)),
            pallet("Bolsa 25kg", Some("Monterrey"), 12, dec!(120)),
        ];
        let doc = build_customs_document("L-100", date(), &pallets, &pricing());

        assert_eq!(doc.products.len(), 1);
        let product = &doc.products[0];
        let labels: Vec<_> = product.slots.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "12 bxs"]);
        assert_eq!(product.packages_per_pallet, 50);
        assert_eq!(product.total_boxes, 2 * product.packages_per_pallet + 12);
        assert_eq!(product.total_rolls, 0);
        assert_eq!(product.total_pieces, 112_000);
        assert_eq!(product.total_price, dec!(91000));
    }

    #[test]
    fn groups_by_description_and_destination_with_tbd_fallback() {
        let pallets = vec![
            pallet("Bolsa 25kg", Some("Monterrey"), 50, dec!(500)),
            pallet("Bolsa 25kg", None, 50, dec!(500)),
            pallet("Rollo 30cm", Some("Monterrey"), 50, dec!(400)),
            pallet("Bolsa 25kg", Some(" "), 40, dec!(400)),
        ];
        let doc = build_customs_document("L-101", date(), &pallets, &pricing());

        let keys: Vec<_> = doc
            .products
            .iter()
            .map(|p| group_key(&p.description, Some(&p.destination)))
            .collect();
        assert_eq!(
            keys,
            vec!["Bolsa 25kg__Monterrey", "Bolsa 25kg__tbd", "Rollo 30cm__Monterrey"]
        );
        assert_eq!(doc.products[1].total_pallets, 2);
        assert_eq!(doc.destinations.len(), 2);
        assert_eq!(doc.destinations[0].products, vec![0, 2]);
    }

    #[test]
    fn lookup_miss_uses_default_pallet_geometry() {
        let mut p = pallet("Rollo 30cm", Some("Saltillo"), 50, dec!(300));
        p.unit = "rolls".into();
        p.customer_lot = Some("UNKNOWN".into());
        let doc = build_customs_document("L-102", date(), &[p], &pricing());

        let product = &doc.products[0];
        assert_eq!(product.pieces_per_pallet, DEFAULT_PIECES_PER_PALLET);
        assert_eq!(product.pieces_per_package, DEFAULT_PIECES_PER_PACKAGE);
        assert_eq!(product.price_per_thousand, Decimal::ZERO);
        assert_eq!(product.total_rolls, 50);
        assert_eq!(product.total_price, Decimal::ZERO);
    }

    #[test]
    fn customs_value_truncates_rate_before_multiplying() {
        let valuation = CustomsValuation::compute(dec!(1000), dec!(3)).unwrap();
        assert_eq!(valuation.truncated_rate, dec!(333.33));
        assert_eq!(valuation.value, dec!(999.99));
        assert!(valuation.equivalent > dec!(333.333333333));
        assert!(CustomsValuation::compute(dec!(1000), Decimal::ZERO).is_none());
    }

    #[test]
    fn zero_net_weight_skips_customs_valuation() {
        let mut p = pallet("Bolsa 25kg", Some("Monterrey"), 50, Decimal::ZERO);
        p.net_weight = None;
        let doc = build_customs_document("L-103", date(), &[p], &pricing());
        assert!(doc.products[0].customs.is_none());
    }

    #[test]
    fn freight_is_prorated_below_a_full_load() {
        assert_eq!(FreightCharge::prorate(12).amount, dec!(2500));
        assert_eq!(FreightCharge::prorate(24).amount, Decimal::ZERO);
        assert_eq!(FreightCharge::prorate(30).amount, Decimal::ZERO);
        assert_eq!(
            super::super::format::format_currency(FreightCharge::prorate(1).rate_per_pallet, 4),
            "208.3333"
        );
    }

    #[test]
    fn grand_total_adds_freight_to_product_value() {
        let pallets: Vec<_> = (0..12)
            .map(|_| pallet("Bolsa 25kg", Some("Monterrey"), 50, dec!(500)))
            .collect();
        let doc = build_customs_document("L-104", date(), &pallets, &pricing());
        assert_eq!(doc.totals.pallets, 12);
        assert_eq!(doc.freight.amount, dec!(2500));
        assert_eq!(doc.grand_total, doc.totals.product_value + dec!(2500));
    }

    #[test]
    fn workbook_renders_as_zip_container() {
        let pallets = vec![
            pallet("Bolsa 25kg", Some("Monterrey"), 50, dec!(500)),
            pallet("Bolsa 25kg", Some("Laredo"), 7, dec!(70)),
        ];
        let doc = build_customs_document("L-105", date(), &pallets, &pricing());
        let bytes = render_customs_workbook(&doc, "BFX PACKAGING").unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(doc.filename(), "L-105.04.05.2026.xlsx");
    }

    proptest! {
        #[test]
        fn customs_value_matches_truncation_formula(
            price_cents in 1i64..50_000_000,
            net_centikilos in 1i64..5_000_000,
        ) {
            let price = Decimal::new(price_cents, 2);
            let net = Decimal::new(net_centikilos, 2);
            let valuation = CustomsValuation::compute(price, net).unwrap();
            let expected = (price / net * dec!(100)).floor() / dec!(100) * net;
            prop_assert_eq!(valuation.value, expected);
            prop_assert_eq!(valuation.equivalent, price / net);
            prop_assert!(valuation.value <= price);
        }

        #[test]
        fn total_price_follows_pieces_per_thousand(
            quantities in proptest::collection::vec(1i64..80, 1..30),
            price_cents in 0i64..200_000,
        ) {
            let mut prices = pricing();
            prices.get_mut("PO-77").unwrap().price_per_thousand = Decimal::new(price_cents, 2);
            let pallets: Vec<_> = quantities
                .iter()
                .map(|q| pallet("Bolsa 25kg", Some("Monterrey"), *q, dec!(10)))
                .collect();
            let doc = build_customs_document("L-P", date(), &pallets, &prices);
            let product = &doc.products[0];
            let pieces: i64 = quantities.iter().map(|q| q * 1_000).sum();
            prop_assert_eq!(product.total_pieces, pieces);
            prop_assert_eq!(
                product.total_price,
                Decimal::from(pieces) / dec!(1000) * Decimal::new(price_cents, 2)
            );
        }
    }
}
