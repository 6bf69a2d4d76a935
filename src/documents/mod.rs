//! Pure document models and their renderers. Nothing here touches the
//! database; `services::documents` gathers the rows and calls in.

pub mod customs;
pub mod format;
pub mod packing_list;

pub use customs::{build_customs_document, render_customs_workbook, CustomsDocument};
pub use packing_list::{build_packing_list, render_packing_list_pdf, PackingList};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
