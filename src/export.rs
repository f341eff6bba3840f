use crate::app::AppState;
use crate::auth::CurrentZone;
use crate::error::AppError;
use crate::sheets::{self, CellValue, SheetRow};
use crate::views::{filter_by_zone, COL_ZONE};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Extension;
use rust_xlsxwriter::{Workbook, Worksheet};

const EXPORT_SHEET_NAME: &str = "Courier_Performance";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Serialize rows into a one-sheet workbook.
///
/// The header row is written verbatim; numeric cells stay numbers so the
/// exported file sorts and sums like the source tab.
pub fn workbook_bytes(headers: &[String], rows: &[SheetRow]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet
        .set_name(EXPORT_SHEET_NAME)
        .map_err(|e| AppError::Export(e.to_string()))?;

    for (c, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, c as u16, header.as_str())
            .map_err(|e| AppError::Export(e.to_string()))?;
    }

    for (r, row) in rows.iter().enumerate() {
        for (c, header) in headers.iter().enumerate() {
            match row.get(header) {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    worksheet
                        .write_number((r + 1) as u32, c as u16, *n)
                        .map_err(|e| AppError::Export(e.to_string()))?;
                }
                CellValue::Text(text) => {
                    worksheet
                        .write_string((r + 1) as u32, c as u16, text.as_str())
                        .map_err(|e| AppError::Export(e.to_string()))?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    workbook
        .save_to_buffer()
        .map_err(|e| AppError::Export(e.to_string()))
}

/// `GET /download` — the zone's roster rows as an xlsx attachment.
pub async fn download(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let roster = doc.tab_by_index(0)?.rows().await?;
    let mine = filter_by_zone(&roster.rows, COL_ZONE, &zone);
    let bytes = workbook_bytes(&roster.headers, &mine)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_MIME)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"Performance_{zone}.xlsx\""),
        )
        .body(axum::body::Body::from(bytes))
        .map_err(|e| AppError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_serializes_headers_and_rows() {
        let headers = vec!["zone_name".to_string(), "المحفظه".to_string()];
        let rows = vec![
            SheetRow::from_pairs([("zone_name", "Giza"), ("المحفظه", "500")]),
            SheetRow::from_pairs([("zone_name", "Giza")]),
        ];
        let bytes = workbook_bytes(&headers, &rows).expect("workbook");
        // xlsx files are zip archives.
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_row_set_still_produces_a_workbook() {
        let headers = vec!["zone_name".to_string()];
        let bytes = workbook_bytes(&headers, &[]).expect("workbook");
        assert!(bytes.starts_with(b"PK"));
    }
}
