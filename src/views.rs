use crate::app::AppState;
use crate::auth::CurrentZone;
use crate::clean::{clean_numeric, forward_fill_column};
use crate::error::AppError;
use crate::sheets::{self, SheetRow};
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Tab titles as they appear in the operations spreadsheet. The rider roster
// is addressed by position (tab 0), everything else by title.
pub const TAB_INQUIRY: &str = "مرفوعين استعلام";
pub const TAB_WALLETS: &str = "جميع المحافظ";
pub const TAB_RECONCILIATIONS: &str = "تصالحات";
pub const TAB_TARGETS: &str = "التارجت";
pub const TAB_NEW_RIDERS: &str = "تعيينات الشهر";
pub const TAB_ORDER_RESPONSES: &str = "ردود الأوردات";
pub const TAB_HIRING_RESPONSES: &str = "ردود التعيينات";
pub const TAB_REJECTED: &str = "مرفوضين استعلام";

// Column headers, looked up literally. A tab missing one of these degrades
// to empty cells rather than failing.
pub const COL_ZONE: &str = "zone_name";
pub const COL_ZONE_SPACED: &str = "Zone Name";
pub const COL_TOMORROW_SHIFTS: &str = "شيفتات الغد";
pub const COL_WALLET: &str = "المحفظه";
pub const COL_PREP_OFFICE: &str = "مقر التحضير";
pub const COL_WALLET_DATE: &str = "Date";
pub const COL_DATE: &str = "التاريخ";
pub const COL_HIRING_STATUS: &str = "الحاله";

/// Hand-over statuses that count a new rider as equipped.
pub const RECEIVED_STATUSES: [&str; 3] = ["استلم", "تم الاستلام", "Received"];

const HIGH_WALLET_THRESHOLD: f64 = 1000.0;

/// Roster counters shown on the dashboard and targets pages.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub with_shifts: usize,
    pub no_shifts: usize,
    pub high_wallet: usize,
}

/// Monthly hiring counters.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct HiringStats {
    pub total: usize,
    pub received: usize,
    pub not_received: usize,
}

/// Projection of one rejected-inquiry row.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub date: String,
    pub office: String,
    pub prep_office: String,
    pub name: String,
    pub phone: String,
    pub national_id: String,
    pub supervisor: String,
    pub reason: String,
}

/// Distinct non-empty values of `column`, in first-seen order.
pub fn distinct_values(rows: &[SheetRow], column: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for row in rows {
        let value = row.render(column);
        if value.trim().is_empty() || seen.contains(&value) {
            continue;
        }
        seen.push(value);
    }
    seen
}

/// Rows whose `column` equals `zone` exactly.
pub fn filter_by_zone(rows: &[SheetRow], column: &str, zone: &str) -> Vec<SheetRow> {
    rows.iter()
        .filter(|row| row.render(column) == zone)
        .cloned()
        .collect()
}

pub fn dashboard_stats(rows: &[SheetRow]) -> DashboardStats {
    let with_shifts = rows
        .iter()
        .filter(|r| clean_numeric(r.get(COL_TOMORROW_SHIFTS)) > 0.0)
        .count();
    DashboardStats {
        total: rows.len(),
        with_shifts,
        no_shifts: rows.len() - with_shifts,
        high_wallet: rows
            .iter()
            .filter(|r| clean_numeric(r.get(COL_WALLET)) > HIGH_WALLET_THRESHOLD)
            .count(),
    }
}

pub fn hiring_stats(rows: &[SheetRow]) -> HiringStats {
    let received = rows
        .iter()
        .filter(|r| RECEIVED_STATUSES.contains(&r.render(COL_HIRING_STATUS).as_str()))
        .count();
    HiringStats {
        total: rows.len(),
        received,
        not_received: rows.len() - received,
    }
}

/// Rows belonging to one preparation office, compared with trimmed strings
/// because the sheet carries stray whitespace around office names.
pub fn rows_for_office(rows: &[SheetRow], location: &str) -> Vec<SheetRow> {
    let wanted = location.trim();
    rows.iter()
        .filter(|row| row.render(COL_PREP_OFFICE).trim() == wanted)
        .cloned()
        .collect()
}

/// Project the rejected-inquiry tab into its fixed report fields.
pub fn rejected_rows(rows: &[SheetRow]) -> Vec<RejectedRow> {
    rows.iter()
        .map(|r| RejectedRow {
            date: r.render(COL_DATE),
            office: r.render("مكتب"),
            prep_office: r.render(COL_PREP_OFFICE),
            name: r.render("الاسم"),
            phone: r.render("رقم الهاتف"),
            national_id: r.render("الرقم القومي"),
            supervisor: r.render("اسم المشرف"),
            reason: r.render("سبب الرفض"),
        })
        .collect()
}

fn rows_as_objects(headers: &[String], rows: &[SheetRow]) -> Vec<Value> {
    rows.iter()
        .map(|row| Value::Object(row.to_object(headers)))
        .collect()
}

fn render(state: &AppState, template: &str, data: &Value) -> Result<Response, AppError> {
    let body = state
        .templates
        .render(template, data)
        .map_err(|e| AppError::Template(e.to_string()))?;
    Ok(Html(body).into_response())
}

// --- Route handlers -------------------------------------------------------

/// `GET /` — login form with every zone present in the roster tab.
pub async fn login_page(State(state): State<AppState>) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let roster = doc.tab_by_index(0)?.rows().await?;
    let zones = distinct_values(&roster.rows, COL_ZONE);
    render(&state, "login", &json!({ "zones": zones, "error": null }))
}

/// `GET /dashboard` — the zone's riders plus headline counters.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let roster = doc.tab_by_index(0)?.rows().await?;
    let mine = filter_by_zone(&roster.rows, COL_ZONE, &zone);
    let stats = dashboard_stats(&mine);

    // The hiring tab feeds one counter here; if it is missing or unreadable
    // the dashboard still renders with a zero.
    let new_count = match doc.tab_by_title(TAB_NEW_RIDERS) {
        Ok(tab) => match tab.rows().await {
            Ok(hires) => filter_by_zone(&hires.rows, COL_ZONE, &zone).len(),
            Err(_) => 0,
        },
        Err(_) => 0,
    };

    render(
        &state,
        "dashboard",
        &json!({
            "zone": zone,
            "stats": stats,
            "new_count": new_count,
            "headers": roster.headers,
            "rows": rows_as_objects(&roster.headers, &mine),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct InquiryQuery {
    pub error: Option<String>,
}

/// `GET /uploaded-inquiry` — office picker for the inquiry gate.
pub async fn uploaded_inquiry(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
    Query(query): Query<InquiryQuery>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let inquiries = doc.tab_by_title(TAB_INQUIRY)?.rows().await?;
    let locations = distinct_values(&inquiries.rows, COL_PREP_OFFICE);
    render(
        &state,
        "inquiry_auth",
        &json!({
            "zone": zone,
            "locations": locations,
            "error": query.error.is_some(),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct OfficeAuthForm {
    pub password: String,
    pub location: String,
}

/// `POST /uploaded-inquiry-auth` — office password check, then that
/// office's inquiry rows. The check is evaluated fresh on every submission
/// and grants nothing beyond this response.
pub async fn uploaded_inquiry_auth(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
    Form(form): Form<OfficeAuthForm>,
) -> Result<Response, AppError> {
    if !state
        .config
        .office_password_matches(&form.location, &form.password)
    {
        return Ok(Redirect::to("/uploaded-inquiry?error=true").into_response());
    }

    let doc = sheets::connect(&state.config).await?;
    let inquiries = doc.tab_by_title(TAB_INQUIRY)?.rows().await?;
    let filtered = rows_for_office(&inquiries.rows, &form.location);
    render(
        &state,
        "uploaded_inquiry",
        &json!({
            "zone": zone,
            "location": form.location,
            "headers": inquiries.headers,
            "rows": rows_as_objects(&inquiries.headers, &filtered),
        }),
    )
}

/// `GET /office-wallets` — wallet history across offices, dates carried
/// down through merged cells.
pub async fn office_wallets(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let mut wallets = doc.tab_by_title(TAB_WALLETS)?.rows().await?;
    forward_fill_column(&mut wallets.rows, COL_WALLET_DATE);
    render(
        &state,
        "office_wallets",
        &json!({
            "zone": zone,
            "headers": wallets.headers,
            "rows": rows_as_objects(&wallets.headers, &wallets.rows),
        }),
    )
}

/// `GET /reconciliations` — courier reconciliation log, dates carried down.
pub async fn reconciliations(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let mut recon = doc.tab_by_title(TAB_RECONCILIATIONS)?.rows().await?;
    forward_fill_column(&mut recon.rows, COL_DATE);
    render(
        &state,
        "reconciliations",
        &json!({
            "zone": zone,
            "headers": recon.headers,
            "rows": rows_as_objects(&recon.headers, &recon.rows),
        }),
    )
}

/// `GET /targets` — the zone's target row plus the roster counters.
pub async fn targets(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let target_rows = doc.tab_by_title(TAB_TARGETS)?.rows().await?;
    let target = target_rows
        .rows
        .iter()
        .find(|row| row.render(COL_ZONE) == zone)
        .map(|row| Value::Object(row.to_object(&target_rows.headers)));

    let roster = doc.tab_by_index(0)?.rows().await?;
    let stats = dashboard_stats(&filter_by_zone(&roster.rows, COL_ZONE, &zone));

    render(
        &state,
        "targets",
        &json!({
            "zone": zone,
            "target": target,
            "headers": target_rows.headers,
            "stats": stats,
        }),
    )
}

/// `GET /new-riders` — this month's hires for the zone with hand-over
/// counters.
pub async fn new_riders(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let hires = doc.tab_by_title(TAB_NEW_RIDERS)?.rows().await?;
    let mine = filter_by_zone(&hires.rows, COL_ZONE, &zone);
    let stats = hiring_stats(&mine);
    render(
        &state,
        "new_riders",
        &json!({
            "zone": zone,
            "stats": stats,
            "headers": hires.headers,
            "rows": rows_as_objects(&hires.headers, &mine),
        }),
    )
}

/// `GET /order-responses` — delivery feedback rows for the zone.
pub async fn order_responses(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let orders = doc.tab_by_title(TAB_ORDER_RESPONSES)?.rows().await?;
    let mine = filter_by_zone(&orders.rows, COL_ZONE, &zone);
    render(
        &state,
        "order_responses",
        &json!({
            "zone": zone,
            "headers": orders.headers,
            "rows": rows_as_objects(&orders.headers, &mine),
        }),
    )
}

/// `GET /new-riders-responses` — hiring-process feedback rows for the zone.
/// This tab labels its zone column differently from the rest.
pub async fn new_riders_responses(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let responses = doc.tab_by_title(TAB_HIRING_RESPONSES)?.rows().await?;
    let mine = filter_by_zone(&responses.rows, COL_ZONE_SPACED, &zone);
    render(
        &state,
        "new_riders_responses",
        &json!({
            "zone": zone,
            "headers": responses.headers,
            "rows": rows_as_objects(&responses.headers, &mine),
        }),
    )
}

/// `GET /rejected-inquiry` — the cross-zone screening blacklist. Served to
/// every zone unfiltered so supervisors can check candidates rejected
/// anywhere before re-submitting them.
pub async fn rejected_inquiry(
    State(state): State<AppState>,
    Extension(CurrentZone(zone)): Extension<CurrentZone>,
) -> Result<Response, AppError> {
    let doc = sheets::connect(&state.config).await?;
    let rejected = doc.tab_by_title(TAB_REJECTED)?.rows().await?;
    let data = rejected_rows(&rejected.rows);
    render(
        &state,
        "rejected_inquiry",
        &json!({ "zone": zone, "rows": data }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<SheetRow> {
        vec![
            SheetRow::from_pairs([
                (COL_ZONE, "Giza"),
                (COL_TOMORROW_SHIFTS, "2"),
                (COL_WALLET, "1,500"),
            ]),
            SheetRow::from_pairs([
                (COL_ZONE, "Giza"),
                (COL_TOMORROW_SHIFTS, "NA"),
                (COL_WALLET, "200"),
            ]),
            SheetRow::from_pairs([
                (COL_ZONE, "Suez"),
                (COL_TOMORROW_SHIFTS, "1"),
                (COL_WALLET, "5000"),
            ]),
        ]
    }

    #[test]
    fn distinct_values_preserve_first_seen_order() {
        let rows = vec![
            SheetRow::from_pairs([(COL_ZONE, "Giza")]),
            SheetRow::from_pairs([(COL_ZONE, "")]),
            SheetRow::from_pairs([(COL_ZONE, "Suez")]),
            SheetRow::from_pairs([(COL_ZONE, "Giza")]),
        ];
        assert_eq!(distinct_values(&rows, COL_ZONE), vec!["Giza", "Suez"]);
    }

    #[test]
    fn zone_filter_keeps_exactly_the_zone_rows() {
        let mine = filter_by_zone(&roster(), COL_ZONE, "Giza");
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.render(COL_ZONE) == "Giza"));
    }

    #[test]
    fn dashboard_stats_split_the_roster() {
        let mine = filter_by_zone(&roster(), COL_ZONE, "Giza");
        assert_eq!(
            dashboard_stats(&mine),
            DashboardStats {
                total: 2,
                with_shifts: 1,
                no_shifts: 1,
                high_wallet: 1,
            }
        );
    }

    #[test]
    fn dashboard_stats_degrade_to_zero_without_expected_columns() {
        let rows = vec![SheetRow::from_pairs([(COL_ZONE, "Giza")])];
        let stats = dashboard_stats(&rows);
        assert_eq!(stats.with_shifts, 0);
        assert_eq!(stats.no_shifts, 1);
        assert_eq!(stats.high_wallet, 0);
    }

    #[test]
    fn hiring_stats_recognize_every_received_spelling() {
        let rows = vec![
            SheetRow::from_pairs([(COL_HIRING_STATUS, "استلم")]),
            SheetRow::from_pairs([(COL_HIRING_STATUS, "تم الاستلام")]),
            SheetRow::from_pairs([(COL_HIRING_STATUS, "Received")]),
            SheetRow::from_pairs([(COL_HIRING_STATUS, "لم يستلم")]),
            SheetRow::from_pairs([(COL_ZONE, "Giza")]),
        ];
        assert_eq!(
            hiring_stats(&rows),
            HiringStats {
                total: 5,
                received: 3,
                not_received: 2,
            }
        );
    }

    #[test]
    fn office_rows_match_on_trimmed_names() {
        let rows = vec![
            SheetRow::from_pairs([(COL_PREP_OFFICE, " مكتب طلبات الهرم ")]),
            SheetRow::from_pairs([(COL_PREP_OFFICE, "مكتب طلبات الهرم")]),
            SheetRow::from_pairs([(COL_PREP_OFFICE, "مكتب طلبات التجمع")]),
        ];
        assert_eq!(rows_for_office(&rows, "مكتب طلبات الهرم ").len(), 2);
        assert_eq!(rows_for_office(&rows, "مكتب غير موجود").len(), 0);
    }

    #[test]
    fn rejected_projection_fills_missing_fields_with_blanks() {
        let rows = vec![SheetRow::from_pairs([
            (COL_DATE, "2026-05-01"),
            ("الاسم", "أحمد"),
            ("سبب الرفض", "بيانات ناقصة"),
        ])];
        let projected = rejected_rows(&rows);
        assert_eq!(projected[0].date, "2026-05-01");
        assert_eq!(projected[0].name, "أحمد");
        assert_eq!(projected[0].reason, "بيانات ناقصة");
        assert_eq!(projected[0].phone, "");
        assert_eq!(projected[0].supervisor, "");
    }
}
