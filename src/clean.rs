use crate::sheets::{CellValue, SheetRow};

/// Sentinel strings the sheet uses for "no value". All coerce to zero.
const EMPTY_SENTINELS: [&str; 4] = ["NA", "#N/A", "N/A", "0"];

/// Coerce a raw cell into a number.
///
/// Empty cells and the sheet's not-available sentinels become 0. Anything
/// else is stripped down to digits, `.` and `-` (which also removes
/// thousands separators and trailing units) and parsed as a float; parse
/// failures become 0.
///
/// Idempotent: feeding the rendered result back in returns the same number.
pub fn clean_numeric(value: &CellValue) -> f64 {
    match value {
        CellValue::Empty => 0.0,
        CellValue::Number(n) => *n,
        CellValue::Text(text) => clean_numeric_str(text),
    }
}

/// String core of [`clean_numeric`], usable on any raw cell text.
pub fn clean_numeric_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || EMPTY_SENTINELS.contains(&trimmed) {
        return 0.0;
    }

    let numeric: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    numeric.parse::<f64>().unwrap_or(0.0)
}

/// Carry the last non-empty value of `column` down through blank cells.
///
/// Merged date cells export flat: only the first row of a merged run holds
/// the date, the rest come through blank (or as a literal `"0"`). A single
/// left-to-right pass rewrites those cells with the most recently seen
/// value; rows before the first real value get the empty string.
pub fn forward_fill_column(rows: &mut [SheetRow], column: &str) {
    let mut last_seen = CellValue::Empty;
    for row in rows.iter_mut() {
        let rendered = row.render(column);
        if rendered.is_empty() || rendered == "0" {
            row.set(column, last_seen.clone());
        } else {
            last_seen = row.get(column).clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cleaning_table() {
        assert_eq!(clean_numeric_str("1,234"), 1234.0);
        assert_eq!(clean_numeric_str("NA"), 0.0);
        assert_eq!(clean_numeric_str("#N/A"), 0.0);
        assert_eq!(clean_numeric_str("N/A"), 0.0);
        assert_eq!(clean_numeric_str(""), 0.0);
        assert_eq!(clean_numeric_str("   "), 0.0);
        assert_eq!(clean_numeric_str("abc"), 0.0);
        assert_eq!(clean_numeric_str("12.5kg"), 12.5);
        assert_eq!(clean_numeric_str("0"), 0.0);
        assert_eq!(clean_numeric_str("-42"), -42.0);
        assert_eq!(clean_numeric_str(" 1,500 EGP "), 1500.0);
    }

    #[test]
    fn numeric_cleaning_is_idempotent() {
        for raw in ["1,234", "NA", "", "abc", "12.5kg", "0", "-42", "7.25"] {
            let once = clean_numeric_str(raw);
            let twice = clean_numeric_str(&once.to_string());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn tagged_cells_coerce_too() {
        assert_eq!(clean_numeric(&CellValue::Empty), 0.0);
        assert_eq!(clean_numeric(&CellValue::Number(9.5)), 9.5);
        assert_eq!(clean_numeric(&CellValue::Text("2,000".to_string())), 2000.0);
    }

    fn date_rows(dates: &[&str]) -> Vec<SheetRow> {
        dates
            .iter()
            .map(|d| SheetRow::from_pairs([("d", *d)]))
            .collect()
    }

    fn rendered(rows: &[SheetRow]) -> Vec<String> {
        rows.iter().map(|r| r.render("d")).collect()
    }

    #[test]
    fn forward_fill_carries_last_seen_value() {
        let mut rows = date_rows(&["2024-01-01", "", "0", "2024-01-02"]);
        forward_fill_column(&mut rows, "d");
        assert_eq!(
            rendered(&rows),
            vec!["2024-01-01", "2024-01-01", "2024-01-01", "2024-01-02"]
        );
    }

    #[test]
    fn forward_fill_never_looks_ahead() {
        // Leading blanks stay blank even though a value appears later.
        let mut rows = date_rows(&["", "0", "2024-03-05", ""]);
        forward_fill_column(&mut rows, "d");
        assert_eq!(rendered(&rows), vec!["", "", "2024-03-05", "2024-03-05"]);
    }

    #[test]
    fn forward_fill_on_missing_column_is_harmless() {
        let mut rows = date_rows(&["2024-01-01"]);
        forward_fill_column(&mut rows, "other");
        assert_eq!(rows[0].render("other"), "");
        assert_eq!(rows[0].render("d"), "2024-01-01");
    }
}
