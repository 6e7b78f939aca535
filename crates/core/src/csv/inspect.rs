use super::{CsvFormat, CsvInspection};

pub(crate) const BOM: char = '\u{feff}';

/// Splits trimmed content into lines, dropping `\r` from CRLF endings.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    content
        .trim_start_matches(BOM)
        .trim()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Returns the remainder of a `<digits>|...` line, if it has that prefix.
pub(crate) fn strip_row_number(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('|')
}

/// Removes a BOM and a leading row number from a data line.
pub(crate) fn clean_line(line: &str) -> &str {
    let line = line.trim_start_matches(BOM);
    strip_row_number(line).unwrap_or(line)
}

fn clean_header(raw: &str) -> String {
    let quotes: &[char] = &['"', '\''];
    let raw = raw.trim().trim_start_matches(BOM);
    let unquoted = raw.strip_prefix(quotes).unwrap_or(raw);
    let unquoted = unquoted.strip_suffix(quotes).unwrap_or(unquoted);
    unquoted.trim().to_string()
}

/// Splits one comma-delimited line, honoring double quotes and `""` escapes.
/// Fields are trimmed.
#[must_use]
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Sniffs the delimiter and header row of CSV content.
///
/// A header of the form `1|a,b,c` is the API's numbered layout and counts as
/// comma-delimited. Otherwise whichever of `|` and `,` appears more often in
/// the header wins, with ties going to comma.
#[must_use]
pub fn inspect(content: &str) -> CsvInspection {
    let lines = split_lines(content);
    let Some(first) = lines.first().filter(|l| !l.trim().is_empty()) else {
        return CsvInspection::rejected("File is empty");
    };
    let header = first.trim_start_matches(BOM);
    let row_count = lines.len() - 1;

    let (format, raw_headers) = if let Some(rest) = strip_row_number(header) {
        (CsvFormat::Comma, parse_line(rest))
    } else {
        let commas = header.matches(',').count();
        let pipes = header.matches('|').count();
        if pipes > commas {
            (
                CsvFormat::Pipe,
                header.split('|').map(|h| h.trim().to_string()).collect(),
            )
        } else if commas > 0 {
            (CsvFormat::Comma, parse_line(header))
        } else {
            return CsvInspection::rejected(
                "Unable to detect CSV format (no commas or pipes found)",
            );
        }
    };

    let headers: Vec<String> = raw_headers.iter().map(|h| clean_header(h)).collect();
    CsvInspection {
        is_valid: !headers.is_empty(),
        format,
        headers,
        missing_columns: Vec::new(),
        row_count,
        errors: Vec::new(),
    }
}

/// Checks an inspection against required columns, case-insensitively.
#[must_use]
pub fn validate_columns(mut inspection: CsvInspection, required: &[&str]) -> CsvInspection {
    let present: Vec<String> = inspection
        .headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let missing: Vec<String> = required
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !present.contains(c))
        .collect();

    if !missing.is_empty() {
        inspection
            .errors
            .push(format!("Missing required columns: {}", missing.join(", ")));
    }
    inspection.is_valid = inspection.is_valid && inspection.errors.is_empty();
    inspection.missing_columns = missing;
    inspection
}

/// Full pre-upload check: sniff, required columns, and allowed delimiters.
#[must_use]
pub fn validate(
    content: &str,
    required: &[&str],
    allowed_formats: Option<&[CsvFormat]>,
) -> CsvInspection {
    let mut result = validate_columns(inspect(content), required);
    if let Some(allowed) = allowed_formats {
        if !allowed.contains(&result.format) {
            let names: Vec<&str> = allowed.iter().map(|f| f.as_str()).collect();
            result.errors.push(format!(
                "Format '{}' not allowed. Allowed formats: {}",
                result.format,
                names.join(", ")
            ));
            result.is_valid = false;
        }
    }
    result
}
