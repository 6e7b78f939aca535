use super::inspect::{BOM, clean_line, inspect, parse_line, split_lines, strip_row_number};
use super::CsvFormat;

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Rewrites content into `target` delimiters.
///
/// Row-number prefixes and BOMs are dropped. Content whose format cannot be
/// detected is returned unchanged.
#[must_use]
pub fn normalize(content: &str, target: CsvFormat) -> String {
    let detected = inspect(content);
    if !detected.is_valid || detected.format == CsvFormat::Unknown || target == CsvFormat::Unknown
    {
        return content.to_string();
    }

    let lines: Vec<String> = split_lines(content)
        .into_iter()
        .map(clean_line)
        .map(|line| {
            if detected.format == target {
                return line.to_string();
            }
            let fields: Vec<String> = match detected.format {
                CsvFormat::Pipe => line.split('|').map(|f| f.trim().to_string()).collect(),
                _ => parse_line(line),
            };
            match target {
                CsvFormat::Pipe => fields.join("|"),
                _ => fields
                    .iter()
                    .map(|f| quote_field(f))
                    .collect::<Vec<_>>()
                    .join(","),
            }
        })
        .collect();
    lines.join("\n")
}

/// Converts content into the upload API's numbered-row layout:
/// `1|<bom>header` then `<n>|row` for each non-empty line, where `n` is the
/// line's position in the original file. Already-numbered content is left
/// as is.
#[must_use]
pub fn to_api_format(content: &str) -> String {
    let lines = split_lines(content);
    if lines
        .first()
        .is_some_and(|first| strip_row_number(first).is_some())
    {
        return content.to_string();
    }

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let row = index + 1;
            if index == 0 && !line.starts_with(BOM) {
                format!("{row}|{BOM}{line}")
            } else {
                format!("{row}|{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (name, "csv"),
    }
}

/// `lessons.csv` → `lessons_pipe.csv`.
#[must_use]
pub fn normalized_file_name(original: &str, target: CsvFormat) -> String {
    let (stem, ext) = split_extension(original);
    format!("{stem}_{target}.{ext}")
}

/// `lessons.csv` → `lessons_api_format.csv`.
#[must_use]
pub fn api_file_name(original: &str) -> String {
    let (stem, ext) = split_extension(original);
    format!("{stem}_api_format.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_to_comma_quotes_fields_that_need_it() {
        let content = "title|problem\nAdd|1, 2 and \"3\"";
        let out = normalize(content, CsvFormat::Comma);
        assert_eq!(out, "title,problem\nAdd,\"1, 2 and \"\"3\"\"\"");
    }

    #[test]
    fn comma_to_pipe_unquotes() {
        let out = normalize("a,\"b,c\"\n1,2", CsvFormat::Pipe);
        assert_eq!(out, "a|b,c\n1|2");
    }

    #[test]
    fn same_format_only_strips_prefixes() {
        let out = normalize("\u{feff}1|a,b\n2|c,d", CsvFormat::Comma);
        assert_eq!(out, "a,b\nc,d");
    }

    #[test]
    fn undetectable_content_is_returned_unchanged() {
        assert_eq!(normalize("just text", CsvFormat::Pipe), "just text");
    }

    #[test]
    fn api_format_numbers_rows_and_marks_header() {
        let out = to_api_format("a,b\n\n1,2\n");
        assert_eq!(out, "1|\u{feff}a,b\n3|1,2");
        assert_eq!(to_api_format(&out), out);
    }

    #[test]
    fn file_names_keep_extension() {
        assert_eq!(
            normalized_file_name("lessons.csv", CsvFormat::Pipe),
            "lessons_pipe.csv"
        );
        assert_eq!(api_file_name("week.1.txt"), "week.1_api_format.txt");
    }
}
