use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Serializes `header` followed by `records`, quoting every field.
///
/// Quotes inside a field are doubled. Records are joined with `\n` and the
/// output carries no trailing newline.
pub fn write_quoted_csv<I, R>(header: &[String], records: I) -> Result<String, csv::Error>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for record in records {
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn csv_escapes_double_quotes() {
        let csv = write_quoted_csv(&header(&["a"]), [vec!["say \"hello\""]]).unwrap();
        assert_eq!(csv, "\"a\"\n\"say \"\"hello\"\"\"");
    }

    #[test]
    fn csv_handles_comma_in_fields() {
        let csv = write_quoted_csv(&header(&["name"]), [vec!["Doe, John"]]).unwrap();
        assert_eq!(csv, "\"name\"\n\"Doe, John\"");
    }

    #[test]
    fn csv_quotes_empty_and_dash_fields() {
        let csv = write_quoted_csv(&header(&["x", "y"]), [vec!["", "-"]]).unwrap();
        assert_eq!(csv, "\"x\",\"y\"\n\"\",\"-\"");
    }

    #[test]
    fn csv_header_only_when_no_records() {
        let records: Vec<Vec<String>> = Vec::new();
        let csv = write_quoted_csv(&header(&["x"]), records).unwrap();
        assert_eq!(csv, "\"x\"");
    }

    #[test]
    fn csv_handles_unicode() {
        let csv = write_quoted_csv(&header(&["name"]), [vec!["日本語テスト"]]).unwrap();
        assert_eq!(csv, "\"name\"\n\"日本語テスト\"");
    }
}
