use crumb_core::DatabaseEntry;

/// Number of positional columns in a database row.
pub const COLUMN_COUNT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub entries: Vec<DatabaseEntry>,
    /// Non-blank rows with fewer than [`COLUMN_COUNT`] fields.
    pub skipped: usize,
}

/// Parse the Open Cookie Database CSV.
///
/// Columns: ID, vendor, category, cookie name, value/domain, description,
/// expiration, vendor site, privacy-policy URL, wildcard flag. A leading header
/// row (first field `ID`) is ignored.
pub fn parse_cookie_database(text: &str) -> ParseOutput {
    let mut output = ParseOutput::default();

    for (index, record) in split_records(text).into_iter().enumerate() {
        if is_blank(&record) {
            continue;
        }
        if index == 0 && record[0].trim().eq_ignore_ascii_case("id") {
            continue;
        }
        if record.len() < COLUMN_COUNT {
            log::debug!("Skipping row {} with {} fields", index + 1, record.len());
            output.skipped += 1;
            continue;
        }

        output.entries.push(entry_from_record(record));
    }

    output
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn entry_from_record(record: Vec<String>) -> DatabaseEntry {
    let mut fields = record.into_iter().map(|f| f.trim().to_string());
    let mut next = || fields.next().unwrap_or_default();

    DatabaseEntry {
        id: next(),
        vendor: next(),
        category: next(),
        cookie_name: next(),
        value: next(),
        description: next(),
        expiration: next(),
        vendor_site: next(),
        privacy_policy: next(),
        is_wildcard: parse_flag(&next()),
    }
}

fn parse_flag(text: &str) -> bool {
    matches!(text.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Split CSV text into records. Quoted fields may contain commas, newlines
/// and doubled quotes.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}
