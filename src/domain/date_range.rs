use chrono::NaiveDate;

/// Accepted input length, `DD/MM/YYYY` or `DD-MM-YYYY`.
const DATE_INPUT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn parse(from: &str, to: &str) -> Result<Self, String> {
        let from = parse_input_date(from)?;
        let to = parse_input_date(to)?;

        if from > to {
            return Err(format!(
                "Start date {} is after end date {}.",
                from.format("%d/%m/%Y"),
                to.format("%d/%m/%Y")
            ));
        }

        Ok(DateRange { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Parses a user supplied date. Only the two fixed-width layouts are accepted,
/// so `1/1/2024` is rejected even though chrono could read it.
pub fn parse_input_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    let invalid = || format!("Invalid date '{}', expected DD/MM/YYYY or DD-MM-YYYY.", raw);

    if raw.len() != DATE_INPUT_LEN || !raw.is_ascii() {
        return Err(invalid());
    }

    let bytes = raw.as_bytes();
    let separator = bytes[2];
    if !(separator == b'/' || separator == b'-') || bytes[5] != separator {
        return Err(invalid());
    }
    let digits_only = bytes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 2 && *i != 5)
        .all(|(_, b)| b.is_ascii_digit());
    if !digits_only {
        return Err(invalid());
    }

    let format = match separator {
        b'/' => "%d/%m/%Y",
        _ => "%d-%m-%Y",
    };

    NaiveDate::parse_from_str(raw, format).map_err(|_| invalid())
}
