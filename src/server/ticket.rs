use chrono::Datelike;
use serde::Deserialize;

/// How the date stamp in front of the sequence is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketFormat {
    /// `YMMDD`: only the last digit of the year.
    #[default]
    ShortYear,
    /// `YYMMDD`
    FullYear,
}

impl TicketFormat {
    pub fn format<D: Datelike>(&self, date: &D, seq: i32) -> String {
        let year = date.year().rem_euclid(100);

        let stamp = match self {
            TicketFormat::ShortYear => format!("{}{:02}{:02}", year % 10, date.month(), date.day()),
            TicketFormat::FullYear => format!("{:02}{:02}{:02}", year, date.month(), date.day()),
        };

        format!("{}{}", stamp, pad_sequence(seq))
    }
}

/// At least two digits, never truncated.
pub fn pad_sequence(seq: i32) -> String {
    format!("{:02}", seq)
}
