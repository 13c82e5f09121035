// History pane: a user's past uploads bucketed by recency into Today /
// Yesterday / Older, newest first within each bucket.

use crate::models::UploadRecord;
use chrono::{DateTime, Local, NaiveDate, Utc};

pub const GUEST_PLACEHOLDER: &str = "Guest uploads are analyzed but not saved.";
pub const SIGNED_OUT_PLACEHOLDER: &str = "Please login to see your files.";
pub const EMPTY_PLACEHOLDER: &str = "No files uploaded yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Today,
    Yesterday,
    Older,
}

impl Bucket {
    pub fn title(&self) -> &'static str {
        match self {
            Bucket::Today => "Today",
            Bucket::Yesterday => "Yesterday",
            Bucket::Older => "Older",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub doc_id: String,
    pub file_name: String,
    pub display_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryGroup {
    pub bucket: Bucket,
    pub rows: Vec<HistoryRow>,
}

/// What the history section renders: either a placeholder line or the
/// non-empty recency groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPane {
    Placeholder(&'static str),
    Groups(Vec<HistoryGroup>),
}

impl HistoryPane {
    /// Buckets records (already newest-first) against today's local
    /// calendar date, skipping empty groups.
    pub fn build(records: &[UploadRecord], today: NaiveDate) -> Self {
        if records.is_empty() {
            return HistoryPane::Placeholder(EMPTY_PLACEHOLDER);
        }

        let yesterday = today.pred_opt().unwrap_or(today);
        let mut groups: Vec<HistoryGroup> = [Bucket::Today, Bucket::Yesterday, Bucket::Older]
            .into_iter()
            .map(|bucket| HistoryGroup {
                bucket,
                rows: Vec::new(),
            })
            .collect();

        for record in records {
            let date = local_date(&record.uploaded_at);
            let slot = if date == today {
                0
            } else if date == yesterday {
                1
            } else {
                2
            };
            groups[slot].rows.push(HistoryRow {
                doc_id: record.id.clone(),
                file_name: record.file_name.clone(),
                display_date: display_date(&record.uploaded_at),
            });
        }

        groups.retain(|g| !g.rows.is_empty());
        HistoryPane::Groups(groups)
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }
}

fn local_date(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

fn display_date(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%b %d, %Y %H:%M")
        .to_string()
}
