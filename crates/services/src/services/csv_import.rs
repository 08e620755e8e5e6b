//! Import of historical Twitter follower counts from a CSV export.
//!
//! Required columns (any order, case-insensitive headers):
//! `date, followers_count, following_count, tweet_count`.

use chrono::NaiveDate;
use db::{
    Db, StorageError,
    models::twitter::{DailyCounts, TwitterAccount, TwitterStat},
};
use serde::Serialize;
use thiserror::Error;

const REQUIRED_COLUMNS: [&str; 4] = ["date", "followers_count", "following_count", "tweet_count"];

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV file is empty or only contains a header row")]
    Empty,
    #[error("Invalid CSV header. Required columns: date, followers_count, following_count, tweet_count")]
    MissingColumns,
    #[error("Twitter account not found. Register an account first.")]
    NoAccount,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// `imported` counts every valid row, including dates that were already
/// recorded and left untouched. `skipped` counts rows that failed to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub date: String,
    pub counts: DailyCounts,
}

/// Split one CSV line on commas outside double quotes, trimming each field.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn is_iso_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Parse the file into valid rows plus the number of rejected data lines.
pub fn parse_stats_csv(text: &str) -> Result<(Vec<StatRow>, usize), CsvImportError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() < 2 {
        return Err(CsvImportError::Empty);
    }

    let headers: Vec<String> = parse_line(lines[0])
        .into_iter()
        .map(|h| h.to_lowercase())
        .collect();
    let index_of = |name: &str| headers.iter().position(|h| h == name);
    let [date_idx, followers_idx, following_idx, tweet_idx] = match REQUIRED_COLUMNS.map(index_of) {
        [Some(a), Some(b), Some(c), Some(d)] => [a, b, c, d],
        _ => return Err(CsvImportError::MissingColumns),
    };
    let widest = date_idx.max(followers_idx).max(following_idx).max(tweet_idx);

    let mut rows = Vec::new();
    let mut skipped = 0;
    for line in &lines[1..] {
        let values = parse_line(line);
        if values.len() <= widest {
            skipped += 1;
            continue;
        }
        let parsed = (
            values[followers_idx].parse::<i64>(),
            values[following_idx].parse::<i64>(),
            values[tweet_idx].parse::<i64>(),
        );
        let date = &values[date_idx];
        match parsed {
            (Ok(followers), Ok(following), Ok(tweets)) if is_iso_date(date) => rows.push(StatRow {
                date: date.clone(),
                counts: DailyCounts {
                    followers_count: followers,
                    following_count: following,
                    tweet_count: tweets,
                },
            }),
            _ => skipped += 1,
        }
    }
    Ok((rows, skipped))
}

/// Insert each row unless that date is already recorded, then recompute the
/// day-over-day changes for the whole account. Existing dates keep their
/// stored counts.
#[tracing::instrument(skip(db, text), fields(bytes = text.len()))]
pub async fn import_twitter_stats(
    db: &Db,
    project_id: i64,
    text: &str,
) -> Result<ImportSummary, CsvImportError> {
    let (rows, skipped) = parse_stats_csv(text)?;
    let account = TwitterAccount::latest(db, project_id)
        .await?
        .ok_or(CsvImportError::NoAccount)?;

    let imported = rows.len();
    let mut inserted = 0;
    for row in rows {
        if TwitterStat::insert_if_absent(db, account.id, &row.date, row.counts).await? {
            inserted += 1;
        }
    }
    let updated = TwitterStat::recompute_changes(db, account.id).await?;
    tracing::info!(imported, inserted, skipped, updated, "twitter stats imported");

    Ok(ImportSummary { imported, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_commas_stay_in_one_field() {
        assert_eq!(
            parse_line(r#"2025-01-01, "1,200" ,"x""#),
            vec!["2025-01-01", "1,200", "x"]
        );
        assert_eq!(parse_line(""), vec![""]);
    }

    #[test]
    fn header_only_is_rejected() {
        assert!(matches!(
            parse_stats_csv("date,followers_count,following_count,tweet_count\n"),
            Err(CsvImportError::Empty)
        ));
    }

    #[test]
    fn missing_column_is_rejected() {
        assert!(matches!(
            parse_stats_csv("date,followers_count,tweet_count\n2025-01-01,1,2\n"),
            Err(CsvImportError::MissingColumns)
        ));
    }

    #[test]
    fn invalid_rows_are_counted_as_skipped() {
        let csv = "Tweet_Count,Date,Followers_Count,Following_Count\r\n\
                   5,2025-01-01,100,10\r\n\
                   5,01/02/2025,100,10\r\n\
                   x,2025-01-03,100,10\r\n\
                   5,2025-01-04\r\n\
                   \r\n\
                   7,2025-01-05,120,11\r\n";
        let (rows, skipped) = parse_stats_csv(csv).unwrap();
        assert_eq!(skipped, 3);
        assert_eq!(
            rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
            ["2025-01-01", "2025-01-05"]
        );
        assert_eq!(
            rows[1].counts,
            DailyCounts {
                followers_count: 120,
                following_count: 11,
                tweet_count: 7
            }
        );
    }
}
