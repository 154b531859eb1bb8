use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;

use crate::models::{Subject, FALLBACK_COLOR};
use crate::session::StudySession;

const HOUR_MS: u64 = 60 * 60 * 1000;

/// Total study time per `YYYY-MM-DD` day
pub fn daily_totals(sessions: &[StudySession]) -> BTreeMap<String, u64> {
    sessions.iter().fold(BTreeMap::new(), |mut totals, s| {
        *totals.entry(s.date_string.clone()).or_insert(0) += s.duration_ms;
        totals
    })
}

/// Heatmap shade of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Intensity {
    None,
    Light,
    Medium,
    Strong,
    Intense,
}

impl Intensity {
    pub fn from_ms(ms: u64) -> Self {
        match ms {
            0 => Intensity::None,
            ms if ms < HOUR_MS => Intensity::Light,
            ms if ms < 3 * HOUR_MS => Intensity::Medium,
            ms if ms < 6 * HOUR_MS => Intensity::Strong,
            _ => Intensity::Intense,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Intensity::None => '·',
            Intensity::Light => '░',
            Intensity::Medium => '▒',
            Intensity::Strong => '▓',
            Intensity::Intense => '█',
        }
    }
}

/// Six Sunday-first weeks covering `month`; cells outside the month are `None`.
/// Returns `None` for an invalid year/month.
pub fn month_grid(year: i32, month: u32) -> Option<[Option<NaiveDate>; 42]> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = first.weekday().num_days_from_sunday() as i64;
    let mut cells = [None; 42];
    for (i, cell) in cells.iter_mut().enumerate() {
        let day = first + chrono::Duration::days(i as i64 - offset);
        if day.month() == month && day.year() == year {
            *cell = Some(day);
        }
    }
    Some(cells)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSegment {
    pub subject_id: String,
    pub name: String,
    pub color: String,
    pub total_ms: u64,
    pub percentage: f64,
}

/// Share of study time per subject, largest first. Subjects missing from the
/// registry still count, labelled "Unknown".
pub fn subject_distribution(sessions: &[StudySession], subjects: &[Subject]) -> Vec<SubjectSegment> {
    let total = lifetime_total(sessions);
    if total == 0 {
        return Vec::new();
    }
    let by_id: HashMap<&str, &Subject> = subjects.iter().map(|s| (s.id.as_str(), s)).collect();

    sessions
        .iter()
        .map(|s| (s.subject_id.as_str(), s.duration_ms))
        .into_grouping_map()
        .sum()
        .into_iter()
        .map(|(id, ms)| {
            let subject = by_id.get(id);
            SubjectSegment {
                subject_id: id.to_string(),
                name: subject.map_or("Unknown".to_string(), |s| s.name.clone()),
                color: subject.map_or(FALLBACK_COLOR.to_string(), |s| s.color.clone()),
                total_ms: ms,
                percentage: ms as f64 * 100.0 / total as f64,
            }
        })
        .sorted_by(|a, b| b.total_ms.cmp(&a.total_ms).then_with(|| a.subject_id.cmp(&b.subject_id)))
        .collect()
}

pub fn lifetime_total(sessions: &[StudySession]) -> u64 {
    sessions.iter().map(|s| s.duration_ms).sum()
}

pub fn average_session(sessions: &[StudySession]) -> u64 {
    let durations: Vec<f64> = sessions.iter().map(|s| s.duration_ms as f64).collect();
    crate::util::mean(&durations).map_or(0, |m| m.round() as u64)
}

/// Time spent on one subject during one day
pub fn subject_total_on(sessions: &[StudySession], subject_id: &str, date: &str) -> u64 {
    sessions
        .iter()
        .filter(|s| s.subject_id == subject_id && s.date_string == date)
        .map(|s| s.duration_ms)
        .sum()
}

/// Sessions of a day ordered from most recent
pub fn history_for_day<'a>(sessions: &'a [StudySession], date: &str) -> Vec<&'a StudySession> {
    sessions
        .iter()
        .filter(|s| s.date_string == date)
        .sorted_by(|a, b| b.start_time.cmp(&a.start_time))
        .collect()
}
