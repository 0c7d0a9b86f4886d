//! Due-date labels and the deadline filters offered on the board.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Quest;

/// `YYYY/MM/DD`, the board's date format.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Human label for a due date relative to `today`.
pub fn deadline_label(due: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(due) = due else {
        return "no deadline".to_string();
    };
    if due == today {
        return "today".to_string();
    }
    if Some(due) == today.succ_opt() {
        return "tomorrow".to_string();
    }
    if due < today {
        return format!("overdue ({})", format_date(due));
    }
    format_date(due)
}

/// Whether `date` falls in the Monday-based week containing `today`.
pub fn is_in_this_week(date: NaiveDate, today: NaiveDate) -> bool {
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let sunday = monday + Duration::days(6);
    (monday..=sunday).contains(&date)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadlineFilter {
    #[default]
    All,
    Today,
    Tomorrow,
    ThisWeek,
    Overdue,
    NoDeadline,
    PickedDate,
}

impl DeadlineFilter {
    /// Quests without a due date only pass `All` and `NoDeadline`.
    pub fn matches(self, due: Option<NaiveDate>, today: NaiveDate, picked: Option<NaiveDate>) -> bool {
        match (self, due) {
            (DeadlineFilter::All, _) => true,
            (DeadlineFilter::NoDeadline, due) => due.is_none(),
            (_, None) => false,
            (DeadlineFilter::Today, Some(due)) => due == today,
            (DeadlineFilter::Tomorrow, Some(due)) => Some(due) == today.succ_opt(),
            (DeadlineFilter::ThisWeek, Some(due)) => is_in_this_week(due, today),
            (DeadlineFilter::Overdue, Some(due)) => due < today,
            (DeadlineFilter::PickedDate, Some(due)) => picked == Some(due),
        }
    }

    pub fn retain<T, F>(self, items: &mut Vec<T>, today: NaiveDate, picked: Option<NaiveDate>, quest: F)
    where
        F: Fn(&T) -> &Quest,
    {
        if self != DeadlineFilter::All {
            items.retain(|item| self.matches(quest(item).due_date, today, picked));
        }
    }
}
