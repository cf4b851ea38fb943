// src/services/window.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::quiz::Quiz};

/// Whether a quiz can be attempted right now by a particular student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    NotYetOpen,
    Open,
    Closed,
}

impl WindowState {
    pub fn describe(&self) -> &'static str {
        match self {
            WindowState::NotYetOpen => "not yet open",
            WindowState::Open => "open",
            WindowState::Closed => "closed",
        }
    }
}

/// Classifies the delivery window. Both bounds are inclusive.
///
/// A finished attempt closes the quiz for that student regardless of the clock.
pub fn classify(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
    has_finished_submission: bool,
) -> WindowState {
    if has_finished_submission || now > end_time {
        WindowState::Closed
    } else if now < start_time {
        WindowState::NotYetOpen
    } else {
        WindowState::Open
    }
}

pub fn classify_quiz(
    quiz: &Quiz,
    now: DateTime<Utc>,
    has_finished_submission: bool,
) -> WindowState {
    classify(quiz.start_time, quiz.end_time, now, has_finished_submission)
}

/// Server-side time check for the submit path. Prior attempts are the ledger's concern.
pub fn ensure_within_window(quiz: &Quiz, now: DateTime<Utc>) -> Result<(), AppError> {
    match classify_quiz(quiz, now, false) {
        WindowState::Open => Ok(()),
        state => Err(AppError::WindowClosed(state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bounds() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        (start, start + Duration::hours(1))
    }

    #[test]
    fn test_before_start_is_not_yet_open() {
        let (start, end) = bounds();
        let now = start - Duration::seconds(1);
        assert_eq!(classify(start, end, now, false), WindowState::NotYetOpen);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let (start, end) = bounds();
        assert_eq!(classify(start, end, start, false), WindowState::Open);
        assert_eq!(classify(start, end, end, false), WindowState::Open);
        assert_eq!(
            classify(start, end, end + Duration::milliseconds(1), false),
            WindowState::Closed
        );
    }

    #[test]
    fn test_prior_submission_closes_window() {
        let (start, end) = bounds();
        let now = start + Duration::minutes(10);
        assert_eq!(classify(start, end, now, true), WindowState::Closed);
        // Even before the window opens.
        assert_eq!(classify(start, end, start - Duration::days(1), true), WindowState::Closed);
    }
}
