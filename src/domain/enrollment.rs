use super::order::OrderId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Durable grant of a user's access to a course.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    /// The captured order that paid for this enrollment.
    pub order_id: OrderId,
    pub granted_at: DateTime<Utc>,
}

/// Lectures a user has viewed in a course they are enrolled in.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: String,
    pub course_id: String,
    pub viewed_lecture_ids: BTreeSet<String>,
    pub last_updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// An empty record, created together with the enrollment.
    pub fn empty(enrollment: &Enrollment) -> Self {
        Self {
            user_id: enrollment.user_id.clone(),
            course_id: enrollment.course_id.clone(),
            viewed_lecture_ids: BTreeSet::new(),
            last_updated_at: enrollment.granted_at,
        }
    }

    /// Adds a lecture to the viewed set. Returns false if it was already there.
    pub fn mark_viewed(&mut self, lecture_id: &str, now: DateTime<Utc>) -> bool {
        let added = self.viewed_lecture_ids.insert(lecture_id.to_string());
        if added {
            self.last_updated_at = now;
        }
        added
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.viewed_lecture_ids.clear();
        self.last_updated_at = now;
    }

    /// Percentage of `total_lectures` viewed, capped at 100 and rounded to two
    /// decimal places. A course with no lectures reports zero.
    pub fn completion_percent(&self, total_lectures: u32) -> Decimal {
        if total_lectures == 0 {
            return Decimal::ZERO;
        }
        let viewed = Decimal::from(self.viewed_lecture_ids.len() as u64);
        let percent = viewed * Decimal::ONE_HUNDRED / Decimal::from(total_lectures);
        percent.min(Decimal::ONE_HUNDRED).round_dp(2)
    }
}
