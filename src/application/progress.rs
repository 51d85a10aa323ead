use super::enrollment::EnrollmentActivator;
use crate::domain::enrollment::ProgressRecord;
use crate::domain::ports::{EnrollmentStoreRef, ProgressUpdate};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Records which lectures an enrolled user has viewed.
pub struct ProgressTracker {
    activator: Arc<EnrollmentActivator>,
    enrollments: EnrollmentStoreRef,
}

impl ProgressTracker {
    pub fn new(activator: Arc<EnrollmentActivator>, enrollments: EnrollmentStoreRef) -> Self {
        Self {
            activator,
            enrollments,
        }
    }

    /// Adds `lecture_id` to the viewed set. Viewing a lecture twice is a no-op.
    pub async fn mark_viewed(
        &self,
        user_id: &str,
        course_id: &str,
        lecture_id: &str,
    ) -> Result<ProgressRecord> {
        let lecture_id = lecture_id.trim();
        if lecture_id.is_empty() {
            return Err(LedgerError::InvalidLecture(
                "lecture id must not be empty".to_string(),
            ));
        }
        let record = self
            .apply(
                user_id,
                course_id,
                ProgressUpdate::MarkViewed {
                    lecture_id: lecture_id.to_string(),
                    at: Utc::now(),
                },
            )
            .await?;
        debug!(user_id, course_id, lecture_id, "lecture marked viewed");
        Ok(record)
    }

    /// Clears the viewed set. Leaves the enrollment and its order untouched.
    pub async fn reset_progress(&self, user_id: &str, course_id: &str) -> Result<ProgressRecord> {
        let record = self
            .apply(user_id, course_id, ProgressUpdate::Reset { at: Utc::now() })
            .await?;
        debug!(user_id, course_id, "progress reset");
        Ok(record)
    }

    pub async fn get_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<ProgressRecord>> {
        self.enrollments.progress(user_id, course_id).await
    }

    async fn apply(
        &self,
        user_id: &str,
        course_id: &str,
        update: ProgressUpdate,
    ) -> Result<ProgressRecord> {
        let not_enrolled = || LedgerError::NotEnrolled {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
        };
        if !self.activator.is_enrolled(user_id, course_id).await? {
            return Err(not_enrolled());
        }
        self.enrollments
            .update_progress(user_id, course_id, update)
            .await?
            .ok_or_else(not_enrolled)
    }
}
