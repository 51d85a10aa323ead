use crate::domain::enrollment::Enrollment;
use crate::error::Result;
use std::io::Write;

/// Writes enrollments as CSV with the header
/// `user_id,course_id,order_id,granted_at`.
pub struct EnrollmentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> EnrollmentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes all enrollments sorted by user then course, then flushes.
    pub fn write_enrollments(&mut self, mut enrollments: Vec<Enrollment>) -> Result<()> {
        enrollments.sort_by(|a, b| {
            (a.user_id.as_str(), a.course_id.as_str())
                .cmp(&(b.user_id.as_str(), b.course_id.as_str()))
        });
        self.writer
            .write_record(["user_id", "course_id", "order_id", "granted_at"])?;
        for enrollment in enrollments {
            self.writer.write_record([
                enrollment.user_id,
                enrollment.course_id,
                enrollment.order_id.to_string(),
                enrollment.granted_at.to_rfc3339(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
