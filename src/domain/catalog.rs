use rust_decimal::Decimal;
use serde::Deserialize;

/// What the catalog knows about a course at order-creation time. A zero
/// price marks a free course.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CourseListing {
    pub course_id: String,
    pub price: Decimal,
    pub currency: String,
    pub total_lectures: u32,
}

