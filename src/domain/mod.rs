//! Domain model: orders, payments, enrollments, progress and the ports the
//! application layer talks to.

pub mod catalog;
pub mod enrollment;
pub mod order;
pub mod payment;
pub mod ports;
pub mod signature;
