pub mod catalog_reader;
pub mod enrollment_writer;
