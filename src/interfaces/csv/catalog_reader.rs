use crate::domain::catalog::CourseListing;
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads course listings from a CSV source with the header
/// `course_id,price,currency,total_lectures`.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<CourseListing>`. Whitespace around fields is trimmed.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes listings.
    pub fn listings(self) -> impl Iterator<Item = Result<CourseListing>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }

    /// Reads every listing, failing on the first malformed row.
    pub fn read_all(self) -> Result<Vec<CourseListing>> {
        self.listings().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "course_id, price, currency, total_lectures\n\
                    rust-101, 500, INR, 12\n\
                    intro, 0, INR, 3";
        let listings = CatalogReader::new(data.as_bytes()).read_all().unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].course_id, "rust-101");
        assert_eq!(listings[0].price, dec!(500));
        assert_eq!(listings[0].total_lectures, 12);
        assert!(listings[1].price.is_zero());
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "course_id, price, currency, total_lectures\nrust-101, cheap, INR, 12";
        let results: Vec<Result<CourseListing>> =
            CatalogReader::new(data.as_bytes()).listings().collect();

        assert!(results[0].is_err());
    }
}
