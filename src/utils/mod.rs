
pub mod layout;
pub mod pdf_parser;
pub mod text_processor;

#[cfg(test)]
pub(crate) mod test_pdf;

pub use layout::extract_spans;
pub use pdf_parser::{extract_text, page_count};
pub use text_processor::{chunk_words, list_items};
