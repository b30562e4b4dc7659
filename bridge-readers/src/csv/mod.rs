//! Delimited-text support: schema inference, lazy reading and batch writing

mod infer;
mod reader;
mod writer;

pub use infer::{infer, infer_reader, infer_type};
pub use reader::{rows, CsvRowSource, FileLocator};
pub use writer::CsvBatchSink;
