//! Bounded-memory access to workbooks.

mod reader;
mod writer;

pub use reader::{RowStream, StreamingReader};
pub use writer::{DEFAULT_BATCH_SIZE, StreamingWorkbook};
