pub mod findings;
pub mod report;
pub mod writer_csv;

pub use findings::{aggregate, Findings, Summary};
pub use report::write_deliverables;
pub use writer_csv::write_csv;
