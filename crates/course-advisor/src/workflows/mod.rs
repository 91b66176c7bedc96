pub mod advising;
pub mod offline;
