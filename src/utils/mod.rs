//! Shared helpers for reading and writing analysis data
//!
//! Numeric arrays and dataset tables are exchanged as plain delimited text
//! so results can be inspected or plotted with any external tool.

pub mod array_file;

pub use array_file::{
    read_array_from_file,
    read_table_from_file,
    save_array_to_file,
    save_table_to_file,
};
