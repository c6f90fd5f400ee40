//! Module for reading and writing Models and tables
pub mod gpr_parse;
pub mod json;
pub mod table;
