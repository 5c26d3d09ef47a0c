//! Browser components.

pub mod flow_builder;
