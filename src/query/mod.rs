//! Query module - the draft model, its builder and the YAML round trip

mod model;
mod builder;
mod codec;
pub mod yaml;

pub use model::{
    Condition, Filter, FilterEdit, FilterField, GeneratedResult, Operation, QueryDraft,
};
pub use builder::{DraftSnapshot, DraftTicket, QueryBuilder};
pub use codec::{Generator, Parser};
pub use yaml::YamlCodec;
