mod assembler;
mod types;

pub use assembler::FilterParser;
pub use types::{
    Conjunction, FilterGroup, FilterLeaf, FilterNode, Operator, MAX_GROUP_DEPTH, ROOT_GROUP,
};
