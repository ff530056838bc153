//! Wire format definitions for upstream provider APIs

pub mod completion;
pub mod openai;
