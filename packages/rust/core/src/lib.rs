//! Chapter indexing, book assembly, and pipeline orchestration for snipbook.
//!
//! This crate ties the corpus parser and the renderer together into the
//! end-to-end `book directory → document` workflow (see [`pipeline`]).

pub mod assembler;
pub mod chapter;
pub mod pipeline;
pub mod toc;
