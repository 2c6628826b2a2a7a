//! End-to-end tests over fixture files and in-memory SEC sources.

mod fixtures;
mod labelling;
mod mock_sec;
mod pipeline;
