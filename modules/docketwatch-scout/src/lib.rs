pub mod checkpoint;
pub mod clock;
pub mod extractor;
pub mod merge;
pub mod poll;
pub mod scheduler;
pub mod state;
pub mod text;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod watchlist;
