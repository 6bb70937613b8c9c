//! Data access layer: the submission store and the statistics computed over it.

pub mod storage {
    pub use crate::storage::*;
}

pub mod stats {
    pub use crate::stats::*;
}
