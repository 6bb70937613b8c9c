// Domain-layer modules and shared errors/models
pub mod assessment {
    pub use crate::assessment::*;
}

pub mod enrichment {
    pub use crate::enrichment::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod predictor {
    pub use crate::predictor::*;
}

pub mod report {
    pub use crate::report::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod errors {
    pub use crate::errors::*;
}
