// Domain-layer modules and shared errors/models
pub mod classifier {
    pub use crate::classifier::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod ingestion {
    pub use crate::ingestion::*;
}

pub mod reconciler {
    pub use crate::reconciler::*;
}

pub mod degree_map {
    pub use crate::degree_map::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
