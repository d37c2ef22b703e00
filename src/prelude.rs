pub use crate::data::distances::{pairwise_distances, DistanceSource, VectorDistances};
pub use crate::data::structures::DenseMatrix;
pub use crate::error::{Result, TsneError};
pub use crate::training::{parse_tsne_execution, TsneExecution, TsneOptimParams};
pub use crate::{tsne, Tsne, TsneParams};
