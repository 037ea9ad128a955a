// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] validator::ValidationErrors),
    #[error("failed to parse options: {0}")]
    ParseOptions(#[from] toml::de::Error),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("expected {expected} initial means, got {actual}")]
    NumberOfMeans { expected: usize, actual: usize },
    #[error("there are no points to cluster")]
    EmptyRelation,
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
