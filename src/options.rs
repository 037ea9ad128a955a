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

use distance::DistanceKind;
use k_means::KMeans;
use k_means::kdtree::{Filter, KdTreeKMeans, Split};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};
use vector::Relation;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "Self::validate_self"))]
pub struct KMeansOptions {
    #[validate(range(min = 1, max = 16_777_216))]
    pub k: u32,
    /// `0` lets the run go on until no point changes.
    #[serde(default = "KMeansOptions::default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "KMeansOptions::default_distance")]
    pub distance: DistanceKind,
    #[serde(default = "KMeansOptions::default_algorithm")]
    #[validate(nested)]
    pub algorithm: KMeansAlgorithm,
    /// Recompute the per-cluster sums of squares after the run.
    #[serde(default = "KMeansOptions::default_varstat")]
    pub varstat: bool,
    #[serde(default = "KMeansOptions::default_num_threads")]
    #[validate(range(min = 1, max = 255))]
    pub num_threads: u16,
}

impl KMeansOptions {
    pub fn new(k: u32) -> Self {
        Self {
            k,
            max_iterations: Self::default_max_iterations(),
            distance: Self::default_distance(),
            algorithm: Self::default_algorithm(),
            varstat: Self::default_varstat(),
            num_threads: Self::default_num_threads(),
        }
    }
    fn default_max_iterations() -> u32 {
        0
    }
    fn default_distance() -> DistanceKind {
        DistanceKind::default()
    }
    fn default_algorithm() -> KMeansAlgorithm {
        KMeansAlgorithm::Lloyd {}
    }
    fn default_varstat() -> bool {
        false
    }
    fn default_num_threads() -> u16 {
        1
    }
    pub fn validate_self(&self) -> Result<(), ValidationError> {
        match self.algorithm {
            KMeansAlgorithm::YinYang(YinYangOptions {
                groups: Some(groups),
            }) if groups > self.k => Err(ValidationError::new("`groups` must not exceed `k`")),
            _ => Ok(()),
        }
    }

    /// The distance the run uses, warning when it does not fit the algorithm.
    pub(crate) fn checked_distance(&self) -> DistanceKind {
        let distance = self.distance;
        if self.algorithm.needs_squared_euclidean() && !distance.is_euclidean() {
            log::warn!(
                "{} only works with Euclidean geometry, using squared Euclidean distance instead of {distance:?}",
                self.algorithm.name()
            );
            return DistanceKind::SquaredEuclidean;
        }
        if distance.is_squared() {
            // the objective itself
        } else if self.algorithm.needs_metric() && !distance.is_metric() {
            log::warn!(
                "{} requires the triangle inequality, and thus should only be used with squared Euclidean distance or a metric distance",
                self.algorithm.name()
            );
        } else if !distance.is_euclidean() {
            log::warn!(
                "k-means optimizes the sum of squares, it should be used with squared Euclidean distance and may stop converging otherwise"
            );
        }
        distance
    }
}

impl FromStr for KMeansOptions {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let options = toml::from_str::<KMeansOptions>(s)?;
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct YinYangOptions {
    /// Defaults to `k / 10` groups.
    #[serde(default)]
    #[validate(range(min = 1, max = 16_777_216))]
    pub groups: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct KdTreeOptions {
    #[serde(default = "KdTreeOptions::default_split")]
    pub split: Split,
    #[serde(default = "KdTreeOptions::default_leaf_size")]
    #[validate(range(min = 1, max = 65_536))]
    pub leaf_size: u32,
}

impl KdTreeOptions {
    fn default_split() -> Split {
        Split::default()
    }
    fn default_leaf_size() -> u32 {
        5
    }
}

impl Default for KdTreeOptions {
    fn default() -> Self {
        Self {
            split: Self::default_split(),
            leaf_size: Self::default_leaf_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub enum KMeansAlgorithm {
    Lloyd {},
    Hamerly {},
    SimplifiedHamerly {},
    Elkan {},
    SimplifiedElkan {},
    Annulus {},
    Exponion {},
    Shallot {},
    Compare {},
    Sort {},
    YinYang(YinYangOptions),
    KdTreePruning(KdTreeOptions),
    KdTreeFiltering(KdTreeOptions),
    HartiganWong {},
}

impl Validate for KMeansAlgorithm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        use KMeansAlgorithm::*;
        match self {
            YinYang(x) => x.validate(),
            KdTreePruning(x) | KdTreeFiltering(x) => x.validate(),
            _ => Ok(()),
        }
    }
}

impl KMeansAlgorithm {
    pub fn name(&self) -> &'static str {
        use KMeansAlgorithm::*;
        match self {
            Lloyd {} => "lloyd",
            Hamerly {} => "hamerly",
            SimplifiedHamerly {} => "simplified_hamerly",
            Elkan {} => "elkan",
            SimplifiedElkan {} => "simplified_elkan",
            Annulus {} => "annulus",
            Exponion {} => "exponion",
            Shallot {} => "shallot",
            Compare {} => "compare",
            Sort {} => "sort",
            YinYang(_) => "yin_yang",
            KdTreePruning(_) => "kd_tree_pruning",
            KdTreeFiltering(_) => "kd_tree_filtering",
            HartiganWong {} => "hartigan_wong",
        }
    }

    /// Whether the bounds kept by the algorithm rely on the triangle inequality.
    pub fn needs_metric(&self) -> bool {
        use KMeansAlgorithm::*;
        !matches!(
            self,
            Lloyd {} | KdTreePruning(_) | KdTreeFiltering(_) | HartiganWong {}
        )
    }

    /// Whether the algorithm reasons about boxes or transfer costs in Euclidean space.
    pub fn needs_squared_euclidean(&self) -> bool {
        use KMeansAlgorithm::*;
        matches!(
            self,
            KdTreePruning(_) | KdTreeFiltering(_) | HartiganWong {}
        )
    }

    pub fn build<R: Relation>(&self, relation: &R, k: usize) -> Box<dyn KMeans<R>> {
        use k_means::*;
        let n = relation.len();
        match self {
            KMeansAlgorithm::Lloyd {} => Box::new(lloyd::Lloyd),
            KMeansAlgorithm::Hamerly {} => Box::new(hamerly::Hamerly::new(n, k)),
            KMeansAlgorithm::SimplifiedHamerly {} => Box::new(hamerly::Hamerly::simplified(n, k)),
            KMeansAlgorithm::Elkan {} => Box::new(elkan::Elkan::new(n, k)),
            KMeansAlgorithm::SimplifiedElkan {} => Box::new(elkan::Elkan::simplified(n, k)),
            KMeansAlgorithm::Annulus {} => Box::new(annulus::Annulus::new(n, k)),
            KMeansAlgorithm::Exponion {} => Box::new(exponion::Exponion::new(n, k)),
            KMeansAlgorithm::Shallot {} => Box::new(shallot::Shallot::new(n, k)),
            KMeansAlgorithm::Compare {} => Box::new(compare::Compare::new(k)),
            KMeansAlgorithm::Sort {} => Box::new(compare::Compare::sorted(k)),
            KMeansAlgorithm::YinYang(x) => Box::new(yinyang::YinYang::new(
                n,
                k,
                x.groups.map(|groups| groups as usize),
            )),
            KMeansAlgorithm::KdTreePruning(x) => Box::new(KdTreeKMeans::new(
                relation,
                k,
                Filter::Pruning,
                x.split,
                x.leaf_size as usize,
            )),
            KMeansAlgorithm::KdTreeFiltering(x) => Box::new(KdTreeKMeans::new(
                relation,
                k,
                Filter::Filtering,
                x.split,
                x.leaf_size as usize,
            )),
            KMeansAlgorithm::HartiganWong {} => {
                Box::new(hartigan_wong::HartiganWong::new(n, k))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options: KMeansOptions = "k = 3".parse().unwrap();
        assert_eq!(options.k, 3);
        assert_eq!(options.max_iterations, 0);
        assert_eq!(options.distance, DistanceKind::SquaredEuclidean);
        assert!(matches!(options.algorithm, KMeansAlgorithm::Lloyd {}));
        assert!(!options.varstat);
        assert_eq!(options.num_threads, 1);
    }

    #[test]
    fn algorithm_tables() {
        let options: KMeansOptions = r#"
            k = 20
            max_iterations = 50
            distance = "euclidean"
            [algorithm.yin_yang]
            groups = 4
        "#
        .parse()
        .unwrap();
        assert_eq!(options.distance, DistanceKind::Euclidean);
        assert!(matches!(
            options.algorithm,
            KMeansAlgorithm::YinYang(YinYangOptions { groups: Some(4) })
        ));
        let options: KMeansOptions = r#"
            k = 8
            [algorithm.kd_tree_filtering]
            split = "ssq"
        "#
        .parse()
        .unwrap();
        let KMeansAlgorithm::KdTreeFiltering(x) = options.algorithm else {
            panic!("expected kd_tree_filtering");
        };
        assert_eq!(x.split, Split::Ssq);
        assert_eq!(x.leaf_size, 5);
        let options: KMeansOptions = "k = 2\nalgorithm = { hartigan_wong = {} }".parse().unwrap();
        assert_eq!(options.algorithm.name(), "hartigan_wong");
    }

    #[test]
    fn rejected() {
        for text in [
            "",
            "k = 0",
            "k = 2\nnum_threads = 0",
            "k = 2\nbogus = 1",
            "k = 2\n[algorithm.elkan]\nbogus = 1",
            "k = 2\n[algorithm.kd_tree_pruning]\nleaf_size = 0",
            "k = 2\n[algorithm.yin_yang]\ngroups = 0",
            "k = 2\n[algorithm.yin_yang]\ngroups = 3",
            "k = 2\n[algorithm.unknown]",
            "k = 2\ndistance = \"cosine\"",
        ] {
            assert!(text.parse::<KMeansOptions>().is_err(), "{text:?}");
        }
    }

    #[test]
    fn metric_needs() {
        assert!(!KMeansAlgorithm::Lloyd {}.needs_metric());
        assert!(KMeansAlgorithm::Elkan {}.needs_metric());
        assert!(KMeansAlgorithm::HartiganWong {}.needs_squared_euclidean());
        let mut options = KMeansOptions::new(2);
        options.distance = DistanceKind::Manhattan;
        assert_eq!(options.checked_distance(), DistanceKind::Manhattan);
        options.algorithm = KMeansAlgorithm::KdTreePruning(KdTreeOptions::default());
        assert_eq!(options.checked_distance(), DistanceKind::SquaredEuclidean);
        options.distance = DistanceKind::Euclidean;
        assert_eq!(options.checked_distance(), DistanceKind::Euclidean);
    }
}
