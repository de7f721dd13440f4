//! Similarity Scoring
//!
//! Weighted Jaccard between two feature vectors. Commutative, bounded to
//! [0, 1], and reflexive for non-empty maps.

use crate::domain::features::FeatureVector;

/// Weighted Jaccard similarity between two feature vectors
///
/// Shared keys contribute their weaker weight to the intersection and their
/// stronger weight to the union; one-sided keys only enlarge the union.
/// Either map being empty scores 0.
pub fn weighted_jaccard(a: &FeatureVector, b: &FeatureVector) -> f64 {
    if a.features.is_empty() || b.features.is_empty() {
        return 0.0;
    }

    // Identical stable subsets are an exact match
    if a.digest == b.digest {
        return 1.0;
    }

    let mut intersection = 0.0;
    let mut union = 0.0;

    for (key, &wa) in &a.features {
        match b.features.get(key) {
            Some(&wb) => {
                intersection += wa.min(wb);
                union += wa.max(wb);
            }
            None => union += wa,
        }
    }

    for (key, &wb) in &b.features {
        if !a.features.contains_key(key) {
            union += wb;
        }
    }

    if union == 0.0 {
        return 0.0;
    }

    intersection / union
}
