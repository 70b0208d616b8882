//! Filter criteria: which detections get drawn.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::detection::Detection;

/// User-selected rendering filter, immutable for the duration of a run.
///
/// A detection is drawn iff its class name is in `allowed_classes` AND its
/// confidence strictly exceeds `min_confidence`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct FilterCriteria {
    /// Class names eligible for rendering.
    pub allowed_classes: HashSet<String>,
    /// Minimum confidence (exclusive) a detection must exceed.
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_confidence: f32,
}

impl FilterCriteria {
    /// Create criteria from an iterator of class names and a threshold.
    pub fn new<I, S>(classes: I, min_confidence: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_classes: classes.into_iter().map(Into::into).collect(),
            min_confidence,
        }
    }

    /// Whether a detection passes the filter. Boundary values equal to the
    /// threshold are excluded (strict inequality).
    pub fn matches(&self, detection: &Detection) -> bool {
        self.allowed_classes.contains(detection.class_name())
            && detection.confidence > self.min_confidence
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::new(["person"], 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    fn det(class_id: usize, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), confidence, class_id)
    }

    #[test]
    fn test_matches_class_and_confidence() {
        let criteria = FilterCriteria::new(["person"], 0.5);
        assert!(criteria.matches(&det(0, 0.9)));
        assert!(!criteria.matches(&det(2, 0.9))); // car not allowed
        assert!(!criteria.matches(&det(0, 0.3))); // below threshold
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let criteria = FilterCriteria::new(["person"], 0.5);
        assert!(!criteria.matches(&det(0, 0.5)));
        assert!(criteria.matches(&det(0, 0.500001)));
    }

    #[test]
    fn test_threshold_one_excludes_everything() {
        let criteria = FilterCriteria::new(["person", "car"], 1.0);
        assert!(!criteria.matches(&det(0, 1.0)));
        assert!(!criteria.matches(&det(0, 0.999)));
    }

    #[test]
    fn test_threshold_zero_excludes_only_zero_confidence() {
        let criteria = FilterCriteria::new(["person"], 0.0);
        assert!(criteria.matches(&det(0, 0.001)));
        assert!(!criteria.matches(&det(0, 0.0)));
    }

    #[test]
    fn test_default_preselects_person() {
        let criteria = FilterCriteria::default();
        assert!(criteria.allowed_classes.contains("person"));
        assert_eq!(criteria.min_confidence, 0.0);
    }

    #[test]
    fn test_validation_bounds() {
        use validator::Validate;
        let ok = FilterCriteria::new(["person"], 0.5);
        assert!(ok.validate().is_ok());
        let bad = FilterCriteria::new(["person"], 1.5);
        assert!(bad.validate().is_err());
    }
}
