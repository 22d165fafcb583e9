//! Class-index to display-string mapping.
//!
//! The ordering must stay consistent with the class indices used at training
//! time, and [`NUM_CLASSES`] must equal the topology's output dimension.

/// Number of classes used end-to-end (model output, training targets, serving).
pub const NUM_CLASSES: usize = 10;

/// Returned for any index outside the trained class range.
pub const UNKNOWN_LABEL: &str = "Unknown";

const LABELS: [&str; NUM_CLASSES] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Maps a predicted class index to its LaTeX rendering.
///
/// Total over `usize`: out-of-range indices map to [`UNKNOWN_LABEL`] instead
/// of failing.
pub fn latex_label(index: usize) -> &'static str {
    LABELS.get(index).copied().unwrap_or(UNKNOWN_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_label() {
        for index in 0..NUM_CLASSES {
            assert_ne!(latex_label(index), UNKNOWN_LABEL);
        }
        assert_eq!(latex_label(7), "7");
    }

    #[test]
    fn out_of_range_maps_to_sentinel() {
        assert_eq!(latex_label(NUM_CLASSES), UNKNOWN_LABEL);
        assert_eq!(latex_label(usize::MAX), UNKNOWN_LABEL);
    }
}
