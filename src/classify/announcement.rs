//! Display and speech text built from a classification result

use super::Classification;

/// Shown and spoken when the top result is not confident enough
pub const LOW_CONFIDENCE_MESSAGE: &str = "I'm not sure. Please try again!";

/// What the UI shows and says for one classification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub item_text: String,
    pub confidence_text: String,
    pub spoken_text: String,
}

impl Announcement {
    /// Build the announcement from results sorted highest confidence first
    ///
    /// Only the first entry is examined. An empty result list is treated as unsure.
    pub fn from_results(results: &[Classification], threshold: f32) -> Self {
        match results.first() {
            Some(top) if top.confidence >= threshold => {
                let percentage = confidence_percentage(top.confidence);
                Self {
                    item_text: top.label.clone(),
                    confidence_text: format!("CONFIDENCE: {} %", percentage),
                    spoken_text: format!(
                        "This looks like a {}. I'm {} sure.",
                        top.label, percentage
                    ),
                }
            }
            _ => Self::unsure(),
        }
    }

    /// The low-confidence announcement
    pub fn unsure() -> Self {
        Self {
            item_text: LOW_CONFIDENCE_MESSAGE.to_string(),
            confidence_text: String::new(),
            spoken_text: LOW_CONFIDENCE_MESSAGE.to_string(),
        }
    }
}

/// Confidence as a truncated whole percentage
pub fn confidence_percentage(confidence: f32) -> i32 {
    (confidence * 100.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_result() {
        let results = vec![
            Classification::new("banana", 0.92),
            Classification::new("lemon", 0.05),
        ];
        let announcement = Announcement::from_results(&results, 0.5);
        assert_eq!(announcement.item_text, "banana");
        assert_eq!(announcement.confidence_text, "CONFIDENCE: 92 %");
        assert_eq!(announcement.spoken_text, "This looks like a banana. I'm 92 sure.");
    }

    #[test]
    fn test_low_confidence_result() {
        let results = vec![Classification::new("object", 0.31)];
        let announcement = Announcement::from_results(&results, 0.5);
        assert_eq!(announcement.item_text, "I'm not sure. Please try again!");
        assert_eq!(announcement.confidence_text, "");
        assert_eq!(announcement.spoken_text, announcement.item_text);
    }

    #[test]
    fn test_only_top_entry_matters() {
        // Lower-ranked entries never rescue an unsure top result
        let results = vec![
            Classification::new("object", 0.49),
            Classification::new("banana", 0.99),
        ];
        assert_eq!(Announcement::from_results(&results, 0.5), Announcement::unsure());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let results = vec![Classification::new("mug", 0.5)];
        let announcement = Announcement::from_results(&results, 0.5);
        assert_eq!(announcement.item_text, "mug");
        assert_eq!(announcement.confidence_text, "CONFIDENCE: 50 %");
    }

    #[test]
    fn test_percentage_truncates() {
        assert_eq!(confidence_percentage(0.999), 99);
        assert_eq!(confidence_percentage(0.926), 92);
        assert_eq!(confidence_percentage(1.0), 100);
        let announcement = Announcement::from_results(&[Classification::new("cup", 0.5789)], 0.5);
        assert_eq!(announcement.confidence_text, "CONFIDENCE: 57 %");
    }

    #[test]
    fn test_empty_results_are_unsure() {
        assert_eq!(Announcement::from_results(&[], 0.5), Announcement::unsure());
    }
}
