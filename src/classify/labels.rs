//! ImageNet labels and score ranking

use anyhow::{Context, Result};
use std::path::Path;

use super::Classification;

/// Parse a synset file: one `<wordnet id> <synonym>, <synonym>, ...` per line
///
/// Each label is the first synonym with the WordNet id stripped.
pub fn parse_synset(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let names = match line.split_once(' ') {
                Some((id, rest)) if is_wordnet_id(id) => rest,
                _ => line,
            };
            names
                .split(',')
                .next()
                .unwrap_or(names)
                .trim()
                .to_string()
        })
        .collect()
}

/// WordNet ids look like `n01440764`
fn is_wordnet_id(token: &str) -> bool {
    token.len() > 1
        && token.starts_with('n')
        && token[1..].chars().all(|c| c.is_ascii_digit())
}

/// Load and parse a synset label file
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read label file: {}", path.display()))?;
    let labels = parse_synset(&text);
    if labels.is_empty() {
        anyhow::bail!("Label file is empty: {}", path.display());
    }
    Ok(labels)
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pair probabilities with labels, highest first, keeping at most `limit`
pub fn rank(probabilities: &[f32], labels: &[String], limit: usize) -> Vec<Classification> {
    let mut ranked: Vec<Classification> = probabilities
        .iter()
        .enumerate()
        .map(|(idx, &p)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("class {}", idx));
            Classification::new(label, p)
        })
        .collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synset_lines() {
        let text = "n01440764 tench, Tinca tinca\nn07753592 banana\n\nn03063599 coffee mug\n";
        assert_eq!(parse_synset(text), vec!["tench", "banana", "coffee mug"]);
    }

    #[test]
    fn test_parse_plain_label_lines() {
        let text = "banana\nnotebook, notebook computer\n";
        assert_eq!(parse_synset(text), vec!["banana", "notebook"]);
    }

    #[test]
    fn test_load_labels_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synset.txt");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(load_labels(&path).is_err());

        std::fs::write(&path, "n07753592 banana\n").unwrap();
        assert_eq!(load_labels(&path).unwrap(), vec!["banana"]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 1000.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[3] > 0.99);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_rank_sorts_descending_and_truncates() {
        let labels: Vec<String> = ["apple", "banana", "cherry"].iter().map(|s| s.to_string()).collect();
        let ranked = rank(&[0.2, 0.7, 0.1, 0.0], &labels, 3);
        let names: Vec<&str> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(names, vec!["banana", "apple", "cherry"]);
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let ranked = rank(&[0.1, 0.2, 0.3, 0.4], &labels, 1);
        assert_eq!(ranked, vec![Classification::new("class 3", 0.4)]);
    }
}
