/// 匹配结果数据结构
///
/// 候选位置 -> 分数的映射，每次匹配重新生成

use crate::algorithms::PositionInformation;
use std::collections::HashMap;
use std::fmt;

/// 候选分数集合（分数越低越相似）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateScores {
    scores: HashMap<PositionInformation, f64>,
}

impl CandidateScores {
    pub fn new() -> Self {
        CandidateScores {
            scores: HashMap::new(),
        }
    }

    /// 记录候选位置的分数（同名位置会被覆盖）
    pub fn insert(&mut self, position: PositionInformation, score: f64) {
        self.scores.insert(position, score);
    }

    /// 按位置名称获取分数
    pub fn get(&self, name: &str) -> Option<f64> {
        self.scores.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scores.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionInformation, f64)> {
        self.scores.iter().map(|(position, score)| (position, *score))
    }

    /// 按分数升序排列（分数相同按名称排序）
    pub fn ranked(&self) -> Vec<(&PositionInformation, f64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.name.cmp(&b.0.name)));
        ranked
    }

    /// 分数最低的候选位置
    pub fn best(&self) -> Option<(&PositionInformation, f64)> {
        self.ranked().into_iter().next()
    }

    pub fn into_inner(self) -> HashMap<PositionInformation, f64> {
        self.scores
    }
}

impl FromIterator<(PositionInformation, f64)> for CandidateScores {
    fn from_iter<I: IntoIterator<Item = (PositionInformation, f64)>>(iter: I) -> Self {
        CandidateScores {
            scores: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CandidateScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranked()
            .into_iter()
            .map(|(position, score)| format!("{}={:.2}", position.name, score))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Fingerprint;

    fn position(name: &str) -> PositionInformation {
        PositionInformation::new(name, Fingerprint::new())
    }

    #[test]
    fn test_ranked_and_best() {
        let scores: CandidateScores = vec![
            (position("c"), 2.0),
            (position("a"), 3.0),
            (position("b"), 2.0),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = scores.ranked().iter().map(|(p, _)| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(scores.best().map(|(p, s)| (p.name.clone(), s)), Some(("b".to_string(), 2.0)));
        assert_eq!(scores.to_string(), "[b=2.00, c=2.00, a=3.00]");
    }

    #[test]
    fn test_lookup_by_name() {
        let mut scores: CandidateScores = (0..100)
            .map(|i| (position(&format!("room-{}", i)), i as f64))
            .collect();
        assert_eq!(scores.get("room-42"), Some(42.0));
        assert!(scores.contains("room-99"));
        assert_eq!(scores.get("room-100"), None);

        // 同名位置覆盖分数，不论指纹是否不同
        scores.insert(
            PositionInformation::new("room-42", Fingerprint::from_pairs(vec![("A", -50.0)])),
            0.5,
        );
        assert_eq!(scores.len(), 100);
        assert_eq!(scores.get("room-42"), Some(0.5));
    }

    #[test]
    fn test_empty_scores() {
        let scores = CandidateScores::new();
        assert!(scores.best().is_none());
        assert!(!scores.contains("a"));
    }
}
