use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    /// 0..=100
    pub confidence: f64,
}

impl MatchResult {
    pub fn rejected() -> Self {
        Self {
            matched: false,
            confidence: 0.0,
        }
    }
}

/// Compares a captured photo against the employee's reference photos.
///
/// The attendance lifecycle only relies on this contract, so a real face matcher can
/// replace [`SimulatedVerifier`] without touching it.
#[async_trait]
pub trait FaceVerifier: Send + Sync {
    async fn verify(&self, captured: &str, references: &[String]) -> MatchResult;
}

/// Placeholder matcher: accepts whenever reference photos exist, with a random
/// confidence between 70 and 100. No image comparison takes place.
pub struct SimulatedVerifier;

#[async_trait]
impl FaceVerifier for SimulatedVerifier {
    async fn verify(&self, _captured: &str, references: &[String]) -> MatchResult {
        if references.is_empty() {
            return MatchResult::rejected();
        }

        let confidence: f64 = rand::thread_rng().gen_range(70.0..=100.0);
        MatchResult {
            matched: true,
            confidence: (confidence * 100.0).round() / 100.0,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_references_never_match() {
        let result = SimulatedVerifier.verify("aGVsbG8=", &[]).await;
        assert_eq!(result, MatchResult::rejected());
    }

    #[tokio::test]
    async fn matched_confidence_stays_in_range() {
        let references = vec!["memory://a".to_string()];
        for _ in 0..200 {
            let result = SimulatedVerifier.verify("aGVsbG8=", &references).await;
            assert!(result.matched);
            assert!((70.0..=100.0).contains(&result.confidence), "{}", result.confidence);
            let scaled = result.confidence * 100.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }
}
