use crate::error::Result;
use crate::infrastructure::scripted::Scenario;
use std::io::Read;

/// Reads a [`Scenario`] from a JSON source.
pub struct ScenarioReader<R: Read> {
    source: R,
}

impl<R: Read> ScenarioReader<R> {
    /// Creates a new `ScenarioReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn scenario(self) -> Result<Scenario> {
        Ok(serde_json::from_reader(self.source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::Step;
    use crate::error::ProvisionError;

    #[test]
    fn test_reader_valid_scenario() {
        let data = r#"{"latency-ms": 5, "purchase": {"success": true}}"#;
        let scenario = ScenarioReader::new(data.as_bytes()).scenario().unwrap();
        assert_eq!(scenario.latency_ms, 5);
        assert!(scenario.response_for(Step::PurchaseVerification).unwrap().success);
    }

    #[test]
    fn test_reader_malformed_scenario() {
        let result = ScenarioReader::new("{not json".as_bytes()).scenario();
        assert!(matches!(result, Err(ProvisionError::JsonError(_))));
    }
}
