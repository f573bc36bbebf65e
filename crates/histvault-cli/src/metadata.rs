use histvault_core::ProviderId;
use serde::Serialize;

/// Command metadata emitted alongside every result.
///
/// Field order is fixed to keep JSON output deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub command: &'static str,
    pub library: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Metadata {
    pub fn new(command: &'static str, library: impl Into<String>) -> Self {
        Self {
            command,
            library: library.into(),
            provider: None,
            latency_ms: 0,
            warnings: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_empty_optional_fields() {
        let json = serde_json::to_value(Metadata::new("list", "cn_stocks")).expect("serialize");
        assert_eq!(json["command"], "list");
        assert!(json.get("provider").is_none());
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn records_provider_and_warnings() {
        let mut metadata = Metadata::new("delta", "cn_stocks")
            .with_provider(ProviderId::Ifeng)
            .with_latency(42);
        metadata.push_warning("000651: no rows for 2024-06-03");
        let json = serde_json::to_value(&metadata).expect("serialize");
        assert_eq!(json["provider"], "ifeng");
        assert_eq!(json["latency_ms"], 42);
        assert_eq!(json["warnings"][0], "000651: no rows for 2024-06-03");
    }
}
