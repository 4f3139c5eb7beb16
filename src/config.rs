use std::num::NonZeroU64;

use clap::{
    Parser,
    ValueEnum,
};
use opentelemetry_otlp::Protocol;

use crate::position::Sha256Position;

#[derive(Debug, Parser, Clone)]
pub struct SentryConfig {
    #[arg(long, env = "SENTRY_DSN", default_value = "")]
    pub dsn: String,

    #[arg(long, env = "SENTRY_SAMPLE_RATE", default_value = "0.0")]
    pub sample_rate: f32,
}

#[derive(Debug, Parser, Clone)]
pub struct OtelConfig {
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value = "")]
    pub endpoint: String,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_PROTOCOL", value_enum, default_value = "http")]
    pub protocol: OtlpProtocol,
}

/// Wire encoding for OTLP over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OtlpProtocol {
    #[value(name = "http", alias = "http/protobuf")]
    HttpProtobuf,
    #[value(name = "http/json")]
    HttpJson,
}

impl From<OtlpProtocol> for Protocol {
    fn from(protocol: OtlpProtocol) -> Self {
        match protocol {
            OtlpProtocol::HttpProtobuf => Protocol::HttpBinary,
            OtlpProtocol::HttpJson => Protocol::HttpJson,
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct RingConfig {
    /// Size of the keyspace positions are reduced into.
    #[arg(long, env = "RINGCACHE_SEARCH_SPACE", default_value = "1073741824")]
    pub search_space: NonZeroU64,
}

impl RingConfig {
    pub fn hasher(&self) -> Sha256Position {
        Sha256Position::new(self.search_space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SEARCH_SPACE;

    #[test]
    fn test_default_search_space() {
        let config = RingConfig::try_parse_from(["ringcache"]).unwrap();
        assert_eq!(config.search_space.get(), SEARCH_SPACE);
        assert_eq!(config.hasher(), Sha256Position::default());
    }

    #[test]
    fn test_zero_search_space_rejected() {
        assert!(RingConfig::try_parse_from(["ringcache", "--search-space", "0"]).is_err());
    }

    #[test]
    fn test_default_otlp_protocol() {
        let config = OtelConfig::try_parse_from(["ringcache"]).unwrap();
        assert_eq!(config.protocol, OtlpProtocol::HttpProtobuf);
        assert_eq!(Protocol::from(config.protocol), Protocol::HttpBinary);
    }

    #[test]
    fn test_otlp_protocol_names() {
        let config = OtelConfig::try_parse_from(["ringcache", "--protocol", "http/json"]).unwrap();
        assert_eq!(Protocol::from(config.protocol), Protocol::HttpJson);

        let config = OtelConfig::try_parse_from(["ringcache", "--protocol", "http/protobuf"]).unwrap();
        assert_eq!(config.protocol, OtlpProtocol::HttpProtobuf);
    }

    #[test]
    fn test_unknown_otlp_protocol_rejected() {
        assert!(OtelConfig::try_parse_from(["ringcache", "--protocol", "grpc"]).is_err());
    }

    #[test]
    fn test_custom_search_space() {
        let config = RingConfig::try_parse_from(["ringcache", "--search-space", "1024"]).unwrap();
        assert_eq!(config.hasher().search_space(), 1024);
    }
}
