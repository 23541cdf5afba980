//! Envelope metadata shared by every stored event.

use serde::{Deserialize, Serialize};

use crate::EventError;

/// Actor type for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// A human user (tenant administrator).
    User,
    /// A service principal (API key, machine user).
    ServicePrincipal,
    /// The system itself (setup, migrations).
    #[default]
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::ServicePrincipal => "service_principal",
            ActorType::System => "system",
        }
    }
}

impl std::fmt::Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ActorType::User),
            "service_principal" => Ok(ActorType::ServicePrincipal),
            "system" => Ok(ActorType::System),
            other => Err(EventError::Serialization(format!(
                "unknown actor type: {other}"
            ))),
        }
    }
}

/// Aggregate type for event routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    /// SMS provider configuration of a tenant instance.
    #[default]
    SmsConfig,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::SmsConfig => "sms_config",
        }
    }
}

impl std::fmt::Display for AggregateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AggregateType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms_config" => Ok(AggregateType::SmsConfig),
            other => Err(EventError::Serialization(format!(
                "unknown aggregate type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_type_serialization() {
        assert_eq!(serde_json::to_string(&ActorType::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&ActorType::ServicePrincipal).unwrap(),
            "\"service_principal\""
        );
        assert_eq!(
            serde_json::to_string(&ActorType::System).unwrap(),
            "\"system\""
        );
    }

    #[test]
    fn test_actor_type_parses_its_display_form() {
        for actor in [ActorType::User, ActorType::ServicePrincipal, ActorType::System] {
            assert_eq!(actor.to_string().parse::<ActorType>().unwrap(), actor);
        }
        assert!("robot".parse::<ActorType>().is_err());
    }

    #[test]
    fn test_aggregate_type_display() {
        assert_eq!(AggregateType::SmsConfig.to_string(), "sms_config");
        assert_eq!(
            "sms_config".parse::<AggregateType>().unwrap(),
            AggregateType::SmsConfig
        );
    }
}
