//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Product passed inspection
    #[default]
    Ok,
    /// Product failed one or more parameters
    Error,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Ok => "ok",
            VerificationStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(VerificationStatus::Ok),
            "error" => Ok(VerificationStatus::Error),
            _ => Err(format!("Unknown verification status: {}", s)),
        }
    }
}

/// One inspection event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Assigned by the store, never reused
    pub id: i64,
    pub sku: String,
    pub descripcion: String,
    #[serde(rename = "factorEstiba")]
    pub factor_estiba: f64,
    pub status: VerificationStatus,
    /// Stamped by the store at insertion
    pub fecha: DateTime<Utc>,
    pub inspector: String,
    pub turno: String,
    pub ubicacion: String,
    pub observaciones: String,
    /// Inspection parameters, stored as given
    pub parametros: serde_json::Value,
    pub total_fotos: u32,
}

/// One photo attached to a verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub verificacion_id: i64,
    /// Inspection parameter the photo documents
    pub parametro: String,
    pub blob: Vec<u8>,
    pub fecha: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [VerificationStatus::Ok, VerificationStatus::Error] {
            assert_eq!(status.as_str().parse::<VerificationStatus>(), Ok(status));
        }
        assert!("OK ".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn test_verification_json_field_names() {
        let verification = Verification {
            id: 3,
            sku: "A1".to_string(),
            descripcion: "Caja".to_string(),
            factor_estiba: 2.5,
            status: VerificationStatus::Error,
            fecha: Utc::now(),
            inspector: "Ana".to_string(),
            turno: "noche".to_string(),
            ubicacion: "R1".to_string(),
            observaciones: String::new(),
            parametros: serde_json::json!({ "peso": "ok" }),
            total_fotos: 0,
        };

        let json = serde_json::to_value(&verification).unwrap();
        assert_eq!(json["factorEstiba"], 2.5);
        assert_eq!(json["status"], "error");
        assert_eq!(json["total_fotos"], 0);
        assert!(json.get("factor_estiba").is_none());
    }
}
