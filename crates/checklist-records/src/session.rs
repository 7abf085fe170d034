//! In-progress inspection data handed over by the caller

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::verification::VerificationStatus;

/// Transient inspection state. Not persisted directly: the store turns it
/// into one [`Verification`](crate::Verification) plus its photos.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub sku: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(rename = "factorEstiba", default)]
    pub factor_estiba: f64,
    pub status: VerificationStatus,
    #[serde(default)]
    pub inspector: String,
    #[serde(default)]
    pub turno: String,
    #[serde(default)]
    pub ubicacion: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub parametros: serde_json::Value,
    /// Photo count as reported by the capture flow
    #[serde(default)]
    pub fotos_adjuntas: u32,
    /// Photo payloads keyed by inspection parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fotos: Option<BTreeMap<String, Vec<u8>>>,
}

impl SessionState {
    pub fn new(sku: impl Into<String>, status: VerificationStatus) -> Self {
        Self {
            sku: sku.into(),
            status,
            ..Default::default()
        }
    }

    /// Attach a photo for `parametro`, replacing any earlier one, and keep
    /// `fotos_adjuntas` in step with the map.
    pub fn with_photo(mut self, parametro: impl Into<String>, blob: Vec<u8>) -> Self {
        let fotos = self.fotos.get_or_insert_with(BTreeMap::new);
        fotos.insert(parametro.into(), blob);
        self.fotos_adjuntas = fotos.len() as u32;
        self
    }

    /// Photos that get stored with the verification.
    ///
    /// A zero count means nothing is stored, even if payloads are present.
    pub fn attached_photos(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fotos
            .iter()
            .filter(|_| self.fotos_adjuntas > 0)
            .flat_map(|fotos| fotos.iter())
            .map(|(parametro, blob)| (parametro.as_str(), blob.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_caller_shape() {
        let session: SessionState = serde_json::from_value(serde_json::json!({
            "sku": "A1",
            "descripcion": "Pallet de cajas",
            "factorEstiba": 1.5,
            "status": "error",
            "inspector": "Ana",
            "turno": "mañana",
            "ubicacion": "Muelle 3",
            "notes": "esquina dañada",
            "parametros": { "etiqueta": "error" },
            "fotos_adjuntas": 1,
            "fotos": { "etiqueta": [255, 216, 255] }
        }))
        .unwrap();

        assert_eq!(session.factor_estiba, 1.5);
        assert_eq!(session.status, VerificationStatus::Error);
        assert_eq!(session.notes, "esquina dañada");
        let photos: Vec<_> = session.attached_photos().collect();
        assert_eq!(photos, vec![("etiqueta", &[255u8, 216, 255][..])]);
    }

    #[test]
    fn test_missing_photo_map_is_allowed() {
        let session: SessionState =
            serde_json::from_str(r#"{"sku":"B2","status":"ok","fotos_adjuntas":0}"#).unwrap();
        assert!(session.fotos.is_none());
        assert_eq!(session.attached_photos().count(), 0);
    }

    #[test]
    fn test_zero_count_suppresses_photos() {
        let mut session = SessionState::new("C3", VerificationStatus::Ok).with_photo("front", vec![1]);
        assert_eq!(session.fotos_adjuntas, 1);
        assert_eq!(session.attached_photos().count(), 1);

        session.fotos_adjuntas = 0;
        assert_eq!(session.attached_photos().count(), 0);
    }

    #[test]
    fn test_with_photo_replaces_same_parameter() {
        let session = SessionState::new("D4", VerificationStatus::Ok)
            .with_photo("front", vec![1])
            .with_photo("front", vec![2])
            .with_photo("back", vec![3]);

        assert_eq!(session.fotos_adjuntas, 2);
        assert_eq!(session.fotos.unwrap()["front"], vec![2]);
    }
}
