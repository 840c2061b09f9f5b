//! JSON serialization helpers.
//!
//! Serde already provides JSON serialization for every table and snapshot.
//! This module centralizes the convenience helpers and keeps formatting stable.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{GeoError, GeoResult};

/// Serialize a value to pretty JSON.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> GeoResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| GeoError::internal(format!("serialize: {e}")))
}

/// Serialize a value to compact JSON bytes.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> GeoResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| GeoError::internal(format!("serialize: {e}")))
}

/// Deserialize a value from JSON.
///
/// Options should then be checked with their `validate()` before use.
pub fn from_json<T: DeserializeOwned>(s: &str) -> GeoResult<T> {
    serde_json::from_str::<T>(s).map_err(|e| GeoError::internal(format!("deserialize: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::Faults;
    use crate::series::Series;
    use crate::surfaces::Surfaces;

    #[test]
    fn json_roundtrip_works() {
        let mut series = Series::new(Faults::new());
        series.set_series_index(["fault", "cover"], &Surfaces::new()).unwrap();
        series.faults_mut().set_is_fault(Some(["fault"])).unwrap();

        let json = to_json_pretty(&series).unwrap();
        let decoded: Series = from_json(&json).unwrap();
        assert_eq!(series, decoded);
        assert_eq!(decoded.order_series("cover"), Some(2));
    }

    #[test]
    fn malformed_json_is_internal_error() {
        let err = from_json::<Series>("{not json").unwrap_err();
        assert!(err.is_internal());
    }
}
