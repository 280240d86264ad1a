//! Wire formats of 3DS2 tokens and results.
//!
//! Tokens arrive base64-encoded JSON; results are sent back the same way.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use checkout_core::{CheckoutError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FINGERPRINT_DETAILS_KEY: &str = "threeds2.fingerprint";
pub const CHALLENGE_DETAILS_KEY: &str = "threeds2.challengeResult";

/// Transaction status reported when the challenge did not complete.
pub const TRANS_STATUS_UNKNOWN: &str = "U";

/// Directory server parameters carried by a fingerprint action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintToken {
    pub directory_server_id: String,
    pub directory_server_public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_server_root_certificates: Option<String>,
    #[serde(rename = "threeDSServerTransID", default, skip_serializing_if = "Option::is_none")]
    pub three_ds_server_trans_id: Option<String>,
    #[serde(rename = "threeDSMessageVersion", default, skip_serializing_if = "Option::is_none")]
    pub three_ds_message_version: Option<String>,
}

/// ACS parameters carried by a challenge action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeToken {
    pub acs_reference_number: String,
    pub acs_signed_content: String,
    #[serde(rename = "acsTransID")]
    pub acs_trans_id: String,
    #[serde(rename = "acsURL", default, skip_serializing_if = "Option::is_none")]
    pub acs_url: Option<String>,
    pub message_version: String,
    #[serde(rename = "threeDSServerTransID")]
    pub three_ds_server_trans_id: String,
}

/// Device data produced by the 3DS2 SDK for the fingerprint result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRequestParameters {
    #[serde(rename = "sdkAppID")]
    pub sdk_app_id: String,
    #[serde(rename = "sdkEncData")]
    pub device_data: String,
    /// JSON Web Key as a JSON string.
    #[serde(rename = "sdkEphemPubKey")]
    pub sdk_ephemeral_public_key: String,
    #[serde(rename = "sdkReferenceNumber")]
    pub sdk_reference_number: String,
    #[serde(rename = "sdkTransID")]
    pub sdk_transaction_id: String,
    #[serde(rename = "messageVersion")]
    pub message_version: String,
}

impl AuthenticationRequestParameters {
    /// The fingerprint result object, with the ephemeral key embedded as JSON.
    pub fn to_fingerprint_json(&self) -> Result<Value> {
        let ephemeral_key: Value = serde_json::from_str(&self.sdk_ephemeral_public_key)
            .map_err(|e| {
                CheckoutError::component(format!("Invalid SDK ephemeral public key: {}", e))
            })?;
        let mut json = serde_json::to_value(self)?;
        if let Some(object) = json.as_object_mut() {
            object.insert("sdkEphemPubKey".into(), ephemeral_key);
        }
        Ok(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResult {
    pub trans_status: String,
}

pub fn decode_token<T: DeserializeOwned>(token: &str) -> Result<T> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| CheckoutError::invalid_input("token", e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn encode_json(value: &Value) -> Result<String> {
    Ok(STANDARD.encode(serde_json::to_vec(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_fingerprint_token() {
        let token = encode_json(&json!({
            "directoryServerId": "F013371337",
            "directoryServerPublicKey": "eyJrdHkiOiJSU0EifQ==",
            "threeDSServerTransID": "ds-trans-1",
            "threeDSMessageVersion": "2.1.0"
        }))
        .unwrap();

        let decoded: FingerprintToken = decode_token(&token).unwrap();
        assert_eq!(decoded.directory_server_id, "F013371337");
        assert_eq!(decoded.three_ds_message_version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_token::<ChallengeToken>("%%%not-base64").unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidInput { .. }));

        let not_json = STANDARD.encode(b"plain text");
        let err = decode_token::<ChallengeToken>(&not_json).unwrap_err();
        assert!(matches!(err, CheckoutError::Serialization(_)));
    }

    #[test]
    fn test_fingerprint_json_embeds_ephemeral_key() {
        let params = AuthenticationRequestParameters {
            sdk_app_id: "app".into(),
            device_data: "enc".into(),
            sdk_ephemeral_public_key: r#"{"kty":"EC","crv":"P-256"}"#.into(),
            sdk_reference_number: "ref".into(),
            sdk_transaction_id: "tx".into(),
            message_version: "2.1.0".into(),
        };

        let json = params.to_fingerprint_json().unwrap();
        assert_eq!(json["sdkEphemPubKey"], json!({"kty": "EC", "crv": "P-256"}));
        assert_eq!(json["sdkTransID"], "tx");
    }
}
