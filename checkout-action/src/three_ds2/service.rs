//! Seam to the native 3DS2 SDK.

use std::sync::Arc;

use async_trait::async_trait;
use checkout_core::Result;

use super::model::AuthenticationRequestParameters;

/// Directory server the transaction is created against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryServerConfig {
    pub directory_server_id: String,
    pub directory_server_public_key: String,
    pub directory_server_root_certificates: Option<String>,
    pub message_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParameters {
    pub three_ds_server_trans_id: String,
    pub acs_trans_id: String,
    pub acs_ref_number: String,
    pub acs_signed_content: String,
    pub message_version: String,
    pub three_ds_requestor_app_url: Option<String>,
}

/// How a challenge ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Completed { trans_status: String },
    Cancelled,
    Timeout,
    ProtocolError(String),
    RuntimeError(String),
}

/// One live 3DS2 transaction. Created during fingerprinting and reused for
/// the challenge that follows.
#[async_trait]
pub trait ThreeDS2Transaction: Send + Sync {
    fn authentication_request_parameters(&self) -> Result<AuthenticationRequestParameters>;

    async fn do_challenge(&self, parameters: ChallengeParameters) -> ChallengeOutcome;

    fn close(&self);
}

pub trait ThreeDS2Service: Send + Sync {
    fn create_transaction(
        &self,
        config: &DirectoryServerConfig,
    ) -> Result<Arc<dyn ThreeDS2Transaction>>;
}
