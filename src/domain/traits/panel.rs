use async_trait::async_trait;
use crate::application::errors::PanelError;
use crate::domain::entities::PanelCredentials;

/// Verifies that the panel accepts a set of credentials
#[async_trait]
pub trait PanelChecker: Send + Sync {
    async fn verify(&self, credentials: &PanelCredentials) -> Result<(), PanelError>;
}
