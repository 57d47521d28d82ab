use axum::async_trait;
use uuid::Uuid;

/// Source of the caller's authenticated identity id. The HTTP layer adapts
/// the verified token subject through [`FixedIdentity`]; tests use the same
/// adapter to simulate signed-in and signed-out callers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when nobody is signed in; `Err` when the lookup itself fails.
    async fn current_identity_id(&self) -> anyhow::Result<Option<Uuid>>;
}

/// Identity provider with a known, fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedIdentity(pub Option<Uuid>);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_identity_id(&self) -> anyhow::Result<Option<Uuid>> {
        Ok(self.0)
    }
}
