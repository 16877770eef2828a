//! Request context passed to every orchestration operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the caller on whose behalf an operation runs.
///
/// The tenant id scopes newly created entities when the request payload
/// does not name one explicitly. `is_admin` gates the admin-only remote MAC
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant_id: String,
    pub user_id: String,
    pub is_admin: bool,
    /// Correlates log and audit records emitted while serving one request.
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            is_admin,
            request_id: Uuid::new_v4(),
        }
    }

    /// Context for an administrator acting within `tenant_id`.
    pub fn admin(tenant_id: impl Into<String>) -> Self {
        Self::new(tenant_id, "admin", true)
    }

    /// Context for an ordinary tenant user.
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        let user_id = tenant_id.clone();
        Self::new(tenant_id, user_id, false)
    }

    /// Returns the explicit tenant if given, otherwise the caller's tenant.
    pub fn tenant_or(&self, explicit: Option<&str>) -> String {
        explicit.unwrap_or(&self.tenant_id).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_admin_and_tenant_contexts() {
        let admin = RequestContext::admin("t1");
        assert!(admin.is_admin);
        assert_eq!(admin.tenant_id, "t1");

        let user = RequestContext::tenant("t2");
        assert!(!user.is_admin);
        assert_eq!(user.user_id, "t2");
    }

    #[test]
    fn test_tenant_or() {
        let ctx = RequestContext::tenant("t1");
        assert_eq!(ctx.tenant_or(None), "t1");
        assert_eq!(ctx.tenant_or(Some("other")), "other");
    }
}
