//! Narrow capability the event processor (C4) uses to call back into the
//! connection manager (C2). C4 depends on this trait object rather than
//! a concrete handle to C2, so there is no back-pointer cycle between the
//! two components.

use async_trait::async_trait;

use crate::domain::{EndpointId, EndpointStatus};

#[async_trait]
pub trait ManagerNotifier: Send + Sync {
    async fn notify_endpoint_status_changed(&self, endpoint_id: EndpointId, status: EndpointStatus);
}
