//! gRPC implementation of the Permissions service.

use service_core::error::AppError;
use service_core::grpc::IntoStatus;
use tonic::{Request, Response, Status};

use super::proto::{
    permissions_server::Permissions, GetUserPermissionRequest, GetUserPermissionResponse,
    SetUserPermissionRequest, SetUserPermissionResponse,
};
use super::{call_context, require, require_key, to_status};
use crate::services::CallContext;
use crate::AppState;

pub struct PermissionsServiceImpl {
    state: AppState,
}

impl PermissionsServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Resolve `login` to a user id, failing fast when the app is unknown.
    async fn resolve_user(
        &self,
        ctx: &CallContext,
        rpc: &'static str,
        app_key: &[u8],
        login: &str,
    ) -> Result<i64, Status> {
        if !self.state.apps.exists(ctx, app_key).await {
            tracing::info!(rpc, "Permission request for unknown app");
            return Err(
                AppError::FailedPrecondition(anyhow::anyhow!("app does not exist")).into_status(),
            );
        }

        self.state
            .auth
            .get_user_id(ctx, app_key, login)
            .await
            .map_err(|e| to_status(rpc, e))
    }
}

#[tonic::async_trait]
impl Permissions for PermissionsServiceImpl {
    async fn get_user_permission(
        &self,
        request: Request<GetUserPermissionRequest>,
    ) -> Result<Response<GetUserPermissionResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;

        let user_id = self
            .resolve_user(&ctx, "GetUserPermission", &req.app_key, &req.login)
            .await?;

        let permission = self
            .state
            .permissions
            .get(&ctx, user_id)
            .await
            .map_err(|e| to_status("GetUserPermission", e))?;

        Ok(Response::new(GetUserPermissionResponse { permission }))
    }

    async fn set_user_permission(
        &self,
        request: Request<SetUserPermissionRequest>,
    ) -> Result<Response<SetUserPermissionResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;

        let user_id = self
            .resolve_user(&ctx, "SetUserPermission", &req.app_key, &req.login)
            .await?;

        self.state
            .permissions
            .set(&ctx, user_id, req.permission)
            .await
            .map_err(|e| to_status("SetUserPermission", e))?;

        Ok(Response::new(SetUserPermissionResponse {}))
    }
}
