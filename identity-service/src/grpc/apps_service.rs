//! gRPC implementation of the Apps service.

use tonic::{Request, Response, Status};

use super::proto::{
    apps_server::Apps, DeleteAppRequest, DeleteAppResponse, NewAppRequest, NewAppResponse,
};
use super::{call_context, require_key, to_status};
use crate::AppState;

pub struct AppsServiceImpl {
    state: AppState,
}

impl AppsServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl Apps for AppsServiceImpl {
    async fn new_app(
        &self,
        request: Request<NewAppRequest>,
    ) -> Result<Response<NewAppResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);

        let key = self
            .state
            .apps
            .create(&ctx)
            .await
            .map_err(|e| to_status("NewApp", e))?;

        Ok(Response::new(NewAppResponse { key }))
    }

    async fn delete_app(
        &self,
        request: Request<DeleteAppRequest>,
    ) -> Result<Response<DeleteAppResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.key, "key")?;

        self.state
            .apps
            .delete_by_key(&ctx, &req.key)
            .await
            .map_err(|e| to_status("DeleteApp", e))?;

        Ok(Response::new(DeleteAppResponse {}))
    }
}
