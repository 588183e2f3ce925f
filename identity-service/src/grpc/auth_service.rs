//! gRPC implementation of the Auth service.

use tonic::{Request, Response, Status};

use super::proto::{
    auth_server::Auth, ChangePasswordRequest, ChangePasswordResponse, DeleteUserRequest,
    DeleteUserResponse, LoginRequest, LoginResponse, ParseTokenRequest, ParseTokenResponse,
    RegisterRequest, RegisterResponse, TestUserOnExistRequest, TestUserOnExistResponse,
    UpdateLoginRequest, UpdateLoginResponse,
};
use super::{call_context, require, require_key, to_status};
use crate::utils::Password;
use crate::AppState;

/// gRPC Auth implementation.
pub struct AuthServiceImpl {
    state: AppState,
}

impl AuthServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl Auth for AuthServiceImpl {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;
        require(&req.password, "password")?;

        self.state
            .auth
            .register(&ctx, &req.app_key, &req.login, &Password::new(req.password))
            .await
            .map_err(|e| to_status("Register", e))?;

        Ok(Response::new(RegisterResponse {}))
    }

    async fn login(&self, request: Request<LoginRequest>) -> Result<Response<LoginResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;
        require(&req.password, "password")?;

        let token = self
            .state
            .auth
            .login(&ctx, &req.app_key, &req.login, &Password::new(req.password))
            .await
            .map_err(|e| to_status("Login", e))?;

        Ok(Response::new(LoginResponse { token }))
    }

    async fn delete_user(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> Result<Response<DeleteUserResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;

        self.state
            .auth
            .delete_user(&ctx, &req.app_key, &req.login)
            .await
            .map_err(|e| to_status("DeleteUser", e))?;

        Ok(Response::new(DeleteUserResponse {}))
    }

    async fn update_login(
        &self,
        request: Request<UpdateLoginRequest>,
    ) -> Result<Response<UpdateLoginResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;
        require(&req.new_login, "new login")?;

        self.state
            .auth
            .update_login(&ctx, &req.app_key, &req.login, &req.new_login)
            .await
            .map_err(|e| to_status("UpdateLogin", e))?;

        Ok(Response::new(UpdateLoginResponse {}))
    }

    async fn change_password(
        &self,
        request: Request<ChangePasswordRequest>,
    ) -> Result<Response<ChangePasswordResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;
        require(&req.new_password, "new password")?;

        self.state
            .auth
            .change_password(&ctx, &req.app_key, &req.login, &Password::new(req.new_password))
            .await
            .map_err(|e| to_status("ChangePassword", e))?;

        Ok(Response::new(ChangePasswordResponse {}))
    }

    async fn test_user_on_exist(
        &self,
        request: Request<TestUserOnExistRequest>,
    ) -> Result<Response<TestUserOnExistResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.login, "login")?;

        let exist = self
            .state
            .auth
            .test_on_exist(&ctx, &req.app_key, &req.login)
            .await;

        Ok(Response::new(TestUserOnExistResponse { exist }))
    }

    async fn parse_token(
        &self,
        request: Request<ParseTokenRequest>,
    ) -> Result<Response<ParseTokenResponse>, Status> {
        let (ctx, _guard) = call_context(&request, &self.state.config.grpc);
        let req = request.into_inner();

        require_key(&req.app_key, "app key")?;
        require(&req.token, "token")?;

        let login = self
            .state
            .auth
            .parse_token(&ctx, &req.app_key, &req.token)
            .map_err(|e| to_status("ParseToken", e))?;

        Ok(Response::new(ParseTokenResponse { login }))
    }
}
