/// gRPC handlers for identity-service
///
/// Implements the RPCs from qaengine.proto:
/// - AuthService: Login
/// - UserService: CreateUser, FindUser, UpdateUser, ChangePassword,
///   DeleteUser, ToggleAdmin, ToggleActive
///
/// Role checks already happened in the authorization layer. Handlers only
/// translate between wire messages and the service layer.
use super::qaengine::auth_service_server::AuthService;
use super::qaengine::user_service_server::UserService;
use super::qaengine::*;
use crate::models::{ProfileUpdate, User as UserModel};
use crate::services::{CreateUserInput, LoginFlow, UserManager};
use chrono::{DateTime, Utc};
use grpc_authz::{CallerIdentity, CallerIdentityExt};
use tonic::{Request, Response, Status};

/// AuthService handler
#[derive(Clone)]
pub struct AuthHandler {
    login: LoginFlow,
}

impl AuthHandler {
    pub fn new(login: LoginFlow) -> Self {
        Self { login }
    }
}

#[tonic::async_trait]
impl AuthService for AuthHandler {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> std::result::Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let access_token = self.login.login(&req.username, &req.password).await?;

        Ok(Response::new(LoginResponse { access_token }))
    }
}

/// UserService handler
#[derive(Clone)]
pub struct UserHandler {
    users: UserManager,
}

impl UserHandler {
    pub fn new(users: UserManager) -> Self {
        Self { users }
    }
}

/// Identity attached by the authorization layer, if the method required one
fn caller_of<T>(request: &Request<T>) -> Option<CallerIdentity> {
    request.caller().ok().cloned()
}

fn required_user(user: Option<User>) -> std::result::Result<User, Status> {
    user.ok_or_else(|| Status::invalid_argument("user is required"))
}

#[tonic::async_trait]
impl UserService for UserHandler {
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> std::result::Result<Response<CreateUserResponse>, Status> {
        let user = required_user(request.into_inner().user)?;

        let created = self
            .users
            .create_user(CreateUserInput {
                first_name: user.first_name,
                last_name: user.last_name,
                username: user.username,
                email: user.email,
                password: user.password,
                is_active: user.is_active,
                is_admin: user.is_admin,
            })
            .await?;

        Ok(Response::new(CreateUserResponse { id: created.id }))
    }

    async fn find_user(
        &self,
        request: Request<FindUserRequest>,
    ) -> std::result::Result<Response<FindUserResponse>, Status> {
        let caller = caller_of(&request);
        let id = request.into_inner().id;

        let user = self.users.find_user(caller.as_ref(), id).await?;

        Ok(Response::new(FindUserResponse {
            user: Some(user_model_to_proto(&user)),
        }))
    }

    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> std::result::Result<Response<UpdateUserResponse>, Status> {
        let caller = caller_of(&request);
        let user = required_user(request.into_inner().user)?;

        self.users
            .update_user(
                caller.as_ref(),
                user.id,
                ProfileUpdate {
                    first_name: user.first_name,
                    last_name: user.last_name,
                },
            )
            .await?;

        Ok(Response::new(UpdateUserResponse { is_updated: true }))
    }

    async fn change_password(
        &self,
        request: Request<ChangePasswordRequest>,
    ) -> std::result::Result<Response<ChangePasswordResponse>, Status> {
        let caller = caller_of(&request);
        let req = request.into_inner();

        self.users
            .change_password(
                caller.as_ref(),
                req.id,
                &req.old_password,
                &req.new_password,
                &req.retype_new_password,
            )
            .await?;

        Ok(Response::new(ChangePasswordResponse {
            is_password_changed: true,
        }))
    }

    async fn delete_user(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> std::result::Result<Response<DeleteUserResponse>, Status> {
        self.users.delete_user(request.into_inner().id).await?;
        Ok(Response::new(DeleteUserResponse { is_deleted: true }))
    }

    async fn toggle_admin(
        &self,
        request: Request<ToggleAdminRequest>,
    ) -> std::result::Result<Response<ToggleAdminResponse>, Status> {
        self.users.toggle_admin(request.into_inner().id).await?;
        Ok(Response::new(ToggleAdminResponse { is_updated: true }))
    }

    async fn toggle_active(
        &self,
        request: Request<ToggleActiveRequest>,
    ) -> std::result::Result<Response<ToggleActiveResponse>, Status> {
        self.users.toggle_active(request.into_inner().id).await?;
        Ok(Response::new(ToggleActiveResponse { is_updated: true }))
    }
}

fn timestamp(at: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: 0,
    }
}

/// Wire form of a stored user; the password field is always left empty
fn user_model_to_proto(user: &UserModel) -> User {
    User {
        id: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        password: String::new(),
        is_active: user.is_active,
        is_admin: user.is_admin,
        created_at: Some(timestamp(user.created_at)),
        updated_at: Some(timestamp(user.updated_at)),
    }
}
