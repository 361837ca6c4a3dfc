//! OpenAPI document of the public schemas, served at `/api/v1/openapi.json`.

use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::{RefOr, Schema},
};

use crate::auth::{Claims, TokenKind};
use crate::pagination::PageMeta;
use crate::resources::{PermissionRow, ProfileRow, RolePermissionRow, RoleRow, RoleSummary, UserDetail, UserRow};
use crate::services::auth::{LoginInput, RefreshInput, RegisterInput, Session, SessionUser, TokenInfo};
use crate::services::permissions::{CreatePermission, UpdatePermission};
use crate::services::roles::{CreateRole, RolePermissionInput, UpdateRole};
use crate::services::users::{ChangePassword, CreateUser, LinkProfile, PasswordInput, UpdateUser, UpdateUserRole};
use crate::services::{BulkStatusResult, BulkStatusUpdate, StatusUpdate};
use crate::traits::ListResource;

#[derive(OpenApi)]
#[openapi(
    info(title = "rolecrate", description = "Role-based access control admin API"),
    components(schemas(
        PageMeta,
        UserRow,
        UserDetail,
        ProfileRow,
        RoleRow,
        RoleSummary,
        RolePermissionRow,
        PermissionRow,
        CreateUser,
        UpdateUser,
        PasswordInput,
        ChangePassword,
        UpdateUserRole,
        LinkProfile,
        CreateRole,
        UpdateRole,
        RolePermissionInput,
        CreatePermission,
        UpdatePermission,
        StatusUpdate,
        BulkStatusUpdate,
        BulkStatusResult,
        RegisterInput,
        LoginInput,
        RefreshInput,
        Session,
        SessionUser,
        TokenInfo,
        Claims,
        TokenKind,
    )),
    modifiers(&ListingContract)
)]
pub struct ApiDoc;

/// Documents the accepted filter and sort names on each listed row schema
struct ListingContract;

impl Modify for ListingContract {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        describe_listing::<UserRow>(openapi, "UserRow");
        describe_listing::<RoleRow>(openapi, "RoleRow");
        describe_listing::<PermissionRow>(openapi, "PermissionRow");
    }
}

fn describe_listing<T: ListResource>(openapi: &mut utoipa::openapi::OpenApi, schema: &str) {
    let Some(components) = openapi.components.as_mut() else {
        return;
    };
    if let Some(RefOr::T(Schema::Object(object))) = components.schemas.get_mut(schema) {
        let contract = T::listing_contract();
        object.description = Some(match object.description.take() {
            Some(existing) => format!("{existing}\n\n{contract}"),
            None => contract,
        });
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
