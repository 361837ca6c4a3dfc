use axum::http::StatusCode;
use rolecrate::entities::role_permission;
use rolecrate::services::roles::{self, UpdateRole};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;

mod common;
use common::{TestApp, setup_test_app};

async fn links(app: &TestApp, role_id: i32) -> Vec<(i32, bool)> {
    role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.eq(role_id))
        .order_by_asc(role_permission::Column::PermissionId)
        .all(app.db())
        .await
        .unwrap()
        .into_iter()
        .map(|link| (link.permission_id, link.status))
        .collect()
}

/// Ids of the create, edit, read and delete building permissions, in id order
async fn four_permission_ids(app: &TestApp) -> [i32; 4] {
    let mut ids = Vec::new();
    for name in ["create_building", "edit_building", "read_building", "delete_building"] {
        ids.push(app.permission(name).await.id);
    }
    [ids[0], ids[1], ids[2], ids[3]]
}

#[tokio::test]
async fn test_sync_replaces_permission_set_without_duplicates() {
    let app = setup_test_app().await;
    let [p1, p2, p3, p4] = four_permission_ids(&app).await;
    let role = app.create_role("Operators", &["create_building", "edit_building", "read_building"]).await;

    let summary = roles::sync_permissions(app.db(), role.id, &[p2, p3, p4, p4]).await.unwrap();
    assert_eq!(summary.created, vec![p4]);
    assert!(summary.activated.is_empty());
    assert_eq!(summary.deactivated, vec![p1]);

    assert_eq!(links(&app, role.id).await, vec![(p1, false), (p2, true), (p3, true), (p4, true)]);

    // bringing 1 back reactivates the old link instead of inserting another
    let summary = roles::sync_permissions(app.db(), role.id, &[p1, p2, p3, p4]).await.unwrap();
    assert_eq!(summary.activated, vec![p1]);
    assert!(summary.created.is_empty());
    assert_eq!(links(&app, role.id).await.len(), 4);
}

#[tokio::test]
async fn test_role_update_over_http_syncs_permissions() {
    let app = setup_test_app().await;
    let token = app.admin_token().await;
    let [p1, p2, p3, p4] = four_permission_ids(&app).await;
    let role = app.create_role("Operators", &["create_building", "edit_building", "read_building"]).await;

    let res = app
        .put(
            &format!("/api/v1/admin/role/{}", role.id),
            &token,
            json!({"name": "Field Operators", "permissions": [p2, p3, p4]}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Field Operators");
    let active: Vec<i64> = res.body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(active.len(), 3);
    assert!(!active.contains(&i64::from(p1)));
    assert!(active.contains(&i64::from(p4)));
}

#[tokio::test]
async fn test_failed_sync_rolls_back_the_whole_update() {
    let app = setup_test_app().await;
    let [p1, p2, p3, _] = four_permission_ids(&app).await;
    let role = app.create_role("Operators", &["create_building", "edit_building", "read_building"]).await;

    let input = UpdateRole {
        name: Some("Renamed".to_string()),
        status: None,
        permissions: Some(vec![p2, 999_999]),
    };
    let err = roles::update(app.db(), role.id, input).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let unchanged = roles::get_by_id(app.db(), role.id).await.unwrap();
    assert_eq!(unchanged.name, "Operators");
    assert_eq!(links(&app, role.id).await, vec![(p1, true), (p2, true), (p3, true)]);
}

#[tokio::test]
async fn test_assign_and_remove_permission() {
    let app = setup_test_app().await;
    let token = app.admin_token().await;
    let role = app.create_role("Readers", &[]).await;
    let read_forms = app.permission("read_forms").await;
    let body = json!({"roleId": role.id, "permissionId": read_forms.id});

    let res = app.post("/api/v1/admin/role/assign-permission", Some(&token), body.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], true);

    let res = app.post("/api/v1/admin/role/remove-permission", Some(&token), body.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], false);

    // reassigning reactivates the same row
    let res = app.post("/api/v1/admin/role/assign-permission", Some(&token), body).await;
    assert_eq!(res.body["status"], true);
    assert_eq!(links(&app, role.id).await, vec![(read_forms.id, true)]);

    let missing = json!({"roleId": role.id, "permissionId": app.permission("edit_forms").await.id});
    let res = app.post("/api/v1/admin/role/remove-permission", Some(&token), missing).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_soft_delete_and_bulk_status() {
    let app = setup_test_app().await;
    let token = app.admin_token().await;
    let a = app.create_role("A-team", &[]).await;
    let b = app.create_role("B-team", &[]).await;

    let res = app
        .request(axum::http::Method::DELETE, &format!("/api/v1/admin/role/{}", a.id), Some(&token), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], false);
    assert!(roles::get_by_id(app.db(), a.id).await.is_ok());

    let res = app
        .post("/api/v1/admin/role/bulk-status", Some(&token), json!({"ids": [a.id, b.id], "status": true}))
        .await;
    assert_eq!(res.body["updated"], 2);

    let res = app
        .post("/api/v1/admin/role/bulk-status", Some(&token), json!({"ids": [], "status": true}))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_duplicate_role_name_conflicts() {
    let app = setup_test_app().await;
    let token = app.admin_token().await;

    let res = app.post("/api/v1/admin/role", Some(&token), json!({"name": "SuperAdmin"})).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app.post("/api/v1/admin/role", Some(&token), json!({"name": "  Support  "})).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["name"], "Support");
    assert_eq!(res.body["permissions"], json!([]));
}
