//! Schema migrations. Tables are generated from the entity definitions.

use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entities::{audit_log, permission, profile_user, role, role_permission, user};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateRbacTables)]
    }
}

pub struct CreateRbacTables;

impl MigrationName for CreateRbacTables {
    fn name(&self) -> &'static str {
        "m20250101_000001_create_rbac_tables"
    }
}

async fn create_from_entity<E>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for CreateRbacTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        create_from_entity(manager, &schema, role::Entity).await?;
        create_from_entity(manager, &schema, permission::Entity).await?;
        create_from_entity(manager, &schema, user::Entity).await?;
        create_from_entity(manager, &schema, role_permission::Entity).await?;
        create_from_entity(manager, &schema, profile_user::Entity).await?;
        create_from_entity(manager, &schema, audit_log::Entity).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_permission_unique")
                    .table(role_permission::Entity)
                    .col(role_permission::Column::RoleId)
                    .col(role_permission::Column::PermissionId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(audit_log::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(profile_user::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(role_permission::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(user::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(permission::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(role::Entity).to_owned())
            .await
    }
}
