use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection};
use taskboard_server::entities::sea_orm_active_enums::{TaskStatus, UserRole};
use taskboard_server::entities::{task, user};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use uuid::Uuid;

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts an account directly, bypassing registration. The stored password
/// hash is not a usable credential.
#[allow(dead_code)]
pub async fn seed_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    role: UserRole,
) -> anyhow::Result<user::Model> {
    let now = chrono::Utc::now();
    let model = user::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        email: ActiveValue::Set(email.to_string()),
        password_hash: ActiveValue::Set("seeded-account-without-password".to_string()),
        name: ActiveValue::Set(name.to_string()),
        role: ActiveValue::Set(role),
        last_login: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Inserts a task with known field values, due one week out.
#[allow(dead_code)]
pub async fn seed_task(
    db: &DatabaseConnection,
    assigned_to: Uuid,
    created_by: Uuid,
) -> anyhow::Result<task::Model> {
    let now = chrono::Utc::now();
    let model = task::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        title: ActiveValue::Set("Original Title".to_string()),
        description: ActiveValue::Set("Original Description".to_string()),
        status: ActiveValue::Set(TaskStatus::Todo),
        priority: ActiveValue::Set(3),
        due_date: ActiveValue::Set(now + chrono::Duration::days(7)),
        assigned_to: ActiveValue::Set(assigned_to),
        created_by: ActiveValue::Set(created_by),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}
