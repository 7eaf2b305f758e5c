use anyhow::Result;
use iwba_common::ProvisionEvent;
use sqlx::{Pool, Postgres};

/// Write the assignment row keyed by the joined instance names. Overwrites
/// on key collision; concurrent requests naming the same instances race with
/// last-writer-wins and no conflict detection.
pub async fn record_assignment(
    pool: &Pool<Postgres>,
    name: &str,
    event: &ProvisionEvent,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tomcat (name, ip, type, email)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE
        SET ip = EXCLUDED.ip,
            type = EXCLUDED.type,
            email = EXCLUDED.email
        "#,
    )
    .bind(name)
    .bind(&event.ip)
    .bind(&event.instance_type)
    .bind(&event.email)
    .execute(pool)
    .await?;
    Ok(())
}
