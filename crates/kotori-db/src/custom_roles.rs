//! Custom role repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A member-owned custom role.
#[derive(Debug, Clone)]
pub struct CustomRole {
    pub user_id: i64,
    pub role_id: i64,
    pub role_name: Option<String>,
}

/// Per-guild custom role settings.
#[derive(Debug, Clone)]
pub struct CustomRoleSettings {
    pub allowed_roles: String,
    pub reference_role_id: i64,
    pub reference_role_name: Option<String>,
}

impl Db {
    /// Every custom role of a guild.
    pub async fn custom_roles(&self, guild_id: i64) -> Result<Vec<CustomRole>> {
        let rows = sqlx::query(
            "SELECT user_id, role_id, role_name FROM custom_roles WHERE guild_id = ?1",
        )
        .bind(guild_id)
        .map(|row: SqliteRow| CustomRole {
            user_id: row.get("user_id"),
            role_id: row.get("role_id"),
            role_name: row.get("role_name"),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Register a member's custom role.
    pub async fn set_custom_role(
        &self,
        guild_id: i64,
        user_id: i64,
        role_id: i64,
        role_name: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO custom_roles (guild_id, user_id, role_id, role_name)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(role_id)
        .bind(role_name)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Forget a member's custom role.
    pub async fn delete_custom_role(&self, guild_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM custom_roles WHERE guild_id = ?1 AND user_id = ?2")
            .bind(guild_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Custom role settings for a guild, when configured.
    pub async fn custom_role_settings(&self, guild_id: i64) -> Result<Option<CustomRoleSettings>> {
        let row = sqlx::query(
            "SELECT allowed_roles, reference_role_id, reference_role_name
             FROM custom_role_settings
             WHERE guild_id = ?1",
        )
        .bind(guild_id)
        .map(|row: SqliteRow| CustomRoleSettings {
            allowed_roles: row.get::<Option<String>, _>("allowed_roles").unwrap_or_default(),
            reference_role_id: row.get::<Option<i64>, _>("reference_role_id").unwrap_or(0),
            reference_role_name: row.get("reference_role_name"),
        })
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Replace the custom role settings of a guild.
    pub async fn set_custom_role_settings(
        &self,
        guild_id: i64,
        allowed_roles: &str,
        reference_role_id: i64,
        reference_role_name: &str,
    ) -> Result<()> {
        sqlx::query("DELETE FROM custom_role_settings WHERE guild_id = ?1")
            .bind(guild_id)
            .execute(self.pool())
            .await?;
        sqlx::query(
            "INSERT INTO custom_role_settings
                 (guild_id, allowed_roles, reference_role_id, reference_role_name)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(guild_id)
        .bind(allowed_roles)
        .bind(reference_role_id)
        .bind(reference_role_name)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_custom_role_settings_replace() {
        let db = Db::in_memory().await.unwrap();
        assert!(db.custom_role_settings(1).await.unwrap().is_none());

        db.set_custom_role_settings(1, "10,20", 99, "Divider").await.unwrap();
        db.set_custom_role_settings(1, "30", 98, "Other").await.unwrap();

        let settings = db.custom_role_settings(1).await.unwrap().unwrap();
        assert_eq!(settings.allowed_roles, "30");
        assert_eq!(settings.reference_role_id, 98);
    }

    #[tokio::test]
    async fn test_custom_role_crud() {
        let db = Db::in_memory().await.unwrap();
        db.set_custom_role(1, 7, 555, "sparkle").await.unwrap();
        let roles = db.custom_roles(1).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_name.as_deref(), Some("sparkle"));

        db.delete_custom_role(1, 7).await.unwrap();
        assert!(db.custom_roles(1).await.unwrap().is_empty());
    }
}
