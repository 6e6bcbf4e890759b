use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Superadmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            "superadmin" => UserRole::Superadmin,
            _ => UserRole::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }
}

/// Account status. Only active accounts may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Banned => "banned",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => UserStatus::Active,
            "banned" => UserStatus::Banned,
            _ => UserStatus::Inactive,
        }
    }
}

/// Full user record, including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub avatar_url: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    full_name: String,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    avatar_url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: UserRole::from_str(&row.role),
            status: UserStatus::from_str(&row.status),
            avatar_url: row.avatar_url,
        }
    }
}

/// Public view of a user, used by the profile and admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub domicile: Option<String>,
    pub institution: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub last_online_at: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserProfileRow {
    id: i64,
    full_name: String,
    username: String,
    email: String,
    role: String,
    status: String,
    domicile: Option<String>,
    institution: Option<String>,
    phone: Option<String>,
    avatar_url: Option<String>,
    last_online_at: Option<String>,
    created_at: String,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            username: row.username,
            email: row.email,
            role: UserRole::from_str(&row.role),
            status: UserStatus::from_str(&row.status),
            domicile: row.domicile,
            institution: row.institution,
            phone: row.phone,
            avatar_url: row.avatar_url,
            last_online_at: row.last_online_at,
            created_at: row.created_at,
        }
    }
}

/// Fields needed to create a user.
pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: UserRole,
    pub domicile: Option<&'a str>,
    pub institution: Option<&'a str>,
}

/// Editable profile fields.
pub struct ProfileUpdate<'a> {
    pub full_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub domicile: Option<&'a str>,
    pub institution: Option<&'a str>,
    pub phone: Option<&'a str>,
}

const USER_COLUMNS: &str =
    "id, full_name, username, email, password_hash, role, status, avatar_url";

const PROFILE_COLUMNS: &str = "id, full_name, username, email, role, status, domicile, institution, phone, avatar_url, last_online_at, created_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new active user. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (full_name, username, email, password_hash, role, status, domicile, institution)
             VALUES (?, ?, ?, ?, ?, 'active', ?, ?)",
        )
        .bind(user.full_name)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .bind(user.domicile)
        .bind(user.institution)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get the public profile of a user.
    pub async fn get_profile(&self, id: i64) -> Result<Option<UserProfile>, sqlx::Error> {
        let row: Option<UserProfileRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", PROFILE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(UserProfile::from))
    }

    /// List all users, newest first.
    pub async fn list(&self) -> Result<Vec<UserProfile>, sqlx::Error> {
        let rows: Vec<UserProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    /// Update editable profile fields.
    pub async fn update_profile(
        &self,
        id: i64,
        update: &ProfileUpdate<'_>,
    ) -> Result<bool, sqlx::Error> {
        self.update_account(id, update, None).await
    }

    /// Update profile fields and, when given, the role in one transaction.
    pub async fn update_account(
        &self,
        id: i64,
        update: &ProfileUpdate<'_>,
        role: Option<UserRole>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET full_name = ?, username = ?, email = ?, domicile = ?, institution = ?,
             phone = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(update.full_name)
        .bind(update.username)
        .bind(update.email)
        .bind(update.domicile)
        .bind(update.institution)
        .bind(update.phone)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(role) = role {
            sqlx::query("UPDATE users SET role = ? WHERE id = ?")
                .bind(role.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn set_password_hash(&self, id: i64, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_avatar(&self, id: i64, avatar_url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET avatar_url = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(avatar_url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the role for a user.
    pub async fn set_status(&self, id: i64, status: UserStatus) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET status = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login.
    pub async fn touch_last_online(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_online_at = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user by ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    fn new_user<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            full_name: "Test User",
            username,
            email,
            password_hash: "hash",
            role: UserRole::User,
            domicile: None,
            institution: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db
            .users()
            .create(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let user = db
            .users()
            .get_by_email("ALICE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.status, UserStatus::Active);

        let profile = db.users().get_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.email, "alice@example.com");
        assert!(profile.last_online_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_fail() {
        let db = Database::open(":memory:").await.unwrap();

        db.users()
            .create(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = db
            .users()
            .create(&new_user("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_unique_violation());

        let err = db
            .users()
            .create(&new_user("Alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_unique_violation());
    }

    #[tokio::test]
    async fn test_role_and_status_updates() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&new_user("bob", "bob@example.com"))
            .await
            .unwrap();

        let update = ProfileUpdate {
            full_name: "Bob Builder",
            username: "bob",
            email: "bob@example.com",
            domicile: None,
            institution: None,
            phone: None,
        };
        assert!(
            db.users()
                .update_account(id, &update, Some(UserRole::Admin))
                .await
                .unwrap()
        );
        assert!(db.users().set_status(id, UserStatus::Banned).await.unwrap());

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.full_name, "Bob Builder");
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.status, UserStatus::Banned);

        assert!(
            !db.users()
                .update_account(999, &update, Some(UserRole::Admin))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_update_account_rolls_back_on_conflict() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&new_user("dina", "dina@example.com"))
            .await
            .unwrap();
        db.users()
            .create(&new_user("eko", "eko@example.com"))
            .await
            .unwrap();

        let taken = ProfileUpdate {
            full_name: "Dina",
            username: "eko",
            email: "dina@example.com",
            domicile: None,
            institution: None,
            phone: None,
        };
        assert!(
            db.users()
                .update_account(id, &taken, Some(UserRole::Admin))
                .await
                .is_err()
        );

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.username, "dina");
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&new_user("carol", "carol@example.com"))
            .await
            .unwrap();

        assert!(db.users().delete(id).await.unwrap());
        assert!(db.users().get_by_id(id).await.unwrap().is_none());
        assert!(!db.users().delete(id).await.unwrap());
    }
}
