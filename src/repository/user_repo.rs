// ==========================================
// 用户仓储（只读为主）
// ==========================================
// 职责: auth_user 表的按 id / username 查询
// 写入仅用于管理命令与测试数据准备
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::user::User;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub(crate) fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        is_staff: row.get(3)?,
    })
}

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::connection(db_path, e))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建用户
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): username 已存在
    pub fn create(&self, username: &str, first_name: &str, is_staff: bool) -> RepositoryResult<User> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO auth_user (username, first_name, is_staff) VALUES (?1, ?2, ?3)",
            params![username, first_name, is_staff],
        )?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            first_name: first_name.to_string(),
            is_staff,
        })
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, is_staff FROM auth_user WHERE id = ?1",
                params![id],
                map_user_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, is_staff FROM auth_user WHERE username = ?1",
                params![username],
                map_user_row,
            )
            .optional()?;
        Ok(user)
    }

    /// 按 id 查询，不存在时返回 NotFound
    pub fn get(&self, id: i64) -> RepositoryResult<User> {
        self.find_by_id(id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "User".to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup() -> UserRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        UserRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_create_and_find() {
        let repo = setup();
        let user = repo.create("admin", "", true).unwrap();

        assert_eq!(repo.find_by_id(user.id).unwrap(), Some(user.clone()));
        assert_eq!(repo.find_by_username("admin").unwrap(), Some(user));
        assert!(matches!(repo.get(42), Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let repo = setup();
        repo.create("bob", "Bob", false).unwrap();
        assert!(matches!(
            repo.create("bob", "Robert", false),
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
    }
}
