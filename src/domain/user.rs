// ==========================================
// 用户（外部协作实体）
// ==========================================
// 归属认证子系统；本系统只按 id 引用
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub is_staff: bool,
}

impl User {
    /// first_name 为空时回退为 username
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let mut user = User {
            id: 1,
            username: "admin".to_string(),
            first_name: String::new(),
            is_staff: true,
        };
        assert_eq!(user.display_name(), "admin");

        user.first_name = "Ivan".to_string();
        assert_eq!(user.display_name(), "Ivan");
    }
}
