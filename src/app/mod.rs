// ==========================================
// 应用层
// ==========================================
// 职责: 共享状态装配，供管理命令与集成测试使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
