// ==========================================
// 商品/订单 CSV 导入导出 - 管理命令入口
// ==========================================
// 用法: shopapp <db_path> <command> [args]
// ==========================================

use anyhow::{bail, Context, Result};
use shopapp::app::{get_default_db_path, AppState};
use shopapp::api::{CsvImportForm, UploadedFile};
use shopapp::domain::ExportEntity;
use std::path::Path;

const USAGE: &str = "\
用法: shopapp [db_path] <command> [args]

命令:
  init-db                               建表（幂等）
  create-user <username> [first_name] [staff]
  create-products                       创建演示商品 Laptop/Desktop/Phone
  create-order                          为 admin 创建演示订单（包含全部商品）
  bulk-actions                          名称含 phone 的商品折扣设为 10
  agg                                   每个订单的商品数与总价
  import-products <csv> [encoding]
  import-orders <csv> [encoding]
  export-products [out]
  export-orders [out]
  set-config <key> <value>
  show-config                           schema 版本、配置快照、导出缓存有效期";

const BULK_DISCOUNT_FRAGMENT: &str = "phone";
const BULK_DISCOUNT: i32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    shopapp::logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("{}", USAGE);
        return Ok(());
    }

    // 第一个参数若不是命令，则视为数据库路径
    let db_path = if is_command(&args[0]) {
        get_default_db_path()
    } else {
        args.remove(0)
    };
    let Some(command) = args.first().cloned() else {
        bail!("缺少命令\n\n{}", USAGE);
    };
    let rest = &args[1..];

    tracing::info!(version = shopapp::VERSION, db_path = %db_path, command = %command, "启动管理命令");
    let state = AppState::new(db_path.clone()).context("无法初始化AppState")?;

    match command.as_str() {
        "init-db" => {
            println!("数据库已就绪: {}", db_path);
        }
        "create-user" => {
            let username = rest.first().context("缺少 username")?;
            let first_name = rest.get(1).map(String::as_str).unwrap_or("");
            let is_staff = rest.get(2).map(|s| s == "staff").unwrap_or(false);
            let user = state.user_repo.create(username, first_name, is_staff)?;
            println!("已创建用户 {} (id={})", user.username, user.id);
        }
        "create-products" => {
            for (product, created) in state.catalog_api.create_demo_products()? {
                println!(
                    "{} 商品 {} (id={})",
                    if created { "已创建" } else { "已存在" },
                    product.name,
                    product.id
                );
            }
        }
        "create-order" => {
            let (order, created) = state.catalog_api.create_demo_order()?;
            println!(
                "{} 订单 id={} ({})",
                if created { "已创建" } else { "已存在" },
                order.id,
                order.delivery_address
            );
        }
        "bulk-actions" => {
            let updated = state
                .catalog_api
                .apply_bulk_discount(BULK_DISCOUNT_FRAGMENT, BULK_DISCOUNT)?;
            println!("已更新 {} 个商品", updated);
        }
        "agg" => {
            for totals in state.catalog_api.order_totals()? {
                println!(
                    "订单 {}: 商品数={} 总价={}",
                    totals.order_id, totals.products_count, totals.total
                );
            }
        }
        "import-products" | "import-orders" => {
            let path = rest.first().context("缺少 CSV 文件路径")?;
            let form = CsvImportForm {
                csv_file: Some(read_upload(path)?),
                encoding: rest.get(1).cloned(),
            };
            let outcome = if command == "import-products" {
                state.import_api.import_products_csv(form).await?
            } else {
                state.import_api.import_orders_csv(form).await?
            };
            println!("{} ({} 行)", outcome.message, outcome.imported);
        }
        "export-products" | "export-orders" => {
            let entity = if command == "export-products" {
                ExportEntity::Products
            } else {
                ExportEntity::Orders
            };
            let export = state.export_api.export_all_csv(entity)?;
            match rest.first() {
                Some(out) => {
                    std::fs::write(out, export.body.as_bytes())
                        .with_context(|| format!("写入失败: {}", out))?;
                    println!("已导出到 {} ({})", out, export.content_disposition());
                }
                None => print!("{}", export.body),
            }
        }
        "set-config" => {
            let (Some(key), Some(value)) = (rest.first(), rest.get(1)) else {
                bail!("用法: set-config <key> <value>");
            };
            state.config_manager.set_config_value(key, value)?;
            println!("{} = {}", key, value);
        }
        "show-config" => {
            let schema_version = state.config_manager.schema_version()?;
            println!(
                "schema_version = {}",
                schema_version.map_or_else(|| "-".to_string(), |v| v.to_string())
            );
            println!("config = {}", state.config_manager.get_config_snapshot()?);
            println!("export_cache_ttl_secs = {}", state.export_api.cache_ttl().as_secs());
        }
        other => bail!("未知命令: {}\n\n{}", other, USAGE),
    }

    Ok(())
}

fn is_command(arg: &str) -> bool {
    matches!(
        arg,
        "init-db"
            | "create-user"
            | "create-products"
            | "create-order"
            | "bulk-actions"
            | "agg"
            | "import-products"
            | "import-orders"
            | "export-products"
            | "export-orders"
            | "set-config"
            | "show-config"
    )
}

fn read_upload(path: &str) -> Result<UploadedFile> {
    let content = std::fs::read(path).with_context(|| format!("无法读取文件: {}", path))?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    Ok(UploadedFile::new(&name, content))
}
