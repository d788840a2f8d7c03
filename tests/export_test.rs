// ==========================================
// 导出集成测试
// ==========================================
// 测试目标: CSV 下载/选中行导出、下载文件名、
//          JSON 导出（权限/不存在/缓存）
// ==========================================


use shopapp::api::{ApiError, UploadedFile, DOWNLOAD_PRODUCT_FIELDS};
use shopapp::domain::{ExportEntity, ProductOrdering, ProductQuery};
use shopapp::logging;

fn parse_csv(body: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_empty_table_exports_header_only() {
    logging::init_test();
    let (_temp_file, state) = test_helpers::create_test_state();

    let export = state
        .export_api
        .download_products_csv(&ProductQuery::default())
        .unwrap();

    let (headers, rows) = parse_csv(&export.body);
    assert_eq!(headers, DOWNLOAD_PRODUCT_FIELDS);
    assert!(rows.is_empty());
    assert_eq!(export.body.lines().count(), 1);
}

#[tokio::test]
async fn test_download_headers() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let export = state.export_api.export_all_csv(ExportEntity::Orders).unwrap();

    assert_eq!(export.filename, "orders-export.csv");
    assert_eq!(
        export.content_disposition(),
        "attachment; filename=\"orders-export.csv\""
    );
    assert!(export
        .headers()
        .iter()
        .any(|(name, value)| *name == "Content-Type" && value.starts_with("text/csv")));
}

#[tokio::test]
async fn test_exported_products_import_back() {
    let (_temp_file, state) = test_helpers::create_test_state();
    test_helpers::seed_products(&state.db_path, &[("Lamp", "12.50"), ("Desk, oak", "300")]);

    let export = state
        .export_api
        .download_products_csv(&ProductQuery::default())
        .unwrap();
    let (_, rows) = parse_csv(&export.body);
    assert_eq!(rows[1][0], "Desk, oak");
    assert_eq!(rows[0][1], "12.50");

    let reimported = state
        .import_api
        .upload_products_csv(UploadedFile::new("back.csv", export.body.clone()), None)
        .await
        .unwrap();
    assert_eq!(reimported.len(), 2);

    let originals = state.catalog_api.list_products(&ProductQuery::default()).unwrap();
    for (original, copy) in originals.iter().zip(&reimported) {
        assert_eq!(original.name, copy.name);
        assert_eq!(original.price, copy.price);
        assert_eq!(original.description, copy.description);
        assert_eq!(original.discount, copy.discount);
    }
}

#[tokio::test]
async fn test_download_respects_query() {
    let (_temp_file, state) = test_helpers::create_test_state();
    test_helpers::seed_products(
        &state.db_path,
        &[("Red phone", "10"), ("Blue phone", "30"), ("Chair", "20")],
    );

    let query = ProductQuery {
        search: Some("PHONE".to_string()),
        ordering: ProductOrdering::parse("-price"),
        ..ProductQuery::default()
    };
    let export = state.export_api.download_products_csv(&query).unwrap();
    let (_, rows) = parse_csv(&export.body);

    let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, vec!["Blue phone", "Red phone"]);

    // 精确匹配与 search 叠加
    let query = ProductQuery {
        search: Some("PHONE".to_string()),
        name: Some("Red phone".to_string()),
        ..ProductQuery::default()
    };
    let export = state.export_api.download_products_csv(&query).unwrap();
    let (_, rows) = parse_csv(&export.body);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "Red phone");
}

#[tokio::test]
async fn test_selected_rows_sorted_by_primary_key() {
    let (_temp_file, state) = test_helpers::create_test_state();
    let products =
        test_helpers::seed_products(&state.db_path, &[("A", "1"), ("B", "2"), ("C", "3")]);

    let export = state
        .export_api
        .export_selected_csv(ExportEntity::Products, &[products[2].id, products[0].id])
        .unwrap();
    let (headers, rows) = parse_csv(&export.body);

    assert_eq!(headers, shopapp::domain::PRODUCT_FIELDS);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], products[0].id.to_string());
    assert_eq!(rows[1][0], products[2].id.to_string());
    assert_eq!(export.filename, "products-export.csv");
}

#[tokio::test]
async fn test_selected_orders_export() {
    let (_temp_file, state) = test_helpers::create_test_state();
    let user = test_helpers::create_user(&state, "ivy", false);
    let csv = format!(
        "delivery_address,promocode,user,products\nOne,P1,{u},\nTwo,,{u},\n",
        u = user.id
    );
    let orders = state
        .import_api
        .upload_orders_csv(UploadedFile::new("o.csv", csv), None)
        .await
        .unwrap();

    let export = state
        .export_api
        .export_selected_csv(ExportEntity::Orders, &[orders[1].id])
        .unwrap();
    let (headers, rows) = parse_csv(&export.body);

    assert_eq!(headers, shopapp::domain::ORDER_FIELDS);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "Two");
    assert_eq!(rows[0][4], user.id.to_string());
}

#[tokio::test]
async fn test_orders_json_requires_staff() {
    let (_temp_file, state) = test_helpers::create_test_state();
    let customer = test_helpers::create_user(&state, "customer", false);
    let staff = test_helpers::create_user(&state, "staff", true);

    let err = state.export_api.orders_json(&customer).unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
    assert_eq!(err.status_code(), 403);

    let export = state.export_api.orders_json(&staff).unwrap();
    assert!(export.orders.is_empty());
}

#[tokio::test]
async fn test_user_orders_json_unknown_user() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let err = state.export_api.user_orders_json(404).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_user_orders_json_lists_only_that_user() {
    let (_temp_file, state) = test_helpers::create_test_state();
    let jane = test_helpers::create_user(&state, "jane", false);
    let kim = test_helpers::create_user(&state, "kim", false);
    let csv = format!(
        "delivery_address,promocode,user,products\nJ,,{},\nK,,{},\n",
        jane.id, kim.id
    );
    state
        .import_api
        .upload_orders_csv(UploadedFile::new("o.csv", csv), None)
        .await
        .unwrap();

    let export = state.export_api.user_orders_json(jane.id).await.unwrap();
    assert_eq!(export.user_id, jane.id);
    assert_eq!(export.orders.len(), 1);
    assert_eq!(export.orders[0].delivery_address, "J");
}

#[tokio::test]
async fn test_products_json_is_cached() {
    let (_temp_file, state) = test_helpers::create_test_state();
    test_helpers::seed_products(&state.db_path, &[("A", "1.50")]);

    let first = state.export_api.products_json().await.unwrap();
    assert_eq!(first.products.len(), 1);
    let json = serde_json::to_value(first.as_ref()).unwrap();
    assert_eq!(json["products"][0]["price"], "1.50");

    // 缓存有效期内新增的商品不可见
    test_helpers::seed_products(&state.db_path, &[("B", "2")]);
    let second = state.export_api.products_json().await.unwrap();
    assert_eq!(second.products.len(), 1);
}
