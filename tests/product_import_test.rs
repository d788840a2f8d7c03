// ==========================================
// 商品 CSV 导入集成测试
// ==========================================
// 测试目标: 行 → 商品一一对应、默认值、列结构校验、
//          编码、整批回滚
// ==========================================


use rust_decimal::Decimal;
use shopapp::api::{ApiError, CsvImportForm, UploadedFile};
use shopapp::logging;
use std::str::FromStr;

fn form(content: &str) -> CsvImportForm {
    CsvImportForm::with_file(UploadedFile::new("products.csv", content))
}

#[tokio::test]
async fn test_import_creates_one_product_per_row() {
    logging::init_test();
    let (_temp_file, state) = test_helpers::create_test_state();

    let csv = "name,description,price,discount,archived\n\
               Laptop,Fast laptop,1999.99,5,false\n\
               Desktop,,899.50,,\n\
               Phone,\"Good, cheap\",199,10,1\n";
    let created = state
        .import_api
        .upload_products_csv(UploadedFile::new("p.csv", csv), None)
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert_eq!(created[0].name, "Laptop");
    assert_eq!(created[0].price, Decimal::from_str("1999.99").unwrap());
    assert_eq!(created[0].discount, 5);
    assert_eq!(created[1].description, "");
    assert_eq!(created[1].discount, 0);
    assert!(!created[1].archived);
    assert_eq!(created[2].description, "Good, cheap");
    assert!(created[2].archived);

    // 主键按行顺序递增
    assert!(created[0].id < created[1].id && created[1].id < created[2].id);
    assert_eq!(test_helpers::count_rows(&state.db_path, "product"), 3);
}

#[tokio::test]
async fn test_admin_import_outcome() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let outcome = state
        .import_api
        .import_products_csv(form("name,price\nA,1\nB,2\n"))
        .await
        .unwrap();

    assert_eq!(outcome.imported, 2);
    assert_eq!(outcome.redirect, "..");
    assert_eq!(outcome.message, shopapp::i18n::t("import.success"));
}

#[tokio::test]
async fn test_id_column_is_ignored() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let created = state
        .import_api
        .upload_products_csv(UploadedFile::new("p.csv", "id,name\n500,Lamp\n"), None)
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_ne!(created[0].id, 500);
}

#[tokio::test]
async fn test_unknown_column_is_schema_mismatch() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let err = state
        .import_api
        .import_products_csv(form("name,colour\nLamp,red\n"))
        .await
        .unwrap_err();

    match err {
        ApiError::ImportFailed { kind, .. } => assert_eq!(kind, "SCHEMA_MISMATCH"),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(test_helpers::count_rows(&state.db_path, "product"), 0);
}

#[tokio::test]
async fn test_invalid_row_aborts_whole_batch() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let err = state
        .import_api
        .import_products_csv(form("name,price\nGood,1\nBad,abc\n"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    match err {
        ApiError::ImportFailed { kind, errors } => {
            assert_eq!(kind, "VALIDATION");
            assert!(errors[0].contains("price"));
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(test_helpers::count_rows(&state.db_path, "product"), 0);
}

#[tokio::test]
async fn test_unknown_owner_rolls_back() {
    let (_temp_file, state) = test_helpers::create_test_state();
    let user = test_helpers::create_user(&state, "owner", false);

    let csv = format!("name,user\nMine,{}\nOrphan,9999\n", user.id);
    let err = state
        .import_api
        .import_products_csv(form(&csv))
        .await
        .unwrap_err();

    match err {
        ApiError::ImportFailed { kind, .. } => assert_eq!(kind, "REPOSITORY"),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(test_helpers::count_rows(&state.db_path, "product"), 0);
}

#[tokio::test]
async fn test_latin1_upload() {
    let (_temp_file, state) = test_helpers::create_test_state();

    // "Café" 的 ISO-8859-1 编码
    let mut content = b"name\nCaf".to_vec();
    content.push(0xe9);
    content.push(b'\n');

    let created = state
        .import_api
        .upload_products_csv(UploadedFile::new("latin.csv", content.clone()), Some("iso-8859-1"))
        .await
        .unwrap();
    assert_eq!(created[0].name, "Café");

    // 按 utf-8 解码同一文件 → 解码错误
    let err = state
        .import_api
        .upload_products_csv(UploadedFile::new("latin.csv", content), Some("utf-8"))
        .await
        .unwrap_err();
    match err {
        ApiError::ImportFailed { kind, .. } => assert_eq!(kind, "DECODING"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_encoding_label() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let mut import_form = form("name\nA\n");
    import_form.encoding = Some("ebcdic".to_string());
    let err = state
        .import_api
        .import_products_csv(import_form)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::ImportFailed { ref kind, .. } if kind == "DECODING"));
}

#[tokio::test]
async fn test_missing_file_is_form_error() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let err = state
        .import_api
        .import_products_csv(CsvImportForm::default())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(matches!(err, ApiError::FormInvalid { .. }));
}

#[tokio::test]
async fn test_unterminated_quote_rejects_file() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let err = state
        .import_api
        .import_products_csv(form("name,price\n\"Laptop,10\nPhone,5\n"))
        .await
        .unwrap_err();

    match err {
        ApiError::ImportFailed { kind, .. } => assert_eq!(kind, "DECODING"),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(test_helpers::count_rows(&state.db_path, "product"), 0);
}

#[tokio::test]
async fn test_duplicate_column_is_schema_mismatch() {
    let (_temp_file, state) = test_helpers::create_test_state();

    let err = state
        .import_api
        .import_products_csv(form("name,name\nA,B\n"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::ImportFailed { ref kind, .. } if kind == "SCHEMA_MISMATCH"));
    assert_eq!(test_helpers::count_rows(&state.db_path, "product"), 0);
}
