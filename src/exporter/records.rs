// ==========================================
// 实体 → CSV 字段值
// ==========================================

use crate::domain::order::{Order, ORDER_FIELDS};
use crate::domain::product::{Product, PRODUCT_FIELDS};
use crate::exporter::csv_writer::CsvRecord;

fn optional<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl CsvRecord for Product {
    const FIELDS: &'static [&'static str] = PRODUCT_FIELDS;

    fn csv_value(&self, field: &str) -> Option<String> {
        let value = match field {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "description" => self.description.clone(),
            "price" => self.price.to_string(),
            "discount" => self.discount.to_string(),
            "archived" => self.archived.to_string(),
            "preview" => optional(&self.preview),
            "user" => optional(&self.user_id),
            _ => return None,
        };
        Some(value)
    }
}

impl CsvRecord for Order {
    const FIELDS: &'static [&'static str] = ORDER_FIELDS;

    fn csv_value(&self, field: &str) -> Option<String> {
        let value = match field {
            "id" => self.id.to_string(),
            "delivery_address" => self.delivery_address.clone(),
            "promocode" => self.promocode.clone(),
            "created_at" => self.created_at.to_rfc3339(),
            "user" => self.user_id.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_product_values() {
        let product = Product {
            id: 7,
            name: "Phone".to_string(),
            description: String::new(),
            price: Decimal::from_str("19.90").unwrap(),
            discount: 5,
            archived: false,
            preview: None,
            user_id: Some(2),
        };

        assert_eq!(product.csv_value("price").as_deref(), Some("19.90"));
        assert_eq!(product.csv_value("archived").as_deref(), Some("false"));
        assert_eq!(product.csv_value("preview").as_deref(), Some(""));
        assert_eq!(product.csv_value("user").as_deref(), Some("2"));
        assert_eq!(product.csv_value("weight"), None);
        // 每个声明字段都能取值
        assert!(Product::FIELDS.iter().all(|f| product.csv_value(f).is_some()));
    }

    #[test]
    fn test_order_values() {
        let order = Order {
            id: 1,
            delivery_address: "Pushkina str, 10".to_string(),
            promocode: "SALE21".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            user_id: 3,
        };

        assert_eq!(
            order.csv_value("created_at").as_deref(),
            Some("2024-05-01T12:00:00+00:00")
        );
        assert!(Order::FIELDS.iter().all(|f| order.csv_value(f).is_some()));
    }
}
