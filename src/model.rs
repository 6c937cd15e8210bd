use crate::store::Document;
use crate::validation::{
    ValidationError, ValidationResult, normalize_optional_text, parse_uuid, require_trimmed,
    validate_non_empty_update, validate_non_negative,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Persisted field names. Documents and JSON bodies share these exactly.
pub mod fields {
    pub const PRODUCT_ID: &str = "ProductID";
    pub const STOCK_ID: &str = "StockID";
    pub const USER_ID: &str = "UserID";
    pub const CATEGORY_ID: &str = "CategoryID";
    pub const PRODUCT_NAME: &str = "ProductName";
    pub const CATEGORY: &str = "Category";
    pub const UNIT: &str = "Unit";
    pub const PRODUCT_QTY: &str = "ProductQty";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "ProductID")]
    pub product_id: Uuid,
    #[serde(rename = "StockID")]
    pub stock_id: Uuid,
    #[serde(rename = "ProductName")]
    pub product_name: String,
    /// Free text; `null` once cleared through an update.
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "Unit", default)]
    pub unit: String,
    #[serde(rename = "ProductQty", default)]
    pub product_qty: i64,
}

/// A user's stock container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(rename = "StockID")]
    pub stock_id: Uuid,
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    #[serde(rename = "StockName")]
    pub stock_name: String,
}

/// A category belonging to a stock.
///
/// `Discription` keeps the historical spelling used by stored documents and
/// existing clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "CategoryID")]
    pub category_id: Uuid,
    #[serde(rename = "StockID")]
    pub stock_id: Uuid,
    #[serde(rename = "CategoryName")]
    pub category_name: String,
    #[serde(
        rename = "Discription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub discription: Option<String>,
}

// =============================================================================
// FIELD PRESENCE
// =============================================================================

/// Presence of an optional field in a sparse update body.
///
/// `Absent` covers both an omitted key and an explicit `null`; only
/// `Present` values are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Absent,
    Present(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Field::Present(value) => Some(value),
            Field::Absent => None,
        }
    }

    /// Applies a fallible transformation to a present value.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Field<U>, E> {
        match self {
            Field::Present(value) => f(value).map(Field::Present),
            Field::Absent => Ok(Field::Absent),
        }
    }
}

impl<'de, T> Deserialize<'de> for Field<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(value) => Field::Present(value),
            None => Field::Absent,
        })
    }
}

// =============================================================================
// REQUEST PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateProductRequest {
    #[serde(rename = "StockID")]
    pub stock_id: Option<String>,
    #[serde(rename = "ProductName")]
    pub product_name: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Unit")]
    pub unit: Option<String>,
    #[serde(rename = "ProductQty")]
    pub product_qty: Option<i64>,
}

impl CreateProductRequest {
    /// Validates the payload and assigns a fresh `ProductID`.
    pub fn into_product(self) -> ValidationResult<Product> {
        let stock_id = self.stock_id.as_deref().unwrap_or_default().trim();
        let product_name = self.product_name.as_deref().unwrap_or_default().trim();

        if stock_id.is_empty() || product_name.is_empty() {
            return Err(ValidationError::generic(
                "StockID and ProductName are required",
            ));
        }
        let product_qty = match self.product_qty {
            Some(qty) if qty != 0 => qty,
            _ => return Err(ValidationError::generic("ProductQty must be provided")),
        };
        let stock_id = parse_uuid(fields::STOCK_ID, stock_id)?;

        Ok(Product {
            product_id: Uuid::new_v4(),
            stock_id,
            product_name: product_name.to_string(),
            category: Some(self.category.as_deref().unwrap_or_default().trim().to_string()),
            unit: self.unit.as_deref().unwrap_or_default().trim().to_string(),
            product_qty,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProductRequest {
    #[serde(rename = "ProductName")]
    pub product_name: Field<String>,
    #[serde(rename = "Category")]
    pub category: Field<String>,
    #[serde(rename = "Unit")]
    pub unit: Field<String>,
    #[serde(rename = "ProductQty")]
    pub product_qty: Field<i64>,
}

impl UpdateProductRequest {
    /// Normalizes the present fields into the set of changes to apply.
    ///
    /// An empty result is an error: there is nothing to send to the store.
    pub fn into_changes(self) -> ValidationResult<ProductChanges> {
        let changes = ProductChanges {
            product_name: self
                .product_name
                .try_map(|name| validate_non_empty_update(fields::PRODUCT_NAME, &name))?,
            category: self
                .category
                .try_map(|category| Ok::<_, ValidationError>(normalize_optional_text(&category)))?,
            unit: self
                .unit
                .try_map(|unit| Ok::<_, ValidationError>(unit.trim().to_string()))?,
            product_qty: self
                .product_qty
                .try_map(|qty| validate_non_negative(fields::PRODUCT_QTY, qty))?,
        };

        if changes.is_empty() {
            return Err(ValidationError::generic(
                "provide at least one field to update",
            ));
        }
        Ok(changes)
    }
}

/// Validated sparse update for a product.
///
/// `category: Present(None)` clears the stored value to `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductChanges {
    pub product_name: Field<String>,
    pub category: Field<Option<String>>,
    pub unit: Field<String>,
    pub product_qty: Field<i64>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        !(self.product_name.is_present()
            || self.category.is_present()
            || self.unit.is_present()
            || self.product_qty.is_present())
    }

    /// Field assignments to merge into the stored document.
    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = self.product_name.as_present() {
            set.insert(fields::PRODUCT_NAME.into(), Value::from(name.clone()));
        }
        if let Some(category) = self.category.as_present() {
            let value = category.clone().map(Value::from).unwrap_or(Value::Null);
            set.insert(fields::CATEGORY.into(), value);
        }
        if let Some(unit) = self.unit.as_present() {
            set.insert(fields::UNIT.into(), Value::from(unit.clone()));
        }
        if let Some(qty) = self.product_qty.as_present() {
            set.insert(fields::PRODUCT_QTY.into(), Value::from(*qty));
        }
        set
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateStockRequest {
    #[serde(rename = "UserID")]
    pub user_id: Option<String>,
    #[serde(rename = "StockName")]
    pub stock_name: Option<String>,
}

impl CreateStockRequest {
    pub fn into_warehouse(self) -> ValidationResult<Warehouse> {
        let stock_name = self.stock_name.as_deref().unwrap_or_default().trim();
        let user_id = self.user_id.as_deref().unwrap_or_default().trim();

        if stock_name.is_empty() || user_id.is_empty() {
            return Err(ValidationError::generic("UserID and StockName are required"));
        }
        let user_id = parse_uuid(fields::USER_ID, user_id)?;

        Ok(Warehouse {
            stock_id: Uuid::new_v4(),
            user_id,
            stock_name: stock_name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryRequest {
    #[serde(rename = "StockID")]
    pub stock_id: Option<String>,
    #[serde(rename = "CategoryName")]
    pub category_name: Option<String>,
    #[serde(rename = "Discription")]
    pub discription: Option<String>,
}

impl CategoryRequest {
    /// Validates one element of a bulk request; `index` is its position in
    /// the submitted array.
    pub fn into_category(self, index: usize) -> ValidationResult<Category> {
        let stock_id = self.stock_id.as_deref().unwrap_or_default();
        let category_name = self.category_name.as_deref().unwrap_or_default();

        let (Ok(stock_id), Ok(category_name)) = (
            require_trimmed(fields::STOCK_ID, stock_id),
            require_trimmed("CategoryName", category_name),
        ) else {
            return Err(ValidationError::generic(format!(
                "StockID and CategoryName are required at index {index}"
            )));
        };
        let stock_id = Uuid::parse_str(stock_id).map_err(|_| {
            ValidationError::generic(format!("StockID at index {index} must be a valid UUID"))
        })?;

        Ok(Category {
            category_id: Uuid::new_v4(),
            stock_id,
            category_name: category_name.to_string(),
            discription: self.discription.as_deref().and_then(normalize_optional_text),
        })
    }
}

/// Validates a bulk category request in full before anything is persisted.
pub fn categories_from_requests(requests: Vec<CategoryRequest>) -> ValidationResult<Vec<Category>> {
    if requests.is_empty() {
        return Err(ValidationError::generic("at least one category is required"));
    }
    requests
        .into_iter()
        .enumerate()
        .map(|(index, request)| request.into_category(index))
        .collect()
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedProductResponse {
    pub deleted_product: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedCategoryResponse {
    pub deleted_category: u64,
}

/// Result of the two-step stock delete. The counts come from independent
/// store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedStockResponse {
    pub deleted_stock: u64,
    #[serde(rename = "deleted_relatedProducts")]
    pub deleted_related_products: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn update(body: Value) -> ValidationResult<ProductChanges> {
        serde_json::from_value::<UpdateProductRequest>(body)
            .expect("update body decodes")
            .into_changes()
    }

    #[test]
    fn field_distinguishes_missing_from_present() {
        let req: UpdateProductRequest =
            serde_json::from_value(json!({"Unit": "kg", "Category": null})).unwrap();
        assert_eq!(req.unit, Field::Present("kg".to_string()));
        assert_eq!(req.category, Field::Absent);
        assert_eq!(req.product_name, Field::Absent);
    }

    #[test]
    fn whitespace_category_clears_to_null() {
        let changes = update(json!({"Category": "   "})).unwrap();
        assert_eq!(changes.category, Field::Present(None));
        assert_eq!(changes.to_document().get("Category"), Some(&Value::Null));
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = update(json!({})).unwrap_err();
        assert_eq!(err.to_string(), "provide at least one field to update");
        let err = update(json!({"Unknown": 1})).unwrap_err();
        assert_eq!(err.to_string(), "provide at least one field to update");
    }

    #[test]
    fn blank_name_and_negative_qty_are_rejected() {
        assert_eq!(
            update(json!({"ProductName": " "})).unwrap_err().to_string(),
            "ProductName cannot be empty"
        );
        assert_eq!(
            update(json!({"ProductQty": -3})).unwrap_err().to_string(),
            "ProductQty cannot be negative"
        );
    }

    #[test]
    fn update_document_only_has_present_fields() {
        let changes = update(json!({"ProductName": " Rice ", "ProductQty": 0})).unwrap();
        let doc = changes.to_document();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["ProductName"], json!("Rice"));
        assert_eq!(doc["ProductQty"], json!(0));
    }

    #[test]
    fn create_product_requires_quantity() {
        let req = CreateProductRequest {
            stock_id: Some(Uuid::new_v4().to_string()),
            product_name: Some("Rice".into()),
            ..Default::default()
        };
        assert_eq!(
            req.into_product().unwrap_err().to_string(),
            "ProductQty must be provided"
        );
    }

    #[test]
    fn create_product_trims_and_assigns_id() {
        let stock_id = Uuid::new_v4();
        let product = CreateProductRequest {
            stock_id: Some(format!("  {stock_id} ")),
            product_name: Some(" Rice ".into()),
            category: Some(" grain ".into()),
            unit: Some(" kg ".into()),
            product_qty: Some(4),
        }
        .into_product()
        .unwrap();

        assert_eq!(product.stock_id, stock_id);
        assert_eq!(product.product_name, "Rice");
        assert_eq!(product.category.as_deref(), Some("grain"));
        assert_eq!(product.unit, "kg");
        assert_ne!(product.product_id, Uuid::nil());
    }

    #[test]
    fn create_warehouse_checks_user_id() {
        let err = CreateStockRequest {
            user_id: Some("nope".into()),
            stock_name: Some("Main".into()),
        }
        .into_warehouse()
        .unwrap_err();
        assert_eq!(err.to_string(), "UserID must be a valid UUID");

        let err = CreateStockRequest::default().into_warehouse().unwrap_err();
        assert_eq!(err.to_string(), "UserID and StockName are required");
    }

    #[test]
    fn bulk_categories_report_first_bad_index() {
        let stock = Uuid::new_v4().to_string();
        let good = |name: &str| CategoryRequest {
            stock_id: Some(stock.clone()),
            category_name: Some(name.into()),
            discription: None,
        };
        let requests = vec![
            good("a"),
            good("b"),
            CategoryRequest {
                stock_id: Some("bad".into()),
                category_name: Some("c".into()),
                discription: None,
            },
            CategoryRequest::default(),
        ];

        assert_matches!(
            categories_from_requests(requests),
            Err(ValidationError::Generic { message }) if message == "StockID at index 2 must be a valid UUID"
        );
        assert_eq!(
            categories_from_requests(Vec::new()).unwrap_err().to_string(),
            "at least one category is required"
        );
    }

    #[test]
    fn category_serialization_omits_blank_description() {
        let category = CategoryRequest {
            stock_id: Some(Uuid::new_v4().to_string()),
            category_name: Some("Dairy".into()),
            discription: Some("  ".into()),
        }
        .into_category(0)
        .unwrap();
        let json = serde_json::to_value(&category).unwrap();
        assert!(json.get("Discription").is_none());
        assert_eq!(json["CategoryName"], "Dairy");
    }

    #[test]
    fn stock_delete_response_uses_wire_names() {
        let json = serde_json::to_value(DeletedStockResponse {
            deleted_stock: 1,
            deleted_related_products: 0,
        })
        .unwrap();
        assert_eq!(json, json!({"deleted_stock": 1, "deleted_relatedProducts": 0}));
    }
}
