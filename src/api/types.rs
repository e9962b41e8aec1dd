//! Typed records for every backend resource, plus their create/update payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::schema::{
  finish, Column, Draft, Editable, Entity, FieldErrors, FieldKind, FieldSpec, Related, Scope,
};

const DASH: &str = "-";

fn or_dash<T: ToString>(value: &Option<T>) -> String {
  value
    .as_ref()
    .map(|v| v.to_string())
    .unwrap_or_else(|| DASH.to_string())
}

fn yes_no(value: Option<bool>) -> String {
  match value {
    Some(true) => "Yes".into(),
    Some(false) => "No".into(),
    None => DASH.into(),
  }
}

/// Booleans arrive as `true`, `1` or `"1"` depending on the endpoint.
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
  }

  Ok(match Option::<Flag>::deserialize(d)? {
    None => None,
    Some(Flag::Bool(b)) => Some(b),
    Some(Flag::Int(i)) => Some(i != 0),
    Some(Flag::Text(s)) => Some(matches!(s.as_str(), "1" | "true" | "yes")),
  })
}

/// `{ "name": ... }` relation embedded in some records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
  #[serde(default)]
  pub name: Option<String>,
}

fn ref_name(r: &Option<NamedRef>) -> Option<String> {
  r.as_ref().and_then(|r| r.name.clone())
}

// ============================================================================
// Library resources: one label field plus optional store
// ============================================================================

macro_rules! library_entity {
  (
    $(#[$meta:meta])*
    $name:ident, $payload:ident, $resource:literal, $label:literal, $field:literal, scoped = $scoped:literal
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct $name {
      pub id: u64,
      #[serde(rename = $field)]
      pub name: String,
      #[serde(default)]
      pub store_id: Option<u64>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct $payload {
      #[serde(rename = $field)]
      pub name: String,
      #[serde(skip_serializing_if = "Option::is_none")]
      pub store_id: Option<u64>,
    }

    impl Entity for $name {
      const RESOURCE: &'static str = $resource;
      const LABEL: &'static str = $label;
      const SCOPED: bool = $scoped;
      type Payload = $payload;

      fn id(&self) -> u64 {
        self.id
      }

      fn title(&self) -> String {
        self.name.clone()
      }

      fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[Column::new("ID", 6), Column::new("Name", 0)];
        COLUMNS
      }

      fn cells(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
      }
    }

    impl Editable for $name {
      fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::text($field, "Name").required()];
        FIELDS
      }

      fn draft(&self) -> Draft {
        Draft::default().with($field, &self.name)
      }

      fn payload(draft: &Draft, scope: &Scope) -> Result<$payload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let payload = $payload {
          name: draft.required_text($field, &mut errors),
          store_id: scope.payload_store(Self::SCOPED),
        };
        finish(payload, errors)
      }
    }
  };
}

library_entity!(Category, CategoryPayload, "categories", "Category", "name", scoped = false);
library_entity!(Brand, BrandPayload, "brands", "Brand", "name", scoped = false);
library_entity!(Store, StorePayload, "stores", "Store", "name", scoped = false);
library_entity!(
  MenuCategory,
  MenuCategoryPayload,
  "menu-categories",
  "Menu Category",
  "name",
  scoped = true
);
library_entity!(
  /// Dine-in, takeaway, delivery... The label lives in `type_name`.
  OrderType,
  OrderTypePayload,
  "order-types",
  "Order Type",
  "type_name",
  scoped = false
);
library_entity!(
  DeliveryZone,
  DeliveryZonePayload,
  "delivery-zones",
  "Delivery Zone",
  "zone_name",
  scoped = false
);
library_entity!(ComboMeal, ComboMealPayload, "combo-meals", "Combo Meal", "name", scoped = false);
library_entity!(Group, GroupPayload, "groups", "Group", "group_name", scoped = false);

impl OrderType {
  /// Checkout asks for a delivery zone only for this order type.
  pub fn is_delivery(&self) -> bool {
    self.name.trim().eq_ignore_ascii_case("delivery")
  }
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub sku: Option<String>,
  #[serde(default)]
  pub price: Option<Decimal>,
  #[serde(default)]
  pub qty: Option<i64>,
  #[serde(default)]
  pub category_id: Option<u64>,
  #[serde(default)]
  pub brand_id: Option<u64>,
  #[serde(default, deserialize_with = "de_flag")]
  pub availability: Option<bool>,
  #[serde(default)]
  pub store_id: Option<u64>,
  #[serde(default)]
  pub category: Option<NamedRef>,
  #[serde(default)]
  pub brand: Option<NamedRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPayload {
  pub name: String,
  pub sku: Option<String>,
  pub price: Option<Decimal>,
  pub qty: i64,
  pub availability: bool,
  pub category_id: Option<u64>,
  pub brand_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for Product {
  const RESOURCE: &'static str = "products";
  const LABEL: &'static str = "Product";
  const SCOPED: bool = true;
  type Payload = ProductPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self.name.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Name", 0),
      Column::new("SKU", 12),
      Column::new("Price", 10),
      Column::new("Qty", 6),
      Column::new("Category", 16),
      Column::new("Brand", 14),
      Column::new("Avail", 6),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.name.clone(),
      or_dash(&self.sku),
      or_dash(&self.price),
      or_dash(&self.qty),
      or_dash(&ref_name(&self.category)),
      or_dash(&ref_name(&self.brand)),
      yes_no(self.availability),
    ]
  }
}

impl Editable for Product {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::text("name", "Name").required(),
      FieldSpec::text("sku", "SKU"),
      FieldSpec::new("price", "Price", FieldKind::Decimal),
      FieldSpec::new("qty", "Qty", FieldKind::Integer).default_value("0"),
      FieldSpec::new("category_id", "Category", FieldKind::Reference("categories")),
      FieldSpec::new("brand_id", "Brand", FieldKind::Reference("brands")),
      FieldSpec::new("availability", "Available", FieldKind::Flag).default_value("true"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("name", &self.name)
      .with_opt("sku", self.sku.clone())
      .with_opt("price", self.price)
      .with("qty", self.qty.unwrap_or(0))
      .with_opt("category_id", self.category_id)
      .with_opt("brand_id", self.brand_id)
      .with("availability", self.availability.unwrap_or(true))
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<ProductPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let payload = ProductPayload {
      name: draft.required_text("name", &mut errors),
      sku: draft.text("sku"),
      price: draft.decimal("price", &mut errors),
      qty: draft.number("qty", &mut errors).unwrap_or(0),
      availability: draft.flag("availability"),
      category_id: draft.id("category_id", &mut errors),
      brand_id: draft.id("brand_id", &mut errors),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

// ============================================================================
// Menu items
// ============================================================================

/// A product consumed by one serving of a menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  pub id: u64,
  pub product_id: u64,
  pub quantity_per_serving: Decimal,
  #[serde(default)]
  pub product: Option<NamedRef>,
}

impl Ingredient {
  pub fn product_name(&self) -> String {
    ref_name(&self.product).unwrap_or_else(|| format!("Product #{}", self.product_id))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
  pub id: u64,
  pub display_name: String,
  #[serde(default)]
  pub base_price: Option<Decimal>,
  #[serde(default)]
  pub menu_category_id: Option<u64>,
  #[serde(default)]
  pub product_id: Option<u64>,
  #[serde(default, deserialize_with = "de_flag")]
  pub is_available: Option<bool>,
  #[serde(default)]
  pub store_id: Option<u64>,
  #[serde(default)]
  pub menu_category: Option<NamedRef>,
  #[serde(default)]
  pub ingredients: Vec<Ingredient>,
}

impl MenuItem {
  /// Items are orderable unless explicitly marked unavailable.
  pub fn is_orderable(&self) -> bool {
    self.is_available != Some(false)
  }

  pub fn price(&self) -> Decimal {
    self.base_price.unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItemPayload {
  pub display_name: String,
  pub base_price: Option<Decimal>,
  pub menu_category_id: Option<u64>,
  pub product_id: Option<u64>,
  pub is_available: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for MenuItem {
  const RESOURCE: &'static str = "menu-items";
  const LABEL: &'static str = "Menu Item";
  const SCOPED: bool = true;
  type Payload = MenuItemPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self.display_name.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Name", 0),
      Column::new("Price", 10),
      Column::new("Category", 18),
      Column::new("Ingredients", 11),
      Column::new("Avail", 6),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.display_name.clone(),
      or_dash(&self.base_price),
      or_dash(&ref_name(&self.menu_category)),
      self.ingredients.len().to_string(),
      yes_no(self.is_available),
    ]
  }

  fn related(&self) -> Option<Related> {
    const COLUMNS: &[Column] = &[Column::new("Product", 0), Column::new("Per serving", 12)];
    Some(Related {
      title: "Ingredients",
      columns: COLUMNS,
      rows: self
        .ingredients
        .iter()
        .map(|i| vec![i.product_name(), i.quantity_per_serving.normalize().to_string()])
        .collect(),
    })
  }
}

impl Editable for MenuItem {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::text("display_name", "Name").required(),
      FieldSpec::new("base_price", "Base price", FieldKind::Decimal),
      FieldSpec::new(
        "menu_category_id",
        "Menu category",
        FieldKind::Reference("menu-categories"),
      ),
      FieldSpec::new("product_id", "Product", FieldKind::Reference("products")),
      FieldSpec::new("is_available", "Available", FieldKind::Flag).default_value("true"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("display_name", &self.display_name)
      .with_opt("base_price", self.base_price)
      .with_opt("menu_category_id", self.menu_category_id)
      .with_opt("product_id", self.product_id)
      .with("is_available", self.is_orderable())
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<MenuItemPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let payload = MenuItemPayload {
      display_name: draft.required_text("display_name", &mut errors),
      base_price: draft.decimal("base_price", &mut errors),
      menu_category_id: draft.id("menu_category_id", &mut errors),
      product_id: draft.id("product_id", &mut errors),
      is_available: draft.flag("is_available"),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

// ============================================================================
// Customers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub id: u64,
  pub customer_code: String,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerPayload {
  pub customer_code: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub phone: Option<String>,
  pub email: Option<String>,
}

impl Customer {
  pub fn full_name(&self) -> Option<String> {
    let name = [&self.first_name, &self.last_name]
      .into_iter()
      .flatten()
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" ");
    (!name.is_empty()).then_some(name)
  }
}

impl Entity for Customer {
  const RESOURCE: &'static str = "customers";
  const LABEL: &'static str = "Customer";
  type Payload = CustomerPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self.customer_code.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Code", 12),
      Column::new("Name", 0),
      Column::new("Phone", 16),
      Column::new("Email", 24),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.customer_code.clone(),
      or_dash(&self.full_name()),
      or_dash(&self.phone),
      or_dash(&self.email),
    ]
  }
}

impl Editable for Customer {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::text("customer_code", "Code").required(),
      FieldSpec::text("first_name", "First name"),
      FieldSpec::text("last_name", "Last name"),
      FieldSpec::text("phone", "Phone"),
      FieldSpec::text("email", "Email"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("customer_code", &self.customer_code)
      .with_opt("first_name", self.first_name.clone())
      .with_opt("last_name", self.last_name.clone())
      .with_opt("phone", self.phone.clone())
      .with_opt("email", self.email.clone())
  }

  fn payload(draft: &Draft, _scope: &Scope) -> Result<CustomerPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = draft.text("email");
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
      errors.insert("email".into(), "Enter a valid email".into());
    }
    let payload = CustomerPayload {
      customer_code: draft.required_text("customer_code", &mut errors),
      first_name: draft.text("first_name"),
      last_name: draft.text("last_name"),
      phone: draft.text("phone"),
      email,
    };
    finish(payload, errors)
  }
}

// ============================================================================
// Orders
// ============================================================================

/// A line of an order, as embedded by the kitchen-ticket endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
  pub id: u64,
  pub qty: Decimal,
  #[serde(default)]
  pub amount: Option<Decimal>,
  #[serde(default)]
  pub menu_item: Option<OrderItemMenu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemMenu {
  pub display_name: String,
  #[serde(default)]
  pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: u64,
  #[serde(default)]
  pub bill_no: Option<String>,
  #[serde(default)]
  pub order_type_id: Option<u64>,
  #[serde(default)]
  pub customer_id: Option<u64>,
  #[serde(default)]
  pub net_amount: Option<Decimal>,
  #[serde(default, deserialize_with = "de_flag")]
  pub paid_status: Option<bool>,
  #[serde(default)]
  pub date_time: Option<String>,
  #[serde(default)]
  pub store_id: Option<u64>,
  #[serde(default)]
  pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPayload {
  pub bill_no: Option<String>,
  pub order_type_id: u64,
  pub customer_id: Option<u64>,
  pub net_amount: Option<Decimal>,
  pub paid_status: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for Order {
  const RESOURCE: &'static str = "orders";
  const LABEL: &'static str = "Order";
  const SCOPED: bool = true;
  type Payload = OrderPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self
      .bill_no
      .clone()
      .unwrap_or_else(|| format!("Order #{}", self.id))
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Bill", 0),
      Column::new("Type", 6),
      Column::new("Customer", 9),
      Column::new("Net", 10),
      Column::new("Paid", 5),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      or_dash(&self.bill_no),
      or_dash(&self.order_type_id),
      or_dash(&self.customer_id),
      or_dash(&self.net_amount),
      yes_no(self.paid_status),
    ]
  }

  fn related(&self) -> Option<Related> {
    const COLUMNS: &[Column] = &[
      Column::new("Item", 0),
      Column::new("Qty", 6),
      Column::new("Amount", 10),
    ];
    Some(Related {
      title: "Items",
      columns: COLUMNS,
      rows: self
        .items
        .iter()
        .map(|line| {
          vec![
            line
              .menu_item
              .as_ref()
              .map(|m| m.display_name.clone())
              .unwrap_or_else(|| format!("Line #{}", line.id)),
            line.qty.normalize().to_string(),
            or_dash(&line.amount),
          ]
        })
        .collect(),
    })
  }
}

impl Editable for Order {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::text("bill_no", "Bill no"),
      FieldSpec::new("order_type_id", "Order type", FieldKind::Reference("order-types"))
        .required(),
      FieldSpec::new("customer_id", "Customer", FieldKind::Reference("customers")),
      FieldSpec::new("net_amount", "Net amount", FieldKind::Decimal),
      FieldSpec::new("paid_status", "Paid", FieldKind::Flag).default_value("false"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with_opt("bill_no", self.bill_no.clone())
      .with_opt("order_type_id", self.order_type_id)
      .with_opt("customer_id", self.customer_id)
      .with_opt("net_amount", self.net_amount)
      .with("paid_status", self.paid_status.unwrap_or(false))
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<OrderPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let order_type_id = draft.id("order_type_id", &mut errors);
    if order_type_id.is_none() && !errors.contains_key("order_type_id") {
      errors.insert("order_type_id".into(), "Order type is required".into());
    }
    let payload = OrderPayload {
      bill_no: draft.text("bill_no"),
      order_type_id: order_type_id.unwrap_or_default(),
      customer_id: draft.id("customer_id", &mut errors),
      net_amount: draft.decimal("net_amount", &mut errors),
      paid_status: draft.flag("paid_status"),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

// ============================================================================
// Reservations
// ============================================================================

pub const RESERVATION_STATUSES: &[&str] = &[
  "pending",
  "confirmed",
  "seated",
  "completed",
  "cancelled",
  "no_show",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
  pub id: u64,
  #[serde(default)]
  pub reservation_code: Option<String>,
  #[serde(default)]
  pub customer_id: Option<u64>,
  #[serde(default)]
  pub guest_name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub party_size: Option<u32>,
  #[serde(default)]
  pub reservation_date: Option<String>,
  #[serde(default)]
  pub reservation_time: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub store_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationPayload {
  pub reservation_code: Option<String>,
  pub customer_id: Option<u64>,
  pub guest_name: Option<String>,
  pub phone: Option<String>,
  pub party_size: u32,
  pub reservation_date: String,
  pub reservation_time: Option<String>,
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for Reservation {
  const RESOURCE: &'static str = "reservations";
  const LABEL: &'static str = "Reservation";
  const SCOPED: bool = true;
  type Payload = ReservationPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self
      .reservation_code
      .clone()
      .or_else(|| self.guest_name.clone())
      .unwrap_or_else(|| format!("Reservation #{}", self.id))
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Code", 12),
      Column::new("Guest", 0),
      Column::new("Party", 5),
      Column::new("Date", 10),
      Column::new("Time", 5),
      Column::new("Status", 10),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      or_dash(&self.reservation_code),
      or_dash(&self.guest_name),
      or_dash(&self.party_size),
      or_dash(&self.reservation_date),
      or_dash(&self.reservation_time),
      or_dash(&self.status),
    ]
  }
}

impl Editable for Reservation {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::text("reservation_code", "Code"),
      FieldSpec::new("customer_id", "Customer", FieldKind::Reference("customers")),
      FieldSpec::text("guest_name", "Guest name"),
      FieldSpec::text("phone", "Phone"),
      FieldSpec::new("party_size", "Party size", FieldKind::Integer).default_value("2"),
      FieldSpec::new("reservation_date", "Date", FieldKind::Date).required(),
      FieldSpec::new("reservation_time", "Time", FieldKind::Time),
      FieldSpec::new("status", "Status", FieldKind::Choice(RESERVATION_STATUSES))
        .default_value("pending"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with_opt("reservation_code", self.reservation_code.clone())
      .with_opt("customer_id", self.customer_id)
      .with_opt("guest_name", self.guest_name.clone())
      .with_opt("phone", self.phone.clone())
      .with("party_size", self.party_size.unwrap_or(2))
      .with_opt("reservation_date", self.reservation_date.clone())
      .with_opt("reservation_time", self.reservation_time.clone())
      .with("status", self.status.as_deref().unwrap_or("pending"))
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<ReservationPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let party_size = draft.number::<u32>("party_size", &mut errors).unwrap_or(1);
    if party_size < 1 {
      errors.insert("party_size".into(), "Party size must be at least 1".into());
    }
    let reservation_date = draft.date("reservation_date", &mut errors);
    if reservation_date.is_none() && !errors.contains_key("reservation_date") {
      errors.insert(
        "reservation_date".into(),
        "Reservation date is required".into(),
      );
    }
    let payload = ReservationPayload {
      reservation_code: draft.text("reservation_code"),
      customer_id: draft.id("customer_id", &mut errors),
      guest_name: draft.text("guest_name"),
      phone: draft.text("phone"),
      party_size,
      reservation_date: reservation_date.unwrap_or_default(),
      reservation_time: draft.time("reservation_time", &mut errors),
      status: draft
        .choice("status", RESERVATION_STATUSES, &mut errors)
        .unwrap_or_else(|| "pending".into()),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

// ============================================================================
// Stock batches and waste logs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBatch {
  pub id: u64,
  pub product_id: u64,
  #[serde(default)]
  pub quantity: Option<Decimal>,
  #[serde(default)]
  pub remaining_quantity: Option<Decimal>,
  #[serde(default)]
  pub prepared_date: Option<String>,
  #[serde(default)]
  pub expiry_date: Option<String>,
  #[serde(default)]
  pub store_id: Option<u64>,
}

impl StockBatch {
  /// What is left in this batch; untouched batches only report `quantity`.
  pub fn on_hand(&self) -> Decimal {
    self
      .remaining_quantity
      .or(self.quantity)
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockBatchPayload {
  pub product_id: u64,
  pub quantity: Option<Decimal>,
  pub prepared_date: Option<String>,
  pub expiry_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for StockBatch {
  const RESOURCE: &'static str = "stock-batches";
  const LABEL: &'static str = "Stock Batch";
  const SCOPED: bool = true;
  type Payload = StockBatchPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    format!("Batch #{}", self.id)
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Product", 8),
      Column::new("Qty", 8),
      Column::new("Left", 8),
      Column::new("Prepared", 12),
      Column::new("Expiry", 0),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.product_id.to_string(),
      or_dash(&self.quantity),
      or_dash(&self.remaining_quantity),
      or_dash(&self.prepared_date),
      or_dash(&self.expiry_date),
    ]
  }
}

impl Editable for StockBatch {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::new("product_id", "Product", FieldKind::Reference("products")).required(),
      FieldSpec::new("quantity", "Quantity", FieldKind::Decimal),
      FieldSpec::new("prepared_date", "Prepared", FieldKind::Date),
      FieldSpec::new("expiry_date", "Expiry", FieldKind::Date),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("product_id", self.product_id)
      .with_opt("quantity", self.quantity)
      .with_opt("prepared_date", self.prepared_date.clone())
      .with_opt("expiry_date", self.expiry_date.clone())
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<StockBatchPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let product_id = required_id(draft, "product_id", "Product", &mut errors);
    let payload = StockBatchPayload {
      product_id,
      quantity: draft.decimal("quantity", &mut errors),
      prepared_date: draft.date("prepared_date", &mut errors),
      expiry_date: draft.date("expiry_date", &mut errors),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteLog {
  pub id: u64,
  pub product_id: u64,
  #[serde(default)]
  pub quantity: Option<Decimal>,
  #[serde(default)]
  pub reason: Option<String>,
  #[serde(default)]
  pub date: Option<String>,
  #[serde(default)]
  pub store_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteLogPayload {
  pub product_id: u64,
  pub quantity: Option<Decimal>,
  pub reason: Option<String>,
  pub date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for WasteLog {
  const RESOURCE: &'static str = "waste-logs";
  const LABEL: &'static str = "Waste Log";
  const SCOPED: bool = true;
  type Payload = WasteLogPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    format!("Waste #{}", self.id)
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Product", 8),
      Column::new("Qty", 8),
      Column::new("Reason", 0),
      Column::new("Date", 12),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.product_id.to_string(),
      or_dash(&self.quantity),
      or_dash(&self.reason),
      or_dash(&self.date),
    ]
  }
}

impl Editable for WasteLog {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::new("product_id", "Product", FieldKind::Reference("products")).required(),
      FieldSpec::new("quantity", "Quantity", FieldKind::Decimal),
      FieldSpec::text("reason", "Reason"),
      FieldSpec::new("date", "Date", FieldKind::Date),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("product_id", self.product_id)
      .with_opt("quantity", self.quantity)
      .with_opt("reason", self.reason.clone())
      .with_opt("date", self.date.clone())
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<WasteLogPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let product_id = required_id(draft, "product_id", "Product", &mut errors);
    let payload = WasteLogPayload {
      product_id,
      quantity: draft.decimal("quantity", &mut errors),
      reason: draft.text("reason"),
      date: draft.date("date", &mut errors),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

pub const MOVEMENT_TYPES: &[&str] = &["prepared", "sold", "waste", "adjustment", "purchase"];

/// Manual stock adjustment or a recorded sale, waste or purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
  pub id: u64,
  pub product_id: u64,
  pub movement_type: String,
  #[serde(default)]
  pub quantity: Option<Decimal>,
  #[serde(default)]
  pub store_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockMovementPayload {
  pub product_id: u64,
  pub movement_type: String,
  pub quantity: Decimal,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for StockMovement {
  const RESOURCE: &'static str = "stock-movements";
  const LABEL: &'static str = "Stock Movement";
  const SCOPED: bool = true;
  type Payload = StockMovementPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    format!("Movement #{}", self.id)
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Type", 12),
      Column::new("Qty", 10),
      Column::new("Product", 0),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.movement_type.clone(),
      or_dash(&self.quantity),
      self.product_id.to_string(),
    ]
  }
}

impl Editable for StockMovement {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::new("product_id", "Product", FieldKind::Reference("products")).required(),
      FieldSpec::new("movement_type", "Type", FieldKind::Choice(MOVEMENT_TYPES))
        .default_value("adjustment"),
      FieldSpec::new("quantity", "Quantity", FieldKind::Decimal).default_value("0"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("product_id", self.product_id)
      .with("movement_type", &self.movement_type)
      .with("quantity", self.quantity.unwrap_or_default())
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<StockMovementPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let product_id = required_id(draft, "product_id", "Product", &mut errors);
    let quantity = draft.decimal("quantity", &mut errors).unwrap_or_default();
    if quantity < Decimal::ZERO {
      errors.insert("quantity".into(), "Quantity cannot be negative".into());
    }
    let payload = StockMovementPayload {
      product_id,
      movement_type: draft
        .choice("movement_type", MOVEMENT_TYPES, &mut errors)
        .unwrap_or_else(|| "adjustment".into()),
      quantity,
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

fn required_id(draft: &Draft, key: &str, label: &str, errors: &mut FieldErrors) -> u64 {
  match draft.id(key, errors) {
    Some(id) => id,
    None => {
      errors
        .entry(key.to_string())
        .or_insert_with(|| format!("{} is required", label));
      0
    }
  }
}

// ============================================================================
// Deliveries
// ============================================================================

pub const DELIVERY_STATUSES: &[&str] = &["pending", "out_for_delivery", "delivered", "cancelled"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
  pub id: u64,
  pub order_id: u64,
  #[serde(default)]
  pub address_id: Option<u64>,
  #[serde(default)]
  pub zone_id: Option<u64>,
  #[serde(default)]
  pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryPayload {
  pub order_id: u64,
  pub address_id: Option<u64>,
  pub zone_id: Option<u64>,
  pub status: String,
}

impl Entity for Delivery {
  const RESOURCE: &'static str = "deliveries";
  const LABEL: &'static str = "Delivery";
  type Payload = DeliveryPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    format!("Delivery #{}", self.id)
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Order", 8),
      Column::new("Address", 8),
      Column::new("Zone", 6),
      Column::new("Status", 0),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.order_id.to_string(),
      or_dash(&self.address_id),
      or_dash(&self.zone_id),
      or_dash(&self.status),
    ]
  }
}

impl Editable for Delivery {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::new("order_id", "Order", FieldKind::Reference("orders")).required(),
      FieldSpec::new("address_id", "Address", FieldKind::Integer),
      FieldSpec::new("zone_id", "Zone", FieldKind::Reference("delivery-zones")),
      FieldSpec::new("status", "Status", FieldKind::Choice(DELIVERY_STATUSES))
        .default_value("pending"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("order_id", self.order_id)
      .with_opt("address_id", self.address_id)
      .with_opt("zone_id", self.zone_id)
      .with("status", self.status.as_deref().unwrap_or("pending"))
  }

  fn payload(draft: &Draft, _scope: &Scope) -> Result<DeliveryPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let payload = DeliveryPayload {
      order_id: required_id(draft, "order_id", "Order", &mut errors),
      address_id: draft.id("address_id", &mut errors),
      zone_id: draft.id("zone_id", &mut errors),
      status: draft
        .choice("status", DELIVERY_STATUSES, &mut errors)
        .unwrap_or_else(|| "pending".into()),
    };
    finish(payload, errors)
  }
}

// ============================================================================
// Kitchen tickets (status changes only)
// ============================================================================

pub const TICKET_STATUSES: &[&str] = &["pending", "in_preparation", "ready", "served"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenTicket {
  pub id: u64,
  pub ticket_number: String,
  pub status: String,
  pub order_id: u64,
  #[serde(default)]
  pub order: Option<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketStatusPayload {
  pub status: String,
}

impl Entity for KitchenTicket {
  const RESOURCE: &'static str = "kitchen-tickets";
  const LABEL: &'static str = "Kitchen Ticket";
  type Payload = TicketStatusPayload;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self.ticket_number.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Ticket", 0),
      Column::new("Order", 8),
      Column::new("Status", 16),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.ticket_number.clone(),
      self.order_id.to_string(),
      self.status.clone(),
    ]
  }
}

// ============================================================================
// Carts (driven by the kiosk session, listed and edited by admins)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
  pub id: u64,
  pub menu_item_id: u64,
  pub quantity: u32,
  #[serde(default)]
  pub total_price: Option<Decimal>,
  #[serde(default)]
  pub menu_item: Option<MenuItem>,
}

impl CartItem {
  pub fn label(&self) -> String {
    self
      .menu_item
      .as_ref()
      .map(|m| m.display_name.clone())
      .unwrap_or_else(|| format!("Item #{}", self.menu_item_id))
  }
}

pub const CART_STATUSES: &[&str] = &["active", "checked_out", "cancelled"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
  pub id: u64,
  pub cart_code: String,
  #[serde(default)]
  pub table_number: Option<String>,
  pub status: String,
  #[serde(default)]
  pub total: Option<Decimal>,
  #[serde(default)]
  pub store_id: Option<u64>,
  #[serde(default)]
  pub items: Vec<CartItem>,
}

impl Cart {
  pub fn item_count(&self) -> u32 {
    self.items.iter().map(|i| i.quantity).sum()
  }

  pub fn total(&self) -> Decimal {
    self.total.unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCart {
  pub cart_code: String,
  pub table_number: Option<String>,
  pub status: String,
  pub total: Decimal,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
}

impl Entity for Cart {
  const RESOURCE: &'static str = "carts";
  const LABEL: &'static str = "Cart";
  const SCOPED: bool = true;
  type Payload = NewCart;

  fn id(&self) -> u64 {
    self.id
  }

  fn title(&self) -> String {
    self.cart_code.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("ID", 6),
      Column::new("Code", 0),
      Column::new("Table", 8),
      Column::new("Status", 12),
      Column::new("Items", 6),
      Column::new("Total", 10),
    ];
    COLUMNS
  }

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.cart_code.clone(),
      or_dash(&self.table_number),
      self.status.clone(),
      self.item_count().to_string(),
      self.total().to_string(),
    ]
  }
}

impl Editable for Cart {
  fn fields() -> &'static [FieldSpec] {
    const FIELDS: &[FieldSpec] = &[
      FieldSpec::text("cart_code", "Code").required(),
      FieldSpec::text("table_number", "Table"),
      FieldSpec::new("status", "Status", FieldKind::Choice(CART_STATUSES)).default_value("active"),
      FieldSpec::new("total", "Total", FieldKind::Decimal).default_value("0"),
    ];
    FIELDS
  }

  fn draft(&self) -> Draft {
    Draft::default()
      .with("cart_code", &self.cart_code)
      .with_opt("table_number", self.table_number.clone())
      .with("status", &self.status)
      .with("total", self.total())
  }

  fn payload(draft: &Draft, scope: &Scope) -> Result<NewCart, FieldErrors> {
    let mut errors = FieldErrors::new();
    let payload = NewCart {
      cart_code: draft.required_text("cart_code", &mut errors),
      table_number: draft.text("table_number"),
      status: draft
        .choice("status", CART_STATUSES, &mut errors)
        .unwrap_or_else(|| "active".into()),
      total: draft.decimal("total", &mut errors).unwrap_or_default(),
      store_id: scope.payload_store(Self::SCOPED),
    };
    finish(payload, errors)
  }
}

/// Whether list calls for `resource` carry the store id. Used for lookups,
/// which only know the collection path.
pub fn is_scoped(resource: &str) -> bool {
  [
    (Category::RESOURCE, Category::SCOPED),
    (Brand::RESOURCE, Brand::SCOPED),
    (Store::RESOURCE, Store::SCOPED),
    (MenuCategory::RESOURCE, MenuCategory::SCOPED),
    (OrderType::RESOURCE, OrderType::SCOPED),
    (DeliveryZone::RESOURCE, DeliveryZone::SCOPED),
    (Product::RESOURCE, Product::SCOPED),
    (MenuItem::RESOURCE, MenuItem::SCOPED),
    (Customer::RESOURCE, Customer::SCOPED),
    (Order::RESOURCE, Order::SCOPED),
    (Reservation::RESOURCE, Reservation::SCOPED),
    (StockBatch::RESOURCE, StockBatch::SCOPED),
    (WasteLog::RESOURCE, WasteLog::SCOPED),
    (Delivery::RESOURCE, Delivery::SCOPED),
    (StockMovement::RESOURCE, StockMovement::SCOPED),
    (Cart::RESOURCE, Cart::SCOPED),
    (ComboMeal::RESOURCE, ComboMeal::SCOPED),
    (Group::RESOURCE, Group::SCOPED),
  ]
  .iter()
  .any(|(name, scoped)| *name == resource && *scoped)
}
