mod inventory;
mod kiosk;
mod kitchen;
mod record_detail;
mod resource_list;

pub use inventory::InventoryView;
pub use kiosk::KioskView;
pub use kitchen::KitchenView;
pub use record_detail::RecordDetailView;
pub use resource_list::ResourceListView;

use crate::api::types::{
  Brand, Cart, Category, ComboMeal, Customer, Delivery, DeliveryZone, Group, MenuCategory,
  MenuItem, Order, OrderType, Product, Reservation, StockBatch, StockMovement, Store, WasteLog,
};
use crate::api::Editable;
use crate::context::AppContext;
use crate::kiosk::{FileSessionStore, KioskSession};
use crate::ui::view::View;

/// Heading for a resource screen, e.g. `menu-items` -> `Menu Items`.
pub fn resource_title(resource: &str) -> &'static str {
  match resource {
    "products" => "Products",
    "menu-items" => "Menu Items",
    "orders" => "Orders",
    "kitchen-tickets" => "Kitchen",
    "stock-batches" => "Stock Batches",
    "waste-logs" => "Waste Logs",
    "stock-movements" => "Stock Movements",
    "carts" => "Carts",
    "reservations" => "Reservations",
    "deliveries" => "Deliveries",
    "customers" => "Customers",
    "categories" => "Categories",
    "brands" => "Brands",
    "menu-categories" => "Menu Categories",
    "order-types" => "Order Types",
    "delivery-zones" => "Delivery Zones",
    "combo-meals" => "Combo Meals",
    "groups" => "Groups",
    "stores" => "Stores",
    _ => "Records",
  }
}

fn list<E: Editable>(ctx: &AppContext) -> Box<dyn View> {
  Box::new(ResourceListView::new(ctx.clone(), ctx.resource::<E>()))
}

/// Root screen for a resolved command name.
pub fn root_view(name: &str, ctx: &AppContext) -> Option<Box<dyn View>> {
  let view = match name {
    "products" => list::<Product>(ctx),
    "menu-items" => list::<MenuItem>(ctx),
    "orders" => list::<Order>(ctx),
    "stock-batches" => list::<StockBatch>(ctx),
    "waste-logs" => list::<WasteLog>(ctx),
    "stock-movements" => list::<StockMovement>(ctx),
    "carts" => list::<Cart>(ctx),
    "reservations" => list::<Reservation>(ctx),
    "deliveries" => list::<Delivery>(ctx),
    "customers" => list::<Customer>(ctx),
    "categories" => list::<Category>(ctx),
    "brands" => list::<Brand>(ctx),
    "menu-categories" => list::<MenuCategory>(ctx),
    "order-types" => list::<OrderType>(ctx),
    "delivery-zones" => list::<DeliveryZone>(ctx),
    "combo-meals" => list::<ComboMeal>(ctx),
    "groups" => list::<Group>(ctx),
    "stores" => list::<Store>(ctx),
    "kitchen" => Box::new(KitchenView::new(ctx.clone(), ctx.resource())),
    "inventory" => Box::new(InventoryView::new(
      ctx.clone(),
      ctx.resource(),
      ctx.resource(),
      ctx.resource(),
    )),
    "kiosk" => {
      let store_id = ctx.scope.store_id;
      let sessions = FileSessionStore::for_terminal(&ctx.config.kiosk.terminal, store_id);
      tracing::debug!(path = %sessions.path().display(), "kiosk session file");
      let session = KioskSession::new(ctx.api.clone(), sessions, ctx.cache.clone(), store_id);
      Box::new(KioskView::new(
        ctx.clone(),
        session,
        ctx.resource::<MenuItem>(),
        ctx.resource::<OrderType>(),
      ))
    }
    _ => return None,
  };
  Some(view)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::COMMANDS;
  use crate::config::Config;
  use crate::event::Notifier;

  #[tokio::test]
  async fn test_every_command_but_quit_has_a_view() {
    let (notifier, _rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    for command in COMMANDS {
      let view = root_view(command.name, &ctx);
      assert_eq!(view.is_some(), command.name != "quit", "{}", command.name);
      if let Some(view) = view {
        if !matches!(command.name, "kiosk" | "kitchen" | "inventory") {
          assert_ne!(view.breadcrumb_label(), "Records", "{}", command.name);
        }
      }
    }
  }

  #[test]
  fn test_resource_titles() {
    assert_eq!(resource_title("menu-items"), "Menu Items");
    assert_eq!(resource_title("delivery-zones"), "Delivery Zones");
    assert_eq!(resource_title("stock-movements"), "Stock Movements");
    assert_eq!(resource_title("combo-meals"), "Combo Meals");
    assert_eq!(resource_title("unknown"), "Records");
  }
}
