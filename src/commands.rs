/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "product"],
    description: "Products and stock levels",
  },
  Command {
    name: "menu-items",
    aliases: &["m", "menu", "items"],
    description: "Menu items with ingredients",
  },
  Command {
    name: "orders",
    aliases: &["o", "order"],
    description: "Orders",
  },
  Command {
    name: "kitchen",
    aliases: &["k", "tickets", "kitchen-tickets"],
    description: "Kitchen ticket board",
  },
  Command {
    name: "kiosk",
    aliases: &["pos"],
    description: "Take an order at the kiosk",
  },
  Command {
    name: "inventory",
    aliases: &["inv", "stock"],
    description: "Stock and waste per product",
  },
  Command {
    name: "stock-batches",
    aliases: &["batches"],
    description: "Prepared stock batches",
  },
  Command {
    name: "waste-logs",
    aliases: &["waste"],
    description: "Waste log",
  },
  Command {
    name: "stock-movements",
    aliases: &["movements", "sm"],
    description: "Stock movements and adjustments",
  },
  Command {
    name: "carts",
    aliases: &["cart"],
    description: "Kiosk carts",
  },
  Command {
    name: "reservations",
    aliases: &["r", "reservation", "bookings"],
    description: "Table reservations",
  },
  Command {
    name: "deliveries",
    aliases: &["d", "delivery"],
    description: "Deliveries",
  },
  Command {
    name: "customers",
    aliases: &["c", "customer"],
    description: "Customers",
  },
  Command {
    name: "categories",
    aliases: &["cat"],
    description: "Product categories",
  },
  Command {
    name: "brands",
    aliases: &["brand"],
    description: "Product brands",
  },
  Command {
    name: "menu-categories",
    aliases: &["mc"],
    description: "Menu categories",
  },
  Command {
    name: "order-types",
    aliases: &["ot"],
    description: "Order types",
  },
  Command {
    name: "delivery-zones",
    aliases: &["zones"],
    description: "Delivery zones",
  },
  Command {
    name: "combo-meals",
    aliases: &["combos", "combo"],
    description: "Combo meals",
  },
  Command {
    name: "groups",
    aliases: &["group"],
    description: "Groups",
  },
  Command {
    name: "stores",
    aliases: &["s", "store"],
    description: "Stores",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit restodesk",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Stable sort keeps COMMANDS order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve typed input (name or alias) to a command name.
pub fn resolve(input: &str) -> Option<&'static str> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|c| c.name == input || c.aliases.contains(&input.as_str()))
    .map(|c| c.name)
}
