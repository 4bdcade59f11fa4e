//! Plain-text rendering of view models.

use grocery_core::{GroceryItem, ListView, LowStockBanner};

pub fn item_line(item: &GroceryItem) -> String {
    let mut line = format!(
        "#{:<4} {:<24} {:>8}  {} {}  [{}]",
        item.id,
        item.name,
        item.formatted_price(),
        item.quantity,
        item.unit,
        item.category.label(),
    );
    if item.is_low_stock() {
        line.push_str("  Low Stock");
    }
    line
}

pub fn item_detail(item: &GroceryItem) -> String {
    format!(
        "{} (#{})\n  {}\n  price:    {}\n  stock:    {} {}\n  category: {}\n  updated:  {}",
        item.name,
        item.id,
        item.description,
        item.formatted_price(),
        item.quantity,
        item.unit.label(),
        item.category.label(),
        item.updated_at.format("%Y-%m-%d %H:%M"),
    )
}

pub fn banner(banner: &LowStockBanner) -> String {
    format!("{}\n{}\n  {}", banner.title, banner.description, banner.badges.join(", "))
}

pub fn list_view(view: &ListView) -> String {
    match view {
        ListView::Loading => "Loading...".to_string(),
        ListView::Failed {
            title,
            description,
            action_label,
        } => format!("{title}\n{description}\n({action_label} by running the command again)"),
        ListView::Empty { title, description } => format!("{title}\n{description}"),
        ListView::Items(items) => items.iter().map(item_line).collect::<Vec<_>>().join("\n"),
    }
}
