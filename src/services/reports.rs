// src/services/reports.rs
//
// Standalone printable HTML documents. Each page carries its own styles and
// opens the print dialog as soon as it loads.

use crate::models::Product;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn printable_page(title: &str, styles: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <title>{title}</title>
  <style>
    body {{ font-family: Arial, sans-serif; color: #111; margin: 24px; }}
    @media print {{ body {{ margin: 0; }} }}
{styles}
  </style>
</head>
<body>
{body}
<script>window.onload = function () {{ window.print(); }};</script>
</body>
</html>"#,
        title = escape(title),
        styles = styles,
        body = body,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryTotals {
    pub products: usize,
    pub units: i64,
    pub stock_value: Decimal,
    pub low_stock: usize,
}

impl InventoryTotals {
    pub fn of(products: &[Product]) -> Self {
        Self {
            products: products.len(),
            units: products.iter().map(|p| i64::from(p.quantity)).sum(),
            stock_value: products.iter().map(Product::stock_value).sum(),
            low_stock: products.iter().filter(|p| p.is_low_stock()).count(),
        }
    }
}

/// Inventory Summary Report: headline totals, a per-category breakdown and
/// the full product list with low-stock rows highlighted.
pub fn inventory_summary_html(
    tenant_name: &str,
    products: &[Product],
    generated_at: DateTime<Utc>,
) -> String {
    let totals = InventoryTotals::of(products);

    let mut by_category: BTreeMap<&str, (usize, i64, Decimal)> = BTreeMap::new();
    for p in products {
        let entry = by_category.entry(p.category.as_str()).or_default();
        entry.0 += 1;
        entry.1 += i64::from(p.quantity);
        entry.2 += p.stock_value();
    }

    let category_rows: String = by_category
        .iter()
        .map(|(category, (count, units, value))| {
            format!(
                "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
                escape(category),
                count,
                units,
                money(*value)
            )
        })
        .collect();

    let product_rows: String = products
        .iter()
        .map(|p| {
            format!(
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
                if p.is_low_stock() { " class=\"low\"" } else { "" },
                escape(&p.code),
                escape(&p.name),
                escape(&p.category),
                p.quantity,
                money(p.unit_price),
                money(p.stock_value())
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Inventory Summary Report</h1>
<p class="meta">{tenant} &middot; Generated {generated}</p>
<div class="cards">
  <div class="card"><span>Products</span><strong>{products}</strong></div>
  <div class="card"><span>Units in Stock</span><strong>{units}</strong></div>
  <div class="card"><span>Stock Value</span><strong>{value}</strong></div>
  <div class="card"><span>Low Stock</span><strong>{low}</strong></div>
</div>
<h2>By Category</h2>
<table>
<thead><tr><th>Category</th><th>Products</th><th>Units</th><th>Value</th></tr></thead>
<tbody>
{category_rows}</tbody>
</table>
<h2>Products</h2>
<table>
<thead><tr><th>Code</th><th>Name</th><th>Category</th><th>Qty</th><th>Unit Price</th><th>Value</th></tr></thead>
<tbody>
{product_rows}</tbody>
</table>"#,
        tenant = escape(tenant_name),
        generated = generated_at.format("%Y-%m-%d %H:%M UTC"),
        products = totals.products,
        units = totals.units,
        value = money(totals.stock_value),
        low = totals.low_stock,
        category_rows = category_rows,
        product_rows = product_rows,
    );

    let styles = r#"    h1 { margin-bottom: 4px; }
    .meta { color: #555; margin-top: 0; }
    .cards { display: flex; gap: 12px; margin: 16px 0; }
    .card { flex: 1; border: 1px solid #ddd; border-radius: 6px; padding: 10px; }
    .card span { display: block; font-size: 12px; color: #666; }
    .card strong { font-size: 20px; }
    table { width: 100%; border-collapse: collapse; margin-bottom: 20px; font-size: 13px; }
    th, td { border: 1px solid #ddd; padding: 6px 8px; text-align: left; }
    th { background: #f3f4f6; }
    .num { text-align: right; }
    tr.low td { background: #fef2f2; color: #b91c1c; }"#;

    printable_page("Inventory Summary Report", styles, &body)
}

/// Product Code Printer: a grid of cut-out labels, `copies` per product.
pub fn product_labels_html(products: &[Product], copies: usize) -> String {
    let copies = copies.max(1);
    let labels: String = products
        .iter()
        .flat_map(|p| std::iter::repeat_n(p, copies))
        .map(|p| {
            format!(
                "<div class=\"label\"><div class=\"name\">{}</div><div class=\"code\">{}</div><div class=\"price\">{}</div></div>\n",
                escape(&p.name),
                escape(&p.code),
                money(p.unit_price)
            )
        })
        .collect();

    let styles = r#"    .grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 8px; }
    .label { border: 1px dashed #999; padding: 8px; text-align: center; page-break-inside: avoid; }
    .name { font-size: 12px; }
    .code { font-family: "Courier New", monospace; font-size: 18px; font-weight: bold; letter-spacing: 2px; margin: 4px 0; }
    .price { font-size: 12px; color: #333; }"#;

    printable_page(
        "Product Codes",
        styles,
        &format!("<div class=\"grid\">\n{}</div>", labels),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn product(code: &str, category: &str, quantity: i32, price: Decimal, reorder: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            code: code.to_string(),
            name: format!("Item {}", code),
            category: category.to_string(),
            quantity,
            unit_price: price,
            reorder_level: reorder,
            created_at: Utc::now(),
        }
    }

    fn stock() -> Vec<Product> {
        vec![
            product("ONU-01", "onu", 10, dec!(1800), 3),
            product("RTR-01", "router", 2, dec!(2500), 5),
            product("CAB-01", "cable", 100, dec!(12.5), 20),
        ]
    }

    #[test]
    fn totals_cover_every_product() {
        let totals = InventoryTotals::of(&stock());
        assert_eq!(totals.products, 3);
        assert_eq!(totals.units, 112);
        assert_eq!(totals.stock_value, dec!(24250));
        assert_eq!(totals.low_stock, 1);
    }

    #[test]
    fn summary_is_a_self_printing_page() {
        let at = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap();
        let html = inventory_summary_html("Fast & Fiber", &stock(), at);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("window.print()"));
        assert!(html.contains("Fast &amp; Fiber &middot; Generated 2024-04-02 09:00 UTC"));
        assert!(html.contains("<strong>24250.00</strong>"));
        assert!(html.contains("<tr class=\"low\"><td>RTR-01</td>"));
    }

    #[test]
    fn labels_repeat_per_copy() {
        let html = product_labels_html(&stock()[..1], 3);
        assert_eq!(html.matches("class=\"label\"").count(), 3);
        assert!(html.contains("<div class=\"code\">ONU-01</div>"));
        assert!(html.contains("window.print()"));
    }

    #[test]
    fn markup_in_names_is_escaped() {
        let mut p = product("X", "misc", 1, dec!(1), 0);
        p.name = "<script>alert(1)</script>".to_string();
        let html = product_labels_html(&[p], 0);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert_eq!(html.matches("class=\"label\"").count(), 1);
    }
}
