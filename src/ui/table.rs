use tabled::{settings::Style, Table, Tabled};

use crate::enumerate::RouteDescriptor;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct RouteRow {
    #[tabled(rename = "Module")]
    pub module: String,
    #[tabled(rename = "Route")]
    pub subpath: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Target")]
    pub target: String,
}

impl From<&RouteDescriptor> for RouteRow {
    fn from(route: &RouteDescriptor) -> Self {
        let record = &route.record;
        Self {
            module: route.module.clone(),
            subpath: route.subpath.clone(),
            category: record
                .category
                .map(|c| c.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            target: if record.is_alias {
                record.target_fqn.clone()
            } else {
                String::new()
            },
        }
    }
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Route listing, at most `limit` rows
pub fn routes_table(routes: &[RouteDescriptor], limit: usize) -> String {
    let rows: Vec<RouteRow> = routes.iter().take(limit).map(RouteRow::from).collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}
