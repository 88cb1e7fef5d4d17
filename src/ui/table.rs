use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, key: &str, value: &str) {
        self.rows.push(TableRow {
            key: key.to_string(),
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

/// Key/value listing; NULL values are shown as `null`
pub fn entries_table(entries: &[(String, Option<String>)]) -> String {
    let mut builder = TableBuilder::new();
    for (key, value) in entries {
        builder.add_row(key, value.as_deref().unwrap_or("null"));
    }
    builder.build()
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_table() {
        let table = entries_table(&[
            ("color".to_string(), Some("blue".to_string())),
            ("cleared".to_string(), None),
        ]);
        assert!(table.contains("color"));
        assert!(table.contains("blue"));
        assert!(table.contains("null"));
        assert!(entries_table(&[]).is_empty());
    }
}
