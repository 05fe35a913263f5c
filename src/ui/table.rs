use crate::adapter::GrammarRegistry;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
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

#[derive(Tabled)]
struct LanguageRow {
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Extensions")]
    extensions: String,
    #[tabled(rename = "Node types")]
    node_types: usize,
    #[tabled(rename = "Fields")]
    fields: usize,
}

/// One row per registered grammar, in registration order
pub fn languages_table(registry: &GrammarRegistry) -> String {
    let rows: Vec<LanguageRow> = registry
        .grammars()
        .map(|grammar| LanguageRow {
            language: grammar.language_name().to_string(),
            extensions: grammar
                .file_extensions()
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(" "),
            node_types: grammar.vocabulary().named_kinds().count(),
            fields: grammar.vocabulary().fields().count(),
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}
