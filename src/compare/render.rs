use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use eyre::{Result, WrapErr};
use minijinja::{context, Environment};
use serde::Serialize;

use crate::compare::{Label, Row};

const HTML_TEMPLATE: &str = include_str!("comparison.html.jinja");

const SECTION_SHADE: &str = "#e0e0e0";
const SUB_SECTION_SHADES: [&str; 2] = ["#f8f8f8", "#f0f0f0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Visual treatment of a displayed row.
pub enum RowStyle {
    /// Full width, bold, shaded.
    Section,
    /// Full width, bold, lighter shade.
    SubSection,
    /// Label plus one value per product.
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Definition shown when a label is activated.
pub struct DefinitionLink {
    pub feature: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayCell {
    pub text: String,
    pub colspan: usize,
    pub link: Option<DefinitionLink>,
}

impl DisplayCell {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            colspan: 1,
            link: None,
        }
    }

    fn label(label: &Label) -> Self {
        Self {
            text: label.text.clone(),
            colspan: 1,
            link: label.definition.as_ref().map(|definition| DefinitionLink {
                feature: label.text.clone(),
                definition: definition.definition.clone(),
            }),
        }
    }

    fn full_width(mut self) -> Self {
        self.colspan = 3;
        self
    }

    /// Definition to present when the cell is activated, if it has one.
    pub fn activate(&self) -> Option<&DefinitionLink> {
        self.link.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub style: RowStyle,
    pub shade: Option<&'static str>,
    pub bold: bool,
    /// Nesting level of a sub-section, 0 for everything else.
    pub depth: usize,
    pub cells: Vec<DisplayCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A rendered side-by-side comparison of two products.
pub struct ComparisonTable {
    /// Category the products and definitions belong to.
    pub category: String,
    /// Column heading of the first product.
    pub product1: String,
    /// Column heading of the second product.
    pub product2: String,
    pub rows: Vec<DisplayRow>,
}

/// Turns merged rows into a display structure.
pub fn render(category: &str, product1: &str, product2: &str, rows: &[Row]) -> ComparisonTable {
    let rows = rows
        .iter()
        .map(|row| match row {
            Row::Section { title } => DisplayRow {
                style: RowStyle::Section,
                shade: Some(SECTION_SHADE),
                bold: true,
                depth: 0,
                cells: vec![DisplayCell::plain(title).full_width()],
            },
            Row::SubSection { label, depth } => DisplayRow {
                style: RowStyle::SubSection,
                shade: Some(SUB_SECTION_SHADES[(*depth).min(SUB_SECTION_SHADES.len() - 1)]),
                bold: true,
                depth: *depth,
                cells: vec![DisplayCell::label(label).full_width()],
            },
            Row::Leaf {
                label,
                value1,
                value2,
            } => DisplayRow {
                style: RowStyle::Leaf,
                shade: None,
                bold: false,
                depth: 0,
                cells: vec![
                    DisplayCell::label(label),
                    DisplayCell::plain(value1),
                    DisplayCell::plain(value2),
                ],
            },
        })
        .collect();

    ComparisonTable {
        category: category.to_string(),
        product1: product1.to_string(),
        product2: product2.to_string(),
        rows,
    }
}

impl ComparisonTable {
    /// Definition text for `feature`, as linked from this table.
    pub fn definition_for(&self, feature: &str) -> Option<&str> {
        self.links()
            .find(|link| link.feature == feature)
            .map(|link| link.definition.as_str())
    }

    fn links(&self) -> impl Iterator<Item = &DefinitionLink> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter_map(DisplayCell::activate)
    }

    /// Renders the table as HTML markup. All text is escaped.
    pub fn to_html(&self) -> Result<String> {
        let mut env = Environment::new();
        // the .html name turns on auto-escaping
        env.add_template("comparison.html", HTML_TEMPLATE)
            .wrap_err("Failed to add comparison template")?;

        let template = env.get_template("comparison.html")?;
        let html = template.render(context! {
            category => &self.category,
            product1 => &self.product1,
            product2 => &self.product2,
            rows => &self.rows,
        })?;
        Ok(html)
    }

    /// Renders the table for a terminal, followed by the definitions it links.
    pub fn to_text(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Feature").add_attribute(Attribute::Bold),
                Cell::new(&self.product1).add_attribute(Attribute::Bold),
                Cell::new(&self.product2).add_attribute(Attribute::Bold),
            ]);

        for row in &self.rows {
            let first = &row.cells[0];
            let marker = if first.link.is_some() { " *" } else { "" };
            match row.style {
                RowStyle::Section => {
                    table.add_row(vec![
                        Cell::new(&first.text).add_attribute(Attribute::Bold),
                        Cell::new(""),
                        Cell::new(""),
                    ]);
                }
                RowStyle::SubSection => {
                    let prefix = "› ".repeat(row.depth + 1);
                    table.add_row(vec![
                        Cell::new(format!("{prefix}{}{marker}", first.text))
                            .add_attribute(Attribute::Bold),
                        Cell::new(""),
                        Cell::new(""),
                    ]);
                }
                RowStyle::Leaf => {
                    let mut cells = vec![Cell::new(format!("{}{marker}", first.text))];
                    cells.extend(row.cells[1..].iter().map(|cell| Cell::new(&cell.text)));
                    table.add_row(cells);
                }
            }
        }

        let mut out = table.to_string();
        let mut seen: Vec<&str> = Vec::new();
        for link in self.links() {
            if seen.contains(&link.feature.as_str()) {
                continue;
            }
            seen.push(&link.feature);
            out.push_str(&format!("\n* {}: {}", link.feature, link.definition));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;
    use crate::product::Definition;

    fn label(text: &str, definition: Option<&str>) -> Label {
        Label {
            text: text.into(),
            definition: definition.map(|definition| Definition {
                feature: text.into(),
                definition: definition.into(),
            }),
        }
    }

    fn sample() -> ComparisonTable {
        let rows = vec![
            Row::Section {
                title: "Display".into(),
            },
            Row::Leaf {
                label: label("Refresh Rate", Some("Frames per second <max>")),
                value1: "120".into(),
                value2: "No".into(),
            },
            Row::SubSection {
                label: label("Panel", None),
                depth: 0,
            },
            Row::Leaf {
                label: label("Type", None),
                value1: "OLED".into(),
                value2: "LCD & IPS".into(),
            },
            Row::SubSection {
                label: label("Coating", None),
                depth: 1,
            },
            Row::Leaf {
                label: label("Glass", None),
                value1: "Gorilla Victus".into(),
                value2: "No".into(),
            },
        ];
        render("Phones", "Pixel 8", "Galaxy S24", &rows)
    }

    #[test]
    fn test_row_treatment() {
        let table = sample();
        assert_eq!(table.rows[0].style, RowStyle::Section);
        assert_eq!(table.rows[0].shade, Some(SECTION_SHADE));
        assert_eq!(table.rows[0].cells.len(), 1);
        assert_eq!(table.rows[0].cells[0].colspan, 3);

        assert_eq!(table.rows[2].style, RowStyle::SubSection);
        assert_eq!(table.rows[2].shade, Some("#f8f8f8"));
        assert!(table.rows[2].bold);

        assert_eq!(table.rows[3].style, RowStyle::Leaf);
        assert_eq!(table.rows[3].cells.len(), 3);
        assert!(!table.rows[3].bold);

        assert_eq!(table.rows[4].style, RowStyle::SubSection);
        assert_eq!(table.rows[4].depth, 1);
        assert_eq!(table.rows[4].shade, Some("#f0f0f0"));
        assert!(table.rows[4].bold);
    }

    #[test]
    fn test_definition_links() {
        let table = sample();
        assert_eq!(
            table.definition_for("Refresh Rate"),
            Some("Frames per second <max>")
        );
        assert_eq!(table.definition_for("Type"), None);
        assert!(table.rows[3].cells[0].activate().is_none());
    }

    #[test]
    fn test_html_output() {
        let html = sample().to_html().unwrap();
        let document = Html::parse_fragment(&html);

        let headers = Selector::parse("thead th").unwrap();
        let headers: Vec<String> = document
            .select(&headers)
            .map(|th| th.text().collect())
            .collect();
        assert_eq!(headers, ["Feature", "Pixel 8", "Galaxy S24"]);

        let rows = Selector::parse("tbody tr").unwrap();
        assert_eq!(document.select(&rows).count(), 6);

        let nested = Selector::parse("tr.sub_section[style*=\"#f0f0f0\"]").unwrap();
        assert_eq!(document.select(&nested).count(), 1);

        let sections = Selector::parse("tr.section td[colspan=\"3\"]").unwrap();
        assert_eq!(document.select(&sections).count(), 1);

        let links = Selector::parse("span.definition-label").unwrap();
        let links: Vec<_> = document.select(&links).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].value().attr("data-feature"), Some("Refresh Rate"));
        assert_eq!(
            links[0].value().attr("data-definition"),
            Some("Frames per second <max>")
        );

        assert!(html.contains("LCD &amp; IPS"));
    }

    #[test]
    fn test_text_output() {
        let text = sample().to_text();
        assert!(text.contains("Pixel 8"));
        assert!(text.contains("Refresh Rate *"));
        assert!(text.contains("› Panel"));
        assert!(text.contains("› › Coating"));
        assert!(text.ends_with("* Refresh Rate: Frames per second <max>"));
    }
}
