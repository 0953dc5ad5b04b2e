//! Field extraction from rendered product pages.

use std::sync::LazyLock;

use aisle_common::{AisleError, Result};
use regex::Regex;
use scraper::{Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static NAME: LazyLock<Selector> =
    LazyLock::new(|| selector("div.product-details__badge-title--wrapper"));
static IDENTIFIERS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[class="sui-flex sui-text-xs sui-flex-wrap"]"#));
static OVERVIEW: LazyLock<Selector> =
    LazyLock::new(|| selector("section#product-section-product-overview"));
static SPECIFICATIONS: LazyLock<Selector> =
    LazyLock::new(|| selector("section#specifications-desktop"));

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)([A-Z])").expect("valid regex"));

/// Identifier labels, applied in this order.
const ID_LABELS: [(&str, &str); 4] = [
    ("Internet", " Internet:"),
    ("Model", " Model:"),
    ("Store SKU", " Store SKU:"),
    ("Store SO SKU", " Store SO SKU:"),
];

/// The four text regions of a product page, cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailDocument {
    pub name: String,
    pub identifiers: String,
    pub overview: String,
    pub specifications: String,
}

impl DetailDocument {
    /// Locate and clean the regions. Any missing region is an
    /// [`AisleError::ExtractionFailure`].
    pub fn extract(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let region = |selector: &Selector, label: &str| -> Result<String> {
            document
                .select(selector)
                .next()
                .map(|el| el.text().collect::<String>())
                .ok_or_else(|| AisleError::ExtractionFailure(format!("no {label} region on page")))
        };

        let name = region(&NAME, "product name")?;
        let identifiers = region(&IDENTIFIERS, "identifier")?;
        let overview = region(&OVERVIEW, "overview")?;
        let specifications = region(&SPECIFICATIONS, "specifications")?;

        Ok(Self {
            name,
            identifiers: label_identifiers(&identifiers),
            overview: split_case_boundaries(&overview),
            specifications: split_case_boundaries(&specifications)
                .replace("See Similar Items", " "),
        })
    }

    /// The single text blob stored for this page.
    pub fn compose(&self) -> String {
        format!(
            "Product Name: {}\nProduct IDs: {}\nProduct Overview: {}\nSpecifications: {}",
            self.name, self.identifiers, self.overview, self.specifications
        )
    }
}

/// Insert a space wherever a word character runs into a capital letter.
pub fn split_case_boundaries(text: &str) -> String {
    CASE_BOUNDARY.replace_all(text, "${1} ${2}").into_owned()
}

pub fn label_identifiers(text: &str) -> String {
    ID_LABELS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="product-details__badge-title--wrapper"><h1>20V MAX Cordless Drill</h1></div>
          <div class="sui-flex sui-text-xs sui-flex-wrap"><span>Internet #312345678</span><span>Model #DCD771C2</span><span>Store SKU #1001</span></div>
          <section id="product-section-product-overview"><p>Compact</p><p>Lightweight design</p></section>
          <section id="specifications-desktop"><div>Voltage20 V</div><a>See Similar Items</a><div>ColorYellow</div></section>
        </body></html>
    "#;

    #[test]
    fn extracts_all_regions() {
        let doc = DetailDocument::extract(PAGE).unwrap();
        assert_eq!(doc.name, "20V MAX Cordless Drill");
        assert_eq!(
            doc.identifiers,
            " Internet: #312345678 Model: #DCD771C2 Store SKU: #1001"
        );
        assert_eq!(doc.overview, "Compact Lightweight design");
        assert_eq!(doc.specifications, "Voltage20 V   Color Yellow");
    }

    #[test]
    fn composed_text_has_labelled_lines() {
        let text = DetailDocument::extract(PAGE).unwrap().compose();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Product Name: 20V MAX"));
        assert!(lines[1].starts_with("Product IDs: "));
        assert!(lines[2].starts_with("Product Overview: "));
        assert!(lines[3].starts_with("Specifications: "));
    }

    #[test]
    fn missing_region_is_extraction_failure() {
        let html = r#"<div class="product-details__badge-title--wrapper">Drill</div>"#;
        let err = DetailDocument::extract(html).unwrap_err();
        assert!(matches!(err, AisleError::ExtractionFailure(_)));
    }

    #[test]
    fn identifier_block_needs_exact_class() {
        let html = PAGE.replace(
            r#"class="sui-flex sui-text-xs sui-flex-wrap""#,
            r#"class="sui-flex sui-text-xs""#,
        );
        assert!(DetailDocument::extract(&html).is_err());
    }

    #[test]
    fn case_boundaries_split() {
        assert_eq!(split_case_boundaries("BatteryIncluded"), "Battery Included");
        assert_eq!(split_case_boundaries("lower case"), "lower case");
    }

    #[test]
    fn store_so_sku_label() {
        assert_eq!(label_identifiers("Store SO SKU #9"), " Store SO SKU: #9");
    }
}
