use scraper::{ElementRef, Html, Selector};

use crate::{error::ParseError, record::RawRecord, text_manipulators::extract_text};

/// Turns one catalog document into its listing blocks.
///
/// Each block yields either a raw record or the reason it couldn't be read,
/// so callers can skip bad blocks without losing the rest of the page. An
/// empty vector means the page had no listings at all.
pub trait ListingParser {
    fn parse(&self, document: &str) -> Vec<Result<RawRecord, ParseError>>;
}

/// Parser for the Fashion Studio catalog markup:
///
/// ```html
/// <div class="collection-card">
///   <div class="product-details">
///     <h3 class="product-title">T-shirt 2</h3>
///     <div class="price-container"><span class="price">$102.15</span></div>
///     <p>Rating: ⭐ 3.9 / 5</p>
///     <p>3 Colors</p>
///     <p>Size: M</p>
///     <p>Gender: Women</p>
///   </div>
/// </div>
/// ```
pub struct CollectionCardParser {
    card: Selector,
    fallback_card: Selector,
    title: Selector,
    price: Selector,
    detail: Selector,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{css}: {e}")))
}

impl CollectionCardParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            card: selector("div.collection-card")?,
            fallback_card: selector(r#"div[class*="card"]"#)?,
            title: selector("h3.product-title")?,
            price: selector("span.price, p.price")?,
            detail: selector("p")?,
        })
    }

    fn parse_card(&self, card: ElementRef) -> Result<RawRecord, ParseError> {
        let title = card
            .select(&self.title)
            .next()
            .map(extract_text)
            .ok_or(ParseError::MissingTitle)?;

        let mut record = RawRecord {
            title: Some(title),
            price: card.select(&self.price).next().map(extract_text),
            ..RawRecord::default()
        };

        for detail in card.select(&self.detail) {
            if is_price(detail) {
                continue;
            }
            let text = extract_text(detail);
            let lowered = text.to_lowercase();
            let slot = if lowered.starts_with("rating") {
                &mut record.rating
            } else if lowered.starts_with("size") {
                &mut record.size
            } else if lowered.starts_with("gender") {
                &mut record.gender
            } else if lowered.contains("color") {
                &mut record.colors
            } else {
                continue;
            };
            // First match wins; later duplicates are noise.
            if slot.is_none() {
                *slot = Some(text);
            }
        }

        Ok(record)
    }
}

fn is_price(element: ElementRef) -> bool {
    element.value().classes().any(|class| class == "price")
}

impl ListingParser for CollectionCardParser {
    fn parse(&self, document: &str) -> Vec<Result<RawRecord, ParseError>> {
        let html = Html::parse_document(document);
        let mut cards: Vec<ElementRef> = html.select(&self.card).collect();
        if cards.is_empty() {
            // Only keep the outermost match so nested "*card*" wrappers
            // don't produce the same listing twice.
            cards = html
                .select(&self.fallback_card)
                .filter(|card| {
                    !card
                        .ancestors()
                        .filter_map(ElementRef::wrap)
                        .any(|ancestor| self.fallback_card.matches(&ancestor))
                })
                .collect();
        }
        cards.into_iter().map(|card| self.parse_card(card)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, price: &str) -> String {
        format!(
            r#"<div class="collection-card">
                <div class="product-details">
                  <h3 class="product-title">{title}</h3>
                  <div class="price-container"><span class="price">{price}</span></div>
                  <p style="font-size: 14px;">Rating: ⭐ 3.9 / 5</p>
                  <p style="font-size: 14px;">3 Colors</p>
                  <p style="font-size: 14px;">Size: M</p>
                  <p style="font-size: 14px;">Gender: Women</p>
                </div>
              </div>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!(
            r#"<html><body><div id="collectionList">{}</div></body></html>"#,
            cards.concat()
        )
    }

    #[test]
    fn reads_every_field_of_a_card() {
        let parser = CollectionCardParser::new().unwrap();
        let records = parser.parse(&page(&[card("T-shirt 2", "$102.15")]));
        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.title.as_deref(), Some("T-shirt 2"));
        assert_eq!(record.price.as_deref(), Some("$102.15"));
        assert_eq!(record.rating.as_deref(), Some("Rating: ⭐ 3.9 / 5"));
        assert_eq!(record.colors.as_deref(), Some("3 Colors"));
        assert_eq!(record.size.as_deref(), Some("Size: M"));
        assert_eq!(record.gender.as_deref(), Some("Gender: Women"));
    }

    #[test]
    fn keeps_document_order() {
        let parser = CollectionCardParser::new().unwrap();
        let records = parser.parse(&page(&[
            card("A", "$1.00"),
            card("B", "$2.00"),
            card("C", "$3.00"),
        ]));
        let titles: Vec<_> = records
            .iter()
            .map(|r| r.as_ref().unwrap().title.clone().unwrap())
            .collect();
        assert_eq!(titles, ["A", "B", "C"]);
    }

    #[test]
    fn unavailable_price_is_read_from_paragraph() {
        let parser = CollectionCardParser::new().unwrap();
        let doc = page(&[r#"<div class="collection-card">
                <h3 class="product-title">Pants 7</h3>
                <p class="price">Price Unavailable</p>
                <p>Rating: Not Rated</p>
              </div>"#
            .to_string()]);
        let records = parser.parse(&doc);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.price.as_deref(), Some("Price Unavailable"));
        assert_eq!(record.rating.as_deref(), Some("Rating: Not Rated"));
        assert_eq!(record.colors, None);
    }

    #[test]
    fn card_without_title_is_a_parse_error() {
        let parser = CollectionCardParser::new().unwrap();
        let doc = page(&[
            r#"<div class="collection-card"><span class="price">$5.00</span></div>"#.to_string(),
            card("Jacket 1", "$50.00"),
        ]);
        let records = parser.parse(&doc);
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], Err(ParseError::MissingTitle)));
        assert!(records[1].is_ok());
    }

    #[test]
    fn falls_back_to_any_card_like_block() {
        let parser = CollectionCardParser::new().unwrap();
        let doc = r#"<div class="product-card"><div class="card-body">
                <h3 class="product-title">Hoodie 3</h3><span class="price">$80.00</span>
            </div></div>"#;
        let records = parser.parse(doc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().title.as_deref(), Some("Hoodie 3"));
    }

    #[test]
    fn page_without_cards_is_empty() {
        let parser = CollectionCardParser::new().unwrap();
        assert!(parser.parse("<html><body><p>No more products</p></body></html>").is_empty());
    }
}
