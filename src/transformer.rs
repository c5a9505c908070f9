use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Timelike};
use log::{debug, info, warn};

use crate::{
    config::TransformConfig,
    error::{TransformError, ValidationError},
    record::{Gender, NormalizedRecord, Rating, RawRecord, Size, TIMESTAMP_FORMAT},
    text_manipulators::{first_integer, first_number, parse_amount, strip_label},
};

const DEFAULT_SIZE: Size = Size::M;
const DEFAULT_GENDER: Gender = Gender::Unisex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub input: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    /// Rejections keyed by [`ValidationError::reason`].
    pub reasons: BTreeMap<&'static str, usize>,
}

impl TransformSummary {
    pub fn rejection_rate(&self) -> f64 {
        if self.input == 0 {
            0.0
        } else {
            self.rejected as f64 / self.input as f64
        }
    }
}

#[derive(Debug)]
pub struct Transformed {
    pub records: Vec<NormalizedRecord>,
    pub summary: TransformSummary,
}

/// Normalizes every raw record, dropping the ones that fail validation.
///
/// Surviving records keep their input order. Fails only when a rejection
/// threshold is configured and exceeded.
pub fn transform(raw: Vec<RawRecord>, config: &TransformConfig) -> Result<Transformed, TransformError> {
    let mut summary = TransformSummary {
        input: raw.len(),
        ..TransformSummary::default()
    };
    let mut records = Vec::with_capacity(raw.len());
    let mut seen_titles = HashSet::new();

    for (idx, record) in raw.iter().enumerate() {
        let normalized = match normalize(record, config) {
            Ok(normalized) => normalized,
            Err(e) => {
                debug!("Dropping row {idx} ({:?}): {e}", record.title);
                summary.rejected += 1;
                *summary.reasons.entry(e.reason()).or_default() += 1;
                continue;
            }
        };
        if config.dedupe_titles && !seen_titles.insert(normalized.title.clone()) {
            debug!("Dropping row {idx}: duplicate title {:?}", normalized.title);
            summary.duplicates += 1;
            continue;
        }
        records.push(normalized);
    }
    summary.accepted = records.len();

    info!(
        "Transformed {} rows: {} accepted, {} rejected, {} duplicates",
        summary.input, summary.accepted, summary.rejected, summary.duplicates
    );
    for (reason, count) in &summary.reasons {
        info!("  rejected for {reason}: {count}");
    }

    if let Some(max_rate) = config.max_rejection_rate {
        if summary.rejection_rate() > max_rate {
            warn!(
                "Rejection rate {:.1}% is above the limit of {:.1}%",
                summary.rejection_rate() * 100.0,
                max_rate * 100.0
            );
            return Err(TransformError::RejectionRateExceeded {
                rejected: summary.rejected,
                input: summary.input,
                max_rate,
            });
        }
    }

    Ok(Transformed { records, summary })
}

/// Applies every field rule to one raw record.
pub fn normalize(raw: &RawRecord, config: &TransformConfig) -> Result<NormalizedRecord, ValidationError> {
    Ok(NormalizedRecord {
        title: clean_title(raw.title.as_deref(), config)?,
        price: clean_price(raw.price.as_deref(), config)?,
        rating: clean_rating(raw.rating.as_deref(), config)?,
        colors: raw.colors.as_deref().and_then(first_integer).unwrap_or(0),
        size: clean_size(raw.size.as_deref()),
        gender: clean_gender(raw.gender.as_deref()),
        timestamp: clean_timestamp(raw.scraped_at.as_deref())?,
    })
}

fn clean_title(title: Option<&str>, config: &TransformConfig) -> Result<String, ValidationError> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if config
        .placeholder_titles
        .iter()
        .any(|placeholder| placeholder.eq_ignore_ascii_case(title))
    {
        return Err(ValidationError::PlaceholderTitle(title.to_string()));
    }
    Ok(title.to_string())
}

fn clean_price(price: Option<&str>, config: &TransformConfig) -> Result<f64, ValidationError> {
    let text = price.map(str::trim).filter(|t| !t.is_empty()).ok_or(ValidationError::MissingPrice)?;
    let amount = parse_amount(text).ok_or_else(|| ValidationError::UnparsablePrice(text.to_string()))?;
    if amount < 0.0 {
        return Err(ValidationError::NegativePrice(amount));
    }
    let marker = config.source_currency_marker.as_str();
    let converted = if !marker.is_empty() && text.contains(marker) {
        amount * config.exchange_rate
    } else {
        amount
    };
    let rounded = (converted * 100.0).round() / 100.0;
    if !rounded.is_finite() {
        return Err(ValidationError::UnparsablePrice(text.to_string()));
    }
    // "$-0" parses as -0.0, which would be written out as "-0.0".
    Ok(if rounded == 0.0 { 0.0 } else { rounded })
}

fn clean_rating(rating: Option<&str>, config: &TransformConfig) -> Result<Rating, ValidationError> {
    // "Rating: ⭐ 3.9 / 5" -> "⭐ 3.9 "; the "/ 5" part is the scale, not the score.
    let score = rating
        .map(|text| strip_label(text, "rating"))
        .map(|text| text.split('/').next().unwrap_or_default())
        .and_then(first_number);
    match score {
        Some(score) if (0.0..=5.0).contains(&score) => Ok(Rating::Score(score)),
        Some(score) => Err(ValidationError::RatingOutOfRange(score)),
        None if config.rating_required => Err(ValidationError::MissingRating),
        None => Ok(Rating::Unknown),
    }
}

fn clean_size(size: Option<&str>) -> Size {
    size.map(|text| strip_label(text, "size"))
        .and_then(Size::from_label)
        .unwrap_or(DEFAULT_SIZE)
}

fn clean_gender(gender: Option<&str>) -> Gender {
    gender
        .map(|text| strip_label(text, "gender"))
        .and_then(Gender::from_label)
        .unwrap_or(DEFAULT_GENDER)
}

fn clean_timestamp(timestamp: Option<&str>) -> Result<NaiveDateTime, ValidationError> {
    let text = timestamp.map(str::trim).filter(|t| !t.is_empty()).ok_or(ValidationError::MissingTimestamp)?;
    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT))
        .map_err(|_| ValidationError::UnparsableTimestamp(text.to_string()))?;
    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(title: &str, price: &str) -> RawRecord {
        RawRecord {
            title: Some(title.to_string()),
            price: Some(price.to_string()),
            rating: Some("Rating: ⭐ 4.5 / 5".to_string()),
            colors: Some("3 Colors".to_string()),
            size: Some("Size: XL".to_string()),
            gender: Some("Gender: Men".to_string()),
            page: 1,
            scraped_at: Some("2026-01-29T10:00:00.123456+07:00".to_string()),
        }
    }

    fn config() -> TransformConfig {
        TransformConfig::default()
    }

    #[test]
    fn normalizes_a_complete_listing() {
        let record = normalize(&raw("  T-shirt 2 ", "$102.15"), &config()).unwrap();
        assert_eq!(record.title, "T-shirt 2");
        assert_eq!(record.price, 1634400.0);
        assert_eq!(record.rating, Rating::Score(4.5));
        assert_eq!(record.colors, 3);
        assert_eq!(record.size, Size::XL);
        assert_eq!(record.gender, Gender::Men);
        let expected = NaiveDate::from_ymd_opt(2026, 1, 29)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(record.timestamp, expected);
    }

    #[test]
    fn local_currency_prices_only_lose_their_formatting() {
        let record = normalize(&raw("Jacket", "Rp 150.000"), &config()).unwrap();
        assert_eq!(record.price, 150000.0);
        let record = normalize(&raw("Jacket", "1.250.000,50"), &config()).unwrap();
        assert_eq!(record.price, 1250000.5);
    }

    #[test]
    fn bad_prices_reject_the_row() {
        let cfg = config();
        assert_eq!(
            normalize(&raw("Pants", "Price Unavailable"), &cfg),
            Err(ValidationError::UnparsablePrice("Price Unavailable".to_string()))
        );
        assert_eq!(normalize(&raw("Pants", "-$3.00"), &cfg), Err(ValidationError::NegativePrice(-3.0)));
        let mut missing = raw("Pants", "");
        missing.price = None;
        assert_eq!(normalize(&missing, &cfg), Err(ValidationError::MissingPrice));
    }

    #[test]
    fn prices_that_overflow_are_rejected() {
        let cfg = config();
        let huge_local = format!("Rp {}", "9".repeat(400));
        assert_eq!(
            normalize(&raw("Pants", &huge_local), &cfg),
            Err(ValidationError::UnparsablePrice(huge_local.clone()))
        );
        // Fits in an f64 on its own but not once converted.
        let huge_dollars = format!("${}", "9".repeat(306));
        assert_eq!(
            normalize(&raw("Pants", &huge_dollars), &cfg),
            Err(ValidationError::UnparsablePrice(huge_dollars.clone()))
        );
    }

    #[test]
    fn negative_zero_is_written_as_zero() {
        let record = normalize(&raw("Freebie", "$-0"), &config()).unwrap();
        assert_eq!(record.price, 0.0);
        assert!(record.price.is_sign_positive());
    }

    #[test]
    fn dash_for_cents_is_accepted() {
        let record = normalize(&raw("Jacket", "Rp 150.000,-"), &config()).unwrap();
        assert_eq!(record.price, 150000.0);
    }

    #[test]
    fn empty_and_placeholder_titles_are_rejected() {
        let cfg = config();
        assert_eq!(normalize(&raw("   ", "$1"), &cfg), Err(ValidationError::EmptyTitle));
        assert!(matches!(
            normalize(&raw("unknown product", "$1"), &cfg),
            Err(ValidationError::PlaceholderTitle(_))
        ));
    }

    #[test]
    fn rating_without_a_number_is_unknown_unless_required() {
        let mut record = raw("Hoodie", "$10");
        record.rating = Some("Rating: ⭐ Invalid Rating / 5".to_string());
        assert_eq!(normalize(&record, &config()).unwrap().rating, Rating::Unknown);

        record.rating = Some("Not Rated".to_string());
        assert_eq!(normalize(&record, &config()).unwrap().rating, Rating::Unknown);

        let strict = TransformConfig {
            rating_required: true,
            ..config()
        };
        assert_eq!(normalize(&record, &strict), Err(ValidationError::MissingRating));
    }

    #[test]
    fn rating_outside_scale_is_rejected() {
        let mut record = raw("Hoodie", "$10");
        record.rating = Some("Rating: 7.5".to_string());
        assert_eq!(normalize(&record, &config()), Err(ValidationError::RatingOutOfRange(7.5)));
    }

    #[test]
    fn attributes_fall_back_to_defaults() {
        let mut record = raw("Scarf", "$10");
        record.colors = Some("Colors".to_string());
        record.size = Some("Size: Huge".to_string());
        record.gender = None;
        let normalized = normalize(&record, &config()).unwrap();
        assert_eq!(normalized.colors, 0);
        assert_eq!(normalized.size, Size::M);
        assert_eq!(normalized.gender, Gender::Unisex);
    }

    #[test]
    fn gender_synonyms_are_folded() {
        let mut record = raw("Scarf", "$10");
        record.gender = Some("Gender: female".to_string());
        assert_eq!(normalize(&record, &config()).unwrap().gender, Gender::Women);
    }

    #[test]
    fn timestamp_is_mandatory() {
        let mut record = raw("Scarf", "$10");
        record.scraped_at = Some("yesterday".to_string());
        assert!(matches!(normalize(&record, &config()), Err(ValidationError::UnparsableTimestamp(_))));
        record.scraped_at = None;
        assert_eq!(normalize(&record, &config()), Err(ValidationError::MissingTimestamp));
        record.scraped_at = Some("2026-01-29 10:00:00".to_string());
        assert!(normalize(&record, &config()).is_ok());
    }

    #[test]
    fn each_bad_title_removes_exactly_one_row_and_order_is_kept() {
        let input = vec![
            raw("A", "$1"),
            raw("Unknown Product", "$1"),
            raw("B", "$1"),
            raw("", "$1"),
            raw("C", "$1"),
        ];
        let out = transform(input, &config()).unwrap();
        let titles: Vec<_> = out.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C"]);
        assert_eq!(out.summary.input, 5);
        assert_eq!(out.summary.rejected, 2);
        assert_eq!(out.summary.reasons["placeholder_title"], 1);
        assert_eq!(out.summary.reasons["empty_title"], 1);
    }

    #[test]
    fn duplicate_titles_keep_the_first() {
        let input = vec![raw("A", "$1"), raw("A", "$2"), raw("B", "$3")];
        let out = transform(input.clone(), &config()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].price, 16000.0);
        assert_eq!(out.summary.duplicates, 1);
        assert_eq!(out.summary.rejected, 0);

        let keep_all = TransformConfig {
            dedupe_titles: false,
            ..config()
        };
        assert_eq!(transform(input, &keep_all).unwrap().records.len(), 3);
    }

    #[test]
    fn rejection_threshold_fails_the_stage() {
        let input = vec![raw("A", "$1"), raw("B", "n/a"), raw("C", "n/a")];
        let strict = TransformConfig {
            max_rejection_rate: Some(0.5),
            ..config()
        };
        assert!(matches!(
            transform(input.clone(), &strict),
            Err(TransformError::RejectionRateExceeded { rejected: 2, input: 3, .. })
        ));
        let lenient = TransformConfig {
            max_rejection_rate: Some(0.7),
            ..config()
        };
        assert_eq!(transform(input, &lenient).unwrap().records.len(), 1);
    }
}
