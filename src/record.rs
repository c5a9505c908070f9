use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// Output format for scrape timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column header shared by every sink, in output order.
pub const COLUMNS: [&str; 7] = ["title", "price", "rating", "colors", "size", "gender", "timestamp"];

/// Header of the raw dump, matching [`RawRecord`]'s field order.
pub const RAW_COLUMNS: [&str; 8] = [
    "title",
    "price",
    "rating",
    "colors",
    "size",
    "gender",
    "page",
    "scraped_at",
];

/// One listing block as it was read off the page. Nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawRecord {
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub colors: Option<String>,
    pub size: Option<String>,
    pub gender: Option<String>,
    pub page: u32,
    pub scraped_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rating {
    Score(f64),
    Unknown,
}

impl Rating {
    pub fn score(&self) -> Option<f64> {
        match self {
            Rating::Score(score) => Some(*score),
            Rating::Unknown => None,
        }
    }
}

// An unknown rating becomes an empty cell.
impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rating::Score(score) => serializer.serialize_f64(*score),
            Rating::Unknown => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Size {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
    XXXL,
}

impl Size {
    pub const ALL: [Size; 7] = [
        Size::XS,
        Size::S,
        Size::M,
        Size::L,
        Size::XL,
        Size::XXL,
        Size::XXXL,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Size::XS => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::XL => "XL",
            Size::XXL => "XXL",
            Size::XXXL => "XXXL",
        }
    }

    pub fn from_label(label: &str) -> Option<Size> {
        Size::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Men,
    Women,
    Unisex,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Men => "Men",
            Gender::Women => "Women",
            Gender::Unisex => "Unisex",
        }
    }

    pub fn from_label(label: &str) -> Option<Gender> {
        match label.to_ascii_lowercase().as_str() {
            "men" | "man" | "male" | "m" => Some(Gender::Men),
            "women" | "woman" | "female" | "f" => Some(Gender::Women),
            "unisex" | "both" | "all" => Some(Gender::Unisex),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing that passed every field rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub price: f64,
    pub rating: Rating,
    pub colors: u32,
    pub size: Size,
    pub gender: Gender,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

impl NormalizedRecord {
    /// The record as one spreadsheet row, cells in [`COLUMNS`] order.
    pub fn sheet_row(&self) -> Vec<serde_json::Value> {
        vec![
            self.title.clone().into(),
            self.price.into(),
            self.rating
                .score()
                .map_or_else(|| serde_json::Value::String(String::new()), Into::into),
            self.colors.into(),
            self.size.as_str().into(),
            self.gender.as_str().into(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string().into(),
        ]
    }
}
