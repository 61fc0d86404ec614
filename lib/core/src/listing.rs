use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A rental listing as stored in the candidate index. Scraped sources are
/// inconsistent, so amenity fields stay as raw strings and anything we do
/// not model explicitly is kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "de_money")]
    pub price: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub pets: Option<String>,
    #[serde(default)]
    pub couples: Option<String>,
    #[serde(default)]
    pub bills_included: Option<String>,
    #[serde(default)]
    pub parking: Option<String>,
    #[serde(default)]
    pub minimum_term: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub furnishings: Option<String>,
    #[serde(default)]
    pub available: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The renter's ideal listing, synthesized from the conversation.
///
/// Every field is optional: the model only fills in what the renter
/// actually stated. Boolean amenities arrive as "Yes"/"No" strings from
/// the model and are normalized here at the deserialization boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdealCriteria {
    #[serde(default, deserialize_with = "de_money")]
    pub max_rent: Option<i64>,
    #[serde(default, deserialize_with = "de_money")]
    pub min_rent: Option<i64>,
    #[serde(default)]
    pub target_location: Option<String>,
    #[serde(default)]
    pub max_commute: Option<String>,
    #[serde(default)]
    pub minimum_term: Option<String>,
    #[serde(default, deserialize_with = "de_yes_no")]
    pub pets_ok: Option<bool>,
    #[serde(default, deserialize_with = "de_yes_no")]
    pub couples_ok: Option<bool>,
    #[serde(default, deserialize_with = "de_yes_no")]
    pub bills_included: Option<bool>,
    #[serde(default, deserialize_with = "de_yes_no")]
    pub parking: Option<bool>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub furnishings: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub available: Option<String>,
}

impl IdealCriteria {
    /// Renders the populated fields as "key: value" lines for prompts.
    pub fn prompt_lines(&self) -> String {
        let mut lines = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                lines.push(format!("{key}: {v}"));
            }
        };
        push("max_rent", self.max_rent.map(|v| v.to_string()));
        push("min_rent", self.min_rent.map(|v| v.to_string()));
        push("target_location", self.target_location.clone());
        push("max_commute", self.max_commute.clone());
        push("minimum_term", self.minimum_term.clone());
        push("pets_ok", self.pets_ok.map(yes_no));
        push("couples_ok", self.couples_ok.map(yes_no));
        push("bills_included", self.bills_included.map(yes_no));
        push("parking", self.parking.map(yes_no));
        push("property_type", self.property_type.clone());
        push("furnishings", self.furnishings.clone());
        push("location", self.location.clone());
        push("postcode", self.postcode.clone());
        push("detail", self.detail.clone());
        push("available", self.available.clone());
        lines.join("\n")
    }
}

fn yes_no(v: bool) -> String {
    if v { "Yes".to_string() } else { "No".to_string() }
}

/// A per-listing verdict from the scoring model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingScore {
    pub overall: u8,
    pub reasoning: Value,
}

/// A scored candidate, tagged with its index in the filtered candidate
/// list so clients can render results in a stable layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub index: usize,
    pub listing: Listing,
    pub score: u8,
    pub reasoning: Value,
}

/// Events emitted over the match stream, in protocol order: one `init`,
/// zero or more `score` in completion order, one `done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MatchEvent {
    Init {
        total: usize,
        #[serde(rename = "idealListing")]
        ideal_listing: IdealCriteria,
        summary: String,
    },
    Score {
        #[serde(rename = "match")]
        matched: ScoredMatch,
    },
    Done,
}

/// Accepts a monetary amount as a number or a string like "£1,200 pcm".
/// Anything without a digit becomes `None`.
fn de_money<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

/// Accepts a yes/no answer as a bool or a string. Unrecognized strings
/// such as "Unknown" collapse to `None`.
fn de_yes_no<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => Some(true),
            "no" | "n" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
