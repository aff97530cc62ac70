use crate::models::PipelineSettings;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?(\d+(?:,\d{3})*(?:\.\d{2})?)").expect("valid amount regex"));

/// Best-effort extraction from a quick-add line. Missing fields stay `None`;
/// the desk rejects the submission if any of them are required and absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDeal {
    pub company: String,
    pub amount: Option<f64>,
    pub owner: Option<String>,
    pub product: Option<String>,
}

pub fn parse_quick_add(input: &str, settings: &PipelineSettings) -> ParsedDeal {
    let words: Vec<&str> = input.split_whitespace().collect();

    let owner = words
        .iter()
        .find(|word| settings.owners.iter().any(|owner| owner == *word))
        .map(|word| word.to_string());

    let product = words
        .iter()
        .find(|word| settings.products.iter().any(|product| product == *word))
        .map(|word| word.to_string());

    let amount_match = AMOUNT_RE.captures(input);
    let amount = amount_match
        .as_ref()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    let amount_text = amount_match
        .as_ref()
        .and_then(|caps| caps.get(0))
        .map(|m| m.as_str());

    let company = words
        .iter()
        .filter(|word| {
            !settings.owners.iter().any(|owner| owner == *word)
                && !settings.products.iter().any(|product| product == *word)
                && Some(**word) != amount_text
        })
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    ParsedDeal {
        company,
        amount,
        owner,
        product,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_quick_add;
    use crate::models::PipelineSettings;

    #[test]
    fn parses_company_amount_owner_and_product() {
        let settings = PipelineSettings::default();
        let parsed = parse_quick_add("Acme Corp $50000 Hasan Kayako", &settings);

        assert_eq!(parsed.company, "Acme Corp");
        assert_eq!(parsed.amount, Some(50_000.0));
        assert_eq!(parsed.owner.as_deref(), Some("Hasan"));
        assert_eq!(parsed.product.as_deref(), Some("Kayako"));
    }

    #[test]
    fn handles_thousands_separators_and_cents() {
        let settings = PipelineSettings::default();
        let parsed = parse_quick_add("Globex $1,250,000.50 Jared Ephor", &settings);

        assert_eq!(parsed.company, "Globex");
        assert_eq!(parsed.amount, Some(1_250_000.50));
        assert_eq!(parsed.owner.as_deref(), Some("Jared"));
        assert_eq!(parsed.product.as_deref(), Some("Ephor"));
    }

    #[test]
    fn missing_fields_stay_none() {
        let settings = PipelineSettings::default();
        let parsed = parse_quick_add("Initech", &settings);

        assert_eq!(parsed.company, "Initech");
        assert!(parsed.amount.is_none());
        assert!(parsed.owner.is_none());
        assert!(parsed.product.is_none());
    }

    #[test]
    fn roster_membership_follows_settings() {
        let mut settings = PipelineSettings::default();
        settings.owners.push("Priya".to_string());
        let parsed = parse_quick_add("Hooli $9000 Priya Agents", &settings);

        assert_eq!(parsed.owner.as_deref(), Some("Priya"));
        assert_eq!(parsed.product.as_deref(), Some("Agents"));
        assert_eq!(parsed.company, "Hooli");
    }
}
