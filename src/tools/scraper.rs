//! Professor rating scraper. Produces the course -> professors JSON file
//! consumed by the ratings loader.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use ::scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::core::config::settings::ScraperSettings;
use crate::rag::document::MISSING_FIELD;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REFERER_URL: &str = "https://www.ratemyprofessors.com/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorRating {
    pub prof_id: String,
    pub name: String,
    pub rating: String,
    pub would_take_again: String,
    pub difficulty: String,
}

pub type CourseRatings = BTreeMap<String, Vec<ProfessorRating>>;

/// Element selectors for a professor page, built from the configured class
/// attribute strings.
pub struct PageSelectors {
    rating: Selector,
    feedback: Selector,
    name: Selector,
}

impl PageSelectors {
    pub fn from_settings(settings: &ScraperSettings) -> anyhow::Result<Self> {
        Ok(Self {
            rating: class_selector("div", &settings.rating_class)?,
            feedback: class_selector("div", &settings.feedback_class)?,
            name: class_selector("h1", &settings.name_class)?,
        })
    }
}

/// `"A B"` on `div` becomes `div.A.B`.
fn class_selector(tag: &str, classes: &str) -> anyhow::Result<Selector> {
    let selector: String = std::iter::once(tag.to_string())
        .chain(classes.split_whitespace().map(|class| format!(".{}", class)))
        .collect();
    Selector::parse(&selector).map_err(|e| anyhow!("Invalid selector {}: {:?}", selector, e))
}

/// Missing elements become `N/A`. The first feedback number is the
/// would-take-again share, the second the difficulty.
pub fn parse_professor_page(html: &str, selectors: &PageSelectors, prof_id: &str) -> ProfessorRating {
    let document = Html::parse_document(html);
    let text_of = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
    };

    let feedback: Vec<String> = document
        .select(&selectors.feedback)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect();

    let rating = text_of(&selectors.rating);
    if rating.is_none() {
        tracing::warn!(
            "No rating element on page for {}; the page layout may have changed",
            prof_id
        );
    }

    ProfessorRating {
        prof_id: prof_id.to_string(),
        name: text_of(&selectors.name).unwrap_or_else(|| MISSING_FIELD.to_string()),
        rating: rating.unwrap_or_else(|| MISSING_FIELD.to_string()),
        would_take_again: feedback
            .first()
            .cloned()
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
        difficulty: feedback
            .get(1)
            .cloned()
            .unwrap_or_else(|| MISSING_FIELD.to_string()),
    }
}

pub struct RatingScraper {
    client: reqwest::Client,
    base_url: String,
    selectors: PageSelectors,
    professors: BTreeMap<String, Vec<String>>,
}

impl RatingScraper {
    pub fn new(settings: &ScraperSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            selectors: PageSelectors::from_settings(settings)?,
            professors: settings.professors.clone(),
        })
    }

    async fn fetch(&self, prof_id: &str) -> anyhow::Result<String> {
        let url = format!("{}{}", self.base_url, prof_id);
        tracing::info!("Fetching {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// One request per professor id; failed fetches are logged and left out.
    pub async fn scrape(&self) -> CourseRatings {
        let mut ratings = CourseRatings::new();
        for (course, ids) in &self.professors {
            tracing::info!("Scraping course {}", course);
            for prof_id in ids {
                match self.fetch(prof_id).await {
                    Ok(html) => {
                        let entry = parse_professor_page(&html, &self.selectors, prof_id);
                        tracing::info!("Found {} (rating {})", entry.name, entry.rating);
                        ratings.entry(course.clone()).or_default().push(entry);
                    }
                    Err(err) => tracing::warn!("Failed to fetch professor {}: {:#}", prof_id, err),
                }
            }
        }
        ratings
    }
}

/// Writes ratings as 4-space-indented JSON.
pub fn write_ratings(path: &Path, ratings: &CourseRatings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    ratings.serialize(&mut serializer)?;
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h1 class="NameTitle__NameWrapper-dowf0z-2 cSXRap"> Ada Lovelace </h1>
          <div class="RatingValue__Numerator-qw8sqy-2 duhvlP">4.5</div>
          <div class="FeedbackItem__FeedbackNumber-uof32n-1 ecFgca">88%</div>
          <div class="FeedbackItem__FeedbackNumber-uof32n-1 ecFgca">3.2</div>
          <div class="RatingValue__Numerator-qw8sqy-2">9.9</div>
        </body></html>
    "#;

    fn selectors() -> PageSelectors {
        PageSelectors::from_settings(&ScraperSettings::default()).unwrap()
    }

    #[test]
    fn extracts_fields_from_professor_page() {
        let entry = parse_professor_page(PAGE, &selectors(), "2038564");

        assert_eq!(
            entry,
            ProfessorRating {
                prof_id: "2038564".to_string(),
                name: "Ada Lovelace".to_string(),
                rating: "4.5".to_string(),
                would_take_again: "88%".to_string(),
                difficulty: "3.2".to_string(),
            }
        );
    }

    #[test]
    fn missing_elements_become_placeholders() {
        let html = r#"<div class="FeedbackItem__FeedbackNumber-uof32n-1 ecFgca">70%</div>"#;

        let entry = parse_professor_page(html, &selectors(), "1");

        assert_eq!(entry.name, "N/A");
        assert_eq!(entry.rating, "N/A");
        assert_eq!(entry.would_take_again, "70%");
        assert_eq!(entry.difficulty, "N/A");
    }

    #[test]
    fn output_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course_to_prof.json");
        let mut ratings = CourseRatings::new();
        ratings.insert(
            "6350".to_string(),
            vec![parse_professor_page(PAGE, &selectors(), "2038564")],
        );

        write_ratings(&path, &ratings).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"6350\": [\n        {\n            \"prof_id\""));
        let docs = crate::rag::loaders::load_professor_ratings(&path).unwrap();
        assert_eq!(docs.len(), 1);
    }
}
