use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

/// Topic bucket assigned to every article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    AiAdvancement,
    AiInHr,
    AiInTalent,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::AiAdvancement => "ai_advancement",
            NewsCategory::AiInHr => "ai_in_hr",
            NewsCategory::AiInTalent => "ai_in_talent",
        }
    }
}

/// A candidate news item as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Heuristic rank in [0, 1]
    pub relevance_score: f64,
    pub category: NewsCategory,
    pub source: Option<String>,
    pub published_date: Option<String>,
}

/// Result of a collect run: the ranked selection plus the raw list it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsCollection {
    pub articles: Vec<Article>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub all_articles: Vec<Article>,
    pub filtered_articles: Vec<Article>,
}

/// Social post generated from one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub image_prompt: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub news_article_title: Option<String>,
    pub news_article_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub prompt_used: String,
    #[serde(default)]
    pub generation_metadata: BTreeMap<String, String>,
}

/// One finished (post, image) pair; `post_index` is 1-based and unique within a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub post: Post,
    pub image: GeneratedImage,
    pub post_index: usize,
}

pub const COLLECT_COUNT_RANGE: std::ops::RangeInclusive<i64> = 1..=10;
pub const GENERATE_COUNT_RANGE: std::ops::RangeInclusive<i64> = 1..=5;
pub const DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=30;

fn check_range(name: &str, value: i64, range: &std::ops::RangeInclusive<i64>) -> Result<usize> {
    if range.contains(&value) {
        Ok(value as usize)
    } else {
        Err(Error::Validation(format!(
            "{} must be between {} and {}, got {}",
            name,
            range.start(),
            range.end(),
            value
        )))
    }
}

/// Validated parameters of `POST /api/news/collect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectParams {
    pub count: usize,
    pub days: u32,
}

/// Raw query value as an integer; anything unparseable is a validation error.
fn parse_int(name: &str, raw: Option<&str>) -> Result<Option<i64>> {
    raw.map(|v| {
        v.trim().parse::<i64>().map_err(|_| {
            Error::Validation(format!("{} must be an integer, got {:?}", name, v))
        })
    })
    .transpose()
}

impl CollectParams {
    /// Parse raw query values, then apply the same bounds as [`CollectParams::new`].
    pub fn from_query(count: Option<&str>, days: Option<&str>) -> Result<Self> {
        Self::new(parse_int("count", count)?, parse_int("days", days)?)
    }

    pub fn new(count: Option<i64>, days: Option<i64>) -> Result<Self> {
        let count = check_range("count", count.unwrap_or(5), &COLLECT_COUNT_RANGE)?;
        let days = check_range("days", days.unwrap_or(7), &DAYS_RANGE)?;
        Ok(Self {
            count,
            days: days as u32,
        })
    }
}

fn default_generate_count() -> i64 {
    1
}

fn default_days() -> i64 {
    7
}

fn default_save_to_disk() -> bool {
    true
}

/// Body of `POST /api/generate` and `POST /api/generate/async`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default = "default_generate_count")]
    pub count: i64,
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_save_to_disk")]
    pub save_to_disk: bool,
    #[serde(default)]
    pub selected_urls: Vec<String>,
    #[serde(default)]
    pub extra_urls: Vec<String>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            count: default_generate_count(),
            days: default_days(),
            save_to_disk: default_save_to_disk(),
            selected_urls: Vec::new(),
            extra_urls: Vec::new(),
        }
    }
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<()> {
        check_range("count", self.count, &GENERATE_COUNT_RANGE)?;
        check_range("days", self.days, &DAYS_RANGE)?;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count.max(0) as usize
    }

    pub fn days(&self) -> u32 {
        self.days.clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Selected then extra urls, blanks dropped, duplicates removed keeping first occurrence
    pub fn requested_urls(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.selected_urls
            .iter()
            .chain(self.extra_urls.iter())
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .filter(|u| seen.insert(u.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Number of items a job for this request is expected to produce
    pub fn expected_items(&self) -> usize {
        let urls = self.requested_urls().len();
        if urls > 0 {
            urls
        } else {
            self.count()
        }
    }
}
