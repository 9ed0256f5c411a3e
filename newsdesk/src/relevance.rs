//! Keyword/category heuristics and top-N selection.
//!
//! Every article produced by a real provider goes through [`assess`], which
//! assigns its category and relevance score. [`RelevanceFilter`] then ranks by
//! that score and keeps the best `count`.

use crate::models::{Article, NewsCategory, NewsCollection};

const AI_TERMS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "generative ai",
    "machine learning",
    "llm",
    "automation",
    "agentic",
];

const HR_TERMS: &[&str] = &[
    "hr",
    "human resources",
    "recruitment",
    "recruiting",
    "recruiter",
    "hiring",
    "workforce",
    "employee",
];

const TALENT_TERMS: &[&str] = &[
    "talent",
    "talent acquisition",
    "candidate",
    "candidates",
    "job seekers",
];

/// Lowercase, strip punctuation, and pad with spaces so whole-word lookups
/// can be done with `contains(" term ")`.
fn normalize(title: &str, summary: &str) -> String {
    let mut text = String::with_capacity(title.len() + summary.len() + 3);
    text.push(' ');
    for c in title.chars().chain(std::iter::once(' ')).chain(summary.chars()) {
        if c.is_alphanumeric() {
            text.extend(c.to_lowercase());
        } else {
            text.push(' ');
        }
    }
    text.push(' ');
    // collapse runs of whitespace
    text.split_whitespace()
        .fold(String::from(" "), |mut acc, w| {
            acc.push_str(w);
            acc.push(' ');
            acc
        })
}

fn hits(text: &str, terms: &[&str]) -> usize {
    terms
        .iter()
        .filter(|t| text.contains(&format!(" {} ", t)))
        .count()
}

/// Category from title and summary: talent beats HR, anything else is an AI advancement.
pub fn categorize(title: &str, summary: &str) -> NewsCategory {
    let text = normalize(title, summary);
    let hr = hits(&text, HR_TERMS);
    let talent = hits(&text, TALENT_TERMS);

    if hr > 0 || talent > 0 {
        if talent > 0 {
            return NewsCategory::AiInTalent;
        }
        return NewsCategory::AiInHr;
    }
    NewsCategory::AiAdvancement
}

/// Heuristic score in [0, 1]: a base, keyword coverage, and a category bonus.
pub fn heuristic_score(title: &str, summary: &str, category: NewsCategory) -> f64 {
    let text = normalize(title, summary);
    let ai = hits(&text, AI_TERMS).min(3) as f64;
    let people = (hits(&text, HR_TERMS) + hits(&text, TALENT_TERMS)).min(3) as f64;

    let bonus = match category {
        NewsCategory::AiInTalent => 0.1,
        NewsCategory::AiInHr => 0.05,
        NewsCategory::AiAdvancement => 0.0,
    };

    let score = 0.3 + ai * 0.1 + people * 0.1 + bonus;
    (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Category and score for a freshly fetched article
pub fn assess(title: &str, summary: &str) -> (NewsCategory, f64) {
    let category = categorize(title, summary);
    (category, heuristic_score(title, summary, category))
}

/// Ranks articles by relevance and keeps the top `count`
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceFilter;

impl RelevanceFilter {
    pub fn new() -> Self {
        Self
    }

    /// Highest score first; ties keep their fetch order.
    pub fn rank(&self, articles: &[Article]) -> Vec<Article> {
        let mut ranked = articles.to_vec();
        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        ranked
    }

    pub fn filter(&self, all_articles: Vec<Article>, count: usize) -> NewsCollection {
        let mut filtered = self.rank(&all_articles);
        filtered.truncate(count);

        NewsCollection {
            total_count: all_articles.len(),
            filtered_count: filtered.len(),
            articles: filtered.clone(),
            filtered_articles: filtered,
            all_articles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, score: f64) -> Article {
        Article {
            title: format!("Article {}", url),
            url: url.to_string(),
            summary: String::new(),
            relevance_score: score,
            category: NewsCategory::AiAdvancement,
            source: None,
            published_date: None,
        }
    }

    #[test]
    fn categorize_prefers_talent_over_hr() {
        assert_eq!(
            categorize("AI tools reshape talent acquisition", "Recruiters adopt new platforms"),
            NewsCategory::AiInTalent
        );
        assert_eq!(
            categorize("HR departments embrace AI", "Human resources teams automate reviews"),
            NewsCategory::AiInHr
        );
        assert_eq!(
            categorize("New generative AI model released", "Benchmarks improve"),
            NewsCategory::AiAdvancement
        );
    }

    #[test]
    fn short_terms_match_whole_words_only() {
        // "through" contains "hr" but is not about HR
        assert_eq!(
            categorize("Breakthrough in AI through scaling", ""),
            NewsCategory::AiAdvancement
        );
    }

    #[test]
    fn keyword_rich_articles_score_higher() {
        let (cat_a, rich) = assess(
            "AI hiring platforms help recruiters find talent",
            "Machine learning matches candidates to roles",
        );
        let (_, plain) = assess("Quarterly earnings beat estimates", "");
        assert_eq!(cat_a, NewsCategory::AiInTalent);
        assert!(rich > plain);
        assert!((0.0..=1.0).contains(&rich));
        assert!((0.0..=1.0).contains(&plain));
    }

    #[test]
    fn filter_keeps_top_scores_in_descending_order() {
        let scores = [0.11, 0.95, 0.42, 0.77, 0.05, 0.63, 0.88, 0.29, 0.51, 0.70];
        let raw: Vec<Article> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| article(&format!("https://example.com/{}", i), *s))
            .collect();

        let collection = RelevanceFilter::new().filter(raw, 5);

        let got: Vec<f64> = collection.articles.iter().map(|a| a.relevance_score).collect();
        assert_eq!(got, vec![0.95, 0.88, 0.77, 0.70, 0.63]);
        assert_eq!(collection.total_count, 10);
        assert_eq!(collection.filtered_count, 5);
        assert_eq!(collection.all_articles.len(), 10);
        assert_eq!(collection.filtered_articles, collection.articles);
    }

    #[test]
    fn filter_is_stable_for_ties() {
        let raw = vec![
            article("a", 0.5),
            article("b", 0.9),
            article("c", 0.5),
            article("d", 0.5),
        ];
        let collection = RelevanceFilter::new().filter(raw, 3);
        let urls: Vec<&str> = collection.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a", "c"]);
    }

    #[test]
    fn filter_with_fewer_articles_than_count() {
        let collection = RelevanceFilter::new().filter(vec![article("a", 0.4)], 5);
        assert_eq!(collection.filtered_count, 1);
        assert_eq!(collection.total_count, 1);
        assert_eq!(collection.articles.len(), collection.filtered_count);
    }
}
