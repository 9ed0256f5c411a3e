use anyhow::Result;

use super::NewsProvider;
use crate::models::{Article, NewsCategory};

fn placeholder(
    title: &str,
    slug: &str,
    summary: &str,
    relevance_score: f64,
    category: NewsCategory,
    source: &str,
) -> Article {
    Article {
        title: title.to_string(),
        url: format!("https://example.com/{}", slug),
        summary: summary.to_string(),
        relevance_score,
        category,
        source: Some(source.to_string()),
        published_date: None,
    }
}

/// Built-in demo articles served when no provider returns anything
pub fn articles() -> Vec<Article> {
    vec![
        placeholder(
            "AI Revolutionizes Talent Acquisition: New Tools Transform Hiring",
            "ai-talent-acquisition",
            "Artificial intelligence is transforming how companies find and hire talent, with new AI-powered tools making recruitment more efficient and effective.",
            0.9,
            NewsCategory::AiInTalent,
            "Tech News",
        ),
        placeholder(
            "HR Departments Embrace AI for Employee Management",
            "ai-hr-management",
            "Human resources departments are increasingly adopting AI technologies to streamline employee management, improve engagement, and optimize workforce planning.",
            0.85,
            NewsCategory::AiInHr,
            "HR Today",
        ),
        placeholder(
            "Latest AI Breakthroughs in Machine Learning and Automation",
            "ai-breakthroughs",
            "Recent advances in artificial intelligence and machine learning are opening new possibilities for automation and intelligent systems across industries.",
            0.8,
            NewsCategory::AiAdvancement,
            "AI Weekly",
        ),
        placeholder(
            "AI-Powered Recruitment Platforms Gain Traction",
            "ai-recruitment-platforms",
            "Companies are turning to AI-powered recruitment platforms that use machine learning to match candidates with job opportunities more accurately.",
            0.75,
            NewsCategory::AiInTalent,
            "Recruitment Tech",
        ),
        placeholder(
            "How AI is Reshaping the Future of Work and Hiring",
            "ai-future-work",
            "Artificial intelligence is fundamentally changing the landscape of work, from how jobs are posted to how candidates are evaluated and selected.",
            0.7,
            NewsCategory::AiInHr,
            "Future of Work",
        ),
    ]
}

/// Serves [`articles`] for every query, for demos and offline runs
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderProvider;

#[async_trait::async_trait]
impl NewsProvider for PlaceholderProvider {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn search(&self, _query: &str, _max_results: usize, _days: u32) -> Result<Vec<Article>> {
        Ok(articles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_set_is_unique_and_ranked() {
        let set = articles();
        assert_eq!(set.len(), 5);
        let mut urls: Vec<&str> = set.iter().map(|a| a.url.as_str()).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 5);
        assert!(set.windows(2).all(|w| w[0].relevance_score > w[1].relevance_score));
    }
}
