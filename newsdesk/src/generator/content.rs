use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use common::PostConfig;

use crate::error::{Error, Result};
use crate::llm::{extract_json_from_text, LlmProvider, LlmRequest};
use crate::models::{Article, Post};

/// Writes one social post per article with a single text-generation call
pub struct ContentGenerator {
    llm: Arc<dyn LlmProvider>,
    tone: String,
    max_length: usize,
}

#[derive(Debug, Deserialize)]
struct PostJson {
    content: String,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    image_prompt: String,
}

impl ContentGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &PostConfig) -> Self {
        Self {
            llm,
            tone: config.tone.clone(),
            max_length: config.max_length.max(1),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            r##"You are the marketing lead of a company building AI tools for hiring managers and recruiters.
Write LinkedIn posts that present AI as something that augments people rather than replaces them.

Voice: {tone}, clear and authoritative, no hype.

Structure:
1) Hook: one or two lines on why this news matters for hiring.
2) Two or three bullet points on the impact for recruitment and candidate experience.
3) One concrete takeaway for HR leaders.
4) A closing question inviting discussion.

Keep the post under {max_length} characters.

The image prompt must follow the article's theme: minimal, professional, square framing,
one or two sentences naming subject, setting and style. No text, logos or screenshots.

OUTPUT FORMAT (strict JSON):
{{
  "content": "the post body",
  "hashtags": ["#AI", "#Hiring"],
  "image_prompt": "description of the illustration"
}}"##,
            tone = self.tone,
            max_length = self.max_length,
        )
    }

    fn user_prompt(article: &Article) -> String {
        format!(
            "Title: {}\nSummary: {}\nCategory: {}\nURL: {}\n\n\
             Write an engaging LinkedIn post that highlights the key insights of this article, \
             gives the reader context, includes relevant hashtags and comes with an image prompt \
             suitable for an image model.",
            article.title,
            article.summary,
            article.category.as_str(),
            article.url
        )
    }

    /// Cut `content` to at most `max_length` characters on a char boundary.
    fn truncate(content: &str, max_length: usize) -> String {
        match content.char_indices().nth(max_length) {
            Some((idx, _)) => content[..idx].trim_end().to_string(),
            None => content.to_string(),
        }
    }

    fn parse_post(&self, raw: &str) -> anyhow::Result<PostJson> {
        let json = extract_json_from_text(raw).context("No valid JSON found in post response")?;
        let post: PostJson = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse post JSON. Input was: {}", json))?;
        if post.content.trim().is_empty() {
            anyhow::bail!("post response has empty content");
        }
        Ok(post)
    }

    pub async fn generate_post(&self, article: &Article) -> Result<Post> {
        debug!(url = %article.url, "generator: writing post");

        let request = LlmRequest::new(Self::user_prompt(article)).with_system(self.system_prompt());
        let response = self
            .llm
            .generate(request)
            .await
            .context("post generation request failed")
            .map_err(Error::generation)?;

        let parsed = self.parse_post(&response.content).map_err(Error::generation)?;

        let hashtags = parsed
            .hashtags
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        let image_prompt = if parsed.image_prompt.trim().is_empty() {
            format!("Professional illustration about {}", article.title)
        } else {
            parsed.image_prompt.trim().to_string()
        };

        let mut post = Post {
            content: Self::truncate(parsed.content.trim(), self.max_length),
            hashtags,
            image_prompt,
            metadata: Default::default(),
            news_article_title: Some(article.title.clone()),
            news_article_url: Some(article.url.clone()),
        };
        post.metadata
            .insert("source_category".into(), article.category.as_str().into());
        post.metadata
            .insert("source_relevance".into(), article.relevance_score.to_string());
        post.metadata.insert("tone".into(), self.tone.clone());

        info!(
            url = %article.url,
            chars = post.content.chars().count(),
            hashtags = post.hashtags.len(),
            "generator: post written"
        );
        Ok(post)
    }
}
