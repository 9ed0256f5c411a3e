//! On-disk layout for generated content:
//!
//! ```text
//! <dir>/generated_content_<YYYYmmdd_HHMMSS>.json
//! <dir>/posts/post_<i>.txt
//! <dir>/images/post_image_<hash>.png
//! ```

use chrono::Local;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::GeneratedItem;

#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join("posts")
    }

    /// Text rendering of one post file
    pub fn render_post(item: &GeneratedItem) -> String {
        let post = &item.post;
        let mut out = String::new();
        let _ = writeln!(out, "Post #{}", item.post_index);
        let _ = writeln!(out, "{}\n", "=".repeat(50));
        let _ = writeln!(out, "{}\n", post.content);
        let _ = writeln!(out, "Hashtags: {}\n", post.hashtags.join(", "));
        let _ = writeln!(out, "Source: {}", post.news_article_title.as_deref().unwrap_or(""));
        let _ = writeln!(out, "URL: {}", post.news_article_url.as_deref().unwrap_or(""));
        if let Some(path) = &item.image.image_path {
            let _ = writeln!(out, "Image: {}", path);
        } else if let Some(url) = &item.image.image_url {
            let _ = writeln!(out, "Image URL: {}", url);
        }
        out
    }

    /// Write the JSON bundle and one text file per post. Returns the JSON path.
    pub async fn save(&self, items: &[GeneratedItem]) -> Result<PathBuf> {
        let posts_dir = self.posts_dir();
        tokio::fs::create_dir_all(&posts_dir).await?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let json_path = self.root.join(format!("generated_content_{}.json", stamp));
        tokio::fs::write(&json_path, serde_json::to_string_pretty(items)?).await?;

        for item in items {
            let path = posts_dir.join(format!("post_{}.txt", item.post_index));
            tokio::fs::write(&path, Self::render_post(item)).await?;
        }

        info!(path = %json_path.display(), posts = items.len(), "output: generated content saved");
        Ok(json_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeneratedImage, Post};

    fn item(index: usize, image_path: Option<&str>) -> GeneratedItem {
        GeneratedItem {
            post: Post {
                content: "Hiring is changing.".into(),
                hashtags: vec!["#AI".into(), "#Hiring".into()],
                image_prompt: "p".into(),
                metadata: Default::default(),
                news_article_title: Some("AI hiring".into()),
                news_article_url: Some("https://example.com/a".into()),
            },
            image: GeneratedImage {
                image_url: Some("https://img.example.com/1.png".into()),
                image_path: image_path.map(str::to_string),
                prompt_used: "p".into(),
                generation_metadata: Default::default(),
            },
            post_index: index,
        }
    }

    #[test]
    fn post_file_layout() {
        let text = OutputWriter::render_post(&item(2, None));
        let expected = format!(
            "Post #2\n{}\n\nHiring is changing.\n\nHashtags: #AI, #Hiring\n\nSource: AI hiring\nURL: https://example.com/a\nImage URL: https://img.example.com/1.png\n",
            "=".repeat(50)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn local_image_path_wins_over_url() {
        let text = OutputWriter::render_post(&item(1, Some("output/images/post_image_ab.png")));
        assert!(text.ends_with("Image: output/images/post_image_ab.png\n"));
        assert!(!text.contains("Image URL"));
    }

    #[tokio::test]
    async fn save_writes_json_and_posts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let json_path = writer.save(&[item(1, None), item(2, None)]).await.unwrap();

        let raw = tokio::fs::read_to_string(&json_path).await.unwrap();
        let parsed: Vec<GeneratedItem> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(json_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("generated_content_"));
        assert!(dir.path().join("posts/post_1.txt").exists());
        assert!(dir.path().join("posts/post_2.txt").exists());
    }
}
