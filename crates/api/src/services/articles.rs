//! Article write validation.

use serde::Deserialize;

use crate::db::articles::ArticleFields;
use crate::validation::ValidationErrors;

const MAX_TITLE_LENGTH: usize = 255;
const MAX_EXCERPT_LENGTH: usize = 500;
const MAX_IMAGE_URL_LENGTH: usize = 2048;

/// Body of the admin article endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<bool>,
}

/// Check a new article: title and content are required.
///
/// # Errors
///
/// Returns every field problem found.
pub fn validate_new_article(input: &ArticleInput) -> Result<ArticleFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = errors.required("title", input.title.as_deref(), MAX_TITLE_LENGTH);
    let content = errors.required("content", input.content.as_deref(), usize::MAX);
    let (excerpt, image_url) = optional_fields(&mut errors, input);
    errors.into_result()?;

    Ok(ArticleFields {
        title: title.map(str::to_owned),
        excerpt,
        content: content.map(str::to_owned),
        image_url,
        published: Some(input.published.unwrap_or(false)),
    })
}

/// Check an article update; absent fields keep their value.
///
/// # Errors
///
/// Returns every field problem found.
pub fn validate_article_update(input: &ArticleInput) -> Result<ArticleFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = input
        .title
        .as_deref()
        .and_then(|t| errors.required("title", Some(t), MAX_TITLE_LENGTH));
    let content = input
        .content
        .as_deref()
        .and_then(|c| errors.required("content", Some(c), usize::MAX));
    let (excerpt, image_url) = optional_fields(&mut errors, input);
    errors.into_result()?;

    Ok(ArticleFields {
        title: title.map(str::to_owned),
        excerpt,
        content: content.map(str::to_owned),
        image_url,
        published: input.published,
    })
}

fn optional_fields(
    errors: &mut ValidationErrors,
    input: &ArticleInput,
) -> (Option<String>, Option<String>) {
    let excerpt = errors.optional("excerpt", input.excerpt.as_deref(), MAX_EXCERPT_LENGTH);
    let image_url = errors.optional("image_url", input.image_url.as_deref(), MAX_IMAGE_URL_LENGTH);
    (excerpt.map(str::to_owned), image_url.map(str::to_owned))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_requires_title_and_content() {
        let errors = validate_new_article(&ArticleInput::default()).unwrap_err();
        assert!(errors.get("title").is_some());
        assert!(errors.get("content").is_some());

        let fields = validate_new_article(&ArticleInput {
            title: Some("Spring picks".to_owned()),
            content: Some("Five new boxes.".to_owned()),
            ..ArticleInput::default()
        })
        .unwrap();
        assert_eq!(fields.published, Some(false));
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let fields = validate_article_update(&ArticleInput {
            published: Some(true),
            ..ArticleInput::default()
        })
        .unwrap();
        assert_eq!(fields.title, None);
        assert_eq!(fields.published, Some(true));

        let errors = validate_article_update(&ArticleInput {
            title: Some("x".repeat(256)),
            ..ArticleInput::default()
        })
        .unwrap_err();
        assert!(errors.get("title").is_some());
    }
}
