mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use panelcraft_core::gateway::GatewayError;
use panelcraft_core::generation::GenerationError;
use panelcraft_pipeline::{GenerationSettings, PageRequest, StoryStore, StoryTarget};

use common::{FakeText, Harness, StoreFailures, OWNER, STRANGER};

fn new_story(prompt: &str) -> PageRequest {
    PageRequest::new(OWNER, StoryTarget::New, prompt)
}

fn existing(slug: &str, prompt: &str) -> PageRequest {
    PageRequest::new(
        OWNER,
        StoryTarget::Existing {
            slug: slug.to_string(),
        },
        prompt,
    )
}

fn urls(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// New story
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_story_creates_story_and_first_page() {
    let h = Harness::new();
    let mut request = new_story("A detective finds a glowing key in the rain.");
    request.character_images = Some(urls(&["https://u.test/hero.png"]));

    let result = h.generator.generate_page(request).await.unwrap();

    assert_eq!(result.page_number, 1);
    assert_eq!(result.title.as_deref(), Some("The Glowing Key"));
    assert!(result.image_url.starts_with("https://cdn.test/"));

    let stories = h.store.stories();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].title, "The Glowing Key");
    assert_eq!(stories[0].style, "noir");
    let pages = h.store.pages(stories[0].id);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].generated_image_url.as_deref(), Some(result.image_url.as_str()));
}

#[tokio::test]
async fn first_page_references_are_caller_characters_only() {
    let h = Harness::new();
    let mut request = new_story("Two heroes meet.");
    request.character_images = Some(urls(&["https://u.test/a.png", "https://u.test/b.png"]));

    h.generator.generate_page(request).await.unwrap();

    let sent = h.images.last_request();
    assert_eq!(sent.reference_images, urls(&["https://u.test/a.png", "https://u.test/b.png"]));
    assert!(sent.prompt.contains("CRITICAL DUAL CHARACTER FACE CONSISTENCY INSTRUCTIONS"));
}

#[tokio::test]
async fn dimensions_follow_model_and_reference_presence() {
    let h = Harness::new();
    h.generator
        .generate_page(new_story("No references here."))
        .await
        .unwrap();
    let sent = h.images.last_request();
    assert_eq!((sent.width, sent.height), (768, 1344));
    assert_eq!(sent.model, "google/flash-image-2.5");

    let mut request = new_story("With a reference.");
    request.model = Some("gemini-3-pro".into());
    request.character_images = Some(urls(&["https://u.test/a.png"]));
    h.generator.generate_page(request).await.unwrap();
    let sent = h.images.last_request();
    assert_eq!((sent.width, sent.height), (896, 1200));
    assert_eq!(sent.model, "google/gemini-3-pro-image");
}

#[tokio::test]
async fn title_failure_uses_prompt_fallback() {
    let h = Harness::with(
        FakeText::failing(),
        GenerationSettings {
            free_tier_pages_per_week: 0,
            ..Default::default()
        },
    );
    let prompt = "x".repeat(70);

    let result = h.generator.generate_page(new_story(&prompt)).await.unwrap();

    let expected = format!("{}...", "x".repeat(50));
    assert_eq!(result.title.as_deref(), Some(expected.as_str()));
    assert_eq!(h.store.stories()[0].title, expected);
}

#[tokio::test]
async fn unparseable_title_response_uses_fallback() {
    let h = Harness::with(
        FakeText::replying("I cannot comply."),
        GenerationSettings {
            free_tier_pages_per_week: 0,
            ..Default::default()
        },
    );
    let result = h
        .generator
        .generate_page(new_story("Short prompt"))
        .await
        .unwrap();
    assert_eq!(result.title.as_deref(), Some("Short prompt"));
}

#[tokio::test]
async fn title_request_uses_configured_model() {
    let h = Harness::new();
    h.generator
        .generate_page(new_story("A quiet town"))
        .await
        .unwrap();
    let requests = h.text.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "meta-llama/Llama-3.3-70B-Instruct-Turbo");
    assert_eq!(requests[0].max_tokens, 200);
}

#[tokio::test]
async fn failed_first_page_deletes_story() {
    let h = Harness::new();
    h.images
        .fail_next(GatewayError::with_status(500, "model crashed"));

    let err = h
        .generator
        .generate_page(new_story("Doomed"))
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), "api_error");
    assert!(h.store.stories().is_empty());
}

#[tokio::test]
async fn failed_upload_deletes_story() {
    let h = Harness::new();
    *h.storage.fail.lock().unwrap() = true;

    let err = h
        .generator
        .generate_page(new_story("Doomed"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert!(h.store.stories().is_empty());
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_generation_error() {
    let h = Harness::new();
    h.store.fail(StoreFailures {
        delete: true,
        ..Default::default()
    });
    h.images.fail_next(GatewayError::with_status(402, "no credits"));

    let err = h
        .generator
        .generate_page(new_story("Doomed"))
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::CreditLimit);
}

#[tokio::test]
async fn content_policy_rejection_is_400() {
    let h = Harness::new();
    h.images.fail_next(GatewayError::with_status(
        422,
        "Image was flagged by the provider's safety system",
    ));

    let err = h
        .generator
        .generate_page(new_story("Something questionable"))
        .await
        .unwrap_err();

    assert_matches!(err, GenerationError::ContentPolicy { .. });
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn persistence_failure_returns_generated_url() {
    let h = Harness::new();
    h.store.fail(StoreFailures {
        set_image: true,
        ..Default::default()
    });

    let err = h
        .generator
        .generate_page(new_story("Saved nowhere"))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        GenerationError::Persistence { image_url: Some(url), .. } if url.starts_with("https://cdn.test/")
    );
}

#[tokio::test]
async fn custom_prompt_is_flagged_on_page() {
    let h = Harness::new();
    let mut request = new_story("The story text");
    request.custom_system_prompt = Some("Paint it in oils.".into());

    let result = h.generator.generate_page(request).await.unwrap();

    assert_eq!(
        h.images.last_request().prompt,
        "Paint it in oils.\n\nSTORY:\nThe story text"
    );
    let page = h.store.page(result.page_id).unwrap();
    assert!(page.is_custom_prompt);
}

// ---------------------------------------------------------------------------
// Validation and ownership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_prompt_is_rejected_before_any_write() {
    let h = Harness::new();
    let err = h.generator.generate_page(new_story("  ")).await.unwrap_err();
    assert_eq!(err.error_type(), "validation_error");
    assert!(h.store.stories().is_empty());
    assert!(h.images.requests().is_empty());
}

#[tokio::test]
async fn page_id_without_story_is_rejected() {
    let h = Harness::new();
    let mut request = new_story("Redraw what?");
    request.page_id = Some(7);
    let err = h.generator.generate_page(request).await.unwrap_err();
    assert_matches!(err, GenerationError::Validation(_));
}

#[tokio::test]
async fn unknown_story_is_not_found() {
    let h = Harness::new();
    let err = h
        .generator
        .generate_page(existing("no-such-story", "Next"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn foreign_story_is_forbidden_and_untouched() {
    let h = Harness::new();
    let story = h.store.seed_story("calm-owl-1234", STRANGER);
    h.store.seed_page(story.id, 1, Some("https://cdn.test/p1.jpg"), &[]);

    let err = h
        .generator
        .generate_page(existing("calm-owl-1234", "Hijack"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 403);
    assert_eq!(h.store.pages(story.id).len(), 1);
    assert!(h.images.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Add page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_page_prepends_previous_image_and_dedupes() {
    let h = Harness::new();
    let story = h.store.seed_story("brave-fox-0001", OWNER);
    h.store.seed_page(story.id, 1, Some("P"), &["A", "B"]);

    let mut request = existing("brave-fox-0001", "Next scene");
    request.character_images = Some(urls(&["B", "C"]));
    let result = h.generator.generate_page(request).await.unwrap();

    assert_eq!(result.page_number, 2);
    let references = h.images.last_request().reference_images;
    assert_eq!(references, urls(&["P", "B", "C"]));
    assert!(!references.contains(&"A".to_string()));
}

#[tokio::test]
async fn add_page_number_is_max_plus_one() {
    let h = Harness::new();
    let story = h.store.seed_story("odd-bee-0002", OWNER);
    for n in [1, 2, 4] {
        h.store
            .seed_page(story.id, n, Some(&format!("https://cdn.test/{n}.jpg")), &[]);
    }

    let result = h
        .generator
        .generate_page(existing("odd-bee-0002", "Fifth"))
        .await
        .unwrap();

    assert_eq!(result.page_number, 5);
    let sent = h.images.last_request();
    assert_eq!(sent.reference_images, urls(&["https://cdn.test/4.jpg"]));
}

#[tokio::test]
async fn add_page_context_lists_every_prior_page() {
    let h = Harness::new();
    let story = h.store.seed_story("shy-ant-0003", OWNER);
    h.store.seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &[]);
    h.store.seed_page(story.id, 2, Some("https://cdn.test/2.jpg"), &[]);

    h.generator
        .generate_page(existing("shy-ant-0003", "Third"))
        .await
        .unwrap();

    let prompt = h.images.last_request().prompt;
    assert!(prompt.contains("Page 1: Prompt of page 1\nPage 2: Prompt of page 2"));
    assert!(prompt.contains("STORY OVERVIEW:\nTwo rivals share a secret."));
    assert!(prompt.contains("ART STYLE:\nJapanese manga style"));
}

#[tokio::test]
async fn failed_added_page_is_removed_and_story_kept() {
    let h = Harness::new();
    let story = h.store.seed_story("wild-cat-0004", OWNER);
    h.store.seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &[]);
    h.images.fail_next(GatewayError::with_status(503, "busy"));

    let err = h
        .generator
        .generate_page(existing("wild-cat-0004", "Second"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 503);
    assert_eq!(h.store.stories().len(), 1);
    let pages = h.store.pages(story.id);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_number, 1);
}

#[tokio::test]
async fn upload_key_names_story_and_page() {
    let h = Harness::new();
    let story = h.store.seed_story("old-yak-0005", OWNER);
    h.store.seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &[]);

    h.generator
        .generate_page(existing("old-yak-0005", "Second"))
        .await
        .unwrap();

    let (source, key) = h.storage.uploads().pop().unwrap();
    assert!(source.starts_with("https://provider.test/"));
    assert!(key.starts_with(&format!("{}/page-2-", story.id)));
    assert!(key.ends_with(".jpg"));
}

// ---------------------------------------------------------------------------
// Redraw
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redraw_uses_only_earlier_pages() {
    let h = Harness::new();
    let story = h.store.seed_story("red-elk-0006", OWNER);
    h.store.seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &[]);
    let page2 = h
        .store
        .seed_page(story.id, 2, Some("https://cdn.test/2.jpg"), &[]);
    h.store.seed_page(story.id, 3, Some("https://cdn.test/3.jpg"), &[]);

    let mut request = existing("red-elk-0006", "Page two, again");
    request.page_id = Some(page2.id);
    let result = h.generator.generate_page(request).await.unwrap();

    assert_eq!(result.page_id, page2.id);
    assert_eq!(result.page_number, 2);
    let sent = h.images.last_request();
    assert!(sent.prompt.contains("Page 1: Prompt of page 1"));
    assert!(!sent.prompt.contains("Page 3:"));
    assert_eq!(sent.reference_images, urls(&["https://cdn.test/1.jpg"]));

    let stored = h.store.page(page2.id).unwrap();
    assert_eq!(stored.prompt, "Page two, again");
    assert_eq!(stored.generated_image_url.as_deref(), Some(result.image_url.as_str()));
}

#[tokio::test]
async fn redraw_previous_image_skips_imageless_pages() {
    let h = Harness::new();
    let story = h.store.seed_story("tan-ram-0007", OWNER);
    h.store.seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &[]);
    h.store.seed_page(story.id, 2, None, &[]);
    let page3 = h
        .store
        .seed_page(story.id, 3, Some("https://cdn.test/3.jpg"), &[]);

    let mut request = existing("tan-ram-0007", "Again");
    request.page_id = Some(page3.id);
    h.generator.generate_page(request).await.unwrap();

    assert_eq!(
        h.images.last_request().reference_images,
        urls(&["https://cdn.test/1.jpg"])
    );
}

#[tokio::test]
async fn redraw_of_first_page_has_no_continuation() {
    let h = Harness::new();
    let story = h.store.seed_story("fat-cow-0008", OWNER);
    let page1 = h
        .store
        .seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &["H"]);
    h.store.seed_page(story.id, 2, Some("https://cdn.test/2.jpg"), &[]);

    let mut request = existing("fat-cow-0008", "Opening, redone");
    request.page_id = Some(page1.id);
    h.generator.generate_page(request).await.unwrap();

    let sent = h.images.last_request();
    assert!(!sent.prompt.contains("CONTINUATION CONTEXT"));
    // Stored characters are reused when the caller sends none.
    assert_eq!(sent.reference_images, urls(&["H"]));
}

#[tokio::test]
async fn failed_redraw_leaves_page_untouched() {
    let h = Harness::new();
    let story = h.store.seed_story("sly-fox-0009", OWNER);
    let page = h
        .store
        .seed_page(story.id, 1, Some("https://cdn.test/original.jpg"), &[]);
    h.images.fail_next(GatewayError::with_status(500, "boom"));

    let mut request = existing("sly-fox-0009", "Try again");
    request.page_id = Some(page.id);
    let err = h.generator.generate_page(request).await.unwrap_err();

    assert_eq!(err.error_type(), "api_error");
    let stored = h.store.page(page.id).unwrap();
    assert_eq!(stored.prompt, "Prompt of page 1");
    assert_eq!(
        stored.generated_image_url.as_deref(),
        Some("https://cdn.test/original.jpg")
    );
}

#[tokio::test]
async fn redraw_of_page_in_other_story_is_not_found() {
    let h = Harness::new();
    let mine = h.store.seed_story("my-story-0010", OWNER);
    let other = h.store.seed_story("other-0011", OWNER);
    h.store.seed_page(mine.id, 1, None, &[]);
    let foreign = h.store.seed_page(other.id, 1, None, &[]);

    let mut request = existing("my-story-0010", "Redraw");
    request.page_id = Some(foreign.id);
    let err = h.generator.generate_page(request).await.unwrap_err();

    assert_eq!(err, GenerationError::NotFound { entity: "Page" });
}

#[tokio::test]
async fn redraw_save_failure_returns_generated_url() {
    let h = Harness::new();
    let story = h.store.seed_story("dim-bat-0012", OWNER);
    let page = h.store.seed_page(story.id, 1, None, &[]);
    h.store.fail(StoreFailures {
        record_redraw: true,
        ..Default::default()
    });

    let mut request = existing("dim-bat-0012", "Redraw");
    request.page_id = Some(page.id);
    let err = h.generator.generate_page(request).await.unwrap_err();

    assert_eq!(err.error_type(), "persistence_error");
    assert_matches!(err, GenerationError::Persistence { image_url: Some(_), .. });
    assert!(h.store.page(page.id).is_some());
}

// ---------------------------------------------------------------------------
// Free tier
// ---------------------------------------------------------------------------

fn limited_harness() -> Harness {
    Harness::with(FakeText::default(), GenerationSettings::default())
}

#[tokio::test]
async fn free_tier_limit_blocks_without_api_key() {
    let h = limited_harness();
    let oldest = Utc::now() - Duration::days(2);
    h.store.seed_generations(OWNER, 1, oldest);

    let err = h
        .generator
        .generate_page(new_story("One too many"))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        GenerationError::RateLimited { limit: 1, reset_at } if reset_at == oldest + Duration::days(7)
    );
    assert!(h.store.stories().is_empty());
}

#[tokio::test]
async fn own_api_key_bypasses_free_tier() {
    let h = limited_harness();
    h.store.seed_generations(OWNER, 5, Utc::now());
    let mut request = new_story("My key, my rules");
    request.api_key = Some("sk-user".into());

    h.generator.generate_page(request).await.unwrap();

    assert_eq!(h.images.last_request().api_key.as_deref(), Some("sk-user"));
    assert!(h.store.stories()[0].uses_own_api_key);
}

#[tokio::test]
async fn under_limit_is_allowed() {
    let h = limited_harness();
    h.store
        .seed_generations(OWNER, 3, Utc::now() - Duration::days(8));
    assert!(h
        .generator
        .generate_page(new_story("First of the week"))
        .await
        .is_ok());
}

#[tokio::test]
async fn other_users_generations_do_not_count() {
    let h = limited_harness();
    h.store.seed_generations(STRANGER, 4, Utc::now());

    h.generator
        .generate_page(new_story("Mine alone"))
        .await
        .unwrap();

    assert_eq!(h.store.generation_count(OWNER), 1);
}

#[tokio::test]
async fn redraw_counts_toward_free_tier() {
    let settings = GenerationSettings {
        free_tier_pages_per_week: 2,
        ..GenerationSettings::default()
    };
    let h = Harness::with(FakeText::default(), settings);
    let story = h.store.seed_story("wet-cat-0020", OWNER);
    let page = h
        .store
        .seed_page(story.id, 1, Some("https://cdn.test/1.jpg"), &[]);

    for _ in 0..2 {
        let mut request = existing("wet-cat-0020", "Again");
        request.page_id = Some(page.id);
        h.generator.generate_page(request).await.unwrap();
    }
    assert_eq!(h.store.generation_count(OWNER), 2);

    let mut request = existing("wet-cat-0020", "One more");
    request.page_id = Some(page.id);
    let err = h.generator.generate_page(request).await.unwrap_err();
    assert_matches!(err, GenerationError::RateLimited { limit: 2, .. });
}

#[tokio::test]
async fn deleting_story_keeps_quota_used() {
    let h = limited_harness();
    let first = h
        .generator
        .generate_page(new_story("Spent"))
        .await
        .unwrap();

    h.store.delete_story(first.story_id).await.unwrap();
    assert!(h.store.stories().is_empty());

    let err = h
        .generator
        .generate_page(new_story("Try again"))
        .await
        .unwrap_err();
    assert_matches!(err, GenerationError::RateLimited { limit: 1, .. });
}
