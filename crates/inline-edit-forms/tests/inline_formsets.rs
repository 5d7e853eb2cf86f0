//! Integration tests for model forms coordinating inline formsets.

use inline_edit_core::{InlineEditError, ModelInstance, ModelMeta};
use inline_edit_forms::{
    inline_formset_factory, BaseModelFormFactory, FormFieldDef, FormFieldType, Form,
    InlineDeclarations, InlineModelFormFactory, MemoryStore, ModelForm, ModelFormFactory,
    ModelStore,
};
use inline_edit_http::QueryDict;
use serde_json::json;

fn program_meta() -> ModelMeta {
    ModelMeta::new("schedule", "program")
}

fn image_meta() -> ModelMeta {
    ModelMeta::new("schedule", "image")
}

fn slot_meta() -> ModelMeta {
    ModelMeta::new("schedule", "slot")
}

fn program_form_factory() -> InlineModelFormFactory {
    let parent = BaseModelFormFactory::new(
        program_meta(),
        vec![FormFieldDef::new("name", FormFieldType::text())],
    )
    .with_prefix("prog");
    let inlines = InlineDeclarations::new()
        .inline(
            "images",
            inline_formset_factory(
                image_meta(),
                "program",
                vec![FormFieldDef::new("caption", FormFieldType::text())],
            )
            .extra(2),
        )
        .inline(
            "slots",
            inline_formset_factory(
                slot_meta(),
                "program",
                vec![FormFieldDef::new(
                    "minutes",
                    FormFieldType::Integer {
                        min_value: Some(1),
                        max_value: Some(1440),
                    },
                )],
            )
            .extra(1),
        );
    InlineModelFormFactory::new(parent, inlines)
}

async fn seed_program(store: &MemoryStore) -> ModelInstance {
    let program = store
        .save(
            &program_meta(),
            ModelInstance::new().with_value("name", json!("Morning")),
        )
        .await
        .unwrap();
    for caption in ["sunrise", "coffee"] {
        store
            .save(
                &image_meta(),
                ModelInstance::new()
                    .with_value("program", json!(program.pk))
                    .with_value("caption", json!(caption)),
            )
            .await
            .unwrap();
    }
    program
}

// ============================================================
// Construction
// ============================================================

#[tokio::test]
async fn test_unbound_form_builds_one_formset_per_declaration() {
    let store = MemoryStore::new();
    let program = seed_program(&store).await;
    let form = program_form_factory()
        .create(None, Some(program), &store)
        .await
        .unwrap();

    assert!(!form.is_bound());
    let ctx = form.as_context();
    assert_eq!(ctx["inlines"]["images"]["prefix"], json!("prog_IMAGES"));
    assert_eq!(ctx["inlines"]["slots"]["prefix"], json!("prog_SLOTS"));
    // two existing images plus two extra forms
    assert_eq!(ctx["inlines"]["images"]["total_form_count"], json!(4));
    assert_eq!(ctx["inlines"]["images"]["initial_form_count"], json!(2));
    assert_eq!(ctx["inlines"]["slots"]["total_form_count"], json!(1));
}

// ============================================================
// Saving
// ============================================================

#[tokio::test]
async fn test_create_parent_and_children() {
    let store = MemoryStore::new();
    let data = QueryDict::parse(
        "prog-name=Evening\
         &prog_IMAGES-TOTAL_FORMS=2&prog_IMAGES-0-caption=dusk&prog_IMAGES-1-caption=\
         &prog_SLOTS-TOTAL_FORMS=1&prog_SLOTS-0-minutes=30",
    );
    let mut form = program_form_factory()
        .create(Some(&data), None, &store)
        .await
        .unwrap();
    assert!(form.is_valid().await, "errors: {:?}", form.errors());

    let program = form.save(&store).await.unwrap();
    let pk = program.pk.unwrap();

    let images = store.filter(&image_meta(), "program", &json!(pk)).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].get("caption"), Some(&json!("dusk")));

    let slots = store.filter(&slot_meta(), "program", &json!(pk)).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].get("minutes"), Some(&json!(30)));
}

#[tokio::test]
async fn test_edit_updates_deletes_and_adds_children() {
    let store = MemoryStore::new();
    let program = seed_program(&store).await;
    let pk = program.pk.unwrap();
    let data = QueryDict::parse(
        "prog-name=Morning\
         &prog_IMAGES-TOTAL_FORMS=3\
         &prog_IMAGES-0-caption=sunrise%20over%20hills\
         &prog_IMAGES-1-caption=coffee&prog_IMAGES-1-DELETE=on\
         &prog_IMAGES-2-caption=commute\
         &prog_SLOTS-TOTAL_FORMS=1",
    );
    let mut form = program_form_factory()
        .create(Some(&data), Some(program), &store)
        .await
        .unwrap();
    assert!(form.has_changed());
    form.save(&store).await.unwrap();

    let captions: Vec<_> = store
        .filter(&image_meta(), "program", &json!(pk))
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get("caption").cloned())
        .collect();
    assert_eq!(
        captions,
        vec![Some(json!("sunrise over hills")), Some(json!("commute"))]
    );
    assert_eq!(store.count(&slot_meta()).await, 0);
    assert_eq!(
        store.get(&program_meta(), pk).await.unwrap().get("name"),
        Some(&json!("Morning"))
    );
}

// ============================================================
// Change detection and errors
// ============================================================

#[tokio::test]
async fn test_child_change_marks_form_changed() {
    let store = MemoryStore::new();
    let program = seed_program(&store).await;

    let untouched = QueryDict::parse(
        "prog-name=Morning\
         &prog_IMAGES-TOTAL_FORMS=4&prog_IMAGES-0-caption=sunrise&prog_IMAGES-1-caption=coffee\
         &prog_SLOTS-TOTAL_FORMS=1",
    );
    let form = program_form_factory()
        .create(Some(&untouched), Some(program.clone()), &store)
        .await
        .unwrap();
    assert!(!form.has_changed());

    let edited = QueryDict::parse(
        "prog-name=Morning\
         &prog_IMAGES-TOTAL_FORMS=4&prog_IMAGES-0-caption=sunrise&prog_IMAGES-1-caption=tea\
         &prog_SLOTS-TOTAL_FORMS=1",
    );
    let form = program_form_factory()
        .create(Some(&edited), Some(program), &store)
        .await
        .unwrap();
    assert!(form.has_changed());
    assert!(form.changed_data().is_empty());
}

#[tokio::test]
async fn test_child_errors_are_merged_into_parent() {
    let store = MemoryStore::new();
    let data = QueryDict::parse(
        "prog-name=Late\
         &prog_IMAGES-TOTAL_FORMS=2\
         &prog_SLOTS-TOTAL_FORMS=1&prog_SLOTS-0-minutes=0",
    );
    let mut form = program_form_factory()
        .create(Some(&data), None, &store)
        .await
        .unwrap();
    assert!(!form.is_valid().await);
    assert_eq!(
        form.errors().get("_prog_SLOTS_0"),
        Some(&vec![
            "minutes: Ensure this value is greater than or equal to 1.".to_string()
        ])
    );
    assert!(!form.errors().contains_key("_prog_IMAGES_0"));

    let err = form.save(&store).await.unwrap_err();
    assert!(matches!(err, InlineEditError::ValidationError(_)));
    assert_eq!(store.count(&program_meta()).await, 0);
}

#[tokio::test]
async fn test_missing_management_form_is_a_formset_error() {
    let store = MemoryStore::new();
    let data = QueryDict::parse("prog-name=Late&prog_SLOTS-TOTAL_FORMS=1");
    let mut form = program_form_factory()
        .create(Some(&data), None, &store)
        .await
        .unwrap();
    assert!(!form.is_valid().await);
    let errors = form.errors().get("_prog_IMAGES").cloned().unwrap_or_default();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ManagementForm"));
}

#[tokio::test]
async fn test_parent_errors_are_kept() {
    let store = MemoryStore::new();
    let data = QueryDict::parse("prog_IMAGES-TOTAL_FORMS=0&prog_SLOTS-TOTAL_FORMS=0");
    let mut form = program_form_factory()
        .create(Some(&data), None, &store)
        .await
        .unwrap();
    assert!(!form.is_valid().await);
    assert_eq!(
        form.errors().get("name"),
        Some(&vec!["This field is required.".to_string()])
    );
    assert_eq!(form.model_meta(), &program_meta());
}
