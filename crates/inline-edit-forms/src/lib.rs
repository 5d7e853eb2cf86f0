//! # inline-edit-forms
//!
//! Forms framework for inline-edit-rs. Provides field definitions and
//! validation, the [`Form`](form::Form) trait with [`BaseForm`](form::BaseForm),
//! formsets, model-backed forms with a pluggable [`ModelStore`](store::ModelStore),
//! and [`InlineModelForm`](inline::InlineModelForm), which validates and saves
//! a parent form together with its declared inline formsets.

pub mod fields;
pub mod form;
pub mod formset;
pub mod inline;
pub mod model_form;
pub mod store;
pub mod validation;

pub use fields::{FormFieldDef, FormFieldType};
pub use form::{BaseForm, Form, NON_FIELD_ERRORS};
pub use formset::FormSet;
pub use inline::{
    formset_prefix, inline_formset_factory, InlineDeclarations, InlineFormSet,
    InlineFormSetFactory, InlineModelForm, InlineModelFormFactory, ModelInlineFormSet,
    ModelInlineFormSetFactory,
};
pub use model_form::{BaseModelForm, BaseModelFormFactory, ModelForm, ModelFormFactory};
pub use store::{MemoryStore, ModelStore};
