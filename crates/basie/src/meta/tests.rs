use super::*;
use crate::value::FieldType;
use std::any::TypeId;

fn post_ref() -> ForeignRef {
    ForeignRef::named("Post")
}

#[test]
fn unknown_entity_has_empty_record() {
    let registry = Registry::new();
    let meta = registry.metadata("Ghost");
    assert!(meta.fields().is_empty());
    assert!(meta.children().is_empty());
    assert!(!meta.is_declared());
    assert_eq!(meta.table(), "ghost");
    assert_eq!(meta.primary_key(), "id");
}

#[test]
fn register_field_appends_in_order() {
    let registry = Registry::new();
    registry
        .register_field("User", "name", "name", Some(FieldType::Text))
        .unwrap();
    registry
        .register_field("User", "age_years", "age", Some(FieldType::Int))
        .unwrap();

    let meta = registry.metadata("User");
    let columns: Vec<_> = meta.fields().iter().map(|f| f.column.as_str()).collect();
    assert_eq!(columns, ["name", "age_years"]);
    assert_eq!(meta.column_for("age").unwrap(), "age_years");
    assert_eq!(meta.column_for("id").unwrap(), "id");
}

#[test]
fn identical_redeclaration_is_noop() {
    let registry = Registry::new();
    for _ in 0..2 {
        registry
            .register_field("User", "name", "name", Some(FieldType::Text))
            .unwrap();
        registry
            .register_child("User", "posts", post_ref(), Some("user_id"))
            .unwrap();
    }
    let meta = registry.metadata("User");
    assert_eq!(meta.fields().len(), 1);
    assert_eq!(meta.children().len(), 1);
}

#[test]
fn duplicate_column_is_rejected() {
    let registry = Registry::new();
    registry
        .register_field("User", "name", "name", None)
        .unwrap();
    let err = registry
        .register_field("User", "name", "display_name", None)
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(registry.metadata("User").fields().len(), 1);
}

#[test]
fn field_name_is_unique_across_fields_and_children() {
    let registry = Registry::new();
    registry
        .register_field("User", "posts_count", "posts", None)
        .unwrap();
    let err = registry
        .register_child("User", "posts", post_ref(), None)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn primary_key_column_cannot_be_a_field() {
    let registry = Registry::new();
    let err = registry.register_field("User", "id", "id", None).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn invalid_identifiers_are_rejected() {
    let registry = Registry::new();
    assert!(
        registry
            .register_field("User", "name; --", "name", None)
            .is_err()
    );
    assert!(registry.declare_entity("User", Some("bad table"), None).is_err());
    assert!(
        registry
            .register_child("User", "posts", post_ref(), Some("user id"))
            .is_err()
    );
}

#[test]
fn commit_is_atomic() {
    let registry = Registry::new();
    let mut decl = Declaration::new("Post");
    decl.table("posts")
        .field("title", "title", Some(FieldType::Text))
        .field("title", "headline", Some(FieldType::Text));

    assert!(registry.commit(decl).unwrap_err().is_configuration());
    assert!(registry.get("Post").is_none());
}

#[test]
fn ensure_declares_once() {
    fn declare(model: &mut Declaration) {
        model
            .table("widgets")
            .primary_key("widget_id")
            .field("label", "label", Some(FieldType::Text));
    }

    struct Widget;

    let registry = Registry::new();
    let first = registry.ensure("Widget", TypeId::of::<Widget>(), declare).unwrap();
    let second = registry.ensure("Widget", TypeId::of::<Widget>(), declare).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.table(), "widgets");
    assert_eq!(first.primary_key(), "widget_id");
}

#[test]
fn same_name_from_two_types_is_rejected() {
    mod a {
        pub struct User;
        pub fn declare(decl: &mut super::Declaration) {
            decl.table("a_users");
        }
    }
    mod b {
        pub struct User;
        pub fn declare(decl: &mut super::Declaration) {
            decl.table("b_users");
        }
    }

    let registry = Registry::new();
    let first = registry
        .ensure("User", TypeId::of::<a::User>(), a::declare)
        .unwrap();
    assert_eq!(first.table(), "a_users");

    let err = registry
        .ensure("User", TypeId::of::<b::User>(), b::declare)
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("'User'"), "{err}");
    assert_eq!(registry.metadata("User").table(), "a_users");

    // the original owner still resolves
    let again = registry
        .ensure("User", TypeId::of::<a::User>(), a::declare)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn default_foreign_key_uses_snake_case_name() {
    let parent = EntityMeta::empty("BlogPost");
    let child = ChildMeta::new("comments", ForeignRef::named("Comment"), None);
    assert_eq!(child.foreign_key_for(&parent), "blog_post_id");

    let explicit = ChildMeta::new("comments", ForeignRef::named("Comment"), Some("post_ref"));
    assert_eq!(explicit.foreign_key_for(&parent), "post_ref");
}

#[test]
fn unknown_criteria_field_is_configuration_error() {
    let meta = EntityMeta::empty("User");
    assert!(meta.column_for("nickname").unwrap_err().is_configuration());
}

#[test]
fn named_ref_to_unknown_entity_fails_on_resolve() {
    let err = ForeignRef::named("NeverDeclaredAnywhere").resolve().unwrap_err();
    assert!(err.is_configuration());
}
