//! End-to-end query execution against the in-memory datastore.

mod common;

use std::collections::HashMap;

use serde_json as json;

use common::{build_registry, document, field, leaf, seeded_store};
use engine::{Classification, Engine, EngineConfig};
use registry::{NodeTypeDecl, Registry, RootResolver};
use selection::{OperationType, SelectionNode};

fn chats_with_members() -> selection::Document {
    let members = field("members", Vec::new(), vec![leaf("id"), leaf("name")]);
    let chats = field(
        "chats",
        Vec::new(),
        vec![leaf("id"), SelectionNode::Field(members)],
    );
    document(OperationType::Query, vec![SelectionNode::Field(chats)])
}

#[test]
fn nested_request_runs_in_two_fetches() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let response = engine.execute(&chats_with_members(), &HashMap::new(), None);
    assert_eq!(response.classification, Classification::Full);

    let data = response.data.unwrap();
    let chats = data["chats"].as_array().unwrap();
    assert_eq!(chats.len(), 2);
    let member_names: Vec<&str> = chats[0]["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(member_names, vec!["alice", "bob"]);
    assert_eq!(chats[1]["members"].as_array().unwrap().len(), 1);

    // One root query plus one eager load. No per-chat member fetch.
    assert_eq!(store.query_count(), 2);
}

#[test]
fn reverse_declared_messages_resolve_eagerly() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let messages = field("messages", Vec::new(), vec![leaf("text")]);
    let chats = field(
        "chats",
        Vec::new(),
        vec![leaf("id"), SelectionNode::Field(messages)],
    );
    let doc = document(OperationType::Query, vec![SelectionNode::Field(chats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    let data = response.data.unwrap();
    let chats = data["chats"].as_array().unwrap();
    assert_eq!(chats[0]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(chats[1]["messages"].as_array().unwrap().len(), 1);
    assert_eq!(store.query_count(), 2);
}

#[test]
fn lookup_argument_narrows_the_root() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let chats = field("chats", vec![("id", json::json!(2))], vec![leaf("name")]);
    let doc = document(OperationType::Query, vec![SelectionNode::Field(chats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    let data = response.data.unwrap();
    assert_eq!(data["chats"], json::json!([{"name": "random"}]));
}

#[test]
fn expression_filter_orders_and_excludes() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let chats = field(
        "chats",
        vec![("qs", json::json!({"order_by": "-name"}))],
        vec![leaf("name")],
    );
    let doc = document(OperationType::Query, vec![SelectionNode::Field(chats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    let data = response.data.unwrap();
    assert_eq!(
        data["chats"],
        json::json!([{"name": "random"}, {"name": "general"}])
    );
}

#[test]
fn unknown_root_field_yields_a_partial_response() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let chats = field("chats", Vec::new(), vec![leaf("id")]);
    let nope = field("nope", Vec::new(), vec![leaf("id")]);
    let doc = document(
        OperationType::Query,
        vec![SelectionNode::Field(chats), SelectionNode::Field(nope)],
    );

    let response = engine.execute(&doc, &HashMap::new(), None);
    assert_eq!(response.classification, Classification::Partial);

    let data = response.data.unwrap();
    assert_eq!(data["chats"].as_array().unwrap().len(), 2);
    assert!(data["nope"].is_null());

    let errors = response.errors.unwrap();
    assert_eq!(errors.head.field.as_deref(), Some("nope"));
}

#[test]
fn aliased_roots_key_the_response_by_alias() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let mut chats = field("chats", Vec::new(), vec![leaf("id")]);
    chats.alias = Some("mine".into());
    let doc = document(OperationType::Query, vec![SelectionNode::Field(chats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    let data = response.data.unwrap();
    assert!(data.get("mine").is_some());
    assert!(data.get("chats").is_none());
}

#[test]
fn scalar_root_selection_is_an_error() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let doc = document(OperationType::Query, vec![leaf("chats")]);
    let response = engine.execute(&doc, &HashMap::new(), None);
    assert_eq!(response.classification, Classification::None);
    assert!(response
        .errors
        .unwrap()
        .head
        .message
        .contains("object selection"));
}

#[test]
fn custom_nodes_resolve_through_their_own_resolver() {
    let mut registry = Registry::new();
    common_register_chat(&mut registry);
    registry
        .register_type(
            NodeTypeDecl {
                root_resolver: Some(RootResolver::new(|_args| Ok(json::json!({"total": 2})))),
                ..NodeTypeDecl::default()
            },
            Some("ChatStats".into()),
        )
        .unwrap();
    registry.get_schema().unwrap();

    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    let stats = field("chat_stats", Vec::new(), vec![leaf("total")]);
    let doc = document(OperationType::Query, vec![SelectionNode::Field(stats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    assert_eq!(response.classification, Classification::Full);
    assert_eq!(response.data.unwrap()["chat_stats"], json::json!({"total": 2}));
}

fn common_register_chat(registry: &mut Registry) {
    use registry::NodeMetadata;
    let model = registry::ModelInfo {
        name: "Chat".into(),
        collection: "chats".into(),
        columns: indexmap::IndexMap::from([(
            "id".into(),
            registry::ColumnDef::optional(registry::ColumnKind::Id),
        )]),
        relations: indexmap::IndexMap::new(),
    };
    registry
        .register_type(
            NodeTypeDecl {
                model: Some(model),
                metadata: NodeMetadata::with_fields(["id"]),
                ..NodeTypeDecl::default()
            },
            Some("Chat".into()),
        )
        .unwrap();
}

#[test]
fn permission_denial_surfaces_as_a_field_error() {
    struct DenyChats;
    impl engine::PermissionCheck for DenyChats {
        fn allows(
            &self,
            _meta: Option<&engine::RequestMeta>,
            type_name: &str,
            _field: &str,
        ) -> bool {
            type_name != "Chat"
        }
    }

    let registry = build_registry();
    let store = seeded_store();
    let deny = DenyChats;
    let engine = Engine::new(&registry, &store, EngineConfig::default()).with_permissions(&deny);

    let chats = field("chats", Vec::new(), vec![leaf("id")]);
    let doc = document(OperationType::Query, vec![SelectionNode::Field(chats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    assert_eq!(response.classification, Classification::None);
    assert!(response
        .errors
        .unwrap()
        .head
        .message
        .contains("permission denied"));
}

#[test]
fn meta_argument_feeds_request_context_not_filters() {
    let registry = build_registry();
    let store = seeded_store();
    let engine = Engine::new(&registry, &store, EngineConfig::default());

    // A meta argument must not narrow the result set.
    let chats = field(
        "chats",
        vec![("meta", json::json!({"user": "alice"}))],
        vec![leaf("id")],
    );
    let doc = document(OperationType::Query, vec![SelectionNode::Field(chats)]);

    let response = engine.execute(&doc, &HashMap::new(), None);
    let data = response.data.unwrap();
    assert_eq!(data["chats"].as_array().unwrap().len(), 2);
}
