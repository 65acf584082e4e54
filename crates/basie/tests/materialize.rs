mod common;

use basie::{BasieConfig, Entity, FromInstance, OrmError, OrmResult, Row, Value};
use common::MemoryDb;

#[derive(Debug, Clone, PartialEq, Entity)]
#[orm(table = "users")]
struct User {
    #[orm(id)]
    id: Option<i64>,
    name: String,
    age: i64,
    #[orm(has_many(Post, foreign_key = "user_id"))]
    posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[orm(table = "posts")]
struct Post {
    #[orm(id)]
    id: Option<i64>,
    title: String,
    user_id: i64,
}

/// Self-referencing tree keyed by `parent_id`.
#[derive(Debug, Clone, PartialEq, Entity)]
#[orm(table = "nodes")]
struct Node {
    #[orm(id)]
    id: Option<i64>,
    label: String,
    parent_id: Option<i64>,
    #[orm(has_many(Node, foreign_key = "parent_id"))]
    children: Vec<Node>,
}

fn blog() -> MemoryDb {
    let db = MemoryDb::new();
    db.seed(
        "users",
        vec![vec![
            ("id", Value::Int(1)),
            ("name", "Ann".into()),
            ("age", Value::Int(30)),
        ]],
    );
    db.seed(
        "posts",
        vec![
            vec![("id", Value::Int(10)), ("title", "first".into()), ("user_id", Value::Int(1))],
            vec![("id", Value::Int(11)), ("title", "second".into()), ("user_id", Value::Int(1))],
            vec![("id", Value::Int(12)), ("title", "other".into()), ("user_id", Value::Int(2))],
        ],
    );
    db
}

fn node(id: i64, label: &str, parent: Option<i64>) -> Vec<(&'static str, Value)> {
    vec![
        ("id", Value::Int(id)),
        ("label", label.into()),
        ("parent_id", parent.map(Value::Int).unwrap_or(Value::Null)),
    ]
}

#[tokio::test]
async fn user_with_posts_materializes_exactly_its_children() -> OrmResult<()> {
    let db = blog();
    let ann = User::find(&db, 1).await?.expect("user 1 exists");

    assert_eq!(ann.id()?, Some(1));
    assert_eq!(ann.get_as::<String>("name")?, "Ann");
    assert_eq!(ann.get_as::<i64>("age")?, 30);

    let posts = ann.children("posts")?;
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| !p.is_poisoned() && p.id().is_ok()));

    let typed = User::from_instance(&ann)?;
    assert_eq!(
        typed.posts.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(),
        ["first", "second"]
    );
    assert!(typed.posts.iter().all(|p| p.user_id == 1));

    let executed = db.executed();
    assert_eq!(
        executed[1],
        (
            "SELECT id, title, user_id FROM posts WHERE user_id = $1 ORDER BY id".to_string(),
            vec![Value::Int(1)]
        )
    );
    Ok(())
}

#[tokio::test]
async fn materialize_accepts_a_raw_row() -> OrmResult<()> {
    let db = blog();
    let row = Row::new()
        .with("id", 1)
        .with("name", "Ann")
        .with("age", "30");
    let ann = User::materialize(&db, row).await?;

    // text "30" is coerced by the declared Int type
    assert_eq!(ann.get("age")?, &Value::Int(30));
    assert_eq!(ann.children("posts")?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn field_reads_return_coerced_row_values() -> OrmResult<()> {
    let db = MemoryDb::new();
    db.seed(
        "users",
        vec![vec![
            ("id", Value::Int(7)),
            ("name", "Bo".into()),
            ("age", Value::Float(41.0)),
        ]],
    );
    db.create("posts");

    let bo = User::first(&db).await?.unwrap();
    assert_eq!(bo.get("name")?, &Value::from("Bo"));
    assert_eq!(bo.get("age")?, &Value::Int(41));
    assert!(bo.children("posts")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn undecodable_column_names_the_column() {
    let db = MemoryDb::new();
    db.seed(
        "users",
        vec![vec![
            ("id", Value::Int(1)),
            ("name", "Ann".into()),
            ("age", "old".into()),
        ]],
    );
    db.create("posts");

    match User::find(&db, 1).await {
        Err(OrmError::Decode { column, .. }) => assert_eq!(column, "age"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_column_is_a_decode_error() {
    let db = MemoryDb::new();
    db.seed("users", vec![vec![("id", Value::Int(1)), ("name", "Ann".into())]]);
    db.create("posts");

    let err = User::find(&db, 1).await.unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "age"));
}

#[tokio::test]
async fn child_query_failure_propagates() {
    let db = blog();
    let parent = Row::new().with("id", 1).with("name", "Ann").with("age", 30);

    db.fail_next("posts unavailable");
    let err = User::materialize(&db, parent).await.unwrap_err();
    assert!(err.is_execution());
    assert_eq!(db.statements().len(), 1);
}

#[tokio::test]
async fn nested_children_load_recursively() -> OrmResult<()> {
    let db = MemoryDb::new();
    db.seed(
        "nodes",
        vec![
            node(1, "root", None),
            node(2, "a", Some(1)),
            node(3, "b", Some(1)),
            node(4, "a.1", Some(2)),
        ],
    );

    let root = Node::find(&db, 1).await?.unwrap();
    let tree = Node::from_instance(&root)?;
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].label, "a");
    assert_eq!(tree.children[0].children[0].label, "a.1");
    assert!(tree.children[1].children.is_empty());
    Ok(())
}

#[tokio::test]
async fn repeated_entity_and_id_is_a_cycle() {
    let db = MemoryDb::new();
    db.seed("nodes", vec![node(1, "loop", Some(1))]);

    let err = Node::find(&db, 1).await.unwrap_err();
    assert!(err.is_configuration(), "{err}");
    assert!(err.to_string().contains("cycle"));
}

#[tokio::test]
async fn two_node_cycle_is_detected() {
    let db = MemoryDb::new();
    db.seed("nodes", vec![node(1, "a", Some(2)), node(2, "b", Some(1))]);

    let err = Node::find(&db, 1).await.unwrap_err();
    assert!(err.to_string().contains("Node#1 -> Node#2 -> Node#1"), "{err}");
}

#[tokio::test]
async fn depth_bound_comes_from_config() -> OrmResult<()> {
    let chain = || {
        vec![
            node(1, "1", None),
            node(2, "2", Some(1)),
            node(3, "3", Some(2)),
            node(4, "4", Some(3)),
        ]
    };

    let shallow = MemoryDb::new().with_config(BasieConfig::new().max_relation_depth(2));
    shallow.seed("nodes", chain());
    let err = Node::find(&shallow, 1).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("depth"));

    let deep = MemoryDb::new().with_config(BasieConfig::new().max_relation_depth(3));
    deep.seed("nodes", chain());
    assert!(Node::find(&deep, 1).await?.is_some());
    Ok(())
}
