//! End-to-end shaping scenarios: a hand-built result tree joined with a
//! hand-built selection set, checked byte for byte.

use dgraph_response::encode_graphql;
use dgraph_response::graphql::Response;
use dgraph_response::json_ext::Object;
use dgraph_response::json_ext::Path;
use dgraph_response::schema::Condition;
use dgraph_response::schema::Field;
use dgraph_response::schema::FieldType;
use dgraph_response::schema::IncludeSkip;
use dgraph_response::tree::TYPE_PREDICATE;
use dgraph_response::tree::UID_PREDICATE;
use dgraph_response::ResultTree;
use serde_json_bytes::json;

fn scalar(name: &str, dgraph_alias: &str, ty: FieldType) -> Field {
    Field::builder()
        .name(name)
        .dgraph_alias(dgraph_alias)
        .field_type(ty)
        .build()
}

fn typename(possible_types: &[&str]) -> Field {
    Field::builder()
        .name("__typename")
        .field_type(FieldType::named("String").non_null())
        .possible_types(possible_types.iter().map(|t| t.to_string()).collect::<Vec<_>>())
        .build()
}

fn shape(tree: &ResultTree, selections: &[Field]) -> Response {
    encode_graphql(tree, tree.root(), selections, &Object::default())
}

fn data(response: &Response) -> String {
    String::from_utf8(response.data.clone().expect("response data was null").to_vec()).unwrap()
}

#[test]
fn simple_object() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();
    tree.add_scalar(author, "Author.age", b"30").unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .selection(scalar("age", "Author.age", FieldType::named("Int")))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAuthor":{"name":"Alice","age":30}}"#
    );
    assert!(response.errors.is_empty());
}

#[test]
fn aliases_rename_keys_without_touching_tree_attributes() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(
            Field::builder()
                .name("name")
                .alias("fullName")
                .dgraph_alias("Author.name")
                .field_type(FieldType::named("String"))
                .build(),
        )
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryAuthor":{"fullName":"Alice"}}"#);
    assert!(response.errors.is_empty());
}

#[test]
fn missing_non_null_scalar_nulls_the_nearest_nullable_ancestor() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(scalar(
            "name",
            "Author.name",
            FieldType::named("String").non_null(),
        ))
        .selection(scalar("age", "Author.age", FieldType::named("Int").non_null()))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryAuthor":null}"#);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Non-nullable field 'age' (type Int!) was not present in result from Dgraph."
    );
    assert_eq!(response.errors[0].path, Some(Path::from("queryAuthor/age")));
}

fn friends_tree() -> ResultTree {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    let bob = tree.add_object(author, "Author.friends").unwrap();
    tree.mark_list(bob);
    tree.add_scalar(bob, "Person.name", br#""Bob""#).unwrap();
    // the second friend came back without a name, only its uid
    let anon = tree.add_object(author, "Author.friends").unwrap();
    tree.mark_list(anon);
    tree.add_scalar(anon, UID_PREDICATE, br#""0x2""#).unwrap();
    tree
}

fn friends_query(friends_type: FieldType) -> Field {
    Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(
            Field::builder()
                .name("friends")
                .dgraph_alias("Author.friends")
                .field_type(friends_type)
                .selection(scalar(
                    "name",
                    "Person.name",
                    FieldType::named("String").non_null(),
                ))
                .build(),
        )
        .build()
}

#[test]
fn nullable_list_item_absorbs_a_missing_non_null_field() {
    let tree = friends_tree();
    // [Person]: the failed item alone becomes null
    let query = friends_query(FieldType::named("Person").list());

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAuthor":{"friends":[{"name":"Bob"},null]}}"#
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Non-nullable field 'name' (type String!) was not present in result from Dgraph."
    );
    assert_eq!(
        response.errors[0].path,
        Some(Path::from("queryAuthor/friends/1/name"))
    );
}

#[test]
fn non_null_list_items_null_the_whole_list() {
    let tree = friends_tree();
    // [Person!]: the whole list collapses, the original error stays alone
    let query = friends_query(FieldType::named("Person").non_null().list());

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryAuthor":{"friends":null}}"#);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].path,
        Some(Path::from("queryAuthor/friends/1/name"))
    );
}

#[test]
fn fully_non_null_list_keeps_propagating() {
    let tree = friends_tree();
    // [Person!]!: nothing below the query field can absorb the failure
    let query = friends_query(
        FieldType::named("Person").non_null().list().non_null(),
    );

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryAuthor":null}"#);
    assert_eq!(response.errors.len(), 1);
}

#[test]
fn interface_fragment_fields_are_filtered_by_harvested_types() {
    let mut tree = ResultTree::new();
    let animal = tree.add_object(tree.root(), "queryAnimal").unwrap();
    tree.mark_list(animal);
    tree.add_scalar(animal, TYPE_PREDICATE, br#""Dog""#).unwrap();
    tree.add_scalar(animal, "Animal.name", br#""Rex""#).unwrap();

    let query = Field::builder()
        .name("queryAnimal")
        .field_type(FieldType::named("Animal"))
        .selection(scalar("name", "Animal.name", FieldType::named("String")))
        .selection(
            Field::builder()
                .name("meowVolume")
                .dgraph_alias("Cat.meowVolume")
                .field_type(FieldType::named("Int").non_null())
                .type_condition("Cat")
                .build(),
        )
        .build();

    let response = shape(&tree, &[query]);
    // no key, no null, no error for the Cat-only field
    assert_eq!(data(&response), r#"{"queryAnimal":{"name":"Rex"}}"#);
    assert!(response.errors.is_empty());
}

#[test]
fn typename_resolves_from_the_type_predicate_and_consumes_no_data() {
    let mut tree = ResultTree::new();
    let animal = tree.add_object(tree.root(), "queryAnimal").unwrap();
    tree.mark_list(animal);
    tree.add_scalar(animal, TYPE_PREDICATE, br#""Dog""#).unwrap();
    let toy1 = tree.add_object(animal, "Animal.toys").unwrap();
    tree.mark_list(toy1);
    tree.add_scalar(toy1, "Toy.name", br#""ball""#).unwrap();
    let toy2 = tree.add_object(animal, "Animal.toys").unwrap();
    tree.mark_list(toy2);
    tree.add_scalar(toy2, "Toy.name", br#""bone""#).unwrap();

    // __typename sits right before a multi-item list selection
    let query = Field::builder()
        .name("queryAnimal")
        .field_type(FieldType::named("Animal"))
        .selection(typename(&["Dog", "Cat"]))
        .selection(
            Field::builder()
                .name("toys")
                .dgraph_alias("Animal.toys")
                .field_type(FieldType::named("Toy").list())
                .selection(scalar("name", "Toy.name", FieldType::named("String")))
                .build(),
        )
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAnimal":{"__typename":"Dog","toys":[{"name":"ball"},{"name":"bone"}]}}"#
    );
    assert!(response.errors.is_empty());
}

#[test]
fn trailing_typename_is_written_after_the_data_runs_out() {
    let mut tree = ResultTree::new();
    let animal = tree.add_object(tree.root(), "queryAnimal").unwrap();
    tree.mark_list(animal);
    tree.add_scalar(animal, TYPE_PREDICATE, br#""Dog""#).unwrap();
    tree.add_scalar(animal, "Animal.name", br#""Rex""#).unwrap();

    let query = Field::builder()
        .name("queryAnimal")
        .field_type(FieldType::named("Animal"))
        .selection(scalar("name", "Animal.name", FieldType::named("String")))
        .selection(typename(&["Dog", "Cat"]))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAnimal":{"name":"Rex","__typename":"Dog"}}"#
    );
}

#[test]
fn synthetic_uid_predicate_never_reaches_the_output() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();
    tree.add_scalar(author, UID_PREDICATE, br#""0x1""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryAuthor":{"name":"Alice"}}"#);
    assert!(!data(&response).contains(UID_PREDICATE));
    assert!(response.errors.is_empty());
}

#[test]
fn skip_directive_drops_the_field_and_its_data() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();
    tree.add_scalar(author, "Author.email", br#""a@example.com""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .selection(
            Field::builder()
                .name("email")
                .dgraph_alias("Author.email")
                .field_type(FieldType::named("String"))
                .include_skip(IncludeSkip::new(
                    Condition::Yes,
                    Condition::Variable("hideEmail".to_string()),
                ))
                .build(),
        )
        .build();

    let variables = json!({ "hideEmail": true }).as_object().cloned().unwrap();
    let response = encode_graphql(&tree, tree.root(), &[query], &variables);
    assert_eq!(data(&response), r#"{"queryAuthor":{"name":"Alice"}}"#);
    assert!(response.errors.is_empty());
}

#[test]
fn empty_list_results_render_as_empty_lists() {
    let mut tree = ResultTree::new();
    // a list query that matched nothing resolves to a bare stub node
    let stub = tree.add_empty(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(stub);

    let authors = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author").non_null().list().non_null())
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .build();
    let posts = Field::builder()
        .name("queryPost")
        .field_type(FieldType::named("Post").list())
        .selection(scalar("title", "Post.title", FieldType::named("String")))
        .build();

    let response = shape(&tree, &[authors, posts]);
    // [] both for the stubbed query and for the one with no node at all
    assert_eq!(data(&response), r#"{"queryAuthor":[],"queryPost":[]}"#);
    assert!(response.errors.is_empty());
}

#[test]
fn single_item_for_a_list_selection_is_reported() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    // not flagged as a list item
    let friend = tree.add_object(author, "Author.friends").unwrap();
    tree.add_scalar(friend, "Person.name", br#""Bob""#).unwrap();
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(
            Field::builder()
                .name("friends")
                .dgraph_alias("Author.friends")
                .field_type(FieldType::named("Person").list())
                .selection(scalar("name", "Person.name", FieldType::named("String")))
                .build(),
        )
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAuthor":{"friends":[],"name":"Alice"}}"#
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "A single item was returned, but GraphQL was expecting a list."
    );
    assert_eq!(
        response.errors[0].path,
        Some(Path::from("queryAuthor/friends"))
    );
}

#[test]
fn list_items_for_a_single_selection_are_reported_and_dropped() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    let best1 = tree.add_object(author, "Author.bestFriend").unwrap();
    tree.mark_list(best1);
    tree.add_scalar(best1, "Person.name", br#""Bob""#).unwrap();
    let best2 = tree.add_object(author, "Author.bestFriend").unwrap();
    tree.mark_list(best2);
    tree.add_scalar(best2, "Person.name", br#""Carol""#).unwrap();
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(
            Field::builder()
                .name("bestFriend")
                .dgraph_alias("Author.bestFriend")
                .field_type(FieldType::named("Person"))
                .selection(scalar("name", "Person.name", FieldType::named("String")))
                .build(),
        )
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAuthor":{"bestFriend":null,"name":"Alice"}}"#
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "A list was returned, but GraphQL was expecting just one item."
    );
}

#[test]
fn object_data_for_a_scalar_selection_is_reported() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    let name = tree.add_object(author, "Author.name").unwrap();
    tree.add_scalar(name, "Person.first", br#""Alice""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        // scalar selection: no sub-selections
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryAuthor":{"name":null}}"#);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Expected a scalar value, but got an object."
    );
}

#[test]
fn root_non_null_violation_nulls_the_whole_response() {
    let mut tree = ResultTree::new();
    tree.add_scalar(tree.root(), UID_PREDICATE, br#""0x1""#).unwrap();

    let query = Field::builder()
        .name("getAuthor")
        .field_type(FieldType::named("Author").non_null())
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .build();

    let response = shape(&tree, &[query]);
    assert!(response.data.is_none());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Non-nullable field 'getAuthor' (type Author!) was not present in result from Dgraph."
    );
    assert_eq!(response.errors[0].path, Some(Path::from("getAuthor")));
    assert_eq!(
        String::from_utf8(response.to_json_bytes().unwrap()).unwrap(),
        concat!(
            r#"{"data":null,"errors":[{"message":"Non-nullable field 'getAuthor' "#,
            r#"(type Author!) was not present in result from Dgraph.","path":["getAuthor"]}]}"#,
        ),
    );
}

#[test]
fn scalar_lists_splice_their_items() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    let a = tree.add_scalar(author, "Author.tags", br#""rust""#).unwrap();
    tree.mark_list(a);
    let b = tree.add_scalar(author, "Author.tags", br#""graphql""#).unwrap();
    tree.mark_list(b);

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(scalar(
            "tags",
            "Author.tags",
            FieldType::named("String").list(),
        ))
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryAuthor":{"tags":["rust","graphql"]}}"#
    );
}

#[test]
fn geo_point_completes_from_raw_geojson() {
    let mut tree = ResultTree::new();
    let hotel = tree.add_object(tree.root(), "queryHotel").unwrap();
    tree.mark_list(hotel);
    tree.add_scalar(
        hotel,
        "Hotel.location",
        br#"{"type":"Point","coordinates":[12.5,55.1]}"#,
    )
    .unwrap();

    let query = Field::builder()
        .name("queryHotel")
        .field_type(FieldType::named("Hotel"))
        .selection(
            Field::builder()
                .name("location")
                .dgraph_alias("Hotel.location")
                .field_type(FieldType::named("Point"))
                .selection(scalar("longitude", "longitude", FieldType::named("Float").non_null()))
                .selection(scalar("latitude", "latitude", FieldType::named("Float").non_null()))
                .build(),
        )
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(
        data(&response),
        r#"{"queryHotel":{"location":{"longitude":12.5,"latitude":55.1}}}"#
    );
    assert!(response.errors.is_empty());
}

#[test]
fn malformed_geo_values_null_the_field_with_an_error() {
    let mut tree = ResultTree::new();
    let hotel = tree.add_object(tree.root(), "queryHotel").unwrap();
    tree.mark_list(hotel);
    tree.add_scalar(hotel, "Hotel.location", b"5").unwrap();

    let query = Field::builder()
        .name("queryHotel")
        .field_type(FieldType::named("Hotel"))
        .selection(
            Field::builder()
                .name("location")
                .dgraph_alias("Hotel.location")
                .field_type(FieldType::named("Point"))
                .selection(scalar("longitude", "longitude", FieldType::named("Float").non_null()))
                .build(),
        )
        .build();

    let response = shape(&tree, &[query]);
    assert_eq!(data(&response), r#"{"queryHotel":{"location":null}}"#);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "missing coordinates in geojson value: 5"
    );
}

#[test_log::test]
fn shaped_bytes_are_valid_json_with_selection_ordered_keys() {
    let mut tree = ResultTree::new();
    let author = tree.add_object(tree.root(), "queryAuthor").unwrap();
    tree.mark_list(author);
    tree.add_scalar(author, TYPE_PREDICATE, br#""Author""#).unwrap();
    tree.add_scalar(author, "Author.name", br#""Alice""#).unwrap();
    let bob = tree.add_object(author, "Author.friends").unwrap();
    tree.mark_list(bob);
    tree.add_scalar(bob, "Person.name", br#""Bob""#).unwrap();
    tree.add_scalar(author, UID_PREDICATE, br#""0x1""#).unwrap();

    let query = Field::builder()
        .name("queryAuthor")
        .field_type(FieldType::named("Author"))
        .selection(typename(&["Author"]))
        .selection(scalar("name", "Author.name", FieldType::named("String")))
        .selection(
            Field::builder()
                .name("friends")
                .dgraph_alias("Author.friends")
                .field_type(FieldType::named("Person").list())
                .selection(scalar("name", "Person.name", FieldType::named("String")))
                .build(),
        )
        .build();

    let response = shape(&tree, &[query]);
    let body = data(&response);
    insta::assert_snapshot!(
        body,
        @r#"{"queryAuthor":{"__typename":"Author","name":"Alice","friends":[{"name":"Bob"}]}}"#
    );

    // and it parses back to the same values the tree held
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["queryAuthor"]["name"], "Alice");
    assert_eq!(parsed["queryAuthor"]["friends"][0]["name"], "Bob");
}
