use json_edit::{
    infer, Converters, DataQuery, Editor, Error, FieldEdit, MemoryRenderer, Options, Path, Type,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn editor(data: Value) -> Editor<MemoryRenderer> {
    editor_with(data, json!({}))
}

fn editor_with(data: Value, overrides: Value) -> Editor<MemoryRenderer> {
    Editor::new(data, overrides, Options::default(), MemoryRenderer::new())
}

fn all(editor: &Editor<MemoryRenderer>) -> Value {
    editor.get_data(&DataQuery::default())
}

fn type_in(editor: &mut Editor<MemoryRenderer>, path: &str, value: Value) {
    let handle = *editor.field_handle(&Path::parse(path)).unwrap();
    editor.renderer_mut().input(handle, value);
}

fn shown_at(editor: &Editor<MemoryRenderer>, path: &str) -> (String, Value) {
    let handle = *editor.field_handle(&Path::parse(path)).unwrap();
    let field = editor.renderer().field(handle).unwrap();
    (field.path.to_string(), field.value.clone())
}

fn row_paths(editor: &Editor<MemoryRenderer>, table: &str) -> Vec<String> {
    editor
        .rendered()
        .table(&Path::parse(table))
        .unwrap()
        .rows
        .iter()
        .map(|row| row.path.to_string())
        .collect()
}

#[test]
fn round_trip_without_edits() {
    let data = json!({ "age": 19, "hobbies": ["piano", "blogging"] });

    assert_eq!(
        json!({
            "age": { "type": "number" },
            "hobbies": { "type": "array", "schema": { "type": "string" } },
        }),
        infer(&data)
    );

    let editor = editor(data.clone());
    assert_eq!(data, all(&editor));
}

#[test]
fn round_trip_nested_and_empty_containers() {
    let data = json!({
        "name": { "first": "Johnny", "last": "B." },
        "born": "1995-10-14T00:00:00Z",
        "active": true,
        "nothing": null,
        "tags": [],
        "meta": {},
        "keyboards": [
            { "maker": "Yamaha", "keys": 88 },
            { "maker": "Casio", "keys": 61 },
        ],
    });

    let editor = editor(data.clone());
    assert_eq!(data, all(&editor));
}

#[test]
fn typed_input_is_converted() {
    let mut editor = editor(json!({ "age": 19, "active": false, "name": "Johnny" }));

    type_in(&mut editor, "age", json!("42"));
    type_in(&mut editor, "active", json!("on"));
    type_in(&mut editor, "name", json!(7));

    assert_eq!(
        json!({ "age": 42, "active": true, "name": "7" }),
        all(&editor)
    );

    // The snapshot only changes through `set_data` and structural edits.
    assert_eq!(Some(&json!(19)), editor.get_value(&Path::parse("age")));
}

#[test]
fn custom_converters() {
    fn shout(raw: &Value) -> Value {
        json!(raw.as_str().unwrap_or_default().to_uppercase())
    }

    let options = Options::default().with_converters(Converters::default().with(Type::String, shout));
    let editor = Editor::new(
        json!({ "name": "Johnny", "age": 19 }),
        json!({}),
        options,
        MemoryRenderer::new(),
    );

    assert_eq!(json!({ "name": "JOHNNY", "age": 19 }), all(&editor));
}

#[test]
fn get_data_below_a_path() {
    let editor = editor(json!({
        "name": { "first": "Johnny", "last": "B." },
        "hobbies": ["piano", "blogging"],
        "tags": [],
    }));

    assert_eq!(
        json!("Johnny"),
        editor.get_data(&DataQuery::at(Path::parse("name.first")))
    );
    assert_eq!(
        json!({ "first": "Johnny", "last": "B." }),
        editor.get_data(&DataQuery::at(Path::parse("name")))
    );
    assert_eq!(
        json!(["piano", "blogging"]),
        editor.get_data(&DataQuery::at(Path::parse("hobbies")))
    );
    assert_eq!(json!([]), editor.get_data(&DataQuery::at(Path::parse("tags"))));
}

#[test]
fn deferred_rendering() {
    let options = Options {
        auto_init: false,
        ..Options::default()
    };
    let mut editor = Editor::new(json!({ "age": 19 }), json!({}), options, MemoryRenderer::new());

    assert!(!editor.is_initialized());
    assert!(editor.renderer().is_empty());
    assert_eq!(json!({}), all(&editor));

    editor.init_ui();
    editor.init_ui();
    assert_eq!(1, editor.renderer().len());
    assert_eq!(json!({ "age": 19 }), all(&editor));
}

#[test]
fn inline_data_wins_over_data() {
    let editor = editor_with(
        json!({ "country": "Moldova" }),
        json!({ "country": { "data": "Romania" } }),
    );

    assert_eq!(json!({ "country": "Romania" }), all(&editor));
}

#[test]
fn delete_row_renumbers() {
    let mut editor = editor(json!({
        "list": [ { "name": "a" }, { "name": "b" }, { "name": "c" } ],
    }));

    editor.delete_row(&Path::parse("list.1")).unwrap();

    assert_eq!(vec!["list.0", "list.1"], row_paths(&editor, "list"));
    assert_eq!(
        json!({ "list": [ { "name": "a" }, { "name": "c" } ] }),
        all(&editor)
    );
    assert_eq!(
        Some(&json!([ { "name": "a" }, { "name": "c" } ])),
        editor.get_value(&Path::parse("list"))
    );

    // The renderer was told where the moved field lives now.
    assert_eq!(
        ("list.1.name".to_owned(), json!("c")),
        shown_at(&editor, "list.1.name")
    );
}

#[test]
fn delete_row_renumbers_nested_lists() {
    let mut editor = editor(json!({
        "list": [
            { "name": "a", "tags": ["x"] },
            { "name": "b", "tags": ["y", "z"] },
        ],
    }));

    editor.delete_row(&Path::parse("list.0")).unwrap();
    assert_eq!(vec!["list.0.tags.0", "list.0.tags.1"], row_paths(&editor, "list.0.tags"));

    editor.add_row(&Path::parse("list.0.tags"), json!("w")).unwrap();
    assert_eq!(
        json!({ "list": [ { "name": "b", "tags": ["y", "z", "w"] } ] }),
        all(&editor)
    );
}

#[test]
fn lists_of_lists() {
    let data = json!({ "m": [[1, 2], [3]], "e": [["x"], []] });
    let mut editor = editor(data.clone());
    assert_eq!(data, all(&editor));

    let row = editor.add_row(&Path::parse("m.1"), json!(4)).unwrap();
    assert_eq!("m.1.1", row.to_string());
    assert_eq!((String::from("m.1.1"), json!(4)), shown_at(&editor, "m.1.1"));

    editor.delete_row(&Path::parse("m.0")).unwrap();
    assert_eq!(vec!["m.0.0", "m.0.1"], row_paths(&editor, "m.0"));
    assert_eq!(json!({ "m": [[3, 4]], "e": [["x"], []] }), all(&editor));
}

#[test]
fn add_rows() {
    let mut editor = editor(json!({ "keyboards": [ { "maker": "Yamaha" } ], "hobbies": [] }));

    let row = editor
        .add_row(&Path::parse("keyboards"), json!({ "maker": "Casio" }))
        .unwrap();
    assert_eq!("keyboards.1", row.to_string());

    // Columns missing from the row data start from their defaults.
    editor.add_row(&Path::parse("keyboards"), json!({})).unwrap();

    assert_eq!(
        json!({
            "keyboards": [ { "maker": "Yamaha" }, { "maker": "Casio" }, { "maker": "" } ],
            "hobbies": [],
        }),
        all(&editor)
    );

    assert!(matches!(
        editor.add_row(&Path::parse("keyboards.maker"), json!("x")),
        Err(Error::NotATable { .. })
    ));
    assert!(matches!(
        editor.delete_row(&Path::parse("keyboards.7")),
        Err(Error::NoSuchRow { .. })
    ));
    assert!(matches!(
        editor.delete_row(&Path::parse("keyboards")),
        Err(Error::NoSuchRow { .. })
    ));
}

#[test]
fn set_data_reconciles_rows() {
    let mut editor = editor(json!({ "age": 19, "hobbies": ["a", "b", "c"] }));

    editor.set_data(&Path::root(), &json!({ "age": 20, "hobbies": ["x"] }));
    assert_eq!(vec!["hobbies.0"], row_paths(&editor, "hobbies"));
    assert_eq!(json!({ "age": 20, "hobbies": ["x"] }), all(&editor));

    editor.set_data(&Path::parse("hobbies"), &json!(["x", "y"]));
    assert_eq!(json!({ "age": 20, "hobbies": ["x", "y"] }), all(&editor));

    // No array in the data means no rows, and missing leaves fall back to
    // their defaults.
    editor.set_data(&Path::root(), &json!({}));
    assert_eq!(json!({ "age": 0, "hobbies": [] }), all(&editor));
}

#[test]
fn set_data_on_inner_lists() {
    let mut editor = editor(json!({ "m": [[1, 2], [3]] }));

    editor.set_data(&Path::parse("m.0"), &json!([7, 8, 9]));
    assert_eq!(vec!["m.0.0", "m.0.1", "m.0.2"], row_paths(&editor, "m.0"));
    assert_eq!(json!({ "m": [[7, 8, 9], [3]] }), all(&editor));
}

#[test]
fn set_data_far_past_the_end() {
    let mut editor = editor(json!({ "l": ["a", "b"] }));

    editor.set_data(&Path::parse("l.99999999999999"), &json!("x"));
    assert_eq!(vec!["l.0", "l.1"], row_paths(&editor, "l"));
    assert_eq!(json!("x"), editor.data()["l"]["99999999999999"]);
    assert_eq!(json!({ "l": ["a", "b"] }), all(&editor));
}

#[test]
fn set_rows() {
    let mut editor = editor(json!({ "keyboards": [ { "maker": "Yamaha" }, { "maker": "Casio" } ] }));

    editor
        .set_rows(&Path::parse("keyboards"), &[json!({ "maker": "Roland" })])
        .unwrap();
    assert_eq!(
        json!({ "keyboards": [ { "maker": "Roland" } ] }),
        all(&editor)
    );

    assert!(matches!(
        editor.set_rows(&Path::parse("nope"), &[]),
        Err(Error::NotATable { .. })
    ));
}

#[test]
fn new_row_editors() {
    let mut editor = editor(json!({
        "keyboards": [ { "maker": "Yamaha" } ],
        "hobbies": ["piano"],
    }));

    type_in(&mut editor, "keyboards.+.maker", json!("Roland"));
    type_in(&mut editor, "hobbies.+", json!("chess"));

    // Uncommitted input is only collected on request.
    assert_eq!(
        json!({ "keyboards": [ { "maker": "Yamaha" } ], "hobbies": ["piano"] }),
        all(&editor)
    );
    assert_eq!(
        json!({ "maker": "Roland" }),
        editor.get_data(&DataQuery::at(Path::parse("keyboards.+")).with_new_rows())
    );

    let row = editor.commit_new_row(&Path::parse("keyboards")).unwrap();
    assert_eq!("keyboards.1", row.to_string());
    editor.commit_new_row(&Path::parse("hobbies")).unwrap();

    assert_eq!(
        json!({
            "keyboards": [ { "maker": "Yamaha" }, { "maker": "Roland" } ],
            "hobbies": ["piano", "chess"],
        }),
        all(&editor)
    );
    assert_eq!(("keyboards.+.maker".to_owned(), json!("")), shown_at(&editor, "keyboards.+.maker"));
}

#[test]
fn set_data_on_new_row_leaves_snapshot_alone() {
    let mut editor = editor(json!({ "keyboards": [ { "maker": "Yamaha" } ] }));

    editor.set_data(&Path::parse("keyboards.+"), &json!({ "maker": "Korg" }));
    assert_eq!(("keyboards.+.maker".to_owned(), json!("Korg")), shown_at(&editor, "keyboards.+.maker"));
    assert_eq!(
        Some(&json!([ { "maker": "Yamaha" } ])),
        editor.get_value(&Path::parse("keyboards"))
    );
}

#[test]
fn add_field() {
    let mut editor = editor(json!({ "age": 19, "keyboards": [ { "maker": "Yamaha" }, { "maker": "Casio" } ] }));

    let path = editor
        .add_field(&Path::root(), "email", json!({ "type": "string", "label": "E-mail" }))
        .unwrap();
    assert_eq!("email", path.to_string());
    assert_eq!("E-mail", editor.definition_at(&path).unwrap().label);

    editor
        .add_field(&Path::parse("keyboards"), "keys", json!({ "type": "number" }))
        .unwrap();

    assert_eq!(
        json!({
            "age": 19,
            "keyboards": [ { "maker": "Yamaha", "keys": 0 }, { "maker": "Casio", "keys": 0 } ],
            "email": "",
        }),
        all(&editor)
    );
    assert_eq!(
        Some(&["age".to_owned(), "keyboards".to_owned(), "email".to_owned()][..]),
        editor.schema().order(editor.schema().root())
    );

    // The new column belongs to its rows, so renumbering moves it along.
    type_in(&mut editor, "keyboards.1.keys", json!("61"));
    editor.delete_row(&Path::parse("keyboards.0")).unwrap();
    assert_eq!(
        json!([ { "maker": "Casio", "keys": 61 } ]),
        editor.get_data(&DataQuery::at(Path::parse("keyboards")))
    );

    // The new row editor got the column too.
    assert!(editor.field_handle(&Path::parse("keyboards.+.keys")).is_some());
}

#[test]
fn add_nested_container_field() {
    let mut editor = editor(json!({ "name": "Johnny" }));

    editor
        .add_field(
            &Path::root(),
            "address",
            json!({ "type": "object", "schema": { "city": { "type": "string" } } }),
        )
        .unwrap();
    editor
        .add_field(&Path::parse("address"), "zip", json!({ "type": "number" }))
        .unwrap();

    assert_eq!(
        json!({ "name": "Johnny", "address": { "city": "", "zip": 0 } }),
        all(&editor)
    );
    assert_eq!(
        "address.zip",
        editor.definition_at(&Path::parse("address.zip")).unwrap().path.to_string()
    );
}

#[test]
fn duplicate_field_name_is_rejected() {
    let mut editor = editor(json!({ "age": 19 }));
    let before = editor.schema().order(editor.schema().root()).unwrap().len();

    let err = editor
        .add_field(&Path::root(), "age", json!({ "type": "number" }))
        .unwrap_err();

    assert!(matches!(err, Error::InvalidFieldName { .. }));
    assert_eq!("A field named age already exists", err.to_string());
    assert_eq!(before, editor.schema().order(editor.schema().root()).unwrap().len());
    assert_eq!(json!({ "age": 19 }), all(&editor));
}

#[test]
fn invalid_field_names_are_rejected() {
    let mut editor = editor(json!({ "age": 19 }));

    for name in &["", "a.b", "+", "3", "_order"] {
        let err = editor
            .add_field(&Path::root(), name, json!({ "type": "string" }))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFieldName { .. }), "{:?}", name);
    }

    assert_eq!(2, editor.schema().len());
}

#[test]
fn configured_messages() {
    let options: Options = serde_json::from_value(json!({
        "messages": { "duplicate_field_name": "{0} is taken" },
    }))
    .unwrap();
    let mut editor = Editor::new(json!({ "age": 19 }), json!({}), options, MemoryRenderer::new());

    let err = editor
        .add_field(&Path::root(), "age", json!({ "type": "number" }))
        .unwrap_err();
    assert_eq!("age is taken", err.to_string());
}

#[test]
fn rename_field() {
    let mut editor = editor(json!({ "name": { "first": "Johnny", "last": "B." } }));

    let path = editor
        .edit_field(
            &Path::parse("name.last"),
            FieldEdit {
                name: Some("family".to_owned()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!("name.family", path.to_string());
    assert_eq!(
        json!({ "name": { "first": "Johnny", "family": "B." } }),
        all(&editor)
    );
    assert_eq!(Some(&json!("B.")), editor.get_value(&path));
    assert_eq!(None, editor.get_value(&Path::parse("name.last")));
    assert_eq!("family", editor.definition_at(&path).unwrap().label);
    assert!(editor.definition_at(&Path::parse("name.last")).is_none());
    assert_eq!(
        ("name.family".to_owned(), json!("B.")),
        shown_at(&editor, "name.family")
    );
}

#[test]
fn rename_column_in_every_row() {
    let mut editor = editor(json!({ "keyboards": [ { "maker": "Yamaha" }, { "maker": "Casio" } ] }));

    editor
        .edit_field(
            &Path::parse("keyboards.0.maker"),
            FieldEdit {
                name: Some("brand".to_owned()),
                label: Some("Brand".to_owned()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(
        json!({ "keyboards": [ { "brand": "Yamaha" }, { "brand": "Casio" } ] }),
        all(&editor)
    );
    assert_eq!("Brand", editor.definition_at(&Path::parse("keyboards.brand")).unwrap().label);
    assert!(editor.field_handle(&Path::parse("keyboards.+.brand")).is_some());

    // Renumbering still works on renamed cells.
    editor.delete_row(&Path::parse("keyboards.0")).unwrap();
    assert_eq!(
        json!({ "keyboards": [ { "brand": "Casio" } ] }),
        all(&editor)
    );
}

#[test]
fn rename_to_taken_name_changes_nothing() {
    let mut editor = editor(json!({ "first": "Johnny", "last": "B." }));

    let err = editor
        .edit_field(
            &Path::parse("last"),
            FieldEdit {
                name: Some("first".to_owned()),
                label: Some("Nope".to_owned()),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, Error::InvalidFieldName { .. }));
    assert_eq!("last", editor.definition_at(&Path::parse("last")).unwrap().label);
    assert_eq!(json!({ "first": "Johnny", "last": "B." }), all(&editor));
}

#[test]
fn retype_field() {
    let mut editor = editor(json!({ "age": 19, "name": { "first": "Johnny" } }));

    editor
        .edit_field(
            &Path::parse("age"),
            FieldEdit {
                type_: Some(Type::String),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(Type::String, editor.definition_at(&Path::parse("age")).unwrap().type_);
    assert_eq!(json!("19"), editor.get_data(&DataQuery::at(Path::parse("age"))));

    for (path, type_) in &[("age", Type::Object), ("name", Type::String), ("name.first", Type::Array)] {
        let err = editor
            .edit_field(
                &Path::parse(path),
                FieldEdit {
                    type_: Some(*type_),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }), "{} -> {}", path, type_);
    }

    assert_eq!(Type::Object, editor.definition_at(&Path::parse("name")).unwrap().type_);
}

#[test]
fn delete_field() {
    let mut editor = editor(json!({
        "name": { "first": "Johnny", "last": "B." },
        "keyboards": [ { "maker": "Yamaha", "keys": 88 } ],
    }));

    editor.delete_field(&Path::parse("name.first")).unwrap();
    editor.delete_field(&Path::parse("keyboards.keys")).unwrap();

    assert_eq!(
        json!({ "name": { "last": "B." }, "keyboards": [ { "maker": "Yamaha" } ] }),
        all(&editor)
    );
    assert_eq!(None, editor.get_value(&Path::parse("name.first")));
    assert_eq!(None, editor.get_value(&Path::parse("keyboards.0.keys")));
    assert!(editor.definition_at(&Path::parse("name.first")).is_none());
    assert!(editor.field_handle(&Path::parse("keyboards.+.keys")).is_none());

    editor.delete_field(&Path::parse("name")).unwrap();
    assert_eq!(json!({ "keyboards": [ { "maker": "Yamaha" } ] }), all(&editor));

    assert!(matches!(
        editor.delete_field(&Path::parse("name")),
        Err(Error::NoSuchField { .. })
    ));
}

#[test]
fn capability_flags() {
    let mut editor = editor_with(
        json!({ "name": { "first": "Johnny", "last": "B." }, "age": 19 }),
        json!({
            "name": { "deletableFields": false, "editableFields": false, "addField": false },
            "age": { "editable": false },
        }),
    );

    assert!(matches!(
        editor.delete_field(&Path::parse("name.first")),
        Err(Error::NotPermitted { .. })
    ));
    assert!(matches!(
        editor.edit_field(
            &Path::parse("name.last"),
            FieldEdit {
                label: Some("Last".to_owned()),
                ..Default::default()
            },
        ),
        Err(Error::NotPermitted { .. })
    ));
    assert!(matches!(
        editor.edit_field(&Path::parse("age"), FieldEdit::default()),
        Err(Error::NotPermitted { .. })
    ));
    assert!(matches!(
        editor.add_field(&Path::parse("name"), "middle", json!({ "type": "string" })),
        Err(Error::NotPermitted { .. })
    ));

    editor.delete_field(&Path::parse("age")).unwrap();
    assert_eq!(
        json!({ "name": { "first": "Johnny", "last": "B." } }),
        all(&editor)
    );
}

#[test]
fn fields_being_edited() {
    let mut editor = editor(json!({ "age": 19, "name": "Johnny" }));

    editor.begin_field_edit(&Path::parse("age")).unwrap();
    assert_eq!(json!({ "name": "Johnny" }), all(&editor));

    let query = DataQuery {
        include_fields_being_edited: true,
        ..Default::default()
    };
    assert_eq!(json!({ "age": 19, "name": "Johnny" }), editor.get_data(&query));

    editor.cancel_field_edit(&Path::parse("age"));
    assert_eq!(json!({ "age": 19, "name": "Johnny" }), all(&editor));

    // Saving an edit closes it.
    editor.begin_field_edit(&Path::parse("name")).unwrap();
    editor
        .edit_field(
            &Path::parse("name"),
            FieldEdit {
                name: Some("nick".to_owned()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(json!({ "age": 19, "nick": "Johnny" }), all(&editor));

    assert!(matches!(
        editor.begin_field_edit(&Path::parse("missing")),
        Err(Error::NoSuchField { .. })
    ));
}
