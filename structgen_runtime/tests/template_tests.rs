/* Templates built from parameter strings against registry-planned types,
 * plus value sharing under both element representations */

mod common;

use common::{ints, record, registry, registry_with, union};
use pretty_assertions::assert_eq;
use structgen_runtime::{
    parse_param, Ownership, ParamError, Registry, Representation, RuntimeConfig, SemanticError, Template, Value,
};

const TYPES: &str = r#"
module:
  name: Templates
types:
  - name: Ints
    kind:
      record-of:
        element:
          name: item
          field-type: {primitive: {type: integer}}

  - name: IntSet
    kind:
      set-of:
        element:
          name: item
          field-type: {primitive: {type: integer}}

  - name: Pick
    kind:
      union:
        alternatives:
          - name: num
            field-type: {primitive: {type: integer}}
          - name: word
            field-type: {primitive: {type: charstring}}

  - name: Pair
    kind:
      record:
        fields:
          - name: left
            field-type: {primitive: {type: integer}}
          - name: right
            field-type: {primitive: {type: charstring}}
            optional: true
"#;

fn types() -> Registry {
    registry(TYPES)
}

fn template(registry: &Registry, type_name: &str, params: &[&str]) -> Result<Template, ParamError> {
    let mut template = Template::default();
    for param in params {
        template.set_param(registry, type_name, &parse_param(param)?)?;
    }
    Ok(template)
}

fn pair(registry: &Registry, left: i64, right: Option<&str>) -> Value {
    let mut fields = vec![("left", Value::Integer(left))];
    if let Some(right) = right {
        fields.push(("right", Value::Charstring(right.to_string())));
    }
    record(registry, "Pair", &fields)
}

#[test]
fn value_lists_match_positionally() {
    let registry = types();
    let t = template(&registry, "Ints", &["{1, ?, 3}"]).unwrap();

    assert!(t.matches(&ints(&registry, "Ints", &[1, 99, 3])));
    assert!(!t.matches(&ints(&registry, "Ints", &[1, 2, 4])));
    assert!(!t.matches(&ints(&registry, "Ints", &[1, 2])));
    assert!(!t.matches(&registry.new_value("Ints").unwrap()));
}

#[test]
fn permutation_matches_any_order_of_its_block() {
    let registry = types();
    let t = template(&registry, "Ints", &["{permutation(1, 2), 3}"]).unwrap();

    assert!(t.matches(&ints(&registry, "Ints", &[2, 1, 3])));
    assert!(t.matches(&ints(&registry, "Ints", &[1, 2, 3])));
    assert!(!t.matches(&ints(&registry, "Ints", &[1, 3, 2])));

    let err = template(&registry, "IntSet", &["{permutation(1, 2)}"]).unwrap_err();
    assert!(matches!(err, ParamError::Incompatible { .. }));
}

#[test]
fn later_params_refine_earlier_ones() {
    let registry = types();

    /* `-` keeps the previous item */
    let t = template(&registry, "Ints", &["{1, 2, 3}", "{-, 5, -}"]).unwrap();
    assert!(t.matches(&ints(&registry, "Ints", &[1, 5, 3])));
    assert!(!t.matches(&ints(&registry, "Ints", &[1, 2, 3])));

    let t = template(&registry, "Ints", &["{?, ?, 0}", "{[2] := 9}"]).unwrap();
    assert!(t.matches(&ints(&registry, "Ints", &[4, 4, 9])));
    assert!(!t.matches(&ints(&registry, "Ints", &[4, 4, 0])));

    let t = template(&registry, "Ints", &["{1, 2, 3}", "[1] := 7"]).unwrap();
    assert!(t.matches(&ints(&registry, "Ints", &[1, 7, 3])));

    /* indexing past the end leaves unset positions that never match */
    let t = template(&registry, "Ints", &["{[2] := 9}"]).unwrap();
    assert!(!t.matches(&ints(&registry, "Ints", &[0, 0, 9])));
}

#[test]
fn indices_past_the_size_limit_are_rejected() {
    let registry = types();
    for param in ["{[18446744073709551615] := 1}", "[18446744073709551615] := 1", "{[100000000] := 1}"] {
        match template(&registry, "Ints", &[param]) {
            Err(ParamError::Semantic(SemanticError::SizeLimit { type_name, .. })) => assert_eq!(type_name, "Ints"),
            other => panic!("{}: unexpected {:?}", param, other),
        }
    }

    let err = template(&registry, "Ints", &["{[18446744073709551616] := 1}"]).unwrap_err();
    assert!(matches!(err, ParamError::Parse { .. }));
}

#[test]
fn unions_take_one_named_alternative() {
    let registry = types();
    let t = template(&registry, "Pick", &["{word := \"hi\"}"]).unwrap();

    assert!(t.matches(&union(&registry, "Pick", "word", Value::Charstring("hi".into()))));
    assert!(!t.matches(&union(&registry, "Pick", "word", Value::Charstring("ho".into()))));
    assert!(!t.matches(&union(&registry, "Pick", "num", Value::Integer(1))));

    let t = template(&registry, "Pick", &["num := (1, 2)"]).unwrap();
    assert!(t.matches(&union(&registry, "Pick", "num", Value::Integer(2))));
    assert!(!t.matches(&union(&registry, "Pick", "num", Value::Integer(3))));

    let err = template(&registry, "Pick", &["{nope := 1}"]).unwrap_err();
    assert_eq!(
        err,
        ParamError::UnknownName {
            type_name: "Pick".into(),
            name: "nope".into()
        }
    );

    let err = template(&registry, "Pick", &["{num := 1, word := \"x\"}"]).unwrap_err();
    assert!(matches!(err, ParamError::Incompatible { .. }));
}

#[test]
fn record_fields_by_name_or_position() {
    let registry = types();

    let t = template(&registry, "Pair", &["{left := 1, right := omit}"]).unwrap();
    assert!(t.matches(&pair(&registry, 1, None)));
    assert!(!t.matches(&pair(&registry, 1, Some("x"))));

    let t = template(&registry, "Pair", &["{1, \"x\"}"]).unwrap();
    assert!(t.matches(&pair(&registry, 1, Some("x"))));
    assert!(!t.matches(&pair(&registry, 1, None)));

    let t = template(&registry, "Pair", &["{left := ?, right := \"a\" ifpresent}"]).unwrap();
    assert!(t.matches(&pair(&registry, 5, None)));
    assert!(t.matches(&pair(&registry, 5, Some("a"))));
    assert!(!t.matches(&pair(&registry, 5, Some("b"))));

    let err = template(&registry, "Pair", &["{1}"]).unwrap_err();
    assert!(matches!(err, ParamError::Incompatible { .. }));
}

#[test]
fn superset_and_subset_apply_to_sets_only() {
    let registry = types();

    let t = template(&registry, "IntSet", &["superset(1, 2)"]).unwrap();
    assert!(t.matches(&ints(&registry, "IntSet", &[3, 2, 1])));
    assert!(!t.matches(&ints(&registry, "IntSet", &[1, 3])));

    let t = template(&registry, "IntSet", &["subset(1, 2, 3)"]).unwrap();
    assert!(t.matches(&ints(&registry, "IntSet", &[3, 1])));
    assert!(!t.matches(&ints(&registry, "IntSet", &[1, 4])));

    /* unordered matching for plain set-of value lists */
    let t = template(&registry, "IntSet", &["{1, 2}"]).unwrap();
    assert!(t.matches(&ints(&registry, "IntSet", &[2, 1])));

    let err = template(&registry, "Ints", &["superset(1)"]).unwrap_err();
    assert!(matches!(err, ParamError::Incompatible { .. }));
}

#[test]
fn modifiers_and_complements() {
    let registry = types();

    let t = template(&registry, "Ints", &["? length(2)"]).unwrap();
    assert!(t.matches(&ints(&registry, "Ints", &[1, 2])));
    assert!(!t.matches(&ints(&registry, "Ints", &[1, 2, 3])));

    let t = template(&registry, "Ints", &["* length(1..2)"]).unwrap();
    assert!(t.matches(&ints(&registry, "Ints", &[1])));
    assert!(!t.matches(&ints(&registry, "Ints", &[])));

    let t = template(&registry, "Ints", &["{complement(1, 2), ?}"]).unwrap();
    assert!(t.matches(&ints(&registry, "Ints", &[3, 0])));
    assert!(!t.matches(&ints(&registry, "Ints", &[1, 0])));

    let err = template(&registry, "Ints", &["{\"x\"}"]).unwrap_err();
    assert!(matches!(err, ParamError::Incompatible { .. }));
}

#[test]
fn specific_templates_round_trip_through_valueof() {
    let registry = types();
    let value = ints(&registry, "Ints", &[4, 5]);

    let t = Template::from_value(&value);
    assert!(t.is_value());
    assert!(t.matches(&value));
    assert!(t.valueof().unwrap().equals(&value).unwrap());

    let t = template(&registry, "Ints", &["{4, ?}"]).unwrap();
    assert!(!t.is_value());
}

fn with_representation(representation: Representation) -> Registry {
    registry_with(
        TYPES,
        RuntimeConfig {
            representation: Some(representation),
            ..RuntimeConfig::default()
        },
    )
}

#[test]
fn copies_are_independent_in_both_representations() {
    for representation in [Representation::Shared, Representation::Flat] {
        let registry = with_representation(representation);
        let original = ints(&registry, "Ints", &[1, 2, 3]);
        let mut copy = original.clone();

        let expected_sharing = match representation {
            Representation::Shared => Some(Ownership::Shared(2)),
            Representation::Flat => Some(Ownership::Exclusive),
        };
        assert_eq!(copy.as_seq().unwrap().ownership(), expected_sharing);

        *copy.as_seq_mut().unwrap().element_at_mut(0).unwrap() = Some(Value::Integer(9));

        assert_eq!(original.as_seq().unwrap().element_at(0).unwrap(), &Some(Value::Integer(1)));
        assert_eq!(copy.as_seq().unwrap().element_at(0).unwrap(), &Some(Value::Integer(9)));
        assert_eq!(original.as_seq().unwrap().ownership(), Some(Ownership::Exclusive));
    }
}

#[test]
fn handles_survive_assignment_and_shrinking() {
    for representation in [Representation::Shared, Representation::Flat] {
        let registry = with_representation(representation);
        let source = ints(&registry, "Ints", &[7, 8]);
        let mut target = ints(&registry, "Ints", &[1, 2, 3, 4]);
        let seq = target.as_seq_mut().unwrap();

        let handle = seq.reference(3).unwrap();
        seq.assign(source.as_seq().unwrap()).unwrap();

        /* the referenced slot stays allocated but is cleared */
        assert_eq!(seq.size_of().unwrap(), 4);
        assert_eq!(seq.length_of().unwrap(), 2);
        assert_eq!(seq.get(&handle), Some(&None));

        *seq.get_mut(&handle).unwrap() = Some(Value::Integer(5));
        assert_eq!(seq.element_at(3).unwrap(), &Some(Value::Integer(5)));

        seq.release(handle);
        seq.set_size(1).unwrap();
        assert_eq!(seq.size_of().unwrap(), 1);
    }
}
