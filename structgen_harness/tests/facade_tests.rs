use pretty_assertions::assert_eq;
use structgen_harness::{registry, Choice, Ints, IntsTemplate, Pair, PairTemplate};
use structgen_runtime::{DecodeOptions, Registry, SemanticError, SemanticResult, Value};

fn unbound_operation<T: std::fmt::Debug>(result: SemanticResult<T>) -> &'static str {
    match result {
        Err(SemanticError::UnboundOperand { operation, .. }) => operation,
        other => panic!("expected an unbound operand error, got {:?}", other),
    }
}

fn choice_of(registry: &Registry, num: i64) -> Choice {
    let mut choice = Choice::new(registry).unwrap();
    choice.select_num(num).unwrap();
    choice
}

fn pair_of(registry: &Registry, left: i64, right: &str) -> Pair {
    let mut pair = Pair::new(registry).unwrap();
    pair.set_left(left).unwrap();
    pair.set_right(right).unwrap();
    pair
}

fn ints_of(registry: &Registry, items: &[i64]) -> Ints {
    let mut ints = Ints::new(registry).unwrap();
    for (index, item) in items.iter().enumerate() {
        *ints.element_at_mut(index).unwrap() = Some(Value::Integer(*item));
    }
    ints
}

/* ---------------------------------------------------------------- unions */

#[test]
fn union_facades_reject_unbound_sources() {
    let registry = registry().unwrap();
    let empty = Choice::new(&registry).unwrap();
    assert!(!empty.is_bound());
    assert_eq!(empty.selected().unwrap(), None);

    let mut target = choice_of(&registry, 5);
    assert_eq!(unbound_operation(target.assign(&empty)), "assignment");
    assert!(target.ischosen_num().unwrap());
    assert_eq!(target.num().unwrap(), &Some(Value::Integer(5)));

    /* a selected alternative without content is still unbound */
    let mut selected_only = Choice::new(&registry).unwrap();
    selected_only.word_mut().unwrap();
    assert!(!selected_only.is_bound());
    assert_eq!(unbound_operation(target.assign(&selected_only)), "assignment");
    assert!(target.ischosen_num().unwrap());
}

#[test]
fn union_facades_compare_and_copy() {
    let registry = registry().unwrap();
    let five = choice_of(&registry, 5);
    let empty = Choice::new(&registry).unwrap();
    assert_eq!(unbound_operation(five.equals(&empty)), "comparison");
    assert_eq!(unbound_operation(empty.equals(&five)), "comparison");

    let mut copy = Choice::new(&registry).unwrap();
    copy.assign(&five).unwrap();
    assert!(copy.equals(&five).unwrap());

    copy.select_word("five").unwrap();
    assert_eq!(copy.selected().unwrap(), Some("word"));
    assert!(!copy.ischosen_num().unwrap());
    assert!(!copy.equals(&five).unwrap());
    assert!(matches!(copy.num(), Err(SemanticError::WrongAlternative { .. })));

    /* the source is untouched by later writes to the copy */
    assert_eq!(five.selected().unwrap(), Some("num"));
}

/* --------------------------------------------------------------- records */

#[test]
fn record_facades_reject_unbound_sources() {
    let registry = registry().unwrap();
    let empty = Pair::new(&registry).unwrap();
    assert_eq!(unbound_operation(empty.left()), "field access");

    let mut target = pair_of(&registry, 1, "one");
    assert_eq!(unbound_operation(target.assign(&empty)), "assignment");
    assert_eq!(target.left().unwrap(), &Some(Value::Integer(1)));
    assert_eq!(unbound_operation(target.equals(&empty)), "comparison");
}

#[test]
fn record_facades_compare_and_copy() {
    let registry = registry().unwrap();
    let one = pair_of(&registry, 1, "one");

    let mut copy = Pair::new(&registry).unwrap();
    copy.assign(&one).unwrap();
    assert!(copy.equals(&one).unwrap());

    copy.set_right("uno").unwrap();
    assert!(!copy.equals(&one).unwrap());
    assert_eq!(one.right().unwrap(), &Some(Value::Charstring("one".into())));

    copy.clean_up();
    assert!(!copy.is_bound());
}

/* ------------------------------------------------------------- sequences */

#[test]
fn sequence_facades_reject_unbound_sources() {
    let registry = registry().unwrap();
    let empty = Ints::new(&registry).unwrap();
    assert_eq!(unbound_operation(empty.size_of()), "sizeof");

    let mut target = ints_of(&registry, &[1, 2]);
    assert_eq!(unbound_operation(target.assign(&empty)), "assignment");
    assert_eq!(target.size_of().unwrap(), 2);
    assert_eq!(unbound_operation(target.equals(&empty)), "comparison");
}

#[test]
fn sequence_facades_grow_within_limits() {
    let registry = registry().unwrap();
    let mut ints = ints_of(&registry, &[1, 2]);

    *ints.element_at_mut(4).unwrap() = Some(Value::Integer(5));
    assert_eq!(ints.size_of().unwrap(), 5);
    assert_eq!(ints.length_of().unwrap(), 5);
    assert_eq!(ints.element_at(3).unwrap(), &None);

    assert!(matches!(ints.element_at_mut(usize::MAX), Err(SemanticError::SizeLimit { .. })));
    assert!(matches!(ints.set_size(usize::MAX), Err(SemanticError::SizeLimit { .. })));
    assert_eq!(ints.size_of().unwrap(), 5);

    ints.set_size(2).unwrap();
    assert!(ints.equals(&ints_of(&registry, &[1, 2])).unwrap());
    assert!(ints.rotate_left(1).unwrap().equals(&ints_of(&registry, &[2, 1])).unwrap());
}

/* ---------------------------------------------------------------- codecs */

#[test]
fn facades_round_trip_through_tlv() {
    let registry = registry().unwrap();

    let ints = ints_of(&registry, &[1, 2]);
    let encoded = ints.encode_tlv(&registry).unwrap();
    assert_eq!(encoded, vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    assert!(Ints::decode_tlv(&registry, &encoded).unwrap().equals(&ints).unwrap());

    let five = choice_of(&registry, 5);
    let encoded = five.encode_tlv(&registry).unwrap();
    assert_eq!(encoded, vec![0x02, 0x01, 0x05]);
    let decoded = Choice::decode_tlv(&registry, &encoded).unwrap();
    assert!(decoded.ischosen_num().unwrap());
    assert!(decoded.equals(&five).unwrap());
}

#[test]
fn failed_decodes_leave_facades_unbound() {
    let registry = registry().unwrap();
    let mut pair = pair_of(&registry, 1, "one");

    let err = pair.decode_tlv_into(&registry, &[0xFF], DecodeOptions::silent()).unwrap_err();
    assert!(err.path().starts_with("Pair"));
    assert!(!pair.is_bound());

    let encoded = pair_of(&registry, 2, "two").encode_json(&registry).unwrap();
    pair.decode_json_into(&registry, &encoded, DecodeOptions::silent()).unwrap();
    assert!(pair.equals(&pair_of(&registry, 2, "two")).unwrap());
}

/* ------------------------------------------------------------- templates */

#[test]
fn template_facades_match_generated_values() {
    let registry = registry().unwrap();

    let mut template = IntsTemplate::default();
    template.set_param(&registry, "{1, ?, *}").unwrap();
    assert!(template.matches(&ints_of(&registry, &[1, 2, 3])));
    assert!(!template.matches(&ints_of(&registry, &[2, 2])));
    assert!(!template.is_value());

    let one = pair_of(&registry, 1, "one");
    let exact = PairTemplate::from_value(&one);
    assert!(exact.is_value());
    assert!(exact.matches(&one));
    assert!(exact.valueof().unwrap().equals(&one).unwrap());
}
